extern crate log;
extern crate pretty_env_logger;

use std::sync::Arc;

use frond::{
    Entities, MemoryCache, MemorySource, Renderer, Result, SourceSet,
};
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    std::env::set_var("RUST_LOG", "debug");
    pretty_env_logger::init();

    let data = json!({
        "title": "Seasonal stock",
        "items": [
            {"title": "apples", "count": 1},
            {"title": "oranges", "count": 2},
            {"title": "pears", "count": 3},
        ],
    });

    let source = MemorySource::new()
        .with(
            "document",
            "# #(title)\n#for(item in items): * #(item.title) x#(item.count)\n#endfor#inline(\"footer\")",
        )
        .with("footer", "---\n#count(items) kinds in stock\n");

    let mut sources = SourceSet::new();
    sources.register_default(Arc::new(source))?;

    let renderer = Renderer::new(
        Arc::new(Entities::core()),
        Arc::new(sources),
        Arc::new(MemoryCache::new()),
    );

    match renderer.render("document", &data).await {
        Ok(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
        Err(e) => log::error!("{}", e),
    }

    Ok(())
}
