use std::sync::Arc;

use frond::ast::AstKey;
use frond::error::{RenderError, SourceError};
use frond::source::{MemorySource, Source, SourceSet};

fn set() -> SourceSet {
    let mut sources = SourceSet::new();
    sources
        .register_default(Arc::new(
            MemorySource::new().with("hello", "Hello"),
        ))
        .unwrap();
    sources
        .register(
            "partials",
            Arc::new(
                MemorySource::new()
                    .with("hello", "Partial hello")
                    .with("footer", "Footer"),
            ),
        )
        .unwrap();
    sources
}

#[tokio::test]
async fn source_default_order_resolution() {
    let sources = set();
    // both sources hold `hello`; registration order wins
    let (origin, bytes) =
        sources.find(&AstKey::default_scope("hello")).await.unwrap();
    assert_eq!("$", origin);
    assert_eq!(b"Hello", &bytes[..]);

    // only the second source holds `footer`
    let (origin, bytes) =
        sources.find(&AstKey::default_scope("footer")).await.unwrap();
    assert_eq!("partials", origin);
    assert_eq!(b"Footer", &bytes[..]);
}

#[tokio::test]
async fn source_explicit_resolution() {
    let sources = set();
    let (origin, bytes) = sources
        .find(&AstKey::new("partials", "hello"))
        .await
        .unwrap();
    assert_eq!("partials", origin);
    assert_eq!(b"Partial hello", &bytes[..]);
}

#[tokio::test]
async fn source_missing_template() {
    let sources = set();
    let err = sources
        .find(&AstKey::default_scope("nope"))
        .await
        .unwrap_err();
    assert_eq!(RenderError::NoTemplateExists("nope".to_string()), err);

    let err = sources
        .find(&AstKey::new("unknown", "hello"))
        .await
        .unwrap_err();
    assert_eq!(
        RenderError::NoTemplateExists("unknown:hello".to_string()),
        err
    );
}

#[test]
fn source_rejects_illegal_names() {
    let mut sources = SourceSet::new();
    let memory = Arc::new(MemorySource::new());

    let err = sources.register("$custom", memory.clone()).unwrap_err();
    assert_eq!(RenderError::IllegalAccess("$custom".to_string()), err);

    let err = sources.register("a:b", memory.clone()).unwrap_err();
    assert_eq!(RenderError::IllegalAccess("a:b".to_string()), err);

    let err = sources.register("", memory.clone()).unwrap_err();
    assert_eq!(RenderError::IllegalAccess(String::new()), err);

    // the bare default scope name is fine
    sources.register("$", memory).unwrap();
    assert_eq!(1, sources.len());
}

#[cfg(feature = "fs")]
mod fs {
    use super::*;
    use frond::source::FileSource;

    fn fixture_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("frond-source-tests").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn file_source_reads_templates() {
        let dir = fixture_dir("read");
        std::fs::write(dir.join("hello.frond"), "Hello, #(name)!").unwrap();

        let source = FileSource::new(&dir, "frond");
        let bytes = source.read("hello").await.unwrap();
        assert_eq!(b"Hello, #(name)!", &bytes[..]);

        let err = source.read("missing").await.unwrap_err();
        assert_eq!(SourceError::NotFound("missing".to_string()), err);
    }

    #[tokio::test]
    async fn file_source_rejects_traversal() {
        let dir = fixture_dir("traversal");
        let source = FileSource::new(&dir, "frond");
        let err = source.read("../escape").await.unwrap_err();
        assert_eq!(SourceError::IllegalPath("../escape".to_string()), err);

        let err = source.read("/etc/hosts").await.unwrap_err();
        assert_eq!(SourceError::IllegalPath("/etc/hosts".to_string()), err);
    }
}
