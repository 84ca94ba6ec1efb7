extern crate log;

use frond::entity::Entities;
use frond::lexer;

fn main() {
    let value = r#"Hello, #(name)! #if(name == "world"):planet#endif"#;
    match lexer::collect("main.rs", value, &Entities::core()) {
        Ok(tokens) => println!("{:#?}", tokens),
        Err(e) => log::error!("{:?}", e),
    }
}
