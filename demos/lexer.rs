use frond::entity::Entities;
use frond::lexer::collect;

/// Demonstrates low-level access to the token stream.
fn main() {
    let content =
        "Hello, #(name)! #if(visits > 1):welcome back#else:first visit#endif";
    match collect("demo", content, &Entities::core()) {
        Ok(tokens) => {
            for token in tokens {
                println!("{:#?}", token);
            }
        }
        Err(e) => eprintln!("{:?}", e),
    }
}
