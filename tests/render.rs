use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use frond::ast::{Ast, AstKey, Touch};
use frond::cache::{AstCache, MemoryCache, SyncAstCache};
use frond::entity::Entities;
use frond::error::{CacheError, Error, RenderError};
use frond::lexer::collect;
use frond::parser::Parser;
use frond::source::{MemorySource, SourceSet};
use frond::Renderer;

fn renderer(templates: &[(&str, &str)]) -> (Renderer, Arc<MemoryCache>) {
    let entities = Arc::new(Entities::core());
    let mut source = MemorySource::new();
    for (name, body) in templates {
        source.insert(name, body);
    }
    let mut sources = SourceSet::new();
    sources.register_default(Arc::new(source)).unwrap();
    let cache = Arc::new(MemoryCache::new());
    (
        Renderer::new(entities, Arc::new(sources), cache.clone()),
        cache,
    )
}

fn text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap()
}

#[tokio::test]
async fn render_plain() {
    let (renderer, cache) = renderer(&[("hello", "Hello, #(name)!")]);
    let bytes = renderer
        .render("hello", &json!({"name": "world"}))
        .await
        .unwrap();
    assert_eq!("Hello, world!", text(bytes));

    // one cached entry, canonical and touched once
    assert_eq!(1, SyncAstCache::count(cache.as_ref()));
    let ast = SyncAstCache::retrieve(cache.as_ref(), "hello").unwrap();
    assert!(ast.cached());
    assert!(ast.required().is_empty());
    assert_eq!(1, ast.info().touches());
}

#[tokio::test]
async fn render_twice_touches_twice() {
    let (renderer, cache) = renderer(&[("hello", "hi #(name)")]);
    renderer
        .render("hello", &json!({"name": "a"}))
        .await
        .unwrap();
    let bytes = renderer
        .render("hello", &json!({"name": "b"}))
        .await
        .unwrap();
    assert_eq!("hi b", text(bytes));

    let ast = SyncAstCache::retrieve(cache.as_ref(), "hello").unwrap();
    assert_eq!(2, ast.info().touches());
    assert!(ast.info().size_avg() > 0);
}

#[tokio::test]
async fn render_inline_resolution() {
    let (renderer, cache) =
        renderer(&[("a", r#"#inline("b")"#), ("b", "X")]);
    let bytes = renderer.render("a", &json!({})).await.unwrap();
    assert_eq!("X", text(bytes));

    // both documents cached, the composite fully resolved
    assert_eq!(2, SyncAstCache::count(cache.as_ref()));
    let a = SyncAstCache::retrieve(cache.as_ref(), "a").unwrap();
    assert!(a.required().is_empty());
    assert!(a.cached());
    let b = SyncAstCache::retrieve(cache.as_ref(), "b").unwrap();
    assert!(b.cached());
}

#[tokio::test]
async fn render_diamond_inlines() {
    let (renderer, cache) = renderer(&[
        ("a", r#"#inline("b")#inline("c")"#),
        ("b", r#"B#inline("d")"#),
        ("c", r#"C#inline("d")"#),
        ("d", "D"),
    ]);
    let bytes = renderer.render("a", &json!({})).await.unwrap();
    assert_eq!("BDCD", text(bytes));
    assert_eq!(4, SyncAstCache::count(cache.as_ref()));
}

#[tokio::test]
async fn render_cycle_fails() {
    let (renderer, cache) = renderer(&[
        ("a", r#"#inline("b")"#),
        ("b", r#"#inline("a")"#),
    ]);
    let err = renderer.render("a", &json!({})).await.unwrap_err();
    match err {
        Error::Render(RenderError::CyclicalReference(node, chain)) => {
            assert_eq!("a", node);
            assert_eq!(vec!["a".to_string(), "b".to_string()], chain.0);
        }
        other => panic!("expected cyclical reference, got {:?}", other),
    }
    // nothing was cached on the failed resolution
    assert_eq!(0, SyncAstCache::count(cache.as_ref()));
}

#[tokio::test]
async fn render_self_cycle_fails() {
    let (renderer, _) = renderer(&[("a", r#"#inline("a")"#)]);
    let err = renderer.render("a", &json!({})).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Render(RenderError::CyclicalReference(_, _))
    ));
}

/// Cache double whose suspending interface is poisoned; any async
/// call proves the renderer left the synchronous path.
struct SyncOnlyCache {
    inner: MemoryCache,
}

#[async_trait]
impl AstCache for SyncOnlyCache {
    async fn insert(
        &self,
        _ast: Ast,
        _replace: bool,
    ) -> Result<Ast, CacheError> {
        panic!("async insert reached");
    }

    async fn retrieve(&self, _name: &str) -> Option<Ast> {
        panic!("async retrieve reached");
    }

    async fn remove(&self, _name: &str) -> Option<bool> {
        panic!("async remove reached");
    }

    async fn touch(&self, _name: &str, _touch: Touch) {
        panic!("async touch reached");
    }

    async fn count(&self) -> usize {
        panic!("async count reached");
    }

    fn sync_interface(&self) -> Option<&dyn SyncAstCache> {
        Some(&self.inner)
    }
}

#[tokio::test]
async fn render_fast_path_stays_synchronous() {
    let entities = Arc::new(Entities::core());
    let inner = MemoryCache::new();

    // pre-seed a resolved document with a cheap execution history
    let tokens = collect("a", "fast #(name)", &entities).unwrap();
    let ast = Parser::new(AstKey::default_scope("a"), tokens, &entities)
        .parse()
        .unwrap();
    SyncAstCache::insert(&inner, ast, true).unwrap();
    SyncAstCache::touch(
        &inner,
        "a",
        Touch {
            exec: Duration::from_millis(1),
            size: 6,
        },
    );

    let cache = Arc::new(SyncOnlyCache { inner });
    // no sources registered; a read attempt would fail loudly
    let renderer =
        Renderer::new(entities, Arc::new(SourceSet::new()), cache.clone());

    let bytes = renderer
        .render("a", &json!({"name": "x"}))
        .await
        .unwrap();
    assert_eq!("fast x", text(bytes));

    let ast = SyncAstCache::retrieve(&cache.inner, "a").unwrap();
    assert_eq!(2, ast.info().touches());
}

#[tokio::test]
async fn render_escaped_indicator() {
    let (renderer, _) = renderer(&[("price", r"price is \#100")]);
    let bytes = renderer.render("price", &json!({})).await.unwrap();
    assert_eq!("price is #100", text(bytes));
}

#[tokio::test]
async fn render_unknown_tag_decays_to_text() {
    let (renderer, _) = renderer(&[("doc", "#notAnEntity rest")]);
    let bytes = renderer.render("doc", &json!({})).await.unwrap();
    assert_eq!("#notAnEntity rest", text(bytes));
}

#[tokio::test]
async fn render_conditional() {
    let (renderer, _) =
        renderer(&[("doc", "#if(n > 2):big#elseif(n > 0):small#else:none#endif")]);
    for (n, expected) in [(3, "big"), (1, "small"), (0, "none")] {
        let bytes = renderer.render("doc", &json!({ "n": n })).await.unwrap();
        assert_eq!(expected, text(bytes));
    }
}

#[tokio::test]
async fn render_loop() {
    let (renderer, _) =
        renderer(&[("doc", "#for(x in items):#(x),#endfor")]);
    let bytes = renderer
        .render("doc", &json!({"items": ["a", "b"]}))
        .await
        .unwrap();
    assert_eq!("a,b,", text(bytes));
}

#[tokio::test]
async fn render_loop_shadows_outer_binding() {
    let (renderer, _) =
        renderer(&[("doc", "#(x)#for(x in items):#(x)#endfor#(x)")]);
    let bytes = renderer
        .render("doc", &json!({"x": "o", "items": ["i"]}))
        .await
        .unwrap();
    assert_eq!("oio", text(bytes));
}

#[tokio::test]
async fn render_functions() {
    let (renderer, _) =
        renderer(&[("doc", "#count(items) #uppercased(word)")]);
    let bytes = renderer
        .render("doc", &json!({"items": [1, 2, 3], "word": "hi"}))
        .await
        .unwrap();
    assert_eq!("3 HI", text(bytes));
}

#[tokio::test]
async fn render_expression_operators() {
    let (renderer, _) = renderer(&[
        ("math", "#(1 + 2 * 3)"),
        ("member", "#(user.name)"),
        ("subscript", "#(items[1])"),
        ("coalesce", r#"#(missing ?? "fallback")"#),
        ("logic", "#(a && !b)"),
    ]);
    let data = json!({
        "user": {"name": "ada"},
        "items": [10, 20],
        "a": true,
        "b": false,
    });
    for (name, expected) in [
        ("math", "7"),
        ("member", "ada"),
        ("subscript", "20"),
        ("coalesce", "fallback"),
        ("logic", "true"),
    ] {
        let bytes = renderer.render(name, &data).await.unwrap();
        assert_eq!(expected, text(bytes), "template '{}'", name);
    }
}

#[tokio::test]
async fn render_missing_variable_fails() {
    let (renderer, _) = renderer(&[("doc", "#(nope)")]);
    let err = renderer.render("doc", &json!({})).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Render(RenderError::VariableNotFound(_))
    ));
}

#[tokio::test]
async fn render_user_info() {
    let (renderer, _) = renderer(&[("doc", "v#(version)")]);
    let mut info = HashMap::new();
    info.insert("version".to_string(), json!(2));
    // not an identifier; skipped silently
    info.insert("bad key".to_string(), json!(true));
    let bytes = renderer
        .render_with_info("doc", &json!({}), &info)
        .await
        .unwrap();
    assert_eq!("v2", text(bytes));
}

#[tokio::test]
async fn render_from_explicit_source() {
    let entities = Arc::new(Entities::core());
    let mut sources = SourceSet::new();
    sources
        .register_default(Arc::new(MemorySource::new().with("box", "default")))
        .unwrap();
    sources
        .register(
            "partials",
            Arc::new(MemorySource::new().with("box", "B: #(v)")),
        )
        .unwrap();
    let cache = Arc::new(MemoryCache::new());
    let renderer =
        Renderer::new(entities, Arc::new(sources), cache.clone());

    let bytes = renderer
        .render_from("partials", "box", &json!({"v": 1}))
        .await
        .unwrap();
    assert_eq!("B: 1", text(bytes));

    // explicit renders cache under the prefixed name
    assert!(SyncAstCache::retrieve(cache.as_ref(), "partials:box").is_some());

    // a path with a source prefix resolves the same way
    let bytes = renderer
        .render("partials:box", &json!({"v": 2}))
        .await
        .unwrap();
    assert_eq!("B: 2", text(bytes));
}

#[tokio::test]
async fn render_rejects_empty_path() {
    let (renderer, _) = renderer(&[]);
    let err = renderer.render("", &json!({})).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Render(RenderError::NoTemplateExists(_))
    ));
}

#[tokio::test]
async fn render_rejects_illegal_sources() {
    let (renderer, _) = renderer(&[("x", "x")]);
    for path in [":x", "$custom:x", "a:b:c"] {
        let err = renderer.render(path, &json!({})).await.unwrap_err();
        assert!(
            matches!(err, Error::Render(RenderError::IllegalAccess(_))),
            "path '{}'",
            path
        );
    }

    let err = renderer
        .render_from("$custom", "x", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Render(RenderError::IllegalAccess(_))
    ));
}

#[tokio::test]
async fn render_missing_template() {
    let (renderer, _) = renderer(&[]);
    let err = renderer.render("nope", &json!({})).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Render(RenderError::NoTemplateExists(_))
    ));
}

#[tokio::test]
async fn render_default_scope_prefix_is_allowed() {
    let (renderer, _) = renderer(&[("hello", "hi")]);
    let bytes = renderer.render("$:hello", &json!({})).await.unwrap();
    assert_eq!("hi", text(bytes));
}

#[tokio::test]
async fn render_lexer_error_propagates() {
    let (renderer, _) = renderer(&[("doc", "#(\"open")]);
    let err = renderer.render("doc", &json!({})).await.unwrap_err();
    assert!(matches!(err, Error::Lexer(_)));
}

#[tokio::test]
async fn render_parse_error_propagates() {
    let (renderer, _) = renderer(&[("doc", "#if(x): open")]);
    let err = renderer.render("doc", &json!({})).await.unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}
