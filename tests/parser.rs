use frond::ast::{Ast, AstKey};
use frond::entity::Entities;
use frond::error::ParseError;
use frond::lexer::{collect, Literal, Operator};
use frond::parser::{Argument, Branch, Expression, Node, Parser};

fn compile(value: &str) -> Ast {
    let entities = Entities::core();
    let tokens = collect("mock-template", value, &entities).unwrap();
    Parser::new(AstKey::default_scope("mock-template"), tokens, &entities)
        .parse()
        .unwrap()
}

fn compile_err(value: &str) -> ParseError {
    let entities = Entities::core();
    let tokens = collect("mock-template", value, &entities).unwrap();
    Parser::new(AstKey::default_scope("mock-template"), tokens, &entities)
        .parse()
        .unwrap_err()
}

fn var(name: &str) -> Expression {
    Expression::Variable(name.to_string())
}

fn int(value: i64) -> Expression {
    Expression::Literal(Literal::Int(value))
}

#[test]
fn parse_text_and_expression() {
    let ast = compile("Hello, #(name)!");
    let expect = vec![
        Node::Raw("Hello, ".to_string()),
        Node::Expression(var("name")),
        Node::Raw("!".to_string()),
    ];
    assert_eq!(expect, ast.tree());
    assert!(ast.required().is_empty());
    assert!(!ast.cached());
}

#[test]
fn parse_conditional_chain() {
    let ast = compile("#if(a):x#elseif(b):y#else:z#endif");
    let expect = vec![Node::Conditional {
        branches: vec![
            Branch {
                condition: Some(var("a")),
                body: vec![Node::Raw("x".to_string())],
            },
            Branch {
                condition: Some(var("b")),
                body: vec![Node::Raw("y".to_string())],
            },
            Branch {
                condition: None,
                body: vec![Node::Raw("z".to_string())],
            },
        ],
    }];
    assert_eq!(expect, ast.tree());
}

#[test]
fn parse_loop() {
    let ast = compile("#for(item in items):#(item)#endfor");
    let expect = vec![Node::Loop {
        binding: "item".to_string(),
        collection: var("items"),
        body: vec![Node::Expression(var("item"))],
    }];
    assert_eq!(expect, ast.tree());
}

#[test]
fn parse_discarded_binding() {
    let ast = compile("#for(_ in items):.#endfor");
    let expect = vec![Node::Loop {
        binding: "_".to_string(),
        collection: var("items"),
        body: vec![Node::Raw(".".to_string())],
    }];
    assert_eq!(expect, ast.tree());
}

#[test]
fn parse_inline_records_requirement() {
    let ast = compile(r#"a #inline("header") b"#);
    let expect = vec![
        Node::Raw("a ".to_string()),
        Node::Inline {
            name: "header".to_string(),
        },
        Node::Raw(" b".to_string()),
    ];
    assert_eq!(expect, ast.tree());
    assert!(ast.required().contains("header"));
    assert_eq!(
        vec!["header".to_string()],
        ast.info().required_asts().to_vec()
    );
}

#[test]
fn parse_call_tag() {
    let ast = compile("#count(items)");
    let expect = vec![Node::Call {
        name: "count".to_string(),
        arguments: vec![Argument {
            label: None,
            value: var("items"),
        }],
    }];
    assert_eq!(expect, ast.tree());
}

#[test]
fn parse_labeled_argument() {
    let ast = compile("#count(items: list)");
    let expect = vec![Node::Call {
        name: "count".to_string(),
        arguments: vec![Argument {
            label: Some("items".to_string()),
            value: var("list"),
        }],
    }];
    assert_eq!(expect, ast.tree());
}

#[test]
fn parse_operator_precedence() {
    let ast = compile("#(1 + 2 * 3)");
    let expect = vec![Node::Expression(Expression::Binary(
        Operator::Plus,
        Box::new(int(1)),
        Box::new(Expression::Binary(
            Operator::Multiply,
            Box::new(int(2)),
            Box::new(int(3)),
        )),
    ))];
    assert_eq!(expect, ast.tree());
}

#[test]
fn parse_grouping() {
    let ast = compile("#((1 + 2) * 3)");
    let expect = vec![Node::Expression(Expression::Binary(
        Operator::Multiply,
        Box::new(Expression::Binary(
            Operator::Plus,
            Box::new(int(1)),
            Box::new(int(2)),
        )),
        Box::new(int(3)),
    ))];
    assert_eq!(expect, ast.tree());
}

#[test]
fn parse_member_access() {
    let ast = compile("#(user.name)");
    let expect = vec![Node::Expression(Expression::Member(
        Box::new(var("user")),
        "name".to_string(),
    ))];
    assert_eq!(expect, ast.tree());
}

#[test]
fn parse_subscript() {
    let ast = compile("#(items[0])");
    let expect = vec![Node::Expression(Expression::Subscript(
        Box::new(var("items")),
        Box::new(int(0)),
    ))];
    assert_eq!(expect, ast.tree());
}

#[test]
fn parse_nested_call_expression() {
    let ast = compile(r#"#(count("abc") + 1)"#);
    let expect = vec![Node::Expression(Expression::Binary(
        Operator::Plus,
        Box::new(Expression::Call {
            name: "count".to_string(),
            arguments: vec![Argument {
                label: None,
                value: Expression::Literal(Literal::Str("abc".to_string())),
            }],
        }),
        Box::new(int(1)),
    ))];
    assert_eq!(expect, ast.tree());
}

#[test]
fn parse_dangling_closer() {
    assert!(matches!(
        compile_err("#endif"),
        ParseError::BlockNotOpen(_, _)
    ));
}

#[test]
fn parse_unclosed_block() {
    assert!(matches!(
        compile_err("#if(x): y"),
        ParseError::UnclosedBlock(_, _)
    ));
    assert!(matches!(
        compile_err("#for(x in xs): y"),
        ParseError::UnclosedBlock(_, _)
    ));
}

#[test]
fn parse_orphan_continuation() {
    assert!(matches!(
        compile_err("#elseif(x): y #endif"),
        ParseError::BlockNotOpen(_, _)
    ));
}

#[test]
fn parse_chain_after_terminal() {
    assert!(matches!(
        compile_err("#if(a):x#else:y#else:z#endif"),
        ParseError::ChainTerminated(_, _)
    ));
}

#[test]
fn parse_inline_requires_string_name() {
    assert!(matches!(
        compile_err("#inline(5)"),
        ParseError::InlineName(_)
    ));
}

#[test]
fn parse_malformed_loop_signature() {
    assert!(matches!(
        compile_err("#for(items): x #endfor"),
        ParseError::LoopSignature(_, _)
    ));
}
