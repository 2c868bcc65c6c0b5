//! Tests for the flat <-> nested conversion through the public API.

use notemark::{
    build, flatten, parse, tokenize, BlockToken, Document, Mark, Node, NodeKind, ParseOptions,
    TaskState, Token, TokenKind,
};

fn create_test_tree() -> Document {
    Document::new(vec![
        Node::heading(1, vec![Node::text("Title")]),
        Node::with_content(
            NodeKind::TaskList,
            vec![Node::with_content(
                NodeKind::TaskItem {
                    state: TaskState::Waiting,
                },
                vec![
                    Node::paragraph(vec![
                        Node::text("ping "),
                        Node::text("Ana").with_marks(vec![Mark::Bold]),
                        Node::new(NodeKind::Timestamp {
                            time: "16:00".into(),
                        }),
                    ]),
                    Node::with_content(
                        NodeKind::BulletList,
                        vec![Node::with_content(
                            NodeKind::ListItem,
                            vec![Node::paragraph(vec![Node::text("Nested")])],
                        )],
                    ),
                ],
            )],
        ),
        Node::paragraph(vec![
            Node::text("Final "),
            Node::text("paragraph").with_marks(vec![Mark::Italic, Mark::Code]),
        ]),
    ])
}

#[test]
fn test_round_trip_conversion() {
    let original = create_test_tree();

    // 1. nested -> flat
    let tokens = flatten(&original);

    // 2. flat -> nested
    let reconstructed = build(&tokens);

    assert_eq!(original, reconstructed);
}

#[test]
fn test_flatten_emits_code_as_inline_token() {
    let tokens = flatten(&create_test_tree());
    assert!(tokens
        .iter()
        .any(|t| t.kind == TokenKind::CodeInline("paragraph".into())));
    assert!(!tokens
        .iter()
        .any(|t| t.kind == TokenKind::Mark(Mark::Code)));
}

#[test]
fn test_parsed_documents_survive_flatten_and_build() {
    let source = std::fs::read_to_string(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("kitchensink.md"),
    )
    .expect("fixture exists");
    let doc = parse(&source);
    assert_eq!(build(&flatten(&doc)), doc);
}

#[test]
fn test_tokenizer_wrappers_are_spliced() {
    let tokens = tokenize("| a |\n| --- |\n| b |\n", &ParseOptions::default());
    assert!(tokens
        .iter()
        .any(|t| t.kind == TokenKind::Block(BlockToken::TableBody)));

    let doc = build(&tokens);
    let table = &doc.content[0];
    assert_eq!(table.kind, NodeKind::Table);
    assert!(table.content.iter().all(|row| row.kind == NodeKind::TableRow));
    assert_eq!(table.content.len(), 2);
}

#[test]
fn test_builder_tolerates_broken_streams() {
    let tokens = vec![
        Token::close(BlockToken::Blockquote),
        Token::open(BlockToken::BulletList),
        Token::open(BlockToken::ListItem),
        Token::open(BlockToken::Paragraph),
        Token::text("dangling"),
    ];
    let doc = build(&tokens);
    let expected = Document::new(vec![Node::with_content(
        NodeKind::BulletList,
        vec![Node::with_content(
            NodeKind::ListItem,
            vec![Node::paragraph(vec![Node::text("dangling")])],
        )],
    )]);
    assert_eq!(doc, expected);
}
