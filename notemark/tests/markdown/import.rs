//! Import tests for Markdown format (Markdown → tree)
//!
//! These tests verify that Markdown documents are correctly converted to the
//! document tree by checking the resulting node structure.

use insta::assert_snapshot;
use notemark::{
    parse, parse_with, tokenize, Document, Format, Mark, MarkdownFormat, Node, NodeKind,
    ParseOptions, TaskState,
};
use std::path::PathBuf;

fn text(s: &str) -> Node {
    Node::text(s)
}

fn item(content: Vec<Node>) -> Node {
    Node::with_content(NodeKind::ListItem, content)
}

fn para(s: &str) -> Node {
    Node::paragraph(vec![text(s)])
}

fn first_inline(md: &str) -> Vec<Node> {
    let doc = parse(md);
    doc.content[0].content.clone()
}

fn dump_tokens(md: &str) -> String {
    tokenize(md, &ParseOptions::default())
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {path:?}: {e}"))
}

#[test]
fn test_heading_and_paragraph() {
    let doc = MarkdownFormat::default()
        .parse("# Title\n\nBody text.\n")
        .expect("markdown always parses");
    assert_eq!(
        doc,
        Document::new(vec![
            Node::heading(1, vec![text("Title")]),
            para("Body text.")
        ])
    );
}

#[test]
fn test_empty_source() {
    assert!(parse("").is_empty());
    assert!(parse("\n\n   \n").is_empty());
}

#[test]
fn test_setext_heading() {
    let doc = parse("Section\n-------\n");
    assert_eq!(doc.content[0], Node::heading(2, vec![text("Section")]));
}

#[test]
fn test_soft_breaks_become_hard_breaks() {
    assert_eq!(
        first_inline("one\ntwo\n"),
        vec![text("one"), Node::new(NodeKind::HardBreak), text("two")]
    );

    let options = ParseOptions {
        hard_breaks: false,
        ..ParseOptions::default()
    };
    let doc = parse_with("one\ntwo\n", &options);
    assert_eq!(doc.content[0].content, vec![text("one two")]);
}

#[test]
fn test_nested_marks_keep_order() {
    assert_eq!(
        first_inline("**bold _both_** tail\n"),
        vec![
            text("bold ").with_marks(vec![Mark::Bold]),
            text("both").with_marks(vec![Mark::Bold, Mark::Italic]),
            text(" tail"),
        ]
    );
    assert_eq!(
        first_inline("***x***\n"),
        vec![text("x").with_marks(vec![Mark::Italic, Mark::Bold])]
    );
}

#[test]
fn test_inline_code_and_strike() {
    assert_eq!(
        first_inline("use `x` not ~~y~~\n"),
        vec![
            text("use "),
            text("x").with_marks(vec![Mark::Code]),
            text(" not "),
            text("y").with_marks(vec![Mark::Strike]),
        ]
    );
}

#[test]
fn test_highlight() {
    assert_eq!(
        first_inline("a ==hot== b\n"),
        vec![
            text("a "),
            text("hot").with_marks(vec![Mark::Highlight]),
            text(" b"),
        ]
    );
    // no partner, or whitespace on the wrong side: stays text
    assert_eq!(first_inline("a == b\n"), vec![text("a == b")]);
    assert_eq!(first_inline("x ==y\n"), vec![text("x ==y")]);
}

#[test]
fn test_links_and_images() {
    assert_eq!(
        first_inline("[site](https://x.dev \"X\") and https://y.dev\n"),
        vec![
            text("site").with_marks(vec![Mark::Link {
                href: "https://x.dev".into(),
                title: Some("X".into()),
            }]),
            text(" and "),
            text("https://y.dev").with_marks(vec![Mark::Link {
                href: "https://y.dev".into(),
                title: None,
            }]),
        ]
    );
    assert_eq!(
        first_inline("![a *cat*](.assets/cat.png)\n"),
        vec![Node::new(NodeKind::Image {
            src: ".assets/cat.png".into(),
            alt: "a cat".into(),
            title: None,
        })]
    );
}

#[test]
fn test_lists() {
    let doc = parse("- a\n- b\n\n3. x\n4. y\n");
    assert_eq!(
        doc.content,
        vec![
            Node::with_content(
                NodeKind::BulletList,
                vec![item(vec![para("a")]), item(vec![para("b")])]
            ),
            Node::with_content(
                NodeKind::OrderedList { start: 3 },
                vec![item(vec![para("x")]), item(vec![para("y")])]
            ),
        ]
    );
}

#[test]
fn test_nested_lists_keep_depth() {
    let doc = parse("- a\n  - b\n    - c\n");
    let inner = Node::with_content(NodeKind::BulletList, vec![item(vec![para("c")])]);
    let middle = Node::with_content(NodeKind::BulletList, vec![item(vec![para("b"), inner])]);
    let outer = Node::with_content(NodeKind::BulletList, vec![item(vec![para("a"), middle])]);
    assert_eq!(doc.content, vec![outer]);
}

#[test]
fn test_task_list_states() {
    let doc = parse("- [ ] buy\n- [x] sold\n- [ ] DOING write\n- [x] canceled trip\n");
    let states: Vec<_> = doc.content[0]
        .content
        .iter()
        .map(|item| item.kind.clone())
        .collect();
    assert_eq!(doc.content[0].kind, NodeKind::TaskList);
    assert_eq!(
        states,
        vec![
            NodeKind::TaskItem {
                state: TaskState::Todo
            },
            NodeKind::TaskItem {
                state: TaskState::Done
            },
            NodeKind::TaskItem {
                state: TaskState::Doing
            },
            NodeKind::TaskItem {
                state: TaskState::Canceled
            },
        ]
    );
    // the keyword is consumed by the item state
    assert_eq!(doc.content[0].content[2].content, vec![para("write")]);
    assert_eq!(doc.content[0].content[3].content, vec![para("trip")]);
}

#[test]
fn test_mixed_checkbox_list_keeps_checkbox_text() {
    let doc = parse("- [ ] a\n- b\n");
    assert_eq!(doc.content[0].kind, NodeKind::BulletList);
    assert_eq!(doc.content[0].content[0], item(vec![para("[ ] a")]));
}

#[test]
fn test_blockquote_and_rule() {
    let doc = parse("> quoted\n\n---\n\nafter\n");
    assert_eq!(
        doc.content,
        vec![
            Node::with_content(NodeKind::Blockquote, vec![para("quoted")]),
            Node::new(NodeKind::HorizontalRule),
            para("after"),
        ]
    );
}

#[test]
fn test_code_blocks() {
    let doc = parse("```rust\nfn main() {}\n```\n\n    indented\n");
    assert_eq!(
        doc.content,
        vec![
            Node::with_content(
                NodeKind::CodeBlock {
                    language: Some("rust".into())
                },
                vec![text("fn main() {}")]
            ),
            Node::with_content(NodeKind::CodeBlock { language: None }, vec![text("indented")]),
        ]
    );
}

#[test]
fn test_html_block_becomes_text() {
    let doc = parse("<div>\nhi\n</div>\n");
    assert_eq!(
        doc.content[0].content,
        vec![
            text("<div>"),
            Node::new(NodeKind::HardBreak),
            text("hi"),
            Node::new(NodeKind::HardBreak),
            text("</div>"),
        ]
    );
}

#[test]
fn test_token_stream() {
    assert_snapshot!(dump_tokens("# Plan\n\n- [ ] DOING ship ==v2== at [9:30]\n"), @r#"
    heading_open level=1
    text "Plan"
    heading_close
    task_list_open
    task_item_open state=doing
    paragraph_open
    text "ship "
    highlight_open
    text "v2"
    highlight_close
    text " at "
    timestamp time=09:30
    paragraph_close
    task_item_close
    task_list_close
    "#);
}

#[test]
fn test_kitchensink() {
    let doc = parse(&read_fixture("kitchensink.md"));

    let kinds: Vec<&str> = doc.content.iter().map(|n| n.kind.type_name()).collect();
    assert_eq!(
        kinds,
        vec![
            "heading",
            "paragraph",
            "heading",
            "taskList",
            "heading",
            "orderedList",
            "blockquote",
            "codeBlock",
            "table",
            "horizontalRule",
            "paragraph",
        ]
    );

    let tasks: Vec<_> = doc.content[3]
        .content
        .iter()
        .map(|item| item.kind.clone())
        .collect();
    assert_eq!(
        tasks,
        [
            TaskState::Todo,
            TaskState::Doing,
            TaskState::Done,
            TaskState::Canceled
        ]
        .map(|state| NodeKind::TaskItem { state })
    );

    let quote = &doc.content[6].content[0].content;
    assert_eq!(
        quote[0].kind,
        NodeKind::TaskMarker {
            state: TaskState::Idea
        }
    );
}
