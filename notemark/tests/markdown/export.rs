//! Export tests for Markdown format (tree → Markdown)
//!
//! These tests build document trees by hand and check the emitted markup,
//! re-parsing where the output has to come back as the same tree.

use notemark::{
    parse, serialize, serialize_with, Document, HardBreakStyle, Mark, Node, NodeKind,
    SerializeRules, TaskState,
};

fn text(s: &str) -> Node {
    Node::text(s)
}

fn para(s: &str) -> Node {
    Node::paragraph(vec![text(s)])
}

fn item(content: Vec<Node>) -> Node {
    Node::with_content(NodeKind::ListItem, content)
}

fn bullets(items: Vec<Node>) -> Node {
    Node::with_content(NodeKind::BulletList, items)
}

fn image(src: &str) -> Node {
    Node::new(NodeKind::Image {
        src: src.to_string(),
        alt: "diagram".to_string(),
        title: None,
    })
}

fn md(content: Vec<Node>) -> String {
    serialize(&Document::new(content))
}

#[test]
fn test_literal_markup_is_escaped() {
    let doc = Document::new(vec![para("*not bold* and [not a link]")]);
    let out = serialize(&doc);
    assert_eq!(out, "\\*not bold\\* and \\[not a link\\]\n");
    assert_eq!(parse(&out), doc);
}

#[test]
fn test_block_starters_are_escaped_at_line_start() {
    for (source, expected) in [
        ("# not a heading", "\\# not a heading\n"),
        ("> not a quote", "\\> not a quote\n"),
        ("2024. was good", "2024\\. was good\n"),
    ] {
        let doc = Document::new(vec![para(source)]);
        let out = serialize(&doc);
        assert_eq!(out, expected);
        assert_eq!(parse(&out), doc, "re-parse of {out:?}");
    }
}

#[test]
fn test_heading_trailing_hash() {
    let doc = Document::new(vec![Node::heading(2, vec![text("Learning C#")])]);
    let out = serialize(&doc);
    assert_eq!(out, "## Learning C\\#\n");
    assert_eq!(parse(&out), doc);
}

#[test]
fn test_heading_break_becomes_space() {
    let heading = Node::heading(
        1,
        vec![text("one"), Node::new(NodeKind::HardBreak), text("two")],
    );
    assert_eq!(md(vec![heading]), "# one two\n");
}

#[test]
fn test_ordered_list_inside_bullet_item() {
    let ordered = Node::with_content(
        NodeKind::OrderedList { start: 1 },
        vec![item(vec![para("one")]), item(vec![para("two")])],
    );
    let doc = Document::new(vec![bullets(vec![item(vec![para("steps"), ordered])])]);
    let out = serialize(&doc);
    assert_eq!(out, "- steps\n  1. one\n  2. two\n");
    assert_eq!(parse(&out), doc);
}

#[test]
fn test_ordered_list_start() {
    let ordered = Node::with_content(
        NodeKind::OrderedList { start: 3 },
        vec![item(vec![para("three")]), item(vec![para("four")])],
    );
    let out = md(vec![ordered]);
    assert_eq!(out, "3. three\n4. four\n");
}

#[test]
fn test_blockquote_with_list() {
    let quote = Node::with_content(
        NodeKind::Blockquote,
        vec![para("note"), bullets(vec![item(vec![para("a")])])],
    );
    let doc = Document::new(vec![quote]);
    let out = serialize(&doc);
    assert_eq!(out, "> note\n>\n> - a\n");
    assert_eq!(parse(&out), doc);
}

#[test]
fn test_link_with_title() {
    let link = Mark::Link {
        href: "https://docs.rs".to_string(),
        title: Some("The \"docs\"".to_string()),
    };
    let doc = Document::new(vec![Node::paragraph(vec![
        text("read "),
        text("docs").with_marks(vec![link]),
    ])]);
    let out = serialize(&doc);
    assert_eq!(out, "read [docs](https://docs.rs \"The \\\"docs\\\"\")\n");
    assert_eq!(parse(&out), doc);
}

#[test]
fn test_link_destination_with_space() {
    let link = Mark::Link {
        href: "my notes.md".to_string(),
        title: None,
    };
    let out = md(vec![Node::paragraph(vec![text("notes").with_marks(vec![link])])]);
    assert_eq!(out, "[notes](<my notes.md>)\n");
}

#[test]
fn test_task_item_with_code_block_first() {
    let code = Node::with_content(
        NodeKind::CodeBlock { language: None },
        vec![text("cargo test")],
    );
    let task = Node::with_content(
        NodeKind::TaskItem {
            state: TaskState::Todo,
        },
        vec![code],
    );
    let out = md(vec![Node::with_content(NodeKind::TaskList, vec![task])]);
    assert_eq!(out, "- [ ] TODO\n  ```\n  cargo test\n  ```\n");
}

#[test]
fn test_every_task_state_writes_its_keyword() {
    let items = TaskState::ALL
        .iter()
        .map(|state| {
            Node::with_content(NodeKind::TaskItem { state: *state }, vec![para("x")])
        })
        .collect();
    let out = md(vec![Node::with_content(NodeKind::TaskList, items)]);
    assert_eq!(
        out,
        "- [ ] TODO x\n- [ ] DOING x\n- [ ] WAITING x\n- [ ] HOLD x\n\
         - [x] DONE x\n- [x] CANCELED x\n- [ ] IDEA x\n"
    );
}

#[test]
fn test_custom_bullet_and_fence() {
    let rules = SerializeRules {
        bullet_marker: '*',
        alternate_bullet_marker: '+',
        fence_char: '~',
        ..SerializeRules::default()
    };
    let code = Node::with_content(
        NodeKind::CodeBlock {
            language: Some("rust".to_string()),
        },
        vec![text("fn main() {}")],
    );
    let doc = Document::new(vec![
        bullets(vec![item(vec![para("a")])]),
        bullets(vec![item(vec![para("b")])]),
        code,
    ]);
    assert_eq!(
        serialize_with(&doc, &rules),
        "* a\n\n+ b\n\n~~~rust\nfn main() {}\n~~~\n"
    );
}

#[test]
fn test_backticks_in_code_lengthen_fence() {
    let code = Node::with_content(
        NodeKind::CodeBlock {
            language: Some("md".to_string()),
        },
        vec![text("```\nnested\n```")],
    );
    let doc = Document::new(vec![code]);
    let out = serialize(&doc);
    assert_eq!(out, "````md\n```\nnested\n```\n````\n");
    assert_eq!(parse(&out), doc);
}

#[test]
fn test_backslash_hard_breaks() {
    let rules = SerializeRules {
        hard_break: HardBreakStyle::Backslash,
        ..SerializeRules::default()
    };
    let doc = Document::new(vec![Node::paragraph(vec![
        text("first"),
        Node::new(NodeKind::HardBreak),
        text("second"),
    ])]);
    let out = serialize_with(&doc, &rules);
    assert_eq!(out, "first\\\nsecond\n");
    assert_eq!(parse(&out), doc);
}

#[test]
fn test_trailing_hard_break_is_dropped() {
    let out = md(vec![Node::paragraph(vec![
        text("end"),
        Node::new(NodeKind::HardBreak),
    ])]);
    assert_eq!(out, "end\n");
}

#[test]
fn test_asset_paths() {
    let src = "file:///home/ana/notes/.assets/diagram.png";
    let doc = Document::new(vec![Node::paragraph(vec![image(src)])]);

    assert_eq!(serialize(&doc), "![diagram](.assets/diagram.png)\n");

    let keep = SerializeRules {
        rewrite_asset_paths: false,
        ..SerializeRules::default()
    };
    assert_eq!(
        serialize_with(&doc, &keep),
        format!("![diagram]({src})\n")
    );
}

#[test]
fn test_remote_image_is_untouched() {
    let out = md(vec![Node::paragraph(vec![image("https://x.dev/a.png")])]);
    assert_eq!(out, "![diagram](https://x.dev/a.png)\n");
}

#[test]
fn test_rules_between_blocks() {
    let doc = Document::new(vec![
        para("above"),
        Node::new(NodeKind::HorizontalRule),
        para("below"),
    ]);
    let out = serialize(&doc);
    assert_eq!(out, "above\n\n---\n\nbelow\n");
    assert_eq!(parse(&out), doc);
}

#[test]
fn test_unknown_node_content_is_kept() {
    let unknown = Node::with_content(
        NodeKind::Unknown {
            type_name: "callout".to_string(),
            attrs: Default::default(),
        },
        vec![para("inside")],
    );
    assert_eq!(md(vec![unknown]), "inside\n");
}
