use notemark::transforms::format_source;
use notemark::{parse, serialize, Alignment, Document, Node, NodeKind, ParseOptions, SerializeRules};

const TABLE: &str = "| Owner | Item | Due |
| :--- | :---: | ---: |
| Ana | Slides | Mon |
| Bo | `deploy.sh` | Tue |
";

fn cell(header: bool, content: Vec<Node>) -> Node {
    let kind = if header {
        NodeKind::TableHeaderCell {
            align: Alignment::None,
        }
    } else {
        NodeKind::TableDataCell {
            align: Alignment::None,
        }
    };
    Node::with_content(kind, content)
}

fn row(header: bool, cells: &[&str]) -> Node {
    Node::with_content(
        NodeKind::TableRow,
        cells
            .iter()
            .map(|text| cell(header, vec![Node::paragraph(vec![Node::text(*text)])]))
            .collect(),
    )
}

fn table(rows: Vec<Node>) -> Document {
    Document::new(vec![Node::with_content(NodeKind::Table, rows)])
}

#[test]
fn test_table_round_trip() {
    let output = format_source(TABLE, &ParseOptions::default(), &SerializeRules::default());
    assert_eq!(output, TABLE);
    assert_eq!(output.lines().count(), 4);
}

#[test]
fn test_table_alignment_import() {
    let doc = parse(TABLE);
    let table = &doc.content[0];
    assert_eq!(table.kind, NodeKind::Table);
    assert_eq!(table.content.len(), 3);

    let expected = [Alignment::Left, Alignment::Center, Alignment::Right];
    for (column, align) in expected.iter().enumerate() {
        assert_eq!(
            table.content[0].content[column].kind,
            NodeKind::TableHeaderCell { align: *align }
        );
        assert_eq!(
            table.content[2].content[column].kind,
            NodeKind::TableDataCell { align: *align }
        );
    }
}

#[test]
fn test_table_cells_hold_paragraphs() {
    let doc = parse(TABLE);
    let first = &doc.content[0].content[1].content[0];
    assert_eq!(
        first.content,
        vec![Node::paragraph(vec![Node::text("Ana")])]
    );
}

#[test]
fn test_pipe_in_cell_is_escaped() {
    let doc = table(vec![row(true, &["cmd"]), row(false, &["a|b"])]);
    let out = serialize(&doc);
    assert_eq!(out, "| cmd |\n| --- |\n| a\\|b |\n");
    assert_eq!(parse(&out), doc);
}

#[test]
fn test_ragged_rows_follow_header_width() {
    let doc = table(vec![
        row(true, &["a", "b"]),
        row(false, &["1"]),
        row(false, &["1", "2", "3"]),
    ]);
    assert_eq!(
        serialize(&doc),
        "| a | b |\n| --- | --- |\n| 1 |  |\n| 1 | 2 |\n"
    );
}

#[test]
fn test_multi_block_cell_flattens_to_one_line() {
    let blocks = cell(
        false,
        vec![
            Node::paragraph(vec![
                Node::text("first"),
                Node::new(NodeKind::HardBreak),
                Node::text("line"),
            ]),
            Node::paragraph(vec![Node::text("second")]),
        ],
    );
    let doc = table(vec![
        row(true, &["notes"]),
        Node::with_content(NodeKind::TableRow, vec![blocks]),
    ]);
    assert_eq!(
        serialize(&doc),
        "| notes |\n| --- |\n| first line second |\n"
    );
}

#[test]
fn test_entities_inside_cells() {
    let source = "| When | What |\n| --- | --- |\n| [9:30] | TODO call [[Ana]] |\n";
    let doc = parse(source);
    let cells = &doc.content[0].content[1].content;
    assert_eq!(
        cells[0].content[0].content,
        vec![Node::new(NodeKind::Timestamp {
            time: "09:30".to_string()
        })]
    );
    let kinds: Vec<&str> = cells[1].content[0]
        .content
        .iter()
        .map(|node| node.kind.type_name())
        .collect();
    assert_eq!(kinds, vec!["taskMarker", "text", "noteLink"]);

    assert_eq!(
        serialize(&doc),
        "| When | What |\n| --- | --- |\n| [09:30] | TODO call [[Ana]] |\n"
    );
}

#[test]
fn test_table_without_rows_is_dropped() {
    assert_eq!(serialize(&table(vec![])), "");
}
