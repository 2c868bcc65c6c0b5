//! Markdown serialization (document tree → markup text)
//!
//! Written by hand rather than through comrak's CommonMark formatter: task
//! markers, timestamps, note links and highlights have no comrak node, and the
//! output has to re-parse into the tree it came from.
//!
//! Blocks are emitted from an explicit work stack. Every block container
//! (root, blockquote, list, list item) writes into its own buffer; when the
//! container closes, the buffer is post-processed (quote prefixes, item
//! indentation) and appended to the parent buffer as a single block. Block
//! separators are only written when the next block arrives, so empty blocks
//! never produce stray blank lines.

use super::escape::{
    code_span, escape_text, escape_title, link_destination, longest_run, TextContext,
};
use super::options::{HardBreakStyle, SerializeRules};
use crate::ir::nodes::{Alignment, Document, Mark, Node, NodeKind};
use log::debug;
use url::Url;

/// Serialize a document tree to Markdown
pub fn serialize_document(doc: &Document, rules: &SerializeRules) -> String {
    MarkdownSerializer::new(rules).run(doc)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListStyle {
    Bullet(char),
    Ordered(char),
}

/// What the previous block in a buffer was, for choosing separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Paragraph,
    Block,
    List {
        style: ListStyle,
        /// Whether the list may directly follow a paragraph line
        interrupts: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    Quote,
    List,
    Item,
}

struct Buffer {
    scope: Scope,
    out: String,
    previous: Option<Shape>,
    /// Rule written when a thematic break is the buffer's first line
    leading_rule: &'static str,
}

impl Buffer {
    fn new(scope: Scope) -> Self {
        Self {
            scope,
            out: String::new(),
            previous: None,
            leading_rule: "---",
        }
    }

    fn write_block(&mut self, shape: Shape, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(previous) = self.previous {
            let separator = if self.is_tight(previous, shape) {
                "\n"
            } else {
                "\n\n"
            };
            self.out.push_str(separator);
        }
        self.out.push_str(text);
        self.previous = Some(shape);
    }

    fn is_tight(&self, previous: Shape, next: Shape) -> bool {
        match self.scope {
            Scope::List => true,
            Scope::Item => {
                previous == Shape::Paragraph
                    && matches!(next, Shape::List { interrupts: true, .. })
            }
            Scope::Root | Scope::Quote => false,
        }
    }
}

enum Closer {
    Quote,
    List(Shape),
    Item {
        marker: String,
        indent: usize,
        own_line: bool,
    },
}

enum Work<'t> {
    Block(&'t Node),
    Item {
        node: &'t Node,
        marker: String,
        indent: usize,
    },
    Close(Closer),
}

struct MarkdownSerializer<'r> {
    rules: &'r SerializeRules,
    root: Buffer,
    stack: Vec<Buffer>,
}

impl<'r> MarkdownSerializer<'r> {
    fn new(rules: &'r SerializeRules) -> Self {
        Self {
            rules,
            root: Buffer::new(Scope::Root),
            stack: Vec::new(),
        }
    }

    fn run(mut self, doc: &Document) -> String {
        let mut work: Vec<Work<'_>> = doc.content.iter().rev().map(Work::Block).collect();

        while let Some(next) = work.pop() {
            match next {
                Work::Block(node) => self.enter(node, &mut work),
                Work::Item {
                    node,
                    marker,
                    indent,
                } => self.enter_item(node, marker, indent, &mut work),
                Work::Close(closer) => self.close(closer),
            }
        }

        if self.root.out.is_empty() {
            String::new()
        } else {
            let mut out = self.root.out;
            out.push('\n');
            out
        }
    }

    fn top(&mut self) -> &mut Buffer {
        match self.stack.last_mut() {
            Some(buffer) => buffer,
            None => &mut self.root,
        }
    }

    fn enter<'t>(&mut self, node: &'t Node, work: &mut Vec<Work<'t>>) {
        match &node.kind {
            NodeKind::Paragraph => {
                let text = self.inline(&node.content.iter().collect::<Vec<_>>(), InlineMode::Flow);
                self.top().write_block(Shape::Paragraph, &text);
            }
            NodeKind::Heading { level } => {
                let text = self.inline(&node.content.iter().collect::<Vec<_>>(), InlineMode::Heading);
                let mut line = "#".repeat(usize::from((*level).clamp(1, 6)));
                if !text.is_empty() {
                    line.push(' ');
                    line.push_str(&text);
                    if line.ends_with('#') {
                        line.insert(line.len() - 1, '\\');
                    }
                }
                self.top().write_block(Shape::Block, &line);
            }
            NodeKind::BulletList | NodeKind::TaskList => {
                let bullet = self.next_bullet();
                let shape = Shape::List {
                    style: ListStyle::Bullet(bullet),
                    interrupts: first_item_has_content(node),
                };
                self.stack.push(Buffer::new(Scope::List));
                work.push(Work::Close(Closer::List(shape)));
                for item in node.content.iter().rev() {
                    work.push(Work::Item {
                        node: item,
                        marker: bullet_marker(bullet, item),
                        indent: 2,
                    });
                }
            }
            NodeKind::OrderedList { start } => {
                let delimiter = self.next_delimiter();
                let shape = Shape::List {
                    style: ListStyle::Ordered(delimiter),
                    interrupts: *start == 1 && first_item_has_content(node),
                };
                self.stack.push(Buffer::new(Scope::List));
                work.push(Work::Close(Closer::List(shape)));
                for (index, item) in node.content.iter().enumerate().rev() {
                    let number = start.saturating_add(index as u64);
                    let marker = format!("{number}{delimiter} ");
                    let indent = marker.len();
                    work.push(Work::Item {
                        node: item,
                        marker,
                        indent,
                    });
                }
            }
            NodeKind::ListItem | NodeKind::TaskItem { .. } => {
                work.push(Work::Item {
                    node,
                    marker: bullet_marker(self.rules.bullet(), node),
                    indent: 2,
                });
            }
            NodeKind::Blockquote => {
                self.stack.push(Buffer::new(Scope::Quote));
                work.push(Work::Close(Closer::Quote));
                work.extend(node.content.iter().rev().map(Work::Block));
            }
            NodeKind::CodeBlock { language } => {
                let code: String = node.content.iter().filter_map(Node::as_text).collect();
                let text = fenced_code(language.as_deref(), &code, self.rules);
                self.top().write_block(Shape::Block, &text);
            }
            NodeKind::Table => {
                let text = self.table(node);
                self.top().write_block(Shape::Block, &text);
            }
            NodeKind::HorizontalRule => {
                let top = self.top();
                let rule = if top.out.is_empty() {
                    top.leading_rule
                } else {
                    "---"
                };
                top.write_block(Shape::Block, rule);
            }
            kind if kind.is_inline() => {
                let text = self.inline(&[node], InlineMode::Flow);
                self.top().write_block(Shape::Paragraph, &text);
            }
            _ => work.extend(node.content.iter().rev().map(Work::Block)),
        }
    }

    fn enter_item<'t>(
        &mut self,
        node: &'t Node,
        marker: String,
        indent: usize,
        work: &mut Vec<Work<'t>>,
    ) {
        let mut buffer = Buffer::new(Scope::Item);
        // `- ***` and `* ___`: a rule that does not repeat the bullet
        buffer.leading_rule = if marker.starts_with('*') { "___" } else { "***" };
        self.stack.push(buffer);

        let is_item = matches!(node.kind, NodeKind::ListItem | NodeKind::TaskItem { .. });
        // a checkbox line followed by a fence or table on the same line
        // would no longer parse as either
        let own_line = matches!(node.kind, NodeKind::TaskItem { .. })
            && node
                .content
                .first()
                .is_some_and(|first| first.kind != NodeKind::Paragraph);
        work.push(Work::Close(Closer::Item {
            marker,
            indent,
            own_line,
        }));
        if is_item {
            work.extend(node.content.iter().rev().map(Work::Block));
        } else {
            work.push(Work::Block(node));
        }
    }

    fn close(&mut self, closer: Closer) {
        let Some(buffer) = self.stack.pop() else {
            return;
        };
        match closer {
            Closer::Quote => {
                let text = quote_lines(&buffer.out);
                self.top().write_block(Shape::Block, &text);
            }
            Closer::List(shape) => self.top().write_block(shape, &buffer.out),
            Closer::Item {
                marker,
                indent,
                own_line,
            } => {
                let text = indent_item(&marker, indent, own_line, &buffer.out);
                self.top().write_block(Shape::Block, &text);
            }
        }
    }

    /// Bullet for a new list; switches to the alternate when the previous
    /// block is a list with the same bullet, which would otherwise absorb it.
    fn next_bullet(&mut self) -> char {
        let primary = self.rules.bullet();
        let alternate = self.rules.alternate_bullet();
        match self.top().previous {
            Some(Shape::List {
                style: ListStyle::Bullet(previous),
                ..
            }) if previous == primary => alternate,
            _ => primary,
        }
    }

    fn next_delimiter(&mut self) -> char {
        match self.top().previous {
            Some(Shape::List {
                style: ListStyle::Ordered('.'),
                ..
            }) => ')',
            _ => '.',
        }
    }

    fn table(&self, node: &Node) -> String {
        let rows: Vec<&Node> = node
            .content
            .iter()
            .filter(|row| row.kind == NodeKind::TableRow)
            .collect();
        let Some((header, body)) = rows.split_first() else {
            return String::new();
        };

        let header = self.row_cells(header);
        let width = header.len().max(1);

        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(table_line(header.iter().map(|(text, _)| text.as_str()), width));
        lines.push(table_line(
            (0..width).map(|column| {
                let align = header.get(column).map(|(_, align)| *align).unwrap_or_default();
                separator_cell(align)
            }),
            width,
        ));
        for row in body {
            let cells = self.row_cells(row);
            lines.push(table_line(cells.iter().map(|(text, _)| text.as_str()), width));
        }
        lines.join("\n")
    }

    fn row_cells(&self, row: &Node) -> Vec<(String, Alignment)> {
        row.content
            .iter()
            .map(|cell| {
                let align = match &cell.kind {
                    NodeKind::TableHeaderCell { align } | NodeKind::TableDataCell { align } => {
                        *align
                    }
                    _ => Alignment::None,
                };
                (self.cell_text(cell), align)
            })
            .collect()
    }

    /// Cell content flattened onto one line.
    fn cell_text(&self, cell: &Node) -> String {
        let separator = Node::text(" ");
        let mut inline: Vec<&Node> = Vec::new();
        let mut pending: Vec<&Node> = cell.content.iter().rev().collect();
        let mut first_block = true;

        while let Some(node) = pending.pop() {
            if node.kind.is_inline() {
                inline.push(node);
                continue;
            }
            if node.kind.is_textblock() || matches!(node.kind, NodeKind::CodeBlock { .. }) {
                if !first_block {
                    inline.push(&separator);
                }
                first_block = false;
                inline.extend(node.content.iter());
            } else {
                pending.extend(node.content.iter().rev());
            }
        }
        self.inline(&inline, InlineMode::Table)
    }

    fn inline(&self, nodes: &[&Node], mode: InlineMode) -> String {
        let mut writer = InlineWriter::new(self.rules, mode);
        for (index, node) in nodes.iter().enumerate() {
            writer.write_node(node, nodes.get(index + 1).copied());
        }
        writer.finish()
    }
}

fn first_item_has_content(list: &Node) -> bool {
    list.content.first().is_some_and(|item| {
        matches!(item.kind, NodeKind::TaskItem { .. }) || !item.content.is_empty()
    })
}

fn bullet_marker(bullet: char, item: &Node) -> String {
    match &item.kind {
        NodeKind::TaskItem { state } => {
            let check = if state.is_completed() { 'x' } else { ' ' };
            format!("{bullet} [{check}] {} ", state.keyword())
        }
        _ => format!("{bullet} "),
    }
}

/// Puts the marker on the first line and indents continuation lines by
/// `indent` spaces. Empty lines stay empty.
fn indent_item(marker: &str, indent: usize, own_line: bool, body: &str) -> String {
    if body.is_empty() {
        return marker.trim_end().to_string();
    }
    let pad = " ".repeat(indent);
    let mut out = String::with_capacity(body.len() + marker.len() + 16);
    let mut lines = body.split('\n');
    if own_line {
        out.push_str(marker.trim_end());
    } else if let Some(first) = lines.next() {
        out.push_str(marker);
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&pad);
            out.push_str(line);
        }
    }
    out
}

fn quote_lines(body: &str) -> String {
    if body.is_empty() {
        return ">".to_string();
    }
    body.split('\n')
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn fenced_code(language: Option<&str>, code: &str, rules: &SerializeRules) -> String {
    let language = language.unwrap_or("").replace('\n', " ");
    let language = language.trim();
    let fence_char = if rules.fence() == '~' || language.contains('`') {
        '~'
    } else {
        '`'
    };
    let fence = fence_char.to_string().repeat(longest_run(code, fence_char).max(2) + 1);
    if code.is_empty() {
        format!("{fence}{language}\n{fence}")
    } else {
        format!("{fence}{language}\n{code}\n{fence}")
    }
}

/// One pipe table line of exactly `width` cells: short rows are padded, and
/// cells past the header width are dropped.
fn table_line<'a>(cells: impl Iterator<Item = &'a str>, width: usize) -> String {
    let mut cells: Vec<&str> = cells.collect();
    if cells.len() > width {
        debug!(
            "dropping {} table cell(s) beyond the header width of {width}",
            cells.len() - width
        );
    }
    cells.resize(width, "");
    format!("| {} |", cells.join(" | "))
}

fn separator_cell(align: Alignment) -> &'static str {
    match align {
        Alignment::None => "---",
        Alignment::Left => ":---",
        Alignment::Center => ":---:",
        Alignment::Right => "---:",
    }
}

/// Rewrites `file://…/.assets/…` to the portable `.assets/…` suffix.
fn portable_src(src: &str, rules: &SerializeRules) -> String {
    if !rules.rewrite_asset_paths {
        return src.to_string();
    }
    let Ok(url) = Url::parse(src) else {
        return src.to_string();
    };
    if url.scheme() != "file" {
        return src.to_string();
    }
    let Some(segments) = url.path_segments() else {
        return src.to_string();
    };
    let segments: Vec<&str> = segments.collect();
    match segments.iter().position(|segment| *segment == ".assets") {
        Some(index) => segments[index..].join("/"),
        None => src.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineMode {
    Flow,
    Heading,
    Table,
}

struct OpenMark {
    mark: Mark,
    close: String,
}

/// Writes one inline run. Marks are opened and closed as runs across sibling
/// nodes: a node keeps the longest prefix of the currently open marks it
/// shares and opens the rest.
struct InlineWriter<'r> {
    rules: &'r SerializeRules,
    mode: InlineMode,
    out: String,
    open: Vec<OpenMark>,
    pending_breaks: usize,
}

impl<'r> InlineWriter<'r> {
    fn new(rules: &'r SerializeRules, mode: InlineMode) -> Self {
        Self {
            rules,
            mode,
            out: String::new(),
            open: Vec::new(),
            pending_breaks: 0,
        }
    }

    fn write_node(&mut self, node: &Node, next: Option<&Node>) {
        if node.as_text().is_some_and(str::is_empty) {
            return;
        }

        let code = node.marks.contains(&Mark::Code) && node.as_text().is_some();
        let ranged: Vec<&Mark> = node.marks.iter().filter(|m| **m != Mark::Code).collect();
        let shared = self
            .open
            .iter()
            .zip(&ranged)
            .take_while(|(open, mark)| open.mark == ***mark)
            .count();

        match &node.kind {
            NodeKind::HardBreak => self.hard_break(),
            NodeKind::Text(text) if !code && text.trim().is_empty() => {
                if self.pending_breaks > 0 {
                    return;
                }
                self.close_to(shared);
                self.push_text(text);
            }
            NodeKind::Text(text) if code => {
                self.close_to(shared);
                self.flush_breaks();
                self.open_marks(&ranged[shared..]);
                let span = code_span(text, self.mode == InlineMode::Table);
                self.out.push_str(&span);
            }
            NodeKind::Text(text) => {
                self.close_to(shared);
                self.flush_breaks();
                let body = text.trim_start();
                let lead = &text[..text.len() - body.len()];
                if shared < ranged.len() {
                    self.push_text(lead);
                    self.open_marks(&ranged[shared..]);
                    self.push_text(body);
                } else {
                    self.push_text(text);
                }
            }
            kind => {
                self.close_to(shared);
                self.flush_breaks();
                self.open_marks(&ranged[shared..]);
                self.write_atom(kind, next);
            }
        }
    }

    fn write_atom(&mut self, kind: &NodeKind, next: Option<&Node>) {
        match kind {
            NodeKind::TaskMarker { state } => {
                if self.out.chars().next_back().is_some_and(char::is_alphanumeric) {
                    self.out.push(' ');
                }
                self.out.push_str(state.keyword());
                // the parser eats one space after a keyword; punctuation needs none
                let spaced = match next.map(|n| &n.kind) {
                    None | Some(NodeKind::HardBreak) => false,
                    Some(NodeKind::Text(text)) => text
                        .chars()
                        .next()
                        .map_or(true, |c| c.is_whitespace() || c.is_alphanumeric() || c == '_'),
                    Some(_) => true,
                };
                if spaced {
                    self.out.push(' ');
                }
            }
            NodeKind::Timestamp { time } => {
                self.out.push('[');
                self.out.push_str(time);
                self.out.push(']');
            }
            NodeKind::NoteLink { title, .. } => {
                self.out.push_str("[[");
                self.out.push_str(&title.replace('\n', " "));
                self.out.push_str("]]");
            }
            NodeKind::Image { src, alt, title } => {
                let alt = escape_text(
                    alt,
                    TextContext {
                        line_start: false,
                        after_bracket: false,
                        in_table: self.mode == InlineMode::Table,
                    },
                );
                let destination = link_destination(&portable_src(src, self.rules));
                self.out.push_str(&format!("![{alt}]({destination}"));
                if let Some(title) = title {
                    self.out.push_str(&format!(" \"{}\"", escape_title(title)));
                }
                self.out.push(')');
            }
            _ => {}
        }
    }

    fn hard_break(&mut self) {
        match self.mode {
            InlineMode::Flow => {
                if !self.out.trim().is_empty() {
                    self.pending_breaks += 1;
                }
            }
            InlineMode::Heading | InlineMode::Table => {
                if !self.out.is_empty() && !self.out.ends_with(' ') {
                    self.out.push(' ');
                }
            }
        }
    }

    /// Writes breaks deferred until real content follows, so trailing breaks
    /// vanish and closing delimiters land before the line end.
    fn flush_breaks(&mut self) {
        for _ in 0..std::mem::take(&mut self.pending_breaks) {
            let backslash =
                self.rules.hard_break == HardBreakStyle::Backslash || self.at_line_start();
            self.out.push_str(if backslash { "\\\n" } else { "\n" });
        }
    }

    fn open_marks(&mut self, marks: &[&Mark]) {
        for mark in marks {
            let (open, close) = match mark {
                Mark::Bold => ("**", "**".to_string()),
                Mark::Italic if self.out.ends_with('*') => ("_", "_".to_string()),
                Mark::Italic => ("*", "*".to_string()),
                Mark::Strike => ("~~", "~~".to_string()),
                Mark::Highlight => ("==", "==".to_string()),
                Mark::Link { href, title } => {
                    let title = title
                        .as_deref()
                        .map(|t| format!(" \"{}\"", escape_title(t)))
                        .unwrap_or_default();
                    ("[", format!("]({}{title})", link_destination(href)))
                }
                Mark::Code => continue,
            };
            self.out.push_str(open);
            self.open.push(OpenMark {
                mark: (*mark).clone(),
                close,
            });
        }
    }

    /// Closes marks down to `keep`, moving trailing whitespace outside the
    /// closing delimiters.
    fn close_to(&mut self, keep: usize) {
        while self.open.len() > keep {
            let Some(open) = self.open.pop() else {
                break;
            };
            let trimmed = self.out.trim_end().len();
            let trailing = self.out.split_off(trimmed);
            self.out.push_str(&open.close);
            self.out.push_str(&trailing);
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let context = TextContext {
            line_start: self.at_line_start(),
            after_bracket: self.out.ends_with(']'),
            in_table: self.mode == InlineMode::Table,
        };
        let escaped = escape_text(text, context);
        self.out.push_str(&escaped);
    }

    fn at_line_start(&self) -> bool {
        self.out
            .rsplit('\n')
            .next()
            .map_or(true, |line| line.trim().is_empty())
    }

    fn finish(mut self) -> String {
        self.close_to(0);
        let lines: Vec<&str> = self.out.split('\n').map(str::trim).collect();
        lines.join("\n").trim_matches('\n').to_string()
    }
}
