//! Markdown tokenizing (markup text → token stream)
//!
//! Pipeline: Markdown string → Comrak AST → tokens → inline post-processing
//! (highlights and entity recognizers, see [`super::recognizers`]).
//!
//! The AST is walked with comrak's `traverse()`, which yields start and end
//! edges from an internal cursor, so nesting depth never grows the call stack.
//! Block nodes become open/close token pairs on the way in and out. Inline
//! nodes of a paragraph, heading or table cell are collected into a run that
//! is post-processed when the text block ends.

use super::options::ParseOptions;
use super::recognizers::{coalesce_text, pair_highlights, recognize_entities, RunToken};
use crate::ir::nodes::{Alignment, Mark, TaskState};
use crate::ir::tokens::{BlockToken, Token, TokenKind};
use comrak::arena_tree::NodeEdge;
use comrak::nodes::{AstNode, ListType, NodeValue, TableAlignment};
use comrak::{parse_document, Arena, ComrakOptions};
use log::trace;

/// Tokenize Markdown text. Never fails: anything comrak cannot place
/// degrades to text.
pub fn tokenize(source: &str, options: &ParseOptions) -> Vec<Token> {
    let arena = Arena::new();
    let comrak_options = default_comrak_options();
    let root = parse_document(&arena, source, &comrak_options);

    let mut lowering = Lowering::new(options);
    lowering.walk(root);
    trace!(
        "tokenized {} bytes into {} tokens",
        source.len(),
        lowering.tokens.len()
    );
    lowering.tokens
}

fn default_comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    // keeps backslash escapes visible as `Escaped` nodes
    options.render.escaped_char_spans = true;
    options
}

/// A list item whose first paragraph may need rewriting.
struct ItemFrame {
    /// Index of the item's open token, patched once the task state is known
    open_index: usize,
    block: BlockToken,
    /// Checkbox item outside a task list: keeps its checkbox as text
    degraded_checkbox: Option<bool>,
}

struct TableFrame {
    alignments: Vec<Alignment>,
    in_head: bool,
    column: usize,
    cell: Option<BlockToken>,
}

/// The inline run being collected for the current text block.
struct InlineRun {
    start: usize,
    /// Index into `items` when this run is the first paragraph of that item
    item: Option<usize>,
    /// Indices into `tokens` of text that came from backslash escapes
    escaped: Vec<usize>,
}

struct Lowering<'o> {
    options: &'o ParseOptions,
    tokens: Vec<Token>,
    lists: Vec<BlockToken>,
    items: Vec<ItemFrame>,
    tables: Vec<TableFrame>,
    run: Option<InlineRun>,
    in_escape: bool,
}

impl<'o> Lowering<'o> {
    fn new(options: &'o ParseOptions) -> Self {
        Self {
            options,
            tokens: Vec::new(),
            lists: Vec::new(),
            items: Vec::new(),
            tables: Vec::new(),
            run: None,
            in_escape: false,
        }
    }

    fn walk<'a>(&mut self, root: &'a AstNode<'a>) {
        // Images are emitted whole; their subtree is skipped until its end edge.
        let mut skipping: Option<&'a AstNode<'a>> = None;

        for edge in root.traverse() {
            match edge {
                NodeEdge::Start(node) => {
                    if skipping.is_some() {
                        continue;
                    }
                    if !self.enter(node) {
                        skipping = Some(node);
                    }
                }
                NodeEdge::End(node) => {
                    if let Some(skipped) = skipping {
                        if std::ptr::eq(skipped, node) {
                            skipping = None;
                        }
                        continue;
                    }
                    self.leave(node);
                }
            }
        }
    }

    /// Handles a start edge. Returns `false` when the children must be skipped.
    fn enter<'a>(&mut self, node: &'a AstNode<'a>) -> bool {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Paragraph => {
                self.open(BlockToken::Paragraph);
                self.begin_run(node);
            }
            NodeValue::Heading(heading) => {
                self.open(BlockToken::Heading {
                    level: heading.level,
                });
                self.begin_run(node);
            }
            NodeValue::List(list) => {
                let block = match list.list_type {
                    ListType::Ordered => BlockToken::OrderedList {
                        start: list.start as u64,
                    },
                    ListType::Bullet if all_task_items(node) => BlockToken::TaskList,
                    ListType::Bullet => BlockToken::BulletList,
                };
                self.lists.push(block.clone());
                self.open(block);
            }
            NodeValue::Item(_) => self.open_item(BlockToken::ListItem, None),
            NodeValue::TaskItem(symbol) => {
                let checked = symbol.is_some();
                if matches!(self.lists.last(), Some(BlockToken::TaskList)) {
                    let state = if checked {
                        TaskState::Done
                    } else {
                        TaskState::Todo
                    };
                    self.open_item(BlockToken::TaskItem { state }, None);
                } else {
                    self.open_item(BlockToken::ListItem, Some(checked));
                }
            }
            NodeValue::BlockQuote => self.open(BlockToken::Blockquote),
            NodeValue::CodeBlock(code) => {
                let info = code.info.trim();
                let language = (!info.is_empty()).then(|| info.to_string());
                let content = code
                    .literal
                    .strip_suffix('\n')
                    .unwrap_or(&code.literal)
                    .to_string();
                self.tokens
                    .push(Token::leaf(TokenKind::CodeBlock { language, content }));
            }
            NodeValue::HtmlBlock(html) => {
                self.open(BlockToken::Paragraph);
                for (index, line) in html.literal.trim_end_matches('\n').lines().enumerate() {
                    if index > 0 {
                        self.tokens.push(Token::leaf(TokenKind::HardBreak));
                    }
                    self.tokens.push(Token::text(line));
                }
                self.close(BlockToken::Paragraph);
            }
            NodeValue::ThematicBreak => self.tokens.push(Token::leaf(TokenKind::HorizontalRule)),
            NodeValue::Table(table) => {
                self.tables.push(TableFrame {
                    alignments: table.alignments.iter().map(convert_alignment).collect(),
                    in_head: true,
                    column: 0,
                    cell: None,
                });
                self.open(BlockToken::Table);
                self.open(BlockToken::TableHead);
            }
            NodeValue::TableRow(header) => {
                let mut section_change = false;
                if let Some(table) = self.tables.last_mut() {
                    if !*header && table.in_head {
                        table.in_head = false;
                        section_change = true;
                    }
                    table.column = 0;
                }
                if section_change {
                    self.close(BlockToken::TableHead);
                    self.open(BlockToken::TableBody);
                }
                self.open(BlockToken::TableRow);
            }
            NodeValue::TableCell => {
                let cell = match self.tables.last_mut() {
                    Some(table) => {
                        let align = table
                            .alignments
                            .get(table.column)
                            .copied()
                            .unwrap_or_default();
                        table.column += 1;
                        let cell = if table.in_head {
                            BlockToken::TableHeaderCell { align }
                        } else {
                            BlockToken::TableDataCell { align }
                        };
                        table.cell = Some(cell.clone());
                        cell
                    }
                    None => BlockToken::TableDataCell {
                        align: Alignment::None,
                    },
                };
                self.open(cell);
                self.open(BlockToken::Paragraph);
                self.begin_run(node);
            }
            NodeValue::Escaped => self.in_escape = true,
            NodeValue::Text(text) => {
                if self.in_escape {
                    if let Some(run) = self.run.as_mut() {
                        run.escaped.push(self.tokens.len());
                    }
                }
                self.tokens.push(Token::text(text.as_str()));
            }
            NodeValue::SoftBreak => {
                if self.options.hard_breaks {
                    self.tokens.push(Token::leaf(TokenKind::HardBreak));
                } else {
                    self.tokens.push(Token::text(" "));
                }
            }
            NodeValue::LineBreak => self.tokens.push(Token::leaf(TokenKind::HardBreak)),
            NodeValue::Code(code) => self
                .tokens
                .push(Token::leaf(TokenKind::CodeInline(code.literal.clone()))),
            NodeValue::HtmlInline(html) => self.tokens.push(Token::text(html.as_str())),
            NodeValue::Emph => self.tokens.push(Token::mark_open(Mark::Italic)),
            NodeValue::Strong => self.tokens.push(Token::mark_open(Mark::Bold)),
            NodeValue::Strikethrough => self.tokens.push(Token::mark_open(Mark::Strike)),
            NodeValue::Link(link) => self.tokens.push(Token::mark_open(link_mark(
                &link.url,
                &link.title,
            ))),
            NodeValue::Image(link) => {
                self.tokens.push(Token::leaf(TokenKind::Image {
                    src: link.url.clone(),
                    alt: collect_text(node),
                    title: (!link.title.is_empty()).then(|| link.title.clone()),
                }));
                return false;
            }
            _ => {}
        }
        true
    }

    fn leave<'a>(&mut self, node: &'a AstNode<'a>) {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Paragraph => {
                self.finish_run();
                self.close(BlockToken::Paragraph);
            }
            NodeValue::Heading(heading) => {
                self.finish_run();
                self.close(BlockToken::Heading {
                    level: heading.level,
                });
            }
            NodeValue::List(_) => {
                if let Some(block) = self.lists.pop() {
                    self.close(block);
                }
            }
            NodeValue::Item(_) | NodeValue::TaskItem(_) => {
                if let Some(item) = self.items.pop() {
                    self.close(item.block);
                }
            }
            NodeValue::BlockQuote => self.close(BlockToken::Blockquote),
            NodeValue::Escaped => self.in_escape = false,
            NodeValue::Table(_) => {
                if let Some(table) = self.tables.pop() {
                    let section = if table.in_head {
                        BlockToken::TableHead
                    } else {
                        BlockToken::TableBody
                    };
                    self.close(section);
                }
                self.close(BlockToken::Table);
            }
            NodeValue::TableRow(_) => self.close(BlockToken::TableRow),
            NodeValue::TableCell => {
                self.finish_run();
                self.close(BlockToken::Paragraph);
                let cell = self
                    .tables
                    .last_mut()
                    .and_then(|table| table.cell.take())
                    .unwrap_or(BlockToken::TableDataCell {
                        align: Alignment::None,
                    });
                self.close(cell);
            }
            NodeValue::Emph => self.tokens.push(Token::mark_close(Mark::Italic)),
            NodeValue::Strong => self.tokens.push(Token::mark_close(Mark::Bold)),
            NodeValue::Strikethrough => self.tokens.push(Token::mark_close(Mark::Strike)),
            NodeValue::Link(link) => self
                .tokens
                .push(Token::mark_close(link_mark(&link.url, &link.title))),
            _ => {}
        }
    }

    fn open(&mut self, block: BlockToken) {
        self.tokens.push(Token::open(block));
    }

    fn close(&mut self, block: BlockToken) {
        self.tokens.push(Token::close(block));
    }

    fn open_item(&mut self, block: BlockToken, degraded_checkbox: Option<bool>) {
        self.items.push(ItemFrame {
            open_index: self.tokens.len(),
            block: block.clone(),
            degraded_checkbox,
        });
        self.open(block);
    }

    fn begin_run<'a>(&mut self, node: &'a AstNode<'a>) {
        let first_in_item = node.previous_sibling().is_none()
            && node.parent().is_some_and(|parent| {
                matches!(
                    parent.data.borrow().value,
                    NodeValue::Item(_) | NodeValue::TaskItem(_)
                )
            });
        let item = first_in_item
            .then(|| self.items.len().checked_sub(1))
            .flatten();
        self.run = Some(InlineRun {
            start: self.tokens.len(),
            item,
            escaped: Vec::new(),
        });
    }

    /// Post-processes the current inline run in place.
    fn finish_run(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        let mut inline: Vec<RunToken> = self
            .tokens
            .split_off(run.start)
            .into_iter()
            .enumerate()
            .map(|(index, token)| {
                if run.escaped.contains(&(run.start + index)) {
                    RunToken::escaped(token)
                } else {
                    RunToken::from(token)
                }
            })
            .collect();
        let item = run.item.and_then(|index| self.items.get_mut(index));

        if let Some(checked) = item.as_ref().and_then(|item| item.degraded_checkbox) {
            let prefix = if checked { "[x] " } else { "[ ] " };
            inline.insert(0, Token::text(prefix).into());
        }

        let inline = coalesce_text(inline);
        let inline = pair_highlights(inline);
        let mut inline = recognize_entities(inline, self.options);

        let leading_state = match inline.first().map(|t| &t.kind) {
            Some(TokenKind::TaskMarker { state }) => Some(*state),
            _ => None,
        };
        if let (Some(item), Some(state)) = (item, leading_state) {
            if matches!(item.block, BlockToken::TaskItem { .. }) {
                let block = BlockToken::TaskItem { state };
                item.block = block.clone();
                if let Some(open) = self.tokens.get_mut(item.open_index) {
                    *open = Token::open(block);
                }
                inline.remove(0);
            }
        }

        self.tokens.extend(inline);
    }
}

/// True when every item of a list carries a checkbox.
fn all_task_items<'a>(list: &'a AstNode<'a>) -> bool {
    let mut items = list.children().peekable();
    items.peek().is_some()
        && items.all(|item| matches!(item.data.borrow().value, NodeValue::TaskItem(_)))
}

fn link_mark(url: &str, title: &str) -> Mark {
    Mark::Link {
        href: url.to_string(),
        title: (!title.is_empty()).then(|| title.to_string()),
    }
}

fn convert_alignment(alignment: &TableAlignment) -> Alignment {
    match alignment {
        TableAlignment::Left => Alignment::Left,
        TableAlignment::Center => Alignment::Center,
        TableAlignment::Right => Alignment::Right,
        TableAlignment::None => Alignment::None,
    }
}

/// Flattened text of a node's descendants (image alt text).
fn collect_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        match &descendant.data.borrow().value {
            NodeValue::Text(t) => text.push_str(t),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            _ => {}
        }
    }
    text
}
