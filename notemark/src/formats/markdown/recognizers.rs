//! Inline post-processing of a paragraph's token run.
//!
//! comrak knows nothing about highlights, task keywords, timestamps or note
//! links, so they arrive as plain text. Each inline run is rewritten here in a
//! fixed order:
//!
//! 1. adjacent text tokens are coalesced,
//! 2. `==` delimiters are paired into highlight marks,
//! 3. entity recognizers split the remaining text: task keywords, then
//!    timestamps, then note links. Each pass only sees the plain spans left by
//!    the previous one.
//!
//! Inline code never reaches the recognizers: it is a `CodeInline` token, not
//! text. Characters written as backslash escapes in the source are tracked
//! per text token and never take part in a highlight delimiter, a timestamp
//! or a note link.

use super::options::ParseOptions;
use crate::ir::nodes::{normalize_time, Mark, TaskState};
use crate::ir::tokens::{Nesting, Token, TokenKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static TASK_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:todo|doing|done|waiting|hold|canceled|cancelled|idea)\b")
        .expect("valid task keyword regex")
});

static TASK_KEYWORD_UPPERCASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:TODO|DOING|DONE|WAITING|HOLD|CANCELED|CANCELLED|IDEA)\b")
        .expect("valid task keyword regex")
});

static TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d{1,2}:\d{2})\]").expect("valid timestamp regex"));

static NOTE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("valid note link regex"));

const HIGHLIGHT_DELIMITER: &str = "==";

/// A token of an inline run with the byte ranges of its text that were
/// backslash escapes.
#[derive(Debug, Clone, PartialEq)]
pub struct RunToken {
    pub token: Token,
    pub escaped: Vec<Range<usize>>,
}

impl RunToken {
    /// A text token whose whole text came from an escape.
    pub fn escaped(token: Token) -> Self {
        let len = token.as_text().map_or(0, str::len);
        Self {
            token,
            escaped: vec![0..len],
        }
    }

    fn touches_escape(&self, range: &Range<usize>) -> bool {
        overlaps(range, &self.escaped)
    }

    /// `text[range]` as a new text token, escapes rebased onto it.
    fn slice(text: &str, escaped: &[Range<usize>], range: Range<usize>) -> Self {
        let escaped = escaped
            .iter()
            .filter(|span| span.start < range.end && range.start < span.end)
            .map(|span| {
                span.start.max(range.start) - range.start..span.end.min(range.end) - range.start
            })
            .collect();
        Self {
            token: Token::text(&text[range]),
            escaped,
        }
    }
}

impl From<Token> for RunToken {
    fn from(token: Token) -> Self {
        Self {
            token,
            escaped: Vec::new(),
        }
    }
}

/// Merges neighbouring text tokens so patterns can match across comrak's
/// text splits (comrak cuts text at `[`, `]` and similar characters).
pub fn coalesce_text(run: Vec<RunToken>) -> Vec<RunToken> {
    let mut merged: Vec<RunToken> = Vec::with_capacity(run.len());
    for piece in run {
        if let (TokenKind::Text(next), Some(previous)) = (&piece.token.kind, merged.last_mut()) {
            if let TokenKind::Text(text) = &mut previous.token.kind {
                let shift = text.len();
                text.push_str(next);
                previous
                    .escaped
                    .extend(piece.escaped.iter().map(|r| r.start + shift..r.end + shift));
                continue;
            }
        }
        merged.push(piece);
    }
    merged
}

struct Delimiter {
    token: usize,
    offset: usize,
    context: usize,
    can_open: bool,
    can_close: bool,
}

/// Pairs `==` delimiters into highlight mark tokens.
///
/// Delimiters pair left to right and only with a partner in the same mark
/// context, so a highlight never crosses the edge of a bold or link span. An
/// opener must be followed by non-whitespace and a closer preceded by it.
pub fn pair_highlights(run: Vec<RunToken>) -> Vec<RunToken> {
    let delimiters = find_delimiters(&run);
    if delimiters.len() < 2 {
        return run;
    }

    // (token index, byte offset, opens)
    let mut splits: Vec<(usize, usize, bool)> = Vec::new();
    let mut opener: Option<&Delimiter> = None;
    for delimiter in &delimiters {
        if let Some(open) = opener {
            if open.context == delimiter.context && delimiter.can_close {
                splits.push((open.token, open.offset, true));
                splits.push((delimiter.token, delimiter.offset, false));
                opener = None;
                continue;
            }
        }
        if delimiter.can_open {
            opener = Some(delimiter);
        }
    }
    if splits.is_empty() {
        return run;
    }
    splits.sort_unstable();

    let mut out = Vec::with_capacity(run.len() + splits.len() * 2);
    let mut pending = splits.into_iter().peekable();
    for (index, piece) in run.into_iter().enumerate() {
        let TokenKind::Text(text) = &piece.token.kind else {
            out.push(piece);
            continue;
        };
        let mut cursor = 0;
        while let Some(&(_, offset, opens)) = pending.peek().filter(|s| s.0 == index) {
            pending.next();
            if offset > cursor {
                out.push(RunToken::slice(text, &piece.escaped, cursor..offset));
            }
            let mark = if opens {
                Token::mark_open(Mark::Highlight)
            } else {
                Token::mark_close(Mark::Highlight)
            };
            out.push(mark.into());
            cursor = offset + HIGHLIGHT_DELIMITER.len();
        }
        let rest = (cursor > 0 && cursor < text.len())
            .then(|| RunToken::slice(text, &piece.escaped, cursor..text.len()));
        if cursor == 0 {
            out.push(piece);
        } else if let Some(rest) = rest {
            out.push(rest);
        }
    }
    out
}

fn find_delimiters(run: &[RunToken]) -> Vec<Delimiter> {
    let mut delimiters = Vec::new();
    let mut contexts = vec![0usize];
    let mut next_context = 1;

    for (index, piece) in run.iter().enumerate() {
        match (&piece.token.kind, piece.token.nesting) {
            (TokenKind::Mark(_), Nesting::Open) => {
                contexts.push(next_context);
                next_context += 1;
            }
            (TokenKind::Mark(_), Nesting::Close) => {
                if contexts.len() > 1 {
                    contexts.pop();
                }
            }
            (TokenKind::Text(text), _) => {
                let context = contexts.last().copied().unwrap_or(0);
                let mut from = 0;
                while let Some(found) = text[from..].find(HIGHLIGHT_DELIMITER) {
                    let offset = from + found;
                    let end = offset + HIGHLIGHT_DELIMITER.len();
                    if piece.touches_escape(&(offset..end)) {
                        from = offset + 1;
                        continue;
                    }
                    from = end;
                    let before = text[..offset]
                        .chars()
                        .next_back()
                        .or_else(|| neighbour_char(run, index, false));
                    let after = text[end..]
                        .chars()
                        .next()
                        .or_else(|| neighbour_char(run, index, true));
                    delimiters.push(Delimiter {
                        token: index,
                        offset,
                        context,
                        can_open: after.is_some_and(|c| !c.is_whitespace()),
                        can_close: before.is_some_and(|c| !c.is_whitespace()),
                    });
                }
            }
            _ => {}
        }
    }
    delimiters
}

/// The character adjacent to a text token across its neighbour. Non-text
/// neighbours count as non-whitespace; the run edges and hard breaks count as
/// whitespace.
fn neighbour_char(run: &[RunToken], index: usize, forward: bool) -> Option<char> {
    let neighbour = if forward {
        run.get(index + 1)
    } else {
        index.checked_sub(1).and_then(|i| run.get(i))
    }?;
    match &neighbour.token.kind {
        TokenKind::Text(text) if forward => text.chars().next(),
        TokenKind::Text(text) => text.chars().next_back(),
        TokenKind::HardBreak => None,
        _ => Some('x'),
    }
}

enum Segment {
    Plain(Range<usize>),
    Entity(TokenKind),
}

/// Splits every text token of the run into text and entity tokens.
pub fn recognize_entities(run: Vec<RunToken>, options: &ParseOptions) -> Vec<Token> {
    let mut out = Vec::with_capacity(run.len());
    for piece in run {
        match &piece.token.kind {
            TokenKind::Text(text) => out.extend(split_entities(text, &piece.escaped, options)),
            _ => out.push(piece.token),
        }
    }
    out
}

fn split_entities(text: &str, escaped: &[Range<usize>], options: &ParseOptions) -> Vec<Token> {
    let protected: Vec<Range<usize>> = NOTE_LINK
        .find_iter(text)
        .map(|m| m.range())
        .filter(|range| !overlaps(range, escaped))
        .collect();
    let keywords: &Regex = if options.case_insensitive_keywords {
        &TASK_KEYWORD
    } else {
        &TASK_KEYWORD_UPPERCASE
    };

    let mut segments = vec![Segment::Plain(0..text.len())];

    segments = run_pass(text, segments, |span, base| {
        keywords
            .find_iter(span)
            .filter(|m| !overlaps(&(base + m.start()..base + m.end()), &protected))
            .filter_map(|m| {
                let state = TaskState::from_keyword(m.as_str())?;
                let end = if span[m.end()..].starts_with(' ') {
                    m.end() + 1
                } else {
                    m.end()
                };
                Some((m.start()..end, TokenKind::TaskMarker { state }))
            })
            .collect()
    });

    segments = run_pass(text, segments, |span, base| {
        TIMESTAMP
            .captures_iter(span)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let absolute = base + whole.start()..base + whole.end();
                if overlaps(&absolute, &protected) || overlaps(&absolute, escaped) {
                    return None;
                }
                let time = normalize_time(caps.get(1)?.as_str())?;
                Some((whole.range(), TokenKind::Timestamp { time }))
            })
            .collect()
    });

    segments = run_pass(text, segments, |span, base| {
        NOTE_LINK
            .captures_iter(span)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                if overlaps(&(base + whole.start()..base + whole.end()), escaped) {
                    return None;
                }
                let title = caps.get(1)?.as_str().to_string();
                Some((whole.range(), TokenKind::NoteLink { title }))
            })
            .collect()
    });

    segments
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Plain(range) if range.is_empty() => None,
            Segment::Plain(range) => Some(Token::text(&text[range])),
            Segment::Entity(kind) => Some(Token::leaf(kind)),
        })
        .collect()
}

/// Applies one recognizer to the plain segments. `find` receives the span
/// text and its byte offset in the full text and returns span-relative
/// matches in order.
fn run_pass<F>(text: &str, segments: Vec<Segment>, mut find: F) -> Vec<Segment>
where
    F: FnMut(&str, usize) -> Vec<(Range<usize>, TokenKind)>,
{
    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        let range = match segment {
            Segment::Plain(range) => range,
            entity => {
                out.push(entity);
                continue;
            }
        };
        let span = &text[range.clone()];
        let mut cursor = 0;
        for (found, kind) in find(span, range.start) {
            if found.start > cursor {
                out.push(Segment::Plain(range.start + cursor..range.start + found.start));
            }
            out.push(Segment::Entity(kind));
            cursor = found.end;
        }
        if cursor < span.len() {
            out.push(Segment::Plain(range.start + cursor..range.end));
        }
    }
    out
}

fn overlaps(range: &Range<usize>, spans: &[Range<usize>]) -> bool {
    spans
        .iter()
        .any(|span| range.start < span.end && span.start < range.end)
}
