//! Escaping of literal text for Markdown output.

/// Where a piece of text lands in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextContext {
    /// Only whitespace precedes the text on its line
    pub line_start: bool,
    /// The output so far ends with `]`
    pub after_bracket: bool,
    /// Inside a table cell, where `|` splits cells
    pub in_table: bool,
}

/// Escapes markup-significant characters so the text re-parses as itself.
///
/// Always escaped: `\ * _ ` [ ] < ~`. `&` is escaped before `#` or an
/// alphanumeric (entity references). `=` is escaped when it could join a
/// neighbouring `=` into a highlight delimiter: next to another `=` or at
/// either edge of the text. At line start `# > - + = |` and the delimiter of
/// an ordered list marker are escaped. Newlines become spaces.
pub fn escape_text(text: &str, context: TextContext) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut line_start = context.line_start;
    let mut chars = text.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        let c = if c == '\n' { ' ' } else { c };

        if index == 0 && context.after_bracket && matches!(c, '(' | ':') {
            out.push('\\');
            out.push(c);
            line_start = false;
            continue;
        }

        if line_start && !c.is_whitespace() {
            line_start = false;
            if matches!(c, '#' | '>' | '-' | '+' | '=' | '|') {
                out.push('\\');
                out.push(c);
                continue;
            }
            if c.is_ascii_digit() {
                let digits = text[index..]
                    .bytes()
                    .take_while(u8::is_ascii_digit)
                    .count();
                let delimiter = text[index + digits..].chars().next();
                if matches!(delimiter, Some('.' | ')')) {
                    out.push_str(&text[index..index + digits]);
                    out.push('\\');
                    for _ in 1..digits {
                        chars.next();
                    }
                    if let Some((_, delimiter)) = chars.next() {
                        out.push(delimiter);
                    }
                    continue;
                }
            }
        }

        match c {
            '\\' | '*' | '_' | '`' | '[' | ']' | '<' | '~' => {
                out.push('\\');
                out.push(c);
            }
            '|' if context.in_table => out.push_str("\\|"),
            '=' if index == 0
                || index + 1 == text.len()
                || text[..index].ends_with('=')
                || text[index + 1..].starts_with('=') =>
            {
                out.push_str("\\=");
            }
            '&' if chars
                .peek()
                .is_some_and(|(_, next)| *next == '#' || next.is_ascii_alphanumeric()) =>
            {
                out.push_str("\\&");
            }
            _ => out.push(c),
        }
    }
    out
}

/// Escapes a link or image title for use inside double quotes.
pub fn escape_title(title: &str) -> String {
    title.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Link destination, wrapped in `<...>` when it contains characters that
/// would end a bare destination.
pub fn link_destination(href: &str) -> String {
    if href.contains([' ', '(', ')', '<', '>']) {
        format!("<{}>", href.replace('<', "%3C").replace('>', "%3E"))
    } else {
        href.to_string()
    }
}

/// Inline code span with a backtick fence longer than any run inside.
pub fn code_span(code: &str, in_table: bool) -> String {
    let code = code.replace('\n', " ");
    let code = if in_table {
        code.replace('|', "\\|")
    } else {
        code
    };
    let fence = "`".repeat(longest_run(&code, '`') + 1);
    let pad = code.starts_with('`')
        || code.ends_with('`')
        || (code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty());
    if pad {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

/// Length of the longest run of `c` in `text`.
pub fn longest_run(text: &str, c: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch == c {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}
