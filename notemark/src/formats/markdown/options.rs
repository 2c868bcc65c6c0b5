use serde::{Deserialize, Serialize};

/// Knobs for markup → tree conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Whether single line breaks inside a paragraph become hard breaks
    /// (otherwise they collapse to a space)
    pub hard_breaks: bool,

    /// Whether task keywords match in any case (`todo`, `Todo`) or only in
    /// uppercase
    pub case_insensitive_keywords: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            hard_breaks: true,
            case_insensitive_keywords: true,
        }
    }
}

/// How a `hardBreak` node is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HardBreakStyle {
    /// A bare newline; re-parses as a hard break only with `hard_breaks` on
    #[default]
    Newline,
    /// A backslash before the newline (CommonMark hard break)
    Backslash,
}

/// Configuration for the Markdown serializer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializeRules {
    /// The character to use for bullet list markers
    pub bullet_marker: char,

    /// Marker used when two bullet lists follow each other and would otherwise
    /// merge into one list on re-parse
    pub alternate_bullet_marker: char,

    /// Code fence character (`` ` `` or `~`)
    pub fence_char: char,

    pub hard_break: HardBreakStyle,

    /// Whether `file://…/.assets/…` image sources are rewritten to the
    /// portable `.assets/…` suffix
    pub rewrite_asset_paths: bool,
}

impl Default for SerializeRules {
    fn default() -> Self {
        Self {
            bullet_marker: '-',
            alternate_bullet_marker: '*',
            fence_char: '`',
            hard_break: HardBreakStyle::Newline,
            rewrite_asset_paths: true,
        }
    }
}

const BULLETS: [char; 3] = ['-', '*', '+'];

impl SerializeRules {
    /// The configured bullet, falling back to `-` for characters that are not
    /// list markers.
    pub fn bullet(&self) -> char {
        if BULLETS.contains(&self.bullet_marker) {
            self.bullet_marker
        } else {
            '-'
        }
    }

    /// A valid bullet different from [`SerializeRules::bullet`].
    pub fn alternate_bullet(&self) -> char {
        let primary = self.bullet();
        if BULLETS.contains(&self.alternate_bullet_marker) && self.alternate_bullet_marker != primary
        {
            return self.alternate_bullet_marker;
        }
        BULLETS
            .into_iter()
            .find(|c| *c != primary && *c != '+')
            .unwrap_or('+')
    }

    pub fn fence(&self) -> char {
        if self.fence_char == '~' {
            '~'
        } else {
            '`'
        }
    }
}
