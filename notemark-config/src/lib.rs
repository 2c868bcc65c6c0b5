//! Shared configuration loader for the notemark toolchain.
//!
//! `defaults/notemark.default.toml` is embedded into every binary so that the
//! documented defaults and runtime behavior stay in sync. Applications layer
//! user files on top of those defaults via [`Loader`] before deserializing
//! into [`NotemarkConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use notemark::{HardBreakStyle, ParseOptions, SerializeRules};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/notemark.default.toml");

/// Top-level configuration consumed by notemark applications.
#[derive(Debug, Clone, Deserialize)]
pub struct NotemarkConfig {
    pub parse: ParseConfig,
    pub serialize: SerializeConfig,
}

/// Mirrors [`ParseOptions`].
#[derive(Debug, Clone, Deserialize)]
pub struct ParseConfig {
    pub hard_breaks: bool,
    pub case_insensitive_keywords: bool,
}

/// Mirrors [`SerializeRules`].
#[derive(Debug, Clone, Deserialize)]
pub struct SerializeConfig {
    pub bullet_marker: char,
    pub alternate_bullet_marker: char,
    pub fence_char: char,
    pub hard_break: HardBreakStyle,
    pub rewrite_asset_paths: bool,
}

impl From<&ParseConfig> for ParseOptions {
    fn from(config: &ParseConfig) -> Self {
        ParseOptions {
            hard_breaks: config.hard_breaks,
            case_insensitive_keywords: config.case_insensitive_keywords,
        }
    }
}

impl From<ParseConfig> for ParseOptions {
    fn from(config: ParseConfig) -> Self {
        ParseOptions::from(&config)
    }
}

impl From<&SerializeConfig> for SerializeRules {
    fn from(config: &SerializeConfig) -> Self {
        SerializeRules {
            bullet_marker: config.bullet_marker,
            alternate_bullet_marker: config.alternate_bullet_marker,
            fence_char: config.fence_char,
            hard_break: config.hard_break,
            rewrite_asset_paths: config.rewrite_asset_paths,
        }
    }
}

impl From<SerializeConfig> for SerializeRules {
    fn from(config: SerializeConfig) -> Self {
        SerializeRules::from(&config)
    }
}

impl NotemarkConfig {
    pub fn parse_options(&self) -> ParseOptions {
        (&self.parse).into()
    }

    pub fn serialize_rules(&self) -> SerializeRules {
        (&self.serialize).into()
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (`serialize.bullet_marker`, ...).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<NotemarkConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<NotemarkConfig, ConfigError> {
    Loader::new().build()
}
