// SPDX-FileCopyrightText: 2026 Chloe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rich diagnostics for configuration errors.
//!
//! Figment extraction errors are turned into miette diagnostics that point at
//! the offending line of `chloe.toml` and offer a "did you mean" hint for
//! misspelled keys.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a known key must beat to be offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with enough context for miette to render it.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that no section declares.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(code(chloe::config::unknown_key), help("{}", unknown_key_help(suggestion.as_deref(), valid_keys)))]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value whose TOML type does not fit the field.
    #[error("invalid type for `{key}`: found {found}")]
    #[diagnostic(code(chloe::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that parsed but is outside its allowed range.
    #[error("`{key}` {message}")]
    #[diagnostic(code(chloe::config::validation))]
    Validation { key: String, message: String },

    /// Anything figment reports that has no dedicated variant.
    #[error("configuration error: {0}")]
    #[diagnostic(code(chloe::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// A TOML document the loader read, kept so errors can quote it.
#[derive(Debug, Clone)]
pub struct TomlSource {
    pub name: String,
    pub content: String,
}

impl TomlSource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Convert every error inside a `figment::Error` into a [`ConfigError`].
pub fn figment_to_config_errors(err: figment::Error, sources: &[TomlSource]) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let section: Vec<String> = error.path.iter().map(ToString::to_string).collect();
            let origin = origin_of(&error, sources);
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = locate(origin, &section, field);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::InvalidType(found, expected) => {
                    let (span, src) = match section.split_last() {
                        Some((field, parent)) => locate(origin, parent, field),
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: section.join("."),
                        found: found.to_string(),
                        expected: expected.clone(),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::invalid(field, "is required"),
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// The loaded source a figment error was raised from, matched by file path.
fn origin_of<'a>(error: &figment::Error, sources: &'a [TomlSource]) -> Option<&'a TomlSource> {
    let origin = error.metadata.as_ref().and_then(|m| m.source.as_ref());
    let name = match origin {
        Some(figment::Source::File(path)) => path.display().to_string(),
        _ => INLINE_SOURCE.to_string(),
    };
    sources.iter().find(|s| s.name == name)
}

pub(crate) const INLINE_SOURCE: &str = "<inline>";

fn locate(
    origin: Option<&TomlSource>,
    section: &[String],
    field: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some(source) = origin else {
        return (None, None);
    };
    match find_key_offset(&source.content, section, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(&source.name, source.content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` as a key inside the `[section]` table of a TOML document.
///
/// An empty `section` searches the top level, before the first table header.
pub fn find_key_offset(content: &str, section: &[String], field: &str) -> Option<usize> {
    let wanted_header = section.first().map(|s| format!("[{s}]"));
    let mut in_section = wanted_header.is_none();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            in_section = wanted_header
                .as_deref()
                .is_some_and(|header| trimmed.trim_end() == header);
        } else if in_section {
            let is_key = trimmed
                .strip_prefix(field)
                .is_some_and(|rest| rest.trim_start().starts_with('='));
            if is_key {
                return Some(offset + (line.len() - trimmed.len()));
            }
        }
        offset += line.len();
    }
    None
}

/// Closest known key to `unknown` by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render errors to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}
