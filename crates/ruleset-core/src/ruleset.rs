//! Ruleset file model
//!
//! A ruleset is an ordered list of lines. Every line classifies as a
//! comment, a blank or a rule reference, so parsing cannot fail. Comments
//! and blanks keep their exact text; references keep their original text
//! too and expose the trimmed repository name.

use std::collections::BTreeSet;

use ruleset_fs::NormalizedPath;
use serde::Serialize;

/// A rule repository named on a ruleset line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleReference {
    name: String,
    #[serde(skip)]
    raw: String,
}

impl RuleReference {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let name = raw.trim().to_string();
        Self { name, raw }
    }

    /// Repository name, trimmed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The line exactly as it appeared in the file.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// One line of a ruleset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Comment(String),
    Blank(String),
    Reference(RuleReference),
}

impl Line {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        if trimmed.is_empty() {
            Line::Blank(raw.to_string())
        } else if trimmed.starts_with('#') {
            Line::Comment(raw.to_string())
        } else {
            Line::Reference(RuleReference::new(raw))
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Line::Comment(text) | Line::Blank(text) => text,
            Line::Reference(reference) => reference.raw(),
        }
    }

    pub fn as_reference(&self) -> Option<&RuleReference> {
        match self {
            Line::Reference(reference) => Some(reference),
            _ => None,
        }
    }
}

/// A parsed ruleset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ruleset {
    name: String,
    path: NormalizedPath,
    lines: Vec<Line>,
    crlf: bool,
    trailing_newline: bool,
}

impl Ruleset {
    /// Parse file content. Line ending style and the trailing newline are
    /// remembered so [`Ruleset::render`] reproduces untouched files byte for
    /// byte.
    pub fn parse(name: impl Into<String>, path: NormalizedPath, content: &str) -> Self {
        Self {
            name: name.into(),
            path,
            lines: content.lines().map(Line::parse).collect(),
            crlf: content.contains("\r\n"),
            trailing_newline: content.ends_with('\n'),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// References with their line index, in file order.
    pub fn references(&self) -> impl Iterator<Item = (usize, &RuleReference)> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| line.as_reference().map(|r| (idx, r)))
    }

    pub fn reference_count(&self) -> usize {
        self.references().count()
    }

    /// A copy without the reference lines at `removed`.
    ///
    /// Indexes that point at comments or blanks are ignored, so non-rule
    /// content always survives.
    pub fn without(&self, removed: &BTreeSet<usize>) -> Self {
        let lines = self
            .lines
            .iter()
            .enumerate()
            .filter(|(idx, line)| !(removed.contains(idx) && matches!(line, Line::Reference(_))))
            .map(|(_, line)| line.clone())
            .collect();

        Self {
            lines,
            ..self.clone()
        }
    }

    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }

        let ending = if self.crlf { "\r\n" } else { "\n" };
        let mut out = self
            .lines
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join(ending);
        if self.trailing_newline {
            out.push_str(ending);
        }
        out
    }
}
