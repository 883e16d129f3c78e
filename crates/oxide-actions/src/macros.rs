//! Path macros: parameterized segments.
//!
//! A segment may embed exactly one macro between `{` and `}`. Text before
//! and after the macro stays literal, so `wild{id}cat` matches `wild123cat`
//! and binds `id = "123"`.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};

const MACRO_START: char = '{';
const MACRO_END: char = '}';
const CONSTRAINT_SEPARATOR: char = ':';

/// Which macro declarations are accepted when compiling patterns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroSyntax {
    /// Only `{name}`. The variable binds any non-empty text.
    #[default]
    Plain,
    /// `{name}` or `{name:regex}`. A constraint must match the whole value.
    ///
    /// Braces in the constraint must balance unless they are escaped or
    /// sit inside a character class, as in `{id:[^}]+}`.
    Regex,
}

/// The matching strategy of a single macro.
#[derive(Debug, Clone)]
pub enum MacroKind {
    /// Binds any non-empty text.
    Plain,
    /// Binds text accepted by the constraint.
    Constrained {
        /// The constraint as declared.
        source: String,
        /// The anchored, compiled constraint.
        matcher: Regex,
    },
}

impl PartialEq for MacroKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Plain, Self::Plain) => true,
            (Self::Constrained { source: a, .. }, Self::Constrained { source: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for MacroKind {}

/// A compiled macro: literal prefix, variable, literal suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroSegment {
    name: String,
    prefix: String,
    suffix: String,
    kind: MacroKind,
}

impl MacroSegment {
    /// Returns the variable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the literal text before the macro.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the literal text after the macro.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Returns the matching strategy.
    pub fn kind(&self) -> &MacroKind {
        &self.kind
    }

    /// Returns the declared constraint, if any.
    pub fn constraint(&self) -> Option<&str> {
        match &self.kind {
            MacroKind::Plain => None,
            MacroKind::Constrained { source, .. } => Some(source),
        }
    }

    /// Matches a request segment and returns the bound value.
    ///
    /// The prefix and suffix must not overlap and must leave at least one
    /// character for the variable.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_actions::{MacroSyntax, SegmentPattern};
    ///
    /// let segment = SegmentPattern::compile("wild{id}cat", MacroSyntax::Plain).unwrap();
    /// let m = segment.as_macro().unwrap();
    /// assert_eq!(m.capture("wild123cat"), Some("123"));
    /// assert_eq!(m.capture("wildcat"), None);
    /// ```
    pub fn capture<'s>(&self, candidate: &'s str) -> Option<&'s str> {
        let value = candidate
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if value.is_empty() {
            return None;
        }
        match &self.kind {
            MacroKind::Plain => Some(value),
            MacroKind::Constrained { matcher, .. } => matcher.is_match(value).then_some(value),
        }
    }

    /// Renders the segment with `value` in place of the macro.
    pub fn render(&self, value: &str) -> String {
        format!("{}{value}{}", self.prefix, self.suffix)
    }
}

impl fmt::Display for MacroSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{MACRO_START}{}", self.prefix, self.name)?;
        if let Some(constraint) = self.constraint() {
            write!(f, "{CONSTRAINT_SEPARATOR}{constraint}")?;
        }
        write!(f, "{MACRO_END}{}", self.suffix)
    }
}

/// One segment of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentPattern {
    /// Matches the exact text.
    Literal(String),
    /// Matches via a macro and binds a variable.
    Macro(MacroSegment),
}

impl SegmentPattern {
    /// Compiles a single segment.
    ///
    /// Text without macro delimiters is a literal. Otherwise exactly one
    /// `{...}` declaration is parsed; braces nested inside a regex
    /// constraint are balanced, except inside character classes.
    pub fn compile(text: &str, syntax: MacroSyntax) -> Result<Self> {
        let Some(start) = text.find(MACRO_START) else {
            if text.contains(MACRO_END) {
                return Err(RouterError::malformed(text, "unbalanced '}'"));
            }
            return Ok(Self::Literal(text.to_string()));
        };

        let prefix = &text[..start];
        if prefix.contains(MACRO_END) {
            return Err(RouterError::malformed(text, "unbalanced '}'"));
        }

        let end = closing_brace(text, start)
            .ok_or_else(|| RouterError::malformed(text, "unbalanced '{'"))?;
        let body = &text[start + 1..end];
        let suffix = &text[end + 1..];
        if suffix.contains(MACRO_START) || suffix.contains(MACRO_END) {
            return Err(RouterError::malformed(
                text,
                "a segment may contain only one macro",
            ));
        }

        let (name, constraint) = match body.split_once(CONSTRAINT_SEPARATOR) {
            Some((name, constraint)) => (name, Some(constraint)),
            None => (body, None),
        };
        if name.is_empty() {
            return Err(RouterError::malformed(text, "empty macro name"));
        }
        if name.contains(MACRO_START) || name.contains(MACRO_END) {
            return Err(RouterError::malformed(text, "invalid macro name"));
        }

        let kind = match (constraint, syntax) {
            (None, _) => MacroKind::Plain,
            (Some(_), MacroSyntax::Plain) => {
                return Err(RouterError::malformed(
                    text,
                    "constraints require the regex macro syntax",
                ));
            }
            (Some(""), MacroSyntax::Regex) => {
                return Err(RouterError::malformed(text, "empty macro constraint"));
            }
            (Some(source), MacroSyntax::Regex) => {
                let matcher = Regex::new(&format!("^(?:{source})$"))
                    .map_err(|e| RouterError::malformed(text, e.to_string()))?;
                MacroKind::Constrained {
                    source: source.to_string(),
                    matcher,
                }
            }
        };

        Ok(Self::Macro(MacroSegment {
            name: name.to_string(),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            kind,
        }))
    }

    /// Returns the macro, if this segment is one.
    pub fn as_macro(&self) -> Option<&MacroSegment> {
        match self {
            Self::Literal(_) => None,
            Self::Macro(m) => Some(m),
        }
    }

    /// Returns whether the request segment matches.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Literal(text) => text == candidate,
            Self::Macro(m) => m.capture(candidate).is_some(),
        }
    }
}

impl fmt::Display for SegmentPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => f.write_str(text),
            Self::Macro(m) => m.fmt(f),
        }
    }
}

/// Finds the `}` closing the `{` at byte offset `start`.
///
/// Braces escaped with `\` or inside a `[...]` class are not counted.
fn closing_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_class = false;
    let mut chars = text[start..].char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' if !in_class => {
                in_class = true;
                // `]` right after `[` or `[^` is a literal member.
                chars.next_if(|&(_, c)| c == '^');
                chars.next_if(|&(_, c)| c == ']');
            }
            ']' if in_class => in_class = false,
            _ if in_class => {}
            MACRO_START => depth += 1,
            MACRO_END => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}
