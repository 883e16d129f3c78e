//! Path patterns and request path splitting.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};
use crate::macros::{MacroSegment, MacroSyntax, SegmentPattern};
use crate::request::PathParams;

/// Splits a request path into segments.
///
/// A single leading and a single trailing `/` are ignored, so `/` and the
/// empty string both yield no segments.
///
/// # Example
///
/// ```
/// use oxide_actions::split_path;
///
/// assert_eq!(split_path("/re/user/173/"), vec!["re", "user", "173"]);
/// assert!(split_path("/").is_empty());
/// ```
pub fn split_path(path: &str) -> Vec<&str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

/// How a `.ext` suffix on the last request segment is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionPolicy {
    /// The suffix is part of the segment text.
    #[default]
    Keep,
    /// The suffix is removed before matching.
    Strip,
    /// Match the path as is, and retry without the suffix on a miss.
    ///
    /// The stripped path is only tried when the whole literal pass fails,
    /// so a macro that accepts the suffix wins over an earlier route that
    /// would match the stripped text: with `/re/user/{id}` registered,
    /// `/re/user/173.html` binds `id = "173.html"`.
    KeepThenStrip,
}

impl ExtensionPolicy {
    /// Returns the segment lists to try, in order.
    pub(crate) fn candidates<'p>(self, segments: Vec<&'p str>) -> Vec<Vec<&'p str>> {
        let stripped = strip_extension(&segments);
        match (self, stripped) {
            (Self::Keep, _) | (_, None) => vec![segments],
            (Self::Strip, Some(stripped)) => vec![stripped],
            (Self::KeepThenStrip, Some(stripped)) => vec![segments, stripped],
        }
    }
}

/// Removes the extension of the last segment, if there is one.
///
/// A leading dot (`.hidden`) is not an extension.
fn strip_extension<'p>(segments: &[&'p str]) -> Option<Vec<&'p str>> {
    let (last, init) = segments.split_last()?;
    let dot = last.rfind('.').filter(|&i| i > 0)?;
    let mut stripped = init.to_vec();
    stripped.push(&last[..dot]);
    Some(stripped)
}

/// A parsed path pattern such as `/re/user/{id}/macro`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The pattern string as declared.
    pattern: String,
    /// Parsed segments.
    segments: Vec<SegmentPattern>,
}

impl PathPattern {
    /// Parses a path pattern string.
    ///
    /// Pattern syntax:
    /// - `/users` - literal path
    /// - `/users/{id}` - path with a variable
    /// - `/re/wild{id}cat` - variable embedded in literal text
    /// - `/re/duplo/{id:^[0-9]+}` - constrained variable (regex syntax only)
    ///
    /// Empty segments and repeated variable names are rejected.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_actions::{MacroSyntax, PathPattern};
    ///
    /// let pattern = PathPattern::parse("/re/user/{id}/macro", MacroSyntax::Plain).unwrap();
    /// assert_eq!(pattern.segments().len(), 4);
    /// assert_eq!(pattern.macro_names().collect::<Vec<_>>(), vec!["id"]);
    /// ```
    pub fn parse(pattern: &str, syntax: MacroSyntax) -> Result<Self> {
        let mut segments = Vec::new();
        let mut names = HashSet::new();

        for part in split_path(pattern) {
            if part.is_empty() {
                return Err(RouterError::malformed(pattern, "empty path segment"));
            }
            let segment = SegmentPattern::compile(part, syntax).map_err(|e| match e {
                RouterError::MalformedPattern { reason, .. } => {
                    RouterError::malformed(pattern, reason)
                }
                other => other,
            })?;
            if let Some(m) = segment.as_macro() {
                if !names.insert(m.name().to_string()) {
                    return Err(RouterError::malformed(
                        pattern,
                        format!("duplicate variable '{}'", m.name()),
                    ));
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
        })
    }

    /// Returns the pattern string as declared.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Returns the parsed segments.
    pub fn segments(&self) -> &[SegmentPattern] {
        &self.segments
    }

    /// Returns the macros in declaration order.
    pub fn macros(&self) -> impl Iterator<Item = &MacroSegment> {
        self.segments.iter().filter_map(SegmentPattern::as_macro)
    }

    /// Returns the variable names in declaration order.
    pub fn macro_names(&self) -> impl Iterator<Item = &str> {
        self.macros().map(MacroSegment::name)
    }

    /// Returns whether the pattern has at least one macro.
    pub fn has_macros(&self) -> bool {
        self.macros().next().is_some()
    }

    /// Generates a path from variable values.
    ///
    /// Values are not checked against constraints.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_actions::{MacroSyntax, PathParams, PathPattern};
    ///
    /// let pattern = PathPattern::parse("/re/wild{id}cat", MacroSyntax::Plain).unwrap();
    /// let mut params = PathParams::new();
    /// params.insert("id", "123");
    /// assert_eq!(pattern.reverse(&params).unwrap(), "/re/wild123cat");
    /// ```
    pub fn reverse(&self, params: &PathParams) -> Option<String> {
        let mut path = String::new();

        for segment in &self.segments {
            path.push('/');
            match segment {
                SegmentPattern::Literal(s) => path.push_str(s),
                SegmentPattern::Macro(m) => path.push_str(&m.render(params.get(m.name())?)),
            }
        }

        if path.is_empty() {
            path.push('/');
        }

        Some(path)
    }
}

/// Renders the canonical form: `/`-joined segments with `{name}` placeholders.
impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
