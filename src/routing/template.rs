//! Path templates and path normalization.
//!
//! A template is a `/`-separated list of literal segments and `{name}`
//! placeholders. A placeholder captures exactly one non-empty segment.
//! Empty segments are ignored, so `/orders/` and `/orders` are the same
//! template and the same request path.

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters re-encoded when a decoded segment is written back into a path.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template such as `/api/v1/Discount/{productName}`.
    ///
    /// Errors carry a human-readable reason.
    pub fn parse(raw: &str) -> Result<Self, String> {
        if !raw.starts_with('/') {
            return Err("must start with '/'".to_string());
        }

        let mut segments = Vec::new();
        for part in raw.split('/').filter(|s| !s.is_empty()) {
            if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(format!("invalid placeholder '{}'", part));
                }
                let duplicate = segments
                    .iter()
                    .any(|s| matches!(s, Segment::Param(name) if name == inner));
                if duplicate {
                    return Err(format!("placeholder '{{{}}}' appears twice", inner));
                }
                segments.push(Segment::Param(inner.to_string()));
            } else if part.contains('{') || part.contains('}') {
                return Err(format!("segment '{}' mixes literal text and braces", part));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The template as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Canonical form used for collision detection: placeholder names are
    /// erased, so `/a/{x}` and `/a/{y}` normalize identically.
    pub fn normalized(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param(_) => out.push_str("{}"),
            }
        }
        out
    }

    /// Names of the placeholders, in order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a normalized path, capturing placeholder values.
    pub fn match_path(&self, path: &NormalizedPath) -> Option<PathParams> {
        if path.segments.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::default();
        for (segment, value) in self.segments.iter().zip(&path.segments) {
            match segment {
                Segment::Literal(text) if text == value => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.push(name.clone(), value.clone()),
            }
        }
        Some(params)
    }

    /// Fill placeholders from captured parameters. Values are re-encoded.
    pub fn render(&self, params: &PathParams) -> Option<String> {
        if self.segments.is_empty() {
            return Some("/".to_string());
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param(name) => {
                    let value = params.get(name)?;
                    out.extend(utf8_percent_encode(value, SEGMENT));
                }
            }
        }
        Some(out)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A request path split into percent-decoded, non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedPath {
    segments: Vec<String>,
}

impl NormalizedPath {
    /// Normalize a raw request path: drop empty segments (which strips the
    /// trailing slash) and percent-decode each segment.
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .collect();
        Self { segments }
    }

    /// Decoded segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Canonical, re-encoded path string.
    pub fn to_path_string(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            out.extend(utf8_percent_encode(segment, SEGMENT));
        }
        out
    }
}

/// Placeholder values captured by a template match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn push(&mut self, name: String, value: String) {
        self.0.push((name, value));
    }

    /// Look up a captured value by exact name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a captured value ignoring ASCII case of the name.
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
