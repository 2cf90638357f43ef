//! Stream selector parsing and label matching.
//!
//! Queries use the LogQL stream selector syntax:
//!
//! ```text
//! {app="checkout", env=~"prod-.*", level!="debug"} |= "timeout"
//! ```
//!
//! Only the selector decides which chunks belong to a query. A pipeline after
//! the closing brace is kept for display but does not affect chunk selection,
//! since line filters are applied to chunk contents, not to the index.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// Matcher operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchOp {
    Equal,
    NotEqual,
    RegexMatch,
    RegexNoMatch,
}

impl MatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::RegexMatch => "=~",
            Self::RegexNoMatch => "!~",
        }
    }
}

/// A single `name op "value"` matcher.
#[derive(Clone, Debug)]
pub struct LabelMatcher {
    pub name: String,
    pub op: MatchOp,
    pub value: String,
    regex: Option<Regex>,
}

impl LabelMatcher {
    /// Build a matcher, compiling the value as a fully anchored regex for regex operators.
    pub fn new(name: impl Into<String>, op: MatchOp, value: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        let value = value.into();
        if !is_valid_label_name(&name) {
            return Err(crate::Error::InvalidMatcher(format!(
                "invalid label name: {name:?}"
            )));
        }

        let regex = match op {
            MatchOp::RegexMatch | MatchOp::RegexNoMatch => {
                let anchored = format!("^(?:{value})$");
                Some(Regex::new(&anchored).map_err(|e| {
                    crate::Error::InvalidMatcher(format!("invalid regex for label {name}: {e}"))
                })?)
            }
            MatchOp::Equal | MatchOp::NotEqual => None,
        };

        Ok(Self {
            name,
            op,
            value,
            regex,
        })
    }

    /// Test a label value. A missing label is matched as the empty string.
    pub fn matches(&self, value: &str) -> bool {
        match (self.op, &self.regex) {
            (MatchOp::Equal, _) => value == self.value,
            (MatchOp::NotEqual, _) => value != self.value,
            (MatchOp::RegexMatch, Some(re)) => re.is_match(value),
            (MatchOp::RegexNoMatch, Some(re)) => !re.is_match(value),
            (MatchOp::RegexMatch | MatchOp::RegexNoMatch, None) => false,
        }
    }
}

impl PartialEq for LabelMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.op == other.op && self.value == other.value
    }
}

impl Eq for LabelMatcher {}

impl fmt::Display for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{:?}", self.name, self.op.as_str(), self.value)
    }
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A parsed query: the stream selector plus any trailing pipeline text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatcherExpression {
    matchers: Vec<LabelMatcher>,
    pipeline: String,
    text: String,
}

impl MatcherExpression {
    /// Parse a query.
    pub fn parse(text: &str) -> crate::Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidMatcher("query is empty".to_string()));
        }

        let mut cursor = Cursor { rest: trimmed };
        if !cursor.eat("{") {
            return Err(crate::Error::InvalidMatcher(
                "query must start with a '{' stream selector".to_string(),
            ));
        }

        let mut matchers = Vec::new();
        loop {
            cursor.skip_whitespace();
            if cursor.eat("}") {
                break;
            }
            if cursor.is_empty() {
                return Err(crate::Error::InvalidMatcher(
                    "unterminated stream selector".to_string(),
                ));
            }

            let name = cursor.label_name()?;
            cursor.skip_whitespace();
            let op = cursor.operator(&name)?;
            cursor.skip_whitespace();
            let value = cursor.string_literal()?;
            matchers.push(LabelMatcher::new(name, op, value)?);

            cursor.skip_whitespace();
            if cursor.eat(",") {
                continue;
            }
            if cursor.eat("}") {
                break;
            }
            return Err(crate::Error::InvalidMatcher(format!(
                "expected ',' or '}}' but found {:?}",
                cursor.peek_display()
            )));
        }

        if matchers.is_empty() {
            return Err(crate::Error::InvalidMatcher(
                "stream selector must contain at least one matcher".to_string(),
            ));
        }
        if matchers.iter().all(|m| m.matches("")) {
            return Err(crate::Error::InvalidMatcher(
                "stream selector must contain at least one matcher that does not match the empty string"
                    .to_string(),
            ));
        }

        let pipeline = cursor.rest.trim();
        if !pipeline.is_empty() && !pipeline.starts_with('|') {
            return Err(crate::Error::InvalidMatcher(format!(
                "unexpected {pipeline:?} after stream selector"
            )));
        }

        Ok(Self {
            matchers,
            pipeline: pipeline.to_string(),
            text: trimmed.to_string(),
        })
    }

    /// The selector's matchers in query order.
    pub fn matchers(&self) -> &[LabelMatcher] {
        &self.matchers
    }

    /// Pipeline text following the selector (empty if none).
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Whether a label set satisfies every matcher.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.matchers.iter().all(|matcher| {
            let value = labels.get(&matcher.name).map(String::as_str).unwrap_or("");
            matcher.matches(value)
        })
    }
}

impl fmt::Display for MatcherExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl std::str::FromStr for MatcherExpression {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s)
    }
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn peek_display(&self) -> String {
        match self.rest.chars().next() {
            Some(c) => c.to_string(),
            None => "end of input".to_string(),
        }
    }

    fn label_name(&mut self) -> crate::Result<String> {
        let rest: &'a str = self.rest;
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let name = &rest[..end];
        if !is_valid_label_name(name) {
            return Err(crate::Error::InvalidMatcher(format!(
                "expected label name but found {:?}",
                self.peek_display()
            )));
        }
        self.rest = &rest[end..];
        Ok(name.to_string())
    }

    fn operator(&mut self, name: &str) -> crate::Result<MatchOp> {
        // Two-character operators first so "=~" is not read as "=".
        for op in [
            MatchOp::RegexMatch,
            MatchOp::RegexNoMatch,
            MatchOp::NotEqual,
            MatchOp::Equal,
        ] {
            if self.eat(op.as_str()) {
                return Ok(op);
            }
        }
        Err(crate::Error::InvalidMatcher(format!(
            "expected operator after label {name} but found {:?}",
            self.peek_display()
        )))
    }

    fn string_literal(&mut self) -> crate::Result<String> {
        let rest: &'a str = self.rest;
        let mut chars = rest.char_indices();
        let quote = match chars.next() {
            Some((_, c @ ('"' | '`'))) => c,
            _ => {
                return Err(crate::Error::InvalidMatcher(format!(
                    "expected quoted value but found {:?}",
                    self.peek_display()
                )));
            }
        };

        let mut value = String::new();
        while let Some((idx, c)) = chars.next() {
            if c == quote {
                self.rest = &rest[idx + c.len_utf8()..];
                return Ok(value);
            }
            // Backtick strings are raw.
            if c == '\\' && quote == '"' {
                let escaped = match chars.next() {
                    Some((_, '"')) => '"',
                    Some((_, '\\')) => '\\',
                    Some((_, 'n')) => '\n',
                    Some((_, 't')) => '\t',
                    Some((_, other)) => {
                        return Err(crate::Error::InvalidMatcher(format!(
                            "unknown escape sequence \\{other}"
                        )));
                    }
                    None => break,
                };
                value.push(escaped);
            } else {
                value.push(c);
            }
        }

        Err(crate::Error::InvalidMatcher(
            "unterminated string literal".to_string(),
        ))
    }
}
