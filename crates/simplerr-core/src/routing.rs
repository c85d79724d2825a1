//! URL rule parsing and matching.
//!
//! Rules are URL paths with typed placeholders in the
//! `<converter:name>` format, e.g. `/user/<int:id>` or
//! `/static/<path:filename>`. A placeholder without a converter
//! defaults to `string`. Rules are tried in registration order and the
//! first match wins.

use std::collections::HashMap;
use std::fmt;

use http::Method;
use regex::Regex;
use thiserror::Error;

/// Errors raised while parsing a rule pattern.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("unknown converter `{0}`")]
    UnknownConverter(String),

    #[error("empty parameter name in rule `{0}`")]
    EmptyName(String),

    #[error("duplicate parameter `{0}`")]
    DuplicateParameter(String),

    #[error("unterminated placeholder in rule `{0}`")]
    Unterminated(String),

    #[error("rule compiled to an invalid expression: {0}")]
    Compile(String),
}

/// Why a path failed to match.
#[derive(Debug, PartialEq, Eq)]
pub enum MatchError {
    /// No rule matched the path at all.
    NotFound,
    /// At least one rule matched the path, but none accepts the method.
    MethodNotAllowed {
        /// Union of methods accepted by the path-matching rules.
        allowed: Vec<Method>,
    },
}

/// Placeholder converters supported by the rule grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    /// One path segment, no `/`. The default.
    String,
    /// Decimal integer.
    Int,
    /// Decimal float, `12` or `12.5`.
    Float,
    /// RFC 4122 textual UUID.
    Uuid,
    /// One or more segments, may contain `/`.
    Path,
}

impl Converter {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "uuid" => Some(Self::Uuid),
            "path" => Some(Self::Path),
            _ => None,
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            Self::String => "[^/]+",
            Self::Int => "\\d+",
            Self::Float => "\\d+(?:\\.\\d+)?",
            Self::Uuid => {
                "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
            }
            Self::Path => ".+",
        }
    }

    fn convert(self, raw: &str) -> Option<PathArg> {
        match self {
            Self::String | Self::Path => Some(PathArg::Str(raw.to_owned())),
            Self::Int => raw.parse().ok().map(PathArg::Int),
            Self::Float => raw.parse().ok().map(PathArg::Float),
            Self::Uuid => raw.parse().ok().map(PathArg::Uuid),
        }
    }
}

/// A converted path parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum PathArg {
    Int(i64),
    Float(f64),
    Str(String),
    Uuid(uuid::Uuid),
}

impl PathArg {
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_uuid(&self) -> Option<uuid::Uuid> {
        match self {
            Self::Uuid(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for PathArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => value.fmt(f),
            Self::Float(value) => value.fmt(f),
            Self::Str(value) => value.fmt(f),
            Self::Uuid(value) => value.fmt(f),
        }
    }
}

/// Converted parameters for a matched rule, keyed by placeholder name.
pub type PathArgs = HashMap<String, PathArg>;

/// A parsed URL rule, compiled to an anchored regular expression.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: String,
    regex: Regex,
    params: Vec<(String, Converter)>,
}

// `Regex` does not implement `PartialEq`; the regex and params are derived
// from the pattern, so pattern equality implies rule equality.
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for Rule {}

impl Rule {
    /// Parse a rule pattern.
    pub fn parse(pattern: &str) -> Result<Self, RoutingError> {
        let mut source = String::from("^");
        let mut params: Vec<(String, Converter)> = Vec::new();
        let mut rest = pattern;

        while let Some(start) = rest.find('<') {
            let (literal, tail) = rest.split_at(start);
            source.push_str(&regex::escape(literal));

            let end = tail
                .find('>')
                .ok_or_else(|| RoutingError::Unterminated(pattern.to_owned()))?;
            let placeholder = &tail[1..end];

            let (converter, name) = match placeholder.split_once(':') {
                Some((converter, name)) => {
                    // Converter arguments, e.g. `int(min=1)`, are accepted
                    // but ignored; only the converter name is significant.
                    let converter = converter.split('(').next().unwrap_or(converter);
                    let converter = Converter::from_name(converter)
                        .ok_or_else(|| RoutingError::UnknownConverter(converter.to_owned()))?;
                    (converter, name)
                }
                None => (Converter::String, placeholder),
            };

            if name.is_empty() {
                return Err(RoutingError::EmptyName(pattern.to_owned()));
            }
            if params.iter().any(|(existing, _)| existing == name) {
                return Err(RoutingError::DuplicateParameter(name.to_owned()));
            }

            source.push('(');
            source.push_str(converter.pattern());
            source.push(')');
            params.push((name.to_owned(), converter));

            rest = &tail[end + 1..];
        }

        source.push_str(&regex::escape(rest));
        source.push('$');

        let regex = Regex::new(&source).map_err(|err| RoutingError::Compile(err.to_string()))?;
        Ok(Self {
            pattern: pattern.to_owned(),
            regex,
            params,
        })
    }

    /// The original rule pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Match a path against this rule, converting captured parameters.
    ///
    /// A capture the converter rejects (e.g. an integer overflowing
    /// i64) fails the whole match so later rules can still apply.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathArgs> {
        let caps = self.regex.captures(path)?;
        let mut args = PathArgs::with_capacity(self.params.len());
        for (i, (name, converter)) in self.params.iter().enumerate() {
            let raw = caps.get(i + 1)?.as_str();
            args.insert(name.clone(), converter.convert(raw)?);
        }
        Some(args)
    }
}

/// An ordered collection of rules with method-aware matching.
#[derive(Debug, Default)]
pub struct RuleMap {
    entries: Vec<(Rule, Option<Vec<Method>>)>,
}

impl RuleMap {
    /// Add a rule. `methods: None` accepts every method. Returns the
    /// index later reported by [`RuleMap::match_path`].
    pub fn add(&mut self, rule: Rule, methods: Option<Vec<Method>>) -> usize {
        self.entries.push((rule, methods));
        self.entries.len() - 1
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First rule matching the path regardless of method. Used for
    /// automatic `OPTIONS` responses.
    #[must_use]
    pub fn first_path_match(&self, path: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(rule, _)| rule.matches(path).is_some())
    }

    /// Find the first rule matching `path` that accepts `method`.
    ///
    /// `HEAD` is accepted wherever `GET` is. When rules match the path
    /// but not the method, the error carries the union of accepted
    /// methods for the 405 Allow header.
    pub fn match_path(&self, path: &str, method: &Method) -> Result<(usize, PathArgs), MatchError> {
        let mut allowed: Vec<Method> = Vec::new();

        for (index, (rule, methods)) in self.entries.iter().enumerate() {
            let Some(args) = rule.matches(path) else {
                continue;
            };
            match methods {
                None => return Ok((index, args)),
                Some(accepted) => {
                    if accepted.contains(method)
                        || (*method == Method::HEAD && accepted.contains(&Method::GET))
                    {
                        return Ok((index, args));
                    }
                    for method in accepted {
                        if !allowed.contains(method) {
                            allowed.push(method.clone());
                        }
                    }
                }
            }
        }

        if allowed.is_empty() {
            Err(MatchError::NotFound)
        } else {
            Err(MatchError::MethodNotAllowed { allowed })
        }
    }
}
