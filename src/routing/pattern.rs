//! Route template compiler
//!
//! Templates are literal paths with `:name` placeholders, e.g.
//! `/users/:id/posts/:post`. A placeholder captures one non-empty path
//! segment. The compiled matcher is anchored at the start of the path and
//! accepts the template followed either by the end of the path or by further
//! segments, so `/users` also matches `/users/42`.

use crate::error::PatternError;
use regex::Regex;
use std::collections::HashMap;

/// Compiled form of a route template
#[derive(Debug, Clone)]
pub struct Matcher {
    template: String,
    regex: Regex,
    param_names: Vec<String>,
}

impl Matcher {
    /// Compile a template into a matcher
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let (pattern, param_names) = to_regex(template)?;
        let regex = Regex::new(&pattern).map_err(|source| PatternError::Regex {
            template: template.to_string(),
            source,
        })?;

        Ok(Self {
            template: template.to_string(),
            regex,
            param_names,
        })
    }

    /// Whether `path` is accepted by this template
    pub fn test(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Named parameters captured from `path`; empty when it does not match
    pub fn extract_params(&self, path: &str) -> HashMap<String, String> {
        let Some(caps) = self.regex.captures(path) else {
            return HashMap::new();
        };
        self.param_names
            .iter()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect()
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }
}

fn to_regex(template: &str) -> Result<(String, Vec<String>), PatternError> {
    // "/users/" and "/users" describe the same family of paths
    let trimmed = template.trim_end_matches('/');

    let mut pattern = String::from("^");
    let mut param_names = Vec::new();
    let mut chars = trimmed.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ':' {
            pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
            continue;
        }

        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next == '/' {
                break;
            }
            name.push(next);
            chars.next();
        }

        if name.is_empty() {
            return Err(PatternError::EmptyParam(template.to_string()));
        }
        let valid = name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
            && !name.starts_with(|ch: char| ch.is_ascii_digit());
        if !valid {
            return Err(PatternError::InvalidParam {
                template: template.to_string(),
                name,
            });
        }

        pattern.push_str(&format!("(?P<{name}>[^/]+)"));
        param_names.push(name);
    }

    pattern.push_str("(?:/.*)?$");
    Ok((pattern, param_names))
}
