//! Query type to URL path mapping.
//!
//! A logical query type (`repository`, `user`) maps to a path template
//! with named `:placeholder` segments. Templates are parsed into typed
//! segments when registered, so a malformed template fails at source
//! construction instead of on the first request that touches it.

use crate::error::{Result, SourceError};
use std::collections::BTreeMap;

/// Fields carried by a read request, keyed by placeholder name.
pub type RequestFields = BTreeMap<String, String>;

/// The one placeholder that may go unfilled: its segment is elided.
pub const ACTION_FIELD: &str = "_action";

/// Built-in query types and their path templates.
const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    ("repository", "/repos/:owner/:repo/:_action"),
    ("user", "/users/:user/:_action"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed URL path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template string.
    ///
    /// Templates must start with `/`. Placeholders are whole path segments
    /// starting with `:`, named with ASCII alphanumerics and underscores.
    ///
    /// # Errors
    /// Returns an error for relative templates and malformed placeholders.
    pub fn parse(raw: &str) -> Result<Self> {
        if !raw.starts_with('/') {
            return Err(SourceError::Template {
                template: raw.to_string(),
                message: "template must start with '/'".to_string(),
            });
        }

        let mut segments = Vec::new();
        for part in raw.split('/') {
            if let Some(name) = part.strip_prefix(':') {
                if name.is_empty()
                    || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(SourceError::Template {
                        template: raw.to_string(),
                        message: format!("invalid placeholder ':{name}'"),
                    });
                }
                segments.push(Segment::Placeholder(name.to_string()));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The original template string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in order of appearance.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Substitute placeholders from the request fields.
    ///
    /// An absent or empty `_action` drops its segment entirely, so
    /// `/repos/:owner/:repo/:_action` resolves to `/repos/acme/widget`
    /// when no action is requested. Any other unsatisfied placeholder is
    /// an error; a resolved path never carries placeholder residue.
    ///
    /// # Errors
    /// Returns an error when a non-action placeholder has no value.
    pub fn resolve(&self, fields: &RequestFields) -> Result<String> {
        let mut parts = Vec::with_capacity(self.segments.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => parts.push(text.as_str()),
                Segment::Placeholder(name) => {
                    let value = fields
                        .get(name)
                        .map(String::as_str)
                        .filter(|v| !v.is_empty());
                    match value {
                        Some(value) => parts.push(value),
                        None if name == ACTION_FIELD => {}
                        None => {
                            return Err(SourceError::Template {
                                template: self.raw.clone(),
                                message: format!("no value for placeholder ':{name}'"),
                            });
                        }
                    }
                }
            }
        }

        Ok(parts.join("/"))
    }
}

/// Registered query types and their parsed templates.
#[derive(Debug, Clone)]
pub struct QueryTypeMap {
    templates: BTreeMap<String, PathTemplate>,
}

impl QueryTypeMap {
    /// Map with no registered query types.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            templates: BTreeMap::new(),
        }
    }

    /// Register a query type.
    ///
    /// # Errors
    /// Returns an error if the template cannot be parsed.
    pub fn register(&mut self, query_type: impl Into<String>, template: &str) -> Result<()> {
        let parsed = PathTemplate::parse(template)?;
        self.templates.insert(query_type.into(), parsed);
        Ok(())
    }

    /// Template for a query type.
    #[must_use]
    pub fn get(&self, query_type: &str) -> Option<&PathTemplate> {
        self.templates.get(query_type)
    }

    /// Whether a query type is registered.
    #[must_use]
    pub fn contains(&self, query_type: &str) -> bool {
        self.templates.contains_key(query_type)
    }

    /// Number of registered query types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no query types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for QueryTypeMap {
    /// The built-in `repository` and `user` mappings.
    fn default() -> Self {
        let mut map = Self::empty();
        for (query_type, template) in DEFAULT_TEMPLATES {
            map.register(*query_type, template)
                .expect("built-in path template is valid");
        }
        map
    }
}
