//! Record normalization and the typed record layer.
//!
//! A read produces [`NormalizedRecord`]s: raw JSON fields wrapped under a
//! singular, capitalized model key. That keyed shape is what the host ORM
//! consumes. [`NormalizedRecord::into_domain`] lifts records further into
//! the typed GitHub shapes the directory actually works with, keeping the
//! API's variability at this edge.

use crate::error::{Result, SourceError};
use bakeshop_core::{inflect, json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sonic_rs::{JsonContainerTrait, Value};

/// A keyed record produced by a source read.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedRecord {
    /// Wrapping model key, singular and capitalized.
    pub model: String,
    /// Raw JSON fields for that model.
    pub fields: Value,
}

/// Wrap a decoded payload into keyed records.
///
/// With an action, every top-level element of the payload becomes one
/// record keyed by the action name; without one, the whole payload becomes
/// a single record keyed by the query type. Element order follows the
/// source document.
#[must_use]
pub fn normalize(query_type: &str, action: Option<&str>, payload: &Value) -> Vec<NormalizedRecord> {
    match action {
        Some(action) => {
            let model = model_name(action);
            elements(payload)
                .into_iter()
                .map(|fields| NormalizedRecord {
                    model: model.clone(),
                    fields,
                })
                .collect()
        }
        None => vec![NormalizedRecord {
            model: model_name(query_type),
            fields: payload.clone(),
        }],
    }
}

/// Model key for a raw source, query type, or action name.
///
/// Singularized and capitalized, with the GitHub shorthand `Repo` widened
/// to `Repository` so both `repos` and `repositories` land on one model.
#[must_use]
pub fn model_name(raw: &str) -> String {
    let singular = inflect::singularize(&inflect::camelize(raw));
    if singular == "Repo" {
        "Repository".to_string()
    } else {
        singular
    }
}

/// Top-level elements of a payload: array items, object member values in
/// document order, nothing for scalars.
fn elements(payload: &Value) -> Vec<Value> {
    if let Some(array) = payload.as_array() {
        array.iter().cloned().collect()
    } else if let Some(object) = payload.as_object() {
        object.iter().map(|(_, value)| value.clone()).collect()
    } else {
        Vec::new()
    }
}

/// GitHub v3 repository fields this directory consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubRepository {
    /// Numeric GitHub id.
    #[serde(default)]
    pub id: Option<u64>,
    /// Short repository name.
    pub name: String,
    /// `owner/name` form.
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub fork: Option<bool>,
    #[serde(default)]
    pub forks_count: Option<i64>,
    #[serde(default)]
    pub watchers_count: Option<i64>,
    #[serde(default)]
    pub open_issues_count: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Last push, the freshness signal the directory sorts on.
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub owner: Option<GithubUser>,
}

/// GitHub account fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubUser {
    #[serde(default)]
    pub id: Option<u64>,
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub blog: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub public_repos: Option<i64>,
    #[serde(default)]
    pub followers: Option<i64>,
    #[serde(default)]
    pub following: Option<i64>,
}

/// GitHub issue fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubIssue {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub number: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub comments: Option<i64>,
    #[serde(default)]
    pub user: Option<GithubUser>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

/// A normalized record lifted into the typed shapes the directory knows.
#[derive(Debug, Clone)]
pub enum DomainRecord {
    /// A repository.
    Repository(Box<GithubRepository>),
    /// An account.
    User(Box<GithubUser>),
    /// An issue.
    Issue(Box<GithubIssue>),
    /// Any model without a dedicated shape keeps its raw fields.
    Other {
        /// Model key.
        model: String,
        /// Raw JSON fields.
        fields: Value,
    },
}

impl NormalizedRecord {
    /// Lift the record into a typed domain shape.
    ///
    /// Models without a dedicated shape fall back to
    /// [`DomainRecord::Other`] rather than failing.
    ///
    /// # Errors
    /// Returns an error when the fields do not deserialize into the shape
    /// the model key promises.
    pub fn into_domain(self) -> Result<DomainRecord> {
        match self.model.as_str() {
            "Repository" => Ok(DomainRecord::Repository(Box::new(decode(
                &self.model,
                &self.fields,
            )?))),
            "User" => Ok(DomainRecord::User(Box::new(decode(
                &self.model,
                &self.fields,
            )?))),
            "Issue" => Ok(DomainRecord::Issue(Box::new(decode(
                &self.model,
                &self.fields,
            )?))),
            _ => Ok(DomainRecord::Other {
                model: self.model,
                fields: self.fields,
            }),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(model: &str, fields: &Value) -> Result<T> {
    let encoded = json::to_json(fields).map_err(|e| SourceError::Parse {
        source: model.to_string(),
        message: e.to_string(),
    })?;
    json::from_json(&encoded).map_err(|e| SourceError::Parse {
        source: model.to_string(),
        message: e.to_string(),
    })
}
