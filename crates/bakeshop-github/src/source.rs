//! The GitHub datasource: logical reads over the v3 REST API.
//!
//! [`GithubSource`] answers find-style reads the way an ORM datasource
//! would: a query type plus a string field map goes in, keyed records come
//! out. Behind that surface it resolves the path template, consults the
//! response cache, throttles fresh fetches, and classifies what GitHub
//! sent back. Application-level problems (missing resource, non-JSON body,
//! error payload) are soft failures carried in the [`ReadOutcome`];
//! transport faults are the only hard errors.

use crate::cache::{CachedPayload, ResponseCache};
use crate::config::GithubConfig;
use crate::error::{Result, SourceError};
use crate::record::{NormalizedRecord, normalize};
use crate::template::{ACTION_FIELD, QueryTypeMap, RequestFields};
use crate::transport::{ApiTransport, HttpTransport, RawResponse};
use bakeshop_core::{inflect, json};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use http::StatusCode;
use nonzero_ext::nonzero;
use sonic_rs::{JsonValueTrait, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use url::Url;

/// Logical tables this datasource answers for, in listing order.
pub const SOURCES: [&str; 4] = ["githubs", "issues", "repositories", "users"];

/// Find-option keys that belong to the host ORM, never to the API.
pub const ORM_ONLY_FIELDS: [&str; 9] = [
    "callbacks",
    "conditions",
    "fields",
    "group",
    "joins",
    "limit",
    "offset",
    "order",
    "page",
];

/// Column map for a logical table. The datasource itself is schema-less,
/// so these stay empty; typed shapes live in the record layer.
pub type Schema = BTreeMap<String, String>;

type Throttle = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// What went wrong with an otherwise-completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The resource does not exist (HTTP 404).
    NotFound,
    /// The body was empty or not JSON.
    MalformedResponse,
    /// GitHub answered with an `error` payload.
    Api,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::NotFound => "not found",
            Self::MalformedResponse => "malformed response",
            Self::Api => "api error",
        };
        f.write_str(label)
    }
}

/// A soft failure recorded for a completed request.
///
/// These ride inside [`ReadOutcome`] and the response cache rather than
/// the error channel, so a failed read is replayed from cache exactly like
/// a successful one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// Classification of the failure.
    pub kind: FailureKind,
    /// Human-readable detail, e.g. the reason phrase or API message.
    pub message: String,
}

impl FetchFailure {
    /// Missing resource, with the reason phrase GitHub sent.
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::NotFound,
            message: reason.into(),
        }
    }

    /// Empty or undecodable body.
    #[must_use]
    pub fn malformed() -> Self {
        Self {
            kind: FailureKind::MalformedResponse,
            message: "response was not JSON".to_string(),
        }
    }

    /// Error payload from the API itself.
    pub fn api(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Api,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Result of a logical read: records, or the failure that stopped them.
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    /// Normalized records, possibly empty.
    Records(Vec<NormalizedRecord>),
    /// The request completed but the payload was unusable.
    Failed(FetchFailure),
}

impl ReadOutcome {
    /// The records, empty when the read failed.
    #[must_use]
    pub fn records(&self) -> &[NormalizedRecord] {
        match self {
            Self::Records(records) => records,
            Self::Failed(_) => &[],
        }
    }

    /// Consume the outcome, keeping only the records.
    #[must_use]
    pub fn into_records(self) -> Vec<NormalizedRecord> {
        match self {
            Self::Records(records) => records,
            Self::Failed(_) => Vec::new(),
        }
    }

    /// The failure, when there was one.
    #[must_use]
    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            Self::Records(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    /// Whether the read ended in a soft failure.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A finder lifecycle call carrying its payload.
///
/// Custom finders run in phases; this datasource has no per-phase
/// behavior, so [`dispatch`] hands every payload back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinderCall<T> {
    /// The query is about to run.
    Before(T),
    /// Results are ready.
    After(T),
    /// Any other lifecycle phase.
    Other(T),
}

/// Pass a finder lifecycle payload through untouched.
#[must_use]
pub fn dispatch<T>(call: FinderCall<T>) -> T {
    match call {
        FinderCall::Before(payload) | FinderCall::After(payload) | FinderCall::Other(payload) => {
            payload
        }
    }
}

/// Counters for datasource activity.
#[derive(Debug, Default)]
pub struct SourceStats {
    /// Logical reads answered.
    pub reads: AtomicU64,
    /// Fresh HTTP fetches issued.
    pub fetches: AtomicU64,
    /// Reads that ended in a soft failure.
    pub failures: AtomicU64,
}

impl SourceStats {
    /// One-line summary for logs.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Source: {} reads, {} fetches, {} failed reads",
            self.reads.load(Ordering::Relaxed),
            self.fetches.load(Ordering::Relaxed),
            self.failures.load(Ordering::Relaxed)
        )
    }
}

/// Read-only GitHub datasource with caching and throttling built in.
pub struct GithubSource<T: ApiTransport = HttpTransport> {
    config: GithubConfig,
    transport: T,
    templates: QueryTypeMap,
    schemas: BTreeMap<String, Schema>,
    cache: ResponseCache,
    throttle: Option<Throttle>,
    stats: SourceStats,
}

impl<T: ApiTransport> std::fmt::Debug for GithubSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubSource")
            .field("host", &self.config.host)
            .field("query_types", &self.templates.len())
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl GithubSource<HttpTransport> {
    /// Create a datasource backed by a real HTTP client.
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(config: GithubConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: ApiTransport> GithubSource<T> {
    /// Create a datasource over an arbitrary transport.
    pub fn with_transport(config: GithubConfig, transport: T) -> Self {
        let cache = ResponseCache::new(config.cache_ttl, config.cache_prefix.clone());
        let throttle = (!config.throttle.is_zero()).then(|| {
            let quota = Quota::with_period(config.throttle)
                .unwrap_or_else(|| Quota::per_second(nonzero!(1u32)));
            RateLimiter::direct(quota)
        });
        let schemas = SOURCES
            .iter()
            .map(|table| ((*table).to_string(), Schema::new()))
            .collect();
        Self {
            config,
            transport,
            templates: QueryTypeMap::default(),
            schemas,
            cache,
            throttle,
            stats: SourceStats::default(),
        }
    }

    /// Register an extra query type with its path template.
    ///
    /// # Errors
    /// Returns an error when the template does not parse.
    pub fn with_mapping(mut self, query_type: impl Into<String>, template: &str) -> Result<Self> {
        self.templates.register(query_type, template)?;
        Ok(self)
    }

    /// The logical tables this datasource answers for.
    #[must_use]
    pub fn list_sources(&self) -> Vec<&'static str> {
        SOURCES.to_vec()
    }

    /// Column map for a model alias. Always empty; the datasource carries
    /// no column metadata of its own.
    #[must_use]
    pub fn describe(&self, alias: &str) -> Schema {
        self.schemas
            .get(&inflect::tableize(alias))
            .cloned()
            .unwrap_or_default()
    }

    /// Run a logical read.
    ///
    /// An unregistered query type answers with empty records. ORM-only
    /// keys are stripped from the field map before the path template is
    /// resolved; an absent or empty `_action` drops the trailing action
    /// segment. The classified payload is normalized into keyed records.
    ///
    /// # Errors
    /// Returns an error for transport faults and for templates left with
    /// unsatisfied placeholders. Application-level failures come back as
    /// [`ReadOutcome::Failed`] instead.
    pub async fn read(&self, query_type: &str, mut fields: RequestFields) -> Result<ReadOutcome> {
        self.stats.reads.fetch_add(1, Ordering::Relaxed);

        let Some(template) = self.templates.get(query_type) else {
            debug!(query_type, "no path template registered, empty read");
            return Ok(ReadOutcome::Records(Vec::new()));
        };

        strip_orm_fields(&mut fields);
        let action = fields
            .get(ACTION_FIELD)
            .filter(|value| !value.is_empty())
            .cloned();
        let path = template.resolve(&fields)?;

        match self.request(&path, None).await? {
            CachedPayload::Json(payload) => {
                let records = normalize(query_type, action.as_deref(), &payload);
                debug!(query_type, count = records.len(), "read normalized");
                Ok(ReadOutcome::Records(records))
            }
            CachedPayload::Failed(failure) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                debug!(query_type, kind = %failure.kind, "read ended in failure");
                Ok(ReadOutcome::Failed(failure))
            }
        }
    }

    /// Cached GET for an API path outside the query-type map.
    ///
    /// The cache key covers the path plus the optional suffix, so callers
    /// paging through a resource can keep distinct entries per page.
    ///
    /// # Errors
    /// Returns an error for transport faults; classified failures are
    /// cached and returned as payloads.
    pub async fn request(&self, path: &str, suffix: Option<&str>) -> Result<CachedPayload> {
        let key = self.cache.key(path, suffix);
        self.cache.remember(&key, self.fetch(path)).await
    }

    async fn fetch(&self, path: &str) -> Result<CachedPayload> {
        if let Some(throttle) = &self.throttle {
            throttle.until_ready().await;
        }
        self.stats.fetches.fetch_add(1, Ordering::Relaxed);

        let url = self.request_url(path)?;
        debug!(url = %url, "fetching from GitHub");
        let response = self.transport.get(&url).await?;

        let payload = classify(&response);
        if let CachedPayload::Failed(failure) = &payload {
            warn!(path, kind = %failure.kind, "GitHub request failed: {}", failure.message);
        }
        Ok(payload)
    }

    fn request_url(&self, path: &str) -> Result<Url> {
        let raw = format!("https://{}{}", self.config.host, path);
        let mut url = Url::parse(&raw).map_err(|e| SourceError::InvalidUrl {
            url: raw,
            message: e.to_string(),
        })?;
        if let Some(token) = &self.config.token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        Ok(url)
    }

    /// Datasource configuration.
    #[must_use]
    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    /// The response cache, for inspection and eviction.
    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Activity counters.
    #[must_use]
    pub fn stats(&self) -> &SourceStats {
        &self.stats
    }
}

/// Turn a raw response into a payload or a soft failure.
fn classify(response: &RawResponse) -> CachedPayload {
    if response.status == StatusCode::NOT_FOUND {
        let reason = response
            .reason
            .clone()
            .unwrap_or_else(|| "Not Found".to_string());
        return CachedPayload::Failed(FetchFailure::not_found(reason));
    }

    let body = response.body.trim();
    if body.is_empty() {
        return CachedPayload::Failed(FetchFailure::malformed());
    }
    let Ok(payload) = json::from_json::<Value>(body) else {
        return CachedPayload::Failed(FetchFailure::malformed());
    };

    if let Some(error) = payload.get("error") {
        let message = error.as_str().map_or_else(
            || sonic_rs::to_string(error).unwrap_or_default(),
            str::to_string,
        );
        return CachedPayload::Failed(FetchFailure::api(message));
    }

    CachedPayload::Json(payload)
}

/// Drop field keys that configure the host ORM rather than the request.
fn strip_orm_fields(fields: &mut RequestFields) {
    for key in ORM_ONLY_FIELDS {
        fields.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct MockTransport {
        responses: HashMap<String, (StatusCode, String)>,
        calls: Arc<AtomicU64>,
        seen: Arc<Mutex<Vec<Url>>>,
    }

    impl MockTransport {
        fn with_responses(entries: &[(&str, StatusCode, &str)]) -> Self {
            let responses = entries
                .iter()
                .map(|(path, status, body)| ((*path).to_string(), (*status, (*body).to_string())))
                .collect();
            Self {
                responses,
                calls: Arc::new(AtomicU64::new(0)),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> Arc<AtomicU64> {
            Arc::clone(&self.calls)
        }

        fn seen(&self) -> Arc<Mutex<Vec<Url>>> {
            Arc::clone(&self.seen)
        }
    }

    impl ApiTransport for MockTransport {
        fn get<'a>(
            &'a self,
            url: &'a Url,
        ) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.seen.lock().unwrap().push(url.clone());
                match self.responses.get(url.path()) {
                    Some((status, body)) => Ok(RawResponse {
                        status: *status,
                        reason: status.canonical_reason().map(str::to_owned),
                        body: body.clone(),
                    }),
                    None => Err(SourceError::Network {
                        url: url.to_string(),
                        message: "connection refused".to_string(),
                    }),
                }
            })
        }
    }

    fn quiet_config() -> GithubConfig {
        GithubConfig::default().with_throttle(Duration::ZERO)
    }

    fn source_for(
        entries: &[(&str, StatusCode, &str)],
    ) -> (GithubSource<MockTransport>, Arc<AtomicU64>) {
        let transport = MockTransport::with_responses(entries);
        let calls = transport.calls();
        (GithubSource::with_transport(quiet_config(), transport), calls)
    }

    fn repo_fields(action: Option<&str>) -> RequestFields {
        let mut fields = RequestFields::new();
        fields.insert("owner".to_string(), "acme".to_string());
        fields.insert("repo".to_string(), "widget".to_string());
        if let Some(action) = action {
            fields.insert(ACTION_FIELD.to_string(), action.to_string());
        }
        fields
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_wraps_each_array_element() {
        let (source, _) = source_for(&[(
            "/repos/acme/widget/forks",
            StatusCode::OK,
            r#"[{"name":"fork-a"},{"name":"fork-b"}]"#,
        )]);

        let outcome = source
            .read("repository", repo_fields(Some("forks")))
            .await
            .unwrap();

        assert!(!outcome.is_failed());
        let records = outcome.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.model == "Fork"));
        assert_eq!(records[0].fields.get("name").as_str(), Some("fork-a"));
        assert_eq!(records[1].fields.get("name").as_str(), Some("fork-b"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_without_action_wraps_payload_once() {
        let (source, _) = source_for(&[(
            "/repos/acme/widget",
            StatusCode::OK,
            r#"{"name":"widget","fork":false}"#,
        )]);

        let outcome = source.read("repository", repo_fields(None)).await.unwrap();

        let records = outcome.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].model, "Repository");
        assert_eq!(records[0].fields.get("name").as_str(), Some("widget"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_resource_is_a_soft_failure() {
        let (source, _) = source_for(&[("/repos/acme/widget", StatusCode::NOT_FOUND, "")]);

        let outcome = source.read("repository", repo_fields(None)).await.unwrap();

        assert!(outcome.is_failed());
        assert!(outcome.records().is_empty());
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::NotFound);
        assert_eq!(failure.message, "Not Found");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn repeat_reads_hit_the_cache() {
        let (source, calls) = source_for(&[(
            "/repos/acme/widget/forks",
            StatusCode::OK,
            r#"[{"name":"fork-a"}]"#,
        )]);

        let first = source
            .read("repository", repo_fields(Some("forks")))
            .await
            .unwrap();
        let second = source
            .read("repository", repo_fields(Some("forks")))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            sonic_rs::to_string(&first.records()).unwrap(),
            sonic_rs::to_string(&second.records()).unwrap()
        );
        assert_eq!(source.stats().reads.load(Ordering::Relaxed), 2);
        assert_eq!(source.stats().fetches.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failures_are_cached_like_payloads() {
        let (source, calls) = source_for(&[("/repos/acme/widget", StatusCode::NOT_FOUND, "")]);

        let first = source.read("repository", repo_fields(None)).await.unwrap();
        let second = source.read("repository", repo_fields(None)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(first.is_failed());
        assert!(second.is_failed());
        assert_eq!(source.stats().failures.load(Ordering::Relaxed), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transport_faults_are_hard_and_never_cached() {
        let (source, calls) = source_for(&[]);

        assert!(source.read("repository", repo_fields(None)).await.is_err());
        assert!(source.read("repository", repo_fields(None)).await.is_err());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(source.cache().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_query_type_reads_empty() {
        let (source, calls) = source_for(&[]);

        let outcome = source.read("gists", repo_fields(None)).await.unwrap();

        assert!(!outcome.is_failed());
        assert!(outcome.records().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn custom_mapping_keeps_the_repository_fixup() {
        let transport = MockTransport::with_responses(&[(
            "/repositories/7",
            StatusCode::OK,
            r#"{"name":"widget"}"#,
        )]);
        let source = GithubSource::with_transport(quiet_config(), transport)
            .with_mapping("repos", "/repositories/:id")
            .unwrap();

        let mut fields = RequestFields::new();
        fields.insert("id".to_string(), "7".to_string());
        let outcome = source.read("repos", fields).await.unwrap();

        assert_eq!(outcome.records()[0].model, "Repository");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn error_payload_is_an_api_failure() {
        let (source, _) = source_for(&[(
            "/repos/acme/widget",
            StatusCode::OK,
            r#"{"error":"Bad credentials"}"#,
        )]);

        let outcome = source.read("repository", repo_fields(None)).await.unwrap();

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Api);
        assert_eq!(failure.message, "Bad credentials");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_json_body_is_malformed() {
        let (source, _) = source_for(&[(
            "/repos/acme/widget",
            StatusCode::OK,
            "<html>rate limited</html>",
        )]);

        let outcome = source.read("repository", repo_fields(None)).await.unwrap();

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::MalformedResponse);
        assert_eq!(failure.message, "response was not JSON");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn token_rides_the_query_string() {
        let transport =
            MockTransport::with_responses(&[("/users/octocat", StatusCode::OK, r#"{"id":1}"#)]);
        let seen = transport.seen();
        let source =
            GithubSource::with_transport(quiet_config().with_token("sekrit"), transport);

        let mut fields = RequestFields::new();
        fields.insert("user".to_string(), "octocat".to_string());
        source.read("user", fields).await.unwrap();

        let urls = seen.lock().unwrap();
        let pair = urls[0]
            .query_pairs()
            .find(|(name, _)| name == "access_token");
        assert_eq!(pair, Some(("access_token".into(), "sekrit".into())));
    }

    #[test]
    fn describe_answers_empty_for_every_alias() {
        let (source, _) = source_for(&[]);

        assert!(source.describe("Github").is_empty());
        assert!(source.describe("Repository").is_empty());
        assert!(source.describe("NoSuchModel").is_empty());
        assert_eq!(source.list_sources(), SOURCES.to_vec());
    }

    #[test]
    fn dispatch_passes_payloads_through() {
        assert_eq!(dispatch(FinderCall::Before(7)), 7);
        assert_eq!(dispatch(FinderCall::After("results")), "results");
        assert_eq!(dispatch(FinderCall::Other(vec![1, 2])), vec![1, 2]);
    }

    #[test]
    fn orm_keys_are_stripped_request_keys_kept() {
        let mut fields = RequestFields::new();
        for key in ORM_ONLY_FIELDS {
            fields.insert(key.to_string(), "set".to_string());
        }
        fields.insert("owner".to_string(), "acme".to_string());

        strip_orm_fields(&mut fields);

        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("owner"));
    }

    #[test]
    fn classify_falls_back_to_a_reason_phrase() {
        let response = RawResponse {
            status: StatusCode::NOT_FOUND,
            reason: None,
            body: String::new(),
        };
        match classify(&response) {
            CachedPayload::Failed(failure) => assert_eq!(failure.message, "Not Found"),
            CachedPayload::Json(_) => panic!("404 must classify as a failure"),
        }
    }

    #[test]
    fn classify_keeps_structured_error_payloads() {
        let response = RawResponse {
            status: StatusCode::OK,
            reason: Some("OK".to_string()),
            body: r#"{"error":{"code":42}}"#.to_string(),
        };
        match classify(&response) {
            CachedPayload::Failed(failure) => {
                assert_eq!(failure.kind, FailureKind::Api);
                assert!(failure.message.contains("42"));
            }
            CachedPayload::Json(_) => panic!("error payload must classify as a failure"),
        }
    }

    #[test]
    fn summary_reports_counters() {
        let stats = SourceStats::default();
        stats.reads.fetch_add(3, Ordering::Relaxed);
        stats.fetches.fetch_add(1, Ordering::Relaxed);
        assert_eq!(stats.summary(), "Source: 3 reads, 1 fetches, 0 failed reads");
    }
}
