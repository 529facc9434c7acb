//! The filter pipeline: fetch, adapt, compile, evaluate, partition, render.
//!
//! A [`Pipeline`] is cheap to clone and safe to share across concurrent
//! requests. The only state it shares between requests is the read-only
//! [`Environment`].
//!
//! Per-item evaluation faults never abort a batch on their own. What happens
//! to a faulting item is decided by the pipeline's
//! [`EvaluationErrorHandler`]; the default logs the fault and excludes the
//! item.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use feedsift_expr::{CompileError, Environment, EvaluationError, Evaluator, Item, Program};
use feedsift_feed::{
    adapt_all, fetch_within, render, EncodingError, FeedSource, FetchError, OutputFormat, RawEntry,
    RawFeed, DEFAULT_TIMEOUT,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// The expression used when a request supplies none.
pub const MATCH_ALL: &str = "true";

/// Errors that abort one filtering request.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The feed could not be fetched or parsed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The expression did not compile.
    #[error("invalid expression: {0}")]
    Compile(#[from] CompileError),

    /// An item failed to evaluate and the error handler chose to abort.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// The filtered feed could not be serialized.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// What to do with an item whose evaluation faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Exclude the item and keep going.
    Exclude,
    /// Stop the batch and fail the request.
    Abort,
}

/// Decides the fate of items whose evaluation faulted.
pub trait EvaluationErrorHandler: Send + Sync {
    fn handle(&self, error: &EvaluationError) -> ErrorAction;
}

/// Logs the fault at WARN and excludes the item.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAndExclude;

impl EvaluationErrorHandler for LogAndExclude {
    fn handle(&self, error: &EvaluationError) -> ErrorAction {
        warn!(item = %error.item, fault = %error.fault, "excluding item that failed to evaluate");
        ErrorAction::Exclude
    }
}

/// Fails the whole batch on the first fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnError;

impl EvaluationErrorHandler for AbortOnError {
    fn handle(&self, _error: &EvaluationError) -> ErrorAction {
        ErrorAction::Abort
    }
}

/// An order-preserving partition of a batch.
///
/// Every input element lands in exactly one of `included` or `excluded`.
/// Elements whose evaluation faulted are excluded, and their errors are kept
/// in `errors` in the order they occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult<T> {
    pub included: Vec<T>,
    pub excluded: Vec<T>,
    pub errors: Vec<EvaluationError>,
}

impl<T> FilterResult<T> {
    /// Number of elements partitioned.
    pub fn total(&self) -> usize {
        self.included.len() + self.excluded.len()
    }
}

impl<T> Default for FilterResult<T> {
    fn default() -> Self {
        Self {
            included: Vec::new(),
            excluded: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// How one item fared under an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Included,
    Excluded,
    /// Evaluation faulted and the item was excluded.
    Failed(EvaluationError),
}

impl Outcome {
    /// Evaluates one item, routing a fault through `handler`.
    ///
    /// # Errors
    ///
    /// Returns the fault if `handler` chose [`ErrorAction::Abort`].
    pub fn decide(
        evaluator: &Evaluator<'_>,
        item: &Item,
        handler: &dyn EvaluationErrorHandler,
    ) -> Result<Self, EvaluationError> {
        match evaluator.evaluate(item) {
            Ok(true) => Ok(Outcome::Included),
            Ok(false) => Ok(Outcome::Excluded),
            Err(error) => match handler.handle(&error) {
                ErrorAction::Exclude => Ok(Outcome::Failed(error)),
                ErrorAction::Abort => Err(error),
            },
        }
    }
}

/// Evaluates `program` against every item, partitioning the paired values.
///
/// All items are evaluated against the same `now`.
///
/// # Errors
///
/// Returns the first [`EvaluationError`] for which `handler` chose
/// [`ErrorAction::Abort`].
pub fn partition<T>(
    program: &Program,
    batch: impl IntoIterator<Item = (Item, T)>,
    now: DateTime<Utc>,
    handler: &dyn EvaluationErrorHandler,
) -> Result<FilterResult<T>, EvaluationError> {
    let evaluator = Evaluator::new(program, now);
    let mut result = FilterResult::default();

    for (item, value) in batch {
        match Outcome::decide(&evaluator, &item, handler)? {
            Outcome::Included => result.included.push(value),
            Outcome::Excluded => result.excluded.push(value),
            Outcome::Failed(error) => {
                result.excluded.push(value);
                result.errors.push(error);
            }
        }
    }

    Ok(result)
}

/// Evaluates `program` against every item, pairing each with its outcome in
/// item order.
///
/// # Errors
///
/// Returns the first [`EvaluationError`] for which `handler` chose
/// [`ErrorAction::Abort`].
pub fn outcomes<'a>(
    program: &Program,
    items: &'a [Item],
    now: DateTime<Utc>,
    handler: &dyn EvaluationErrorHandler,
) -> Result<Vec<(&'a Item, Outcome)>, EvaluationError> {
    let evaluator = Evaluator::new(program, now);
    items
        .iter()
        .map(|item| Ok((item, Outcome::decide(&evaluator, item, handler)?)))
        .collect()
}

/// One filtering request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRequest {
    /// Feed URL (or path, for sources that read files).
    pub url: String,
    /// Filter expression; absent or blank matches everything.
    pub expression: Option<String>,
    pub format: OutputFormat,
}

impl FilterRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expression: None,
            format: OutputFormat::default(),
        }
    }

    #[must_use]
    pub fn expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// The outcome of a successful request.
#[derive(Debug, Clone)]
pub struct FilterResponse {
    pub format: OutputFormat,
    /// The rendered feed holding only the included entries.
    pub body: String,
    pub total: usize,
    pub included: usize,
    pub excluded: usize,
    /// Evaluation faults that excluded items.
    pub errors: Vec<EvaluationError>,
}

impl FilterResponse {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Runs filtering requests.
#[derive(Clone)]
pub struct Pipeline {
    env: Arc<Environment>,
    source: Arc<dyn FeedSource>,
    deadline: Duration,
    handler: Arc<dyn EvaluationErrorHandler>,
}

impl Pipeline {
    /// Creates a pipeline that logs and excludes faulting items.
    pub fn new(env: Arc<Environment>, source: Arc<dyn FeedSource>) -> Self {
        Self {
            env,
            source,
            deadline: DEFAULT_TIMEOUT,
            handler: Arc::new(LogAndExclude),
        }
    }

    /// Sets the deadline for fetching the feed.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Replaces the per-item error handler.
    #[must_use]
    pub fn with_error_handler(mut self, handler: Arc<dyn EvaluationErrorHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn error_handler(&self) -> Arc<dyn EvaluationErrorHandler> {
        Arc::clone(&self.handler)
    }

    /// Compiles an expression; absent or blank compiles to [`MATCH_ALL`].
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] for an invalid expression.
    pub fn compile(&self, expression: Option<&str>) -> Result<Program, CompileError> {
        let source = match expression.map(str::trim) {
            Some(source) if !source.is_empty() => source,
            _ => MATCH_ALL,
        };
        self.env.compile(source)
    }

    /// Fetches a feed within the pipeline's deadline.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`]; nothing is retried.
    pub async fn fetch(&self, location: &str) -> Result<RawFeed, FetchError> {
        fetch_within(self.source.as_ref(), location, self.deadline).await
    }

    /// Adapts and filters entries, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] only if the error handler aborts.
    pub fn filter(
        &self,
        program: &Program,
        entries: Vec<RawEntry>,
        now: DateTime<Utc>,
    ) -> Result<FilterResult<RawEntry>, EvaluationError> {
        let items = adapt_all(&entries);
        partition(
            program,
            items.into_iter().zip(entries),
            now,
            self.handler.as_ref(),
        )
    }

    /// Evaluates adapted items in order through the pipeline's error handler.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] only if the error handler aborts.
    pub fn outcomes<'a>(
        &self,
        program: &Program,
        items: &'a [Item],
        now: DateTime<Utc>,
    ) -> Result<Vec<(&'a Item, Outcome)>, EvaluationError> {
        outcomes(program, items, now, self.handler.as_ref())
    }

    /// Runs one request end to end.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] naming the stage that failed.
    pub async fn run(&self, request: &FilterRequest) -> Result<FilterResponse, PipelineError> {
        info!(url = %request.url, format = %request.format, "filtering feed");

        let feed = self.fetch(&request.url).await?;
        let program = self.compile(request.expression.as_deref())?;

        let now = Utc::now();
        let total = feed.entries.len();
        let result = self.filter(&program, feed.entries, now)?;
        debug!(
            total,
            included = result.included.len(),
            errors = result.errors.len(),
            "partitioned feed"
        );

        let body = render(&feed.meta, &result.included, request.format, now)?;

        Ok(FilterResponse {
            format: request.format,
            body,
            total,
            included: result.included.len(),
            excluded: result.excluded.len(),
            errors: result.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeDelta, TimeZone};
    use feedsift_feed::FeedMeta;

    struct StaticSource(RawFeed);

    #[async_trait]
    impl FeedSource for StaticSource {
        async fn fetch(&self, _location: &str) -> Result<RawFeed, FetchError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl FeedSource for FailingSource {
        async fn fetch(&self, location: &str) -> Result<RawFeed, FetchError> {
            Err(FetchError::Status {
                location: location.to_string(),
                status: 503,
            })
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn entry(title: &str) -> RawEntry {
        RawEntry {
            id: title.to_string(),
            link: Some(format!("https://example.com/{}", title)),
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn feed(entries: Vec<RawEntry>) -> RawFeed {
        RawFeed {
            meta: FeedMeta {
                title: Some("Test".to_string()),
                ..Default::default()
            },
            entries,
        }
    }

    fn pipeline(source: impl FeedSource + 'static) -> Pipeline {
        Pipeline::new(Arc::new(Environment::new().unwrap()), Arc::new(source))
    }

    fn titles(entries: &[RawEntry]) -> Vec<&str> {
        entries
            .iter()
            .map(|e| e.title.as_deref().unwrap_or_default())
            .collect()
    }

    // ==================== Partition ====================

    #[test]
    fn test_partition_preserves_order() {
        let p = pipeline(FailingSource);
        let program = p
            .compile(Some(r#"item.Title.startsWith("keep")"#))
            .unwrap();
        let entries = ["keep-1", "drop-1", "keep-2", "drop-2", "keep-3"]
            .into_iter()
            .map(entry)
            .collect();

        let result = p.filter(&program, entries, now()).unwrap();

        assert_eq!(titles(&result.included), vec!["keep-1", "keep-2", "keep-3"]);
        assert_eq!(titles(&result.excluded), vec!["drop-1", "drop-2"]);
        assert_eq!(result.total(), 5);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_faulting_items_are_excluded_and_recorded() {
        let p = pipeline(FailingSource);
        let program = p.compile(Some(r#"item.Author == "Rob""#)).unwrap();
        let mut by_rob = entry("by-rob");
        by_rob.authors = vec![feedsift_feed::RawPerson::new("Rob")];
        let entries = vec![entry("anonymous"), by_rob, entry("also-anonymous")];

        let result = p.filter(&program, entries, now()).unwrap();

        assert_eq!(titles(&result.included), vec!["by-rob"]);
        assert_eq!(titles(&result.excluded), vec!["anonymous", "also-anonymous"]);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].item, "https://example.com/anonymous");
    }

    #[test]
    fn test_abort_handler_stops_batch() {
        let p = pipeline(FailingSource).with_error_handler(Arc::new(AbortOnError));
        let program = p.compile(Some(r#"item.Author == "Rob""#)).unwrap();

        let err = p
            .filter(&program, vec![entry("anonymous")], now())
            .unwrap_err();

        assert_eq!(err.item, "https://example.com/anonymous");
    }

    #[test]
    fn test_outcomes_follow_item_order_and_handler() {
        let p = pipeline(FailingSource);
        let program = p.compile(Some(r#"item.Author == "Rob""#)).unwrap();
        let mut by_rob = entry("by-rob");
        by_rob.authors = vec![feedsift_feed::RawPerson::new("Rob")];
        let items = adapt_all(&[entry("anonymous"), by_rob]);

        let result = p.outcomes(&program, &items, now()).unwrap();

        assert!(matches!(result[0].1, Outcome::Failed(_)));
        assert_eq!(result[1].1, Outcome::Included);

        let aborting = p.with_error_handler(Arc::new(AbortOnError));
        let err = aborting.outcomes(&program, &items, now()).unwrap_err();
        assert_eq!(err.item, "https://example.com/anonymous");
    }

    #[test]
    fn test_empty_expression_matches_everything() {
        let p = pipeline(FailingSource);
        for expression in [None, Some(""), Some("   ")] {
            let program = p.compile(expression).unwrap();
            let entries: Vec<_> = (0..4).map(|n| entry(&n.to_string())).collect();
            let result = p.filter(&program, entries, now()).unwrap();
            assert_eq!(result.included.len(), 4);
            assert!(result.excluded.is_empty());
        }
    }

    #[test]
    fn test_batch_shares_one_now() {
        let p = pipeline(FailingSource);
        let program = p
            .compile(Some(r#"now - item.Published < duration("2h")"#))
            .unwrap();
        let mut fresh = entry("fresh");
        fresh.published = Some(now() - TimeDelta::hours(1));
        let mut stale = entry("stale");
        stale.published = Some(now() - TimeDelta::hours(3));

        let result = p.filter(&program, vec![fresh, stale], now()).unwrap();

        assert_eq!(titles(&result.included), vec!["fresh"]);
    }

    // ==================== Run ====================

    #[tokio::test]
    async fn test_run_renders_included_only() {
        let p = pipeline(StaticSource(feed(vec![entry("Go is great"), entry("Rust is safe")])));
        let request = FilterRequest::new("https://example.com/feed")
            .expression(r#"item.Title.contains("Rust")"#)
            .format(OutputFormat::Json);

        let response = p.run(&request).await.unwrap();

        assert_eq!(response.total, 2);
        assert_eq!(response.included, 1);
        assert_eq!(response.excluded, 1);
        assert_eq!(response.content_type(), "application/json");
        assert!(response.body.contains("Rust is safe"));
        assert!(!response.body.contains("Go is great"));
    }

    #[tokio::test]
    async fn test_run_fetch_failure_is_distinct() {
        let p = pipeline(FailingSource);
        let err = p
            .run(&FilterRequest::new("https://example.com/feed"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(FetchError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_run_compile_failure() {
        let p = pipeline(StaticSource(feed(vec![entry("a")])));
        let request = FilterRequest::new("x").expression("item.Title == 123");
        let err = p.run(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::Compile(_)));
    }

    #[tokio::test]
    async fn test_run_abort_surfaces_evaluation_error() {
        let p = pipeline(StaticSource(feed(vec![entry("a")])))
            .with_error_handler(Arc::new(AbortOnError));
        let request = FilterRequest::new("x").expression(r#"item.Content == "x""#);
        let err = p.run(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::Evaluation(_)));
    }
}
