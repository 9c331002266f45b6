//! Read interface over the performance-data backend.
//!
//! Panels work against this trait rather than a concrete HTTP client, which
//! keeps them testable with an in-memory source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::ApiError;
use crate::domain::models::{
    AshReport, AwrReport, AwrSnapshot, BugMatch, Deadlock, Envelope, ExecutionPlan, PageQuery,
    PlanComparison, Recommendation, SlowQuery, WaitEvent,
};

/// Common result type for backend reads.
pub type ApiResult<T> = Result<T, ApiError>;

/// Paginated, filterable reads over the tuning data the UI consumes.
///
/// All endpoints are plain GETs returning JSON envelopes; the backend is
/// treated as an already-correct data source.
#[async_trait]
pub trait TelemetrySource {
    async fn slow_queries(
        &self,
        page: &PageQuery,
        min_elapsed_secs: Option<f64>,
    ) -> ApiResult<Envelope<Vec<SlowQuery>>>;

    async fn execution_plan(&self, sql_id: &str) -> ApiResult<ExecutionPlan>;

    async fn wait_events(&self, page: &PageQuery) -> ApiResult<Envelope<Vec<WaitEvent>>>;

    async fn bug_matches(&self, page: &PageQuery) -> ApiResult<Envelope<Vec<BugMatch>>>;

    async fn recommendations(&self, page: &PageQuery) -> ApiResult<Envelope<Vec<Recommendation>>>;

    async fn awr_snapshots(&self, page: &PageQuery) -> ApiResult<Envelope<Vec<AwrSnapshot>>>;

    async fn awr_report(&self, begin_snap: u64, end_snap: u64) -> ApiResult<AwrReport>;

    async fn ash_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ApiResult<AshReport>;

    async fn compare_plans(
        &self,
        sql_id: &str,
        baseline_hash: u64,
        current_hash: u64,
    ) -> ApiResult<PlanComparison>;

    async fn deadlocks(&self, page: &PageQuery) -> ApiResult<Envelope<Vec<Deadlock>>>;
}
