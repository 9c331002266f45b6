//! HTTP client for the performance-data REST endpoints.
//!
//! Thin wrappers over conventional paginated GETs; every response is a typed
//! envelope. A 401 invalidates the session context and surfaces as
//! [`ApiError::Unauthorized`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::errors::ApiError;
use crate::domain::models::{
    AshReport, AwrReport, AwrSnapshot, BugMatch, Deadlock, Envelope, ExecutionPlan, PageQuery,
    PlanComparison, Recommendation, SlowQuery, WaitEvent,
};
use crate::domain::telemetry_source::{ApiResult, TelemetrySource};
use crate::session::SessionContext;

/// Client for one backend, carrying its session context.
pub struct PerfApiClient {
    http: Client,
    base_url: String,
    session: Arc<SessionContext>,
}

impl PerfApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<SessionContext>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "GET");
        let mut request = self.http.get(&url).query(query);
        if let Some(header) = self.session.bearer_header() {
            request = request.header(AUTHORIZATION, header);
        }
        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.session.invalidate();
            return Err(ApiError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(ApiError::Status {
                status: response.status(),
                endpoint: path.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

fn page_params(page: &PageQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("page", page.page.to_string()),
        ("per_page", page.per_page.to_string()),
    ];
    if let Some(sort) = &page.sort {
        params.push(("sort", sort.clone()));
    }
    params
}

#[async_trait]
impl TelemetrySource for PerfApiClient {
    async fn slow_queries(
        &self,
        page: &PageQuery,
        min_elapsed_secs: Option<f64>,
    ) -> ApiResult<Envelope<Vec<SlowQuery>>> {
        let mut params = page_params(page);
        if let Some(threshold) = min_elapsed_secs {
            params.push(("min_elapsed", threshold.to_string()));
        }
        self.get_json("queries", &params).await
    }

    async fn execution_plan(&self, sql_id: &str) -> ApiResult<ExecutionPlan> {
        let envelope: Envelope<ExecutionPlan> = self
            .get_json(&format!("queries/{sql_id}/plan"), &[])
            .await?;
        Ok(envelope.data)
    }

    async fn wait_events(&self, page: &PageQuery) -> ApiResult<Envelope<Vec<WaitEvent>>> {
        self.get_json("waits", &page_params(page)).await
    }

    async fn bug_matches(&self, page: &PageQuery) -> ApiResult<Envelope<Vec<BugMatch>>> {
        self.get_json("bugs", &page_params(page)).await
    }

    async fn recommendations(
        &self,
        page: &PageQuery,
    ) -> ApiResult<Envelope<Vec<Recommendation>>> {
        self.get_json("recommendations", &page_params(page)).await
    }

    async fn awr_snapshots(&self, page: &PageQuery) -> ApiResult<Envelope<Vec<AwrSnapshot>>> {
        self.get_json("awr/snapshots", &page_params(page)).await
    }

    async fn awr_report(&self, begin_snap: u64, end_snap: u64) -> ApiResult<AwrReport> {
        let params = [
            ("begin", begin_snap.to_string()),
            ("end", end_snap.to_string()),
        ];
        let envelope: Envelope<AwrReport> = self.get_json("awr/report", &params).await?;
        Ok(envelope.data)
    }

    async fn ash_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ApiResult<AshReport> {
        let params = [("start", start.to_rfc3339()), ("end", end.to_rfc3339())];
        let envelope: Envelope<AshReport> = self.get_json("ash/report", &params).await?;
        Ok(envelope.data)
    }

    async fn compare_plans(
        &self,
        sql_id: &str,
        baseline_hash: u64,
        current_hash: u64,
    ) -> ApiResult<PlanComparison> {
        let params = [
            ("baseline", baseline_hash.to_string()),
            ("current", current_hash.to_string()),
        ];
        let envelope: Envelope<PlanComparison> = self
            .get_json(&format!("queries/{sql_id}/plan/compare"), &params)
            .await?;
        Ok(envelope.data)
    }

    async fn deadlocks(&self, page: &PageQuery) -> ApiResult<Envelope<Vec<Deadlock>>> {
        self.get_json("deadlocks", &page_params(page)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_include_sort_only_when_set() {
        let plain = page_params(&PageQuery::default());
        assert_eq!(
            plain,
            vec![("page", "1".to_string()), ("per_page", "50".to_string())]
        );

        let sorted = page_params(&PageQuery {
            page: 2,
            per_page: 10,
            sort: Some("elapsed_secs:desc".to_string()),
        });
        assert_eq!(sorted[2], ("sort", "elapsed_secs:desc".to_string()));
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let session = Arc::new(SessionContext::anonymous());
        let client = PerfApiClient::new("http://db-host:8080/api/", session);
        assert_eq!(client.base_url, "http://db-host:8080/api");
    }
}
