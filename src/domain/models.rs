//! Typed records returned by the performance-data REST endpoints.
//!
//! Every list endpoint answers with an [`Envelope`] so pagination metadata
//! stays attached to the page it describes instead of floating in a dynamic
//! blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope shared by the paginated endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

/// Paging and sorting knobs accepted by the list endpoints.
#[derive(Debug, Clone)]
pub struct PageQuery {
    pub page: u32,
    pub per_page: u32,
    pub sort: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
            sort: None,
        }
    }
}

/// A captured slow statement from the live workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowQuery {
    pub sql_id: String,
    pub sql_text: String,
    pub elapsed_secs: f64,
    pub executions: u64,
    pub avg_elapsed_secs: f64,
    #[serde(default)]
    pub username: Option<String>,
    pub last_seen: DateTime<Utc>,
}

/// One row of an execution plan, flattened from the plan tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: u32,
    #[serde(default)]
    pub parent_id: Option<u32>,
    pub depth: u32,
    pub operation: String,
    #[serde(default)]
    pub object_name: Option<String>,
    #[serde(default)]
    pub cost: Option<u64>,
    #[serde(default)]
    pub cardinality: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub sql_id: String,
    pub plan_hash_value: u64,
    pub steps: Vec<PlanStep>,
    pub captured_at: DateTime<Utc>,
}

/// Aggregated wait-event statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitEvent {
    pub event: String,
    pub wait_class: String,
    pub total_waits: u64,
    pub time_waited_secs: f64,
    pub avg_wait_ms: f64,
}

/// A known-bug pattern the backend matched against the workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugMatch {
    pub bug_number: String,
    pub description: String,
    pub matched_pattern: String,
    pub severity: String,
    #[serde(default)]
    pub sql_id: Option<String>,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: u64,
    pub target: String,
    pub summary: String,
    pub rationale: String,
    pub urgency_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwrSnapshot {
    pub snap_id: u64,
    pub begin_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub db_name: String,
}

/// A rendered AWR report between two snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwrReport {
    pub begin_snap_id: u64,
    pub end_snap_id: u64,
    pub body: String,
}

/// A rendered ASH report over a wall-clock window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AshReport {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub body: String,
}

/// Outcome of comparing a statement's current plan against a baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanComparison {
    pub sql_id: String,
    pub baseline_hash: u64,
    pub current_hash: u64,
    pub regressed: bool,
    pub severity_score: f64,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deadlock {
    pub detected_at: DateTime<Utc>,
    pub victim_session: u64,
    pub sessions: Vec<u64>,
    pub resource: String,
    #[serde(default)]
    pub graph: Option<Value>,
}
