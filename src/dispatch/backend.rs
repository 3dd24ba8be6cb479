//! The backend contract targets implement, and the result handed back
//! to callers.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// One execution backend, registered under a target id.
///
/// The router is agnostic to what a backend actually does with the
/// request. Implementations report application-level refusals as
/// `BackendError::Rejected`; transport and availability problems use the
/// other `BackendError` variants so the dispatcher can tell what is worth
/// retrying.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Run the request to completion and return the raw output payload.
    async fn invoke(&self, request: &str) -> Result<String, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failure,
}

/// What a dispatch produced, successful or not.
///
/// `served_by` names the target that actually answered, which differs
/// from `Decision::target` when the dispatcher degraded a tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub served_by: String,
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn success(payload: impl Into<String>, served_by: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status: ExecutionStatus::Success,
            payload: payload.into(),
            error: None,
            served_by: served_by.into(),
            elapsed,
        }
    }

    pub fn failure(error: impl Into<String>, served_by: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status: ExecutionStatus::Failure,
            payload: String::new(),
            error: Some(error.into()),
            served_by: served_by.into(),
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    struct EchoBackend;

    #[async_trait]
    impl ExecutionBackend for EchoBackend {
        async fn invoke(&self, request: &str) -> Result<String, BackendError> {
            Ok(format!("echo: {request}"))
        }
    }

    #[tokio::test]
    async fn backends_work_behind_arc() {
        let backend: Arc<dyn ExecutionBackend> = Arc::new(EchoBackend);
        let payload = backend.invoke("ping").await.unwrap();
        assert_eq!(payload, "echo: ping");
    }

    #[test]
    fn success_result_omits_error_field() {
        let result = ExecutionResult::success("done", "worker", Duration::from_millis(12));
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"status\":\"success\""), "{json}");
        assert!(!json.contains("\"error\""), "{json}");
        assert!(result.is_success());
    }

    #[test]
    fn failure_result_carries_error_detail() {
        let result = ExecutionResult::failure("boom", "worker", Duration::from_millis(3));
        assert_eq!(result.status, ExecutionStatus::Failure);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert!(result.payload.is_empty());
        assert!(!result.is_success());
    }

    #[test]
    fn result_round_trips_through_json() {
        let result = ExecutionResult::success("payload", "quick", Duration::from_secs(1));
        let json = serde_json::to_string(&result).unwrap();
        let back: ExecutionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
