use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::job::{JobHandle, JobResult, JobStatus};
use super::service::{upstream_error, ServiceEndpoint};
use crate::types::{AppError, AppResult};

/// Fixed-interval status polling for one job. No backoff, no jitter; the
/// timeout is the only cap.
#[derive(Clone)]
pub struct ResultPoller {
    service: ServiceEndpoint,
    interval: Duration,
}

impl ResultPoller {
    pub fn new(service: ServiceEndpoint, interval: Duration) -> Self {
        Self { service, interval }
    }

    pub async fn poll(&self, handle: &JobHandle, timeout: Duration) -> AppResult<JobResult> {
        let url = self.service.result_url(handle);
        let started = Instant::now();
        let mut attempts: u32 = 0;

        info!(job_id = %handle, timeout_secs = timeout.as_secs_f64(), "Polling analyzer result");

        loop {
            // Checked before every request so an expired job never costs another call.
            if started.elapsed() > timeout {
                warn!(job_id = %handle, attempts, "Analyzer result polling timed out");
                return Err(AppError::Timeout);
            }

            attempts += 1;
            let response = self.service.get(&url).await?;
            let status = response.status();
            if status.is_client_error() || status.is_server_error() {
                return Err(upstream_error(response).await);
            }

            let result: JobResult = response
                .json()
                .await
                .map_err(|e| AppError::Internal(format!("Failed to parse analyzer result: {}", e)))?;

            match result.status() {
                None => {
                    warn!(job_id = %handle, "Analyzer result status is not a string");
                    return Err(AppError::Internal(
                        "Analyzer result has a null or non-string status".to_string(),
                    ));
                }
                Some(JobStatus::Succeeded) => {
                    info!(
                        job_id = %handle,
                        attempts,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Analyzer job succeeded"
                    );
                    return Ok(result);
                }
                Some(JobStatus::Failed | JobStatus::Canceled) => {
                    warn!(job_id = %handle, status = result.raw_status(), "Analyzer job did not succeed");
                    return Err(AppError::JobFailed {
                        status: result.raw_status().to_string(),
                        result: result.into_inner(),
                    });
                }
                Some(JobStatus::InProgress(raw)) => {
                    debug!(job_id = %handle, status = %raw, attempts, "Analyzer job still running");
                }
            }

            sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::test_utils::{mock_service, TEST_API_VERSION};
    use mockito::Matcher;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const RESULT_PATH: &str = "/contentunderstanding/analyzerResults/job-1";

    fn poller(server: &mockito::ServerGuard, interval: Duration) -> ResultPoller {
        ResultPoller::new(mock_service(server), interval)
    }

    #[tokio::test]
    async fn test_succeeded_any_case_returns_body_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "id": "job-1",
            "status": "SUCCEEDED",
            "result": { "contents": [{ "markdown": "# Title" }] }
        });
        let mock = server
            .mock("GET", RESULT_PATH)
            .match_query(Matcher::UrlEncoded("api-version".into(), TEST_API_VERSION.into()))
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(1)
            .create_async()
            .await;

        let result = poller(&server, Duration::from_millis(10))
            .poll(&JobHandle::new("job-1"), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(result.into_inner(), body);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_polls_until_terminal_status() {
        let mut server = mockito::Server::new_async().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mock = server
            .mock("GET", RESULT_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body_from_request(move |_| {
                let status = match counter.fetch_add(1, Ordering::SeqCst) {
                    0 => "NotStarted",
                    1 => "Running",
                    _ => "Succeeded",
                };
                json!({ "id": "job-1", "status": status }).to_string().into_bytes()
            })
            .expect(3)
            .create_async()
            .await;

        let result = poller(&server, Duration::from_millis(10))
            .poll(&JobHandle::new("job-1"), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(result.status(), Some(JobStatus::Succeeded));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_and_canceled_raise_with_body() {
        for status in ["Failed", "canceled"] {
            let mut server = mockito::Server::new_async().await;
            let body = json!({ "id": "job-1", "status": status, "error": { "code": "InvalidContent" } });
            let _mock = server
                .mock("GET", RESULT_PATH)
                .match_query(Matcher::Any)
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(body.to_string())
                .create_async()
                .await;

            let err = poller(&server, Duration::from_millis(10))
                .poll(&JobHandle::new("job-1"), Duration::from_secs(5))
                .await
                .unwrap_err();

            match err {
                AppError::JobFailed { status: raw, result } => {
                    assert_eq!(raw, status);
                    assert_eq!(result, body);
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_null_status_fails_without_further_polling() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", RESULT_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"job-1","status":null}"#)
            .expect(1)
            .create_async()
            .await;

        let err = poller(&server, Duration::from_millis(10))
            .poll(&JobHandle::new("job-1"), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_response_mirrors_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", RESULT_PATH)
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":{"code":"NotFound"}}"#)
            .create_async()
            .await;

        let err = poller(&server, Duration::from_millis(10))
            .poll(&JobHandle::new("job-1"), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            AppError::Upstream { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, r#"{"error":{"code":"NotFound"}}"#);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_stops_polling() {
        let mut server = mockito::Server::new_async().await;
        let running: Value = json!({ "id": "job-1", "status": "Running" });
        let mock = server
            .mock("GET", RESULT_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(running.to_string())
            .expect_at_least(1)
            .expect_at_most(4)
            .create_async()
            .await;

        let err = poller(&server, Duration::from_millis(20))
            .poll(&JobHandle::new("job-1"), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout));

        // Nothing more goes out once the timeout has fired.
        tokio::time::sleep(Duration::from_millis(60)).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_zero_timeout_allows_at_most_one_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", RESULT_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"job-1","status":"Running"}"#)
            .expect_at_most(1)
            .create_async()
            .await;

        let err = poller(&server, Duration::from_millis(10))
            .poll(&JobHandle::new("job-1"), Duration::ZERO)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Timeout));
        mock.assert_async().await;
    }
}
