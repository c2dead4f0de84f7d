//! Polling of asynchronous remote work to a terminal state.
//!
//! A single [`JobPoller`] drives item jobs, dataset refreshes, PBIX imports
//! and SQL endpoint provisioning. Each of those status documents implements
//! [`Observation`] to say whether it is still running, succeeded, or failed.
//!
//! The poller returns on the first terminal observation and never polls
//! again after it. It is bounded by a deadline ([`Error::JobTimeout`]) and a
//! cancellation token ([`Error::Cancelled`]).

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::model::{DatasetRefresh, Import, JobInstance, JobStatus, Lakehouse};

/// State of polled remote work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Still running.
    Pending,
    /// Finished successfully.
    Succeeded,
    /// Finished unsuccessfully, with the remote reason.
    Failed(String),
}

/// A status document that can be classified.
pub trait Observation {
    /// Classifies the observation.
    fn state(&self) -> PollState;

    /// Short label for logs.
    fn status_label(&self) -> String;
}

impl Observation for JobInstance {
    fn state(&self) -> PollState {
        match self.status {
            JobStatus::NotStarted | JobStatus::InProgress | JobStatus::Unknown => {
                PollState::Pending
            }
            JobStatus::Completed => PollState::Succeeded,
            JobStatus::Failed | JobStatus::Cancelled | JobStatus::Deduped => PollState::Failed(
                self.failure_reason
                    .as_ref()
                    .map(|failure| failure.message.clone())
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| format!("job ended in state {:?}", self.status)),
            ),
        }
    }

    fn status_label(&self) -> String {
        format!("{:?}", self.status)
    }
}

impl Observation for DatasetRefresh {
    fn state(&self) -> PollState {
        match self.status.as_str() {
            "Unknown" | "NotStarted" | "InProgress" => PollState::Pending,
            "Completed" => PollState::Succeeded,
            other => PollState::Failed(
                self.service_exception_json
                    .clone()
                    .unwrap_or_else(|| format!("refresh ended in state {other}")),
            ),
        }
    }

    fn status_label(&self) -> String {
        self.status.clone()
    }
}

impl Observation for Import {
    fn state(&self) -> PollState {
        match self.import_state.as_str() {
            "Publishing" => PollState::Pending,
            "Succeeded" => PollState::Succeeded,
            other => PollState::Failed(format!("import ended in state {other}")),
        }
    }

    fn status_label(&self) -> String {
        self.import_state.clone()
    }
}

impl Observation for Lakehouse {
    fn state(&self) -> PollState {
        match self
            .properties
            .sql_endpoint_properties
            .as_ref()
            .map(|sql| sql.provisioning_status.as_str())
        {
            Some("Success") => PollState::Succeeded,
            Some("Failed") => PollState::Failed("SQL endpoint provisioning failed".to_string()),
            _ => PollState::Pending,
        }
    }

    fn status_label(&self) -> String {
        self.properties
            .sql_endpoint_properties
            .as_ref()
            .map_or_else(|| "NotProvisioned".to_string(), |sql| sql.provisioning_status.clone())
    }
}

/// Fixed-interval poller with a deadline and cancellation.
#[derive(Debug, Clone)]
pub struct JobPoller {
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
}

impl JobPoller {
    /// Creates a poller.
    #[must_use]
    pub const fn new(interval: Duration, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            interval,
            timeout,
            cancel,
        }
    }

    /// Poll interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Polls `fetch` until it reports a terminal state.
    ///
    /// The first observation is taken immediately; each later one follows a
    /// sleep of `interval`.
    ///
    /// # Errors
    ///
    /// - [`Error::JobExecution`] when the work failed remotely
    /// - [`Error::JobTimeout`] when the deadline passes first
    /// - [`Error::Cancelled`] when the token fires first
    /// - any error `fetch` returns
    pub async fn poll<T, F, Fut>(&self, job_id: &str, mut fetch: F) -> Result<T>
    where
        T: Observation,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let deadline = started + self.timeout;

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    operation: format!("polling {job_id}"),
                });
            }

            let observation = fetch().await?;
            match observation.state() {
                PollState::Succeeded => {
                    tracing::info!(job_id, status = %observation.status_label(), "job finished");
                    return Ok(observation);
                }
                PollState::Failed(reason) => {
                    tracing::info!(job_id, status = %observation.status_label(), "job failed");
                    return Err(Error::JobExecution {
                        job_id: job_id.to_string(),
                        reason,
                    });
                }
                PollState::Pending => {
                    tracing::debug!(job_id, status = %observation.status_label(), "job in progress");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::JobTimeout {
                    job_id: job_id.to_string(),
                    waited: now - started,
                });
            }

            let wake = (now + self.interval).min(deadline);
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    return Err(Error::Cancelled {
                        operation: format!("polling {job_id}"),
                    });
                }
                () = tokio::time::sleep_until(wake) => {}
            }
        }
    }
}
