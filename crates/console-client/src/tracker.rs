//! Execution job tracking.
//!
//! An [`ExecutionJobTracker`] submits a snippet, polls the backend at a
//! fixed interval until it reports a terminal status, and hands every
//! state transition to a [`JobObserver`]. Each submission gets its own
//! [`ExecutionJob`] slot keyed by execution id, so overlapping submissions
//! never write into each other's state.

use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::client::ExecutionApi;
use crate::clock::{Clock, TokioClock};
use crate::config::ClientConfig;
use crate::error::{ConsoleError, ConsoleResult};
use crate::types::{
    BackendStatus, ExecutionOutcome, ExecutionRequest, ExecutionStatusReport, Language,
};

const EXECUTION_FAILED: &str = "Execution failed";

/// Client-side job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Running,
    Success,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submitted code run.
///
/// Terminal jobs hold exactly one of `output` or `error`; running and idle
/// jobs hold neither. Once terminal, a job no longer changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionJob {
    id: Option<String>,
    status: JobStatus,
    output: Option<String>,
    error: Option<String>,
}

impl ExecutionJob {
    pub fn new() -> Self {
        Self {
            id: None,
            status: JobStatus::Idle,
            output: None,
            error: None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn outcome(&self) -> ExecutionOutcome {
        ExecutionOutcome {
            success: self.status == JobStatus::Success,
            result: self.output.clone(),
            error: self.error.clone(),
        }
    }

    /// Record the backend-assigned id and enter `running`.
    pub(crate) fn start(&mut self, id: String) {
        if self.status != JobStatus::Idle {
            return;
        }
        self.id = Some(id);
        self.status = JobStatus::Running;
    }

    /// Apply a status report. Returns true if the job became terminal.
    pub(crate) fn apply(&mut self, report: &ExecutionStatusReport) -> bool {
        if self.is_terminal() {
            return false;
        }

        match report.status {
            BackendStatus::Completed => match non_empty(report.error.as_deref()) {
                Some(error) => self.fail(error),
                None => {
                    self.status = JobStatus::Success;
                    self.output = Some(report.result.clone().unwrap_or_default());
                    self.error = None;
                }
            },
            BackendStatus::Failed | BackendStatus::Error => {
                let error = non_empty(report.error.as_deref()).unwrap_or(EXECUTION_FAILED);
                self.fail(error);
            }
            _ => return false,
        }

        true
    }

    pub(crate) fn fail(&mut self, message: &str) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Error;
        self.output = None;
        self.error = Some(non_empty(Some(message)).unwrap_or(EXECUTION_FAILED).to_string());
    }
}

impl Default for ExecutionJob {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Receives a job each time its status changes.
///
/// Called once when a job enters `running` and once when it becomes
/// terminal; poll iterations in between are not reported.
pub trait JobObserver: Send + Sync {
    fn on_transition(&self, job: &ExecutionJob);
}

/// Observer that ignores every transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl JobObserver for NoopObserver {
    fn on_transition(&self, _job: &ExecutionJob) {}
}

impl<T: JobObserver + ?Sized> JobObserver for Arc<T> {
    fn on_transition(&self, job: &ExecutionJob) {
        (**self).on_transition(job)
    }
}

/// Timing of the status loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Fixed delay between status checks.
    pub interval: Duration,

    /// Status checks before the job is abandoned; `None` polls forever.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.max_poll_attempts(),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_attempts: Some(600),
        }
    }
}

/// Submits code executions and follows them to a terminal state.
pub struct ExecutionJobTracker<A, C = TokioClock, O = NoopObserver> {
    api: A,
    clock: C,
    observer: O,
    policy: PollPolicy,
    jobs: Mutex<HashMap<String, ExecutionJob>>,
}

impl<A: ExecutionApi> ExecutionJobTracker<A> {
    /// Create a tracker with the tokio clock, no observer and the default
    /// poll policy.
    pub fn new(api: A) -> Self {
        Self::with_parts(api, TokioClock, NoopObserver, PollPolicy::default())
    }
}

impl<A, C, O> ExecutionJobTracker<A, C, O>
where
    A: ExecutionApi,
    C: Clock,
    O: JobObserver,
{
    pub fn with_parts(api: A, clock: C, observer: O, policy: PollPolicy) -> Self {
        Self {
            api,
            clock,
            observer,
            policy,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clock<C2: Clock>(self, clock: C2) -> ExecutionJobTracker<A, C2, O> {
        ExecutionJobTracker {
            api: self.api,
            clock,
            observer: self.observer,
            policy: self.policy,
            jobs: self.jobs,
        }
    }

    pub fn with_observer<O2: JobObserver>(self, observer: O2) -> ExecutionJobTracker<A, C, O2> {
        ExecutionJobTracker {
            api: self.api,
            clock: self.clock,
            observer,
            policy: self.policy,
            jobs: self.jobs,
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Snapshot of a tracked job.
    pub fn job(&self, execution_id: &str) -> Option<ExecutionJob> {
        self.slots().get(execution_id).cloned()
    }

    /// Snapshot of every tracked job.
    pub fn jobs(&self) -> Vec<ExecutionJob> {
        self.slots().values().cloned().collect()
    }

    /// Stop tracking a job and hand back its last state.
    ///
    /// Removing a running job does not stop its poll loop; the loop keeps
    /// its own copy and the result is simply no longer stored.
    pub fn remove(&self, execution_id: &str) -> Option<ExecutionJob> {
        self.slots().remove(execution_id)
    }

    /// Drop every terminal job and return them. Running jobs stay tracked.
    pub fn take_finished(&self) -> Vec<ExecutionJob> {
        let mut slots = self.slots();
        let finished: Vec<String> = slots
            .iter()
            .filter(|(_, job)| job.is_terminal())
            .map(|(id, _)| id.clone())
            .collect();
        finished
            .into_iter()
            .filter_map(|id| slots.remove(&id))
            .collect()
    }

    /// Submit a snippet and wait for its terminal outcome.
    ///
    /// A backend-reported failure is returned as an outcome with
    /// `success = false`. Submission errors, status-check errors and an
    /// exhausted poll budget are returned as `Err`.
    pub async fn submit(
        &self,
        code: &str,
        language: Language,
        options: serde_json::Map<String, serde_json::Value>,
    ) -> ConsoleResult<ExecutionOutcome> {
        let request = ExecutionRequest {
            code: code.to_string(),
            language,
            options,
        };

        let execution_id = match self.api.submit_execution(&request).await {
            Ok(id) => id,
            Err(e) => {
                let message = match e {
                    ConsoleError::Submission(message) => message,
                    other => other.to_string(),
                };
                tracing::warn!(language = %language, error = %message, "Execution submission failed");

                let mut job = ExecutionJob::new();
                job.fail(&message);
                self.observer.on_transition(&job);
                return Err(ConsoleError::Submission(message));
            }
        };

        tracing::info!(
            execution_id = %execution_id,
            language = %language,
            "Execution submitted"
        );

        let mut job = ExecutionJob::new();
        job.start(execution_id.clone());
        let already_tracked = match self.slots().entry(execution_id.clone()) {
            Entry::Occupied(_) => true,
            Entry::Vacant(slot) => {
                slot.insert(job.clone());
                false
            }
        };
        if already_tracked {
            tracing::warn!(
                execution_id = %execution_id,
                "Backend returned an execution id that is already tracked"
            );
            let message = format!("Execution id {} is already tracked", execution_id);
            let mut rejected = ExecutionJob::new();
            rejected.fail(&message);
            self.observer.on_transition(&rejected);
            return Err(ConsoleError::Submission(message));
        }
        self.observer.on_transition(&job);

        let job = self.poll_status(&execution_id).await?;
        Ok(job.outcome())
    }

    /// Poll until the backend reports a terminal status.
    async fn poll_status(&self, execution_id: &str) -> ConsoleResult<ExecutionJob> {
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let report = match self.api.execution_status(execution_id).await {
                Ok(report) => report,
                Err(e) => {
                    let message = match e {
                        ConsoleError::Poll(message) => message,
                        other => other.to_string(),
                    };
                    tracing::warn!(
                        execution_id = %execution_id,
                        attempt = attempts,
                        error = %message,
                        "Status check failed"
                    );
                    self.finish(execution_id, |job| job.fail(&message));
                    return Err(ConsoleError::Poll(message));
                }
            };

            tracing::debug!(
                execution_id = %execution_id,
                attempt = attempts,
                status = %report.status,
                "Status checked"
            );

            if report.status.is_terminal() {
                let job = self.finish(execution_id, |job| {
                    job.apply(&report);
                });
                tracing::info!(
                    execution_id = %execution_id,
                    status = %job.status(),
                    attempts,
                    "Execution finished"
                );
                return Ok(job);
            }

            if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                tracing::warn!(
                    execution_id = %execution_id,
                    attempts,
                    "Execution still running after poll budget"
                );
                let error = ConsoleError::PollTimeout { attempts };
                let message = error.to_string();
                self.finish(execution_id, |job| job.fail(&message));
                return Err(error);
            }

            self.clock.sleep(self.policy.interval).await;
        }
    }

    /// Move a job to its terminal state and notify the observer once.
    fn finish<F>(&self, execution_id: &str, update: F) -> ExecutionJob
    where
        F: FnOnce(&mut ExecutionJob),
    {
        let job = match self.slots().get_mut(execution_id) {
            Some(job) => {
                update(job);
                job.clone()
            }
            // Removed by the caller while polling; resolve without storing.
            None => {
                let mut job = ExecutionJob::new();
                job.start(execution_id.to_string());
                update(&mut job);
                job
            }
        };
        self.observer.on_transition(&job);
        job
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, ExecutionJob>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}
