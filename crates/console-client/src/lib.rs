//! Execution Console Client
//!
//! Talks to the code-execution console backend and renders what it returns.
//!
//! This crate provides:
//! - HTTP client for code execution, workflows, agents and console tools
//! - Execution job tracker that polls a submitted run to completion
//! - HTML projection of job state with single-pass escaping
//! - Environment-driven client configuration

pub mod agent;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod render;
pub mod tracker;
pub mod types;
pub mod workflows;

pub use agent::{AgentMessage, AgentSession};
pub use client::{ConsoleClient, ExecutionApi};
pub use clock::{Clock, TokioClock};
pub use config::ClientConfig;
pub use error::{ConsoleError, ConsoleResult};
pub use render::{escape_html, format_output, format_tests, render, HtmlProjector, JobView};
pub use tracker::{
    ExecutionJob, ExecutionJobTracker, JobObserver, JobStatus, NoopObserver, PollPolicy,
};
pub use types::{
    BackendStatus, ExecutionOutcome, ExecutionRequest, ExecutionStatusReport, GeneratedCode,
    Language, TestCase,
};
pub use workflows::{Workflow, WorkflowManager, WorkflowStep, WorkflowSummary};
