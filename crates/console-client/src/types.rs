//! Wire and result types shared by the client and the tracker.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ConsoleError, ConsoleResult};

/// Language of a submitted snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    Javascript,
    Bash,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Java => "java",
            Language::Javascript => "javascript",
            Language::Bash => "bash",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "javascript" | "js" => Ok(Language::Javascript),
            "bash" | "sh" => Ok(Language::Bash),
            other => Err(ConsoleError::Validation(format!(
                "Unknown language: {}",
                other
            ))),
        }
    }
}

/// Body of `POST /execute_code`. Options are flattened next to `code`
/// and `language`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRequest {
    pub code: String,
    pub language: Language,
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// Status string reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum BackendStatus {
    Queued,
    Running,
    Completed,
    Failed,
    /// Written by the backend when the interpreter could not be started.
    Error,
    Other(String),
}

impl BackendStatus {
    /// Returns true once no further status changes are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BackendStatus::Completed | BackendStatus::Failed | BackendStatus::Error
        )
    }
}

impl From<String> for BackendStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => BackendStatus::Queued,
            "running" => BackendStatus::Running,
            "completed" => BackendStatus::Completed,
            "failed" => BackendStatus::Failed,
            "error" => BackendStatus::Error,
            _ => BackendStatus::Other(s),
        }
    }
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendStatus::Queued => write!(f, "queued"),
            BackendStatus::Running => write!(f, "running"),
            BackendStatus::Completed => write!(f, "completed"),
            BackendStatus::Failed => write!(f, "failed"),
            BackendStatus::Error => write!(f, "error"),
            BackendStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Body of `GET /execution_status/{execution_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionStatusReport {
    #[serde(default)]
    pub execution_id: Option<String>,

    pub status: BackendStatus,

    #[serde(default)]
    pub result: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Final result handed back by `ExecutionJobTracker::submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionOutcome {
    /// Convert a backend-reported failure into `ConsoleError::Terminal`.
    pub fn into_result(self) -> ConsoleResult<String> {
        if self.success {
            Ok(self.result.unwrap_or_default())
        } else {
            Err(ConsoleError::Terminal(self.error.unwrap_or_default()))
        }
    }
}

/// Reply shape shared by the tool and team endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultReply {
    #[serde(default)]
    pub result: Option<String>,
}

/// Outcome of one generated test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,

    pub passed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Reply of `POST /generate_java`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub code: String,

    /// Test cases compiled and run against the generated code, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<Vec<TestCase>>,
}
