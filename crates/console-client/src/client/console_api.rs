//! Console backend HTTP client.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ExecutionApi;
use crate::config::ClientConfig;
use crate::error::{ConsoleError, ConsoleResult};
use crate::types::{
    ExecutionRequest, ExecutionStatusReport, GeneratedCode, Language, ResultReply,
};
use crate::workflows::{Workflow, WorkflowSummary};

#[derive(Debug, Deserialize)]
struct SubmissionReply {
    execution_id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedWorkflow {
    id: String,
}

#[derive(Debug, Serialize)]
struct UpdateCodeRequest<'a> {
    file_path: &'a str,
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolRequest<'a> {
    code: &'a str,
    language: Language,
    options: serde_json::Map<String, serde_json::Value>,
}

/// HTTP client for the console backend API.
#[derive(Clone)]
pub struct ConsoleClient {
    client: reqwest::Client,
    server_url: String,
}

impl ConsoleClient {
    /// Create a new console client with the default request timeout.
    pub fn new(server_url: &str) -> Self {
        Self::with_timeout(server_url, Duration::from_secs(30))
    }

    /// Create a client from loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_timeout(&config.server_url, config.request_timeout())
    }

    fn with_timeout(server_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    /// List workflows known to the backend.
    pub async fn list_workflows(&self) -> ConsoleResult<Vec<WorkflowSummary>> {
        let response = self.client.get(self.url("/list_workflows")).send().await?;
        read_json(response, "Failed to load workflows").await
    }

    /// Register a workflow definition and return its id.
    pub async fn create_workflow(&self, workflow: &Workflow) -> ConsoleResult<String> {
        let response = self
            .client
            .post(self.url("/workflow/create"))
            .json(workflow)
            .send()
            .await?;

        let created: CreatedWorkflow = read_json(response, "Failed to create workflow").await?;
        Ok(created.id)
    }

    /// Run a workflow and return its result text.
    pub async fn execute_workflow(&self, workflow_id: &str) -> ConsoleResult<Option<String>> {
        let response = self
            .client
            .post(self.url(&format!("/execute_workflow/{}", workflow_id)))
            .send()
            .await?;

        let reply: ResultReply = read_json(response, "Failed to execute workflow").await?;
        Ok(reply.result)
    }

    /// Fetch the raw status document of a workflow.
    pub async fn workflow_status(&self, workflow_id: &str) -> ConsoleResult<serde_json::Value> {
        let response = self
            .client
            .get(self.url(&format!("/workflow/status/{}", workflow_id)))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(ConsoleError::NotFound(detail_or(&body, "Workflow not found")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConsoleError::Request(detail_or(
                &body,
                "Failed to fetch workflow status",
            )));
        }
        Ok(response.json().await?)
    }

    /// Post a message on behalf of an agent.
    pub async fn send_message(
        &self,
        sender: &str,
        role: &str,
        message: &str,
    ) -> ConsoleResult<serde_json::Value> {
        let response = self
            .client
            .post(self.url("/send_message"))
            .json(&serde_json::json!({
                "sender": sender,
                "role": role,
                "message": message,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ConsoleError::Request("Failed to send message".to_string()));
        }
        Ok(response.json().await?)
    }

    /// Push new contents for a file on the backend.
    ///
    /// Both arguments must be non-blank; nothing is sent otherwise.
    pub async fn update_code(&self, file_path: &str, code: &str) -> ConsoleResult<serde_json::Value> {
        let file_path = file_path.trim();
        let code = code.trim();
        if file_path.is_empty() || code.is_empty() {
            return Err(ConsoleError::Validation(
                "Please provide both file path and code".to_string(),
            ));
        }

        let response = self
            .client
            .post(self.url("/update_code"))
            .json(&UpdateCodeRequest { file_path, code })
            .send()
            .await?;

        read_json(response, "Failed to update code").await
    }

    /// Run a snippet through the synchronous language tool endpoint.
    pub async fn run_tool(&self, language: Language, code: &str) -> ConsoleResult<Option<String>> {
        let (path, fallback) = match language {
            Language::Python => ("/run_python_tool", "Failed to execute Python code"),
            Language::Java => ("/run_java_tool", "Failed to execute Java code"),
            other => {
                return Err(ConsoleError::Validation(format!(
                    "No console tool for language: {}",
                    other
                )))
            }
        };

        let response = self
            .client
            .post(self.url(path))
            .json(&ToolRequest {
                code,
                language,
                options: serde_json::Map::new(),
            })
            .send()
            .await?;

        let reply: ResultReply = read_json(response, fallback).await?;
        Ok(reply.result)
    }

    /// Generate Java code, with test results when the backend produced tests.
    pub async fn generate_java(&self, prompt: &str) -> ConsoleResult<GeneratedCode> {
        let response = self
            .client
            .post(self.url("/generate_java"))
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;

        read_json(response, "Failed to generate Java code").await
    }

    /// Compile and run a Java snippet, returning its output.
    pub async fn run_java(&self, code: &str) -> ConsoleResult<Option<String>> {
        let response = self
            .client
            .post(self.url("/run_java"))
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await?;

        let reply: ResultReply = read_json(response, "Failed to run Java code").await?;
        Ok(reply.result)
    }

    /// Ask the research team to analyze a codebase.
    pub async fn analyze_codebase(&self, path: &str) -> ConsoleResult<Option<String>> {
        self.team_task("/analyze_codebase", serde_json::json!({ "path": path }), "Analysis failed")
            .await
    }

    /// Ask the debug team to solve a problem.
    pub async fn solve_problem(&self, description: &str) -> ConsoleResult<Option<String>> {
        self.team_task(
            "/solve_problem",
            serde_json::json!({ "problem_description": description }),
            "Problem solving failed",
        )
        .await
    }

    /// Ask the debug team to improve the tests for a feature.
    pub async fn improve_tests(&self, description: &str) -> ConsoleResult<Option<String>> {
        self.team_task(
            "/improve_tests",
            serde_json::json!({ "feature_description": description }),
            "Test improvement failed",
        )
        .await
    }

    async fn team_task(
        &self,
        path: &str,
        body: serde_json::Value,
        fallback: &str,
    ) -> ConsoleResult<Option<String>> {
        let response = self.client.post(self.url(path)).json(&body).send().await?;
        let reply: ResultReply = read_json(response, fallback).await?;
        Ok(reply.result)
    }
}

#[async_trait]
impl ExecutionApi for ConsoleClient {
    async fn submit_execution(&self, request: &ExecutionRequest) -> ConsoleResult<String> {
        let response = self
            .client
            .post(self.url("/execute_code"))
            .json(request)
            .send()
            .await
            .map_err(|e| ConsoleError::Submission(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ConsoleError::Submission(e.to_string()))?;

        if !status.is_success() {
            return Err(ConsoleError::Submission(detail_or(
                &body,
                "Failed to execute code",
            )));
        }

        let reply: SubmissionReply = serde_json::from_str(&body)
            .map_err(|e| ConsoleError::Submission(format!("Invalid response from server: {}", e)))?;
        Ok(reply.execution_id)
    }

    async fn execution_status(&self, execution_id: &str) -> ConsoleResult<ExecutionStatusReport> {
        let response = self
            .client
            .get(self.url(&format!("/execution_status/{}", execution_id)))
            .send()
            .await
            .map_err(|e| ConsoleError::Poll(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ConsoleError::Poll(e.to_string()))?;

        if !status.is_success() {
            return Err(ConsoleError::Poll(detail_or(
                &body,
                "Failed to fetch execution status",
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| ConsoleError::Poll(format!("Invalid response from server: {}", e)))
    }
}

/// Decode a success body, or turn a failure into `ConsoleError::Request`
/// carrying the server `detail` when present.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    fallback: &str,
) -> ConsoleResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ConsoleError::Request(detail_or(&body, fallback)));
    }

    Ok(serde_json::from_str(&body)?)
}

/// Extract the `detail` string from an error body, falling back to a
/// generic message.
fn detail_or(body: &str, fallback: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
