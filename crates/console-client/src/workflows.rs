//! Workflow listing and execution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::client::ConsoleClient;
use crate::error::{ConsoleError, ConsoleResult};
use crate::render::escape_html;

/// Workflow entry returned by `GET /list_workflows`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Step of a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Step kind, "code" or "message".
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// Workflow definition accepted by `POST /workflow/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub steps: Vec<WorkflowStep>,
}

/// Client-side view of the backend's workflows.
pub struct WorkflowManager {
    client: ConsoleClient,
    workflows: BTreeMap<String, WorkflowSummary>,
    active_workflow: Option<String>,
}

impl WorkflowManager {
    pub fn new(client: ConsoleClient) -> Self {
        Self {
            client,
            workflows: BTreeMap::new(),
            active_workflow: None,
        }
    }

    /// Replace the known workflows with the backend's list.
    pub async fn load_workflows(&mut self) -> ConsoleResult<usize> {
        let listed = self.client.list_workflows().await.map_err(|e| {
            tracing::error!(error = %e, "Error loading workflows");
            ConsoleError::Request("Failed to load workflows".to_string())
        })?;

        self.workflows = listed.into_iter().map(|w| (w.id.clone(), w)).collect();
        tracing::debug!(count = self.workflows.len(), "Workflows loaded");
        Ok(self.workflows.len())
    }

    pub fn workflows(&self) -> impl Iterator<Item = &WorkflowSummary> {
        self.workflows.values()
    }

    pub fn get(&self, workflow_id: &str) -> Option<&WorkflowSummary> {
        self.workflows.get(workflow_id)
    }

    pub fn active_workflow(&self) -> Option<&str> {
        self.active_workflow.as_deref()
    }

    /// Run a known workflow and return its result text.
    ///
    /// Unknown ids fail without contacting the backend.
    pub async fn execute_workflow(&mut self, workflow_id: &str) -> ConsoleResult<Option<String>> {
        if !self.workflows.contains_key(workflow_id) {
            return Err(ConsoleError::NotFound("Workflow not found".to_string()));
        }

        self.active_workflow = Some(workflow_id.to_string());
        tracing::info!(workflow_id = %workflow_id, "Executing workflow");

        match self.client.execute_workflow(workflow_id).await {
            Ok(result) => {
                tracing::info!(workflow_id = %workflow_id, "Workflow completed");
                Ok(result)
            }
            Err(e) => {
                tracing::error!(workflow_id = %workflow_id, error = %e, "Error executing workflow");
                Err(e)
            }
        }
    }

    /// Register a workflow and add it to the known set.
    pub async fn create_workflow(&mut self, workflow: &Workflow) -> ConsoleResult<String> {
        let id = self.client.create_workflow(workflow).await?;
        self.workflows.insert(
            id.clone(),
            WorkflowSummary {
                id: id.clone(),
                name: workflow.name.clone(),
                description: None,
                status: Some("created".to_string()),
            },
        );
        Ok(id)
    }

    pub async fn workflow_status(&self, workflow_id: &str) -> ConsoleResult<serde_json::Value> {
        self.client.workflow_status(workflow_id).await
    }

    /// Render the known workflows as list items.
    pub fn render_list(&self) -> String {
        self.workflows
            .values()
            .map(render_item)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_item(workflow: &WorkflowSummary) -> String {
    let description = workflow
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or("No description available");

    format!(
        r#"<div class="workflow-item" data-workflow-id="{}"><h3>{}</h3><p>{}</p></div>"#,
        escape_html(&workflow.id),
        escape_html(&workflow.name),
        escape_html(description),
    )
}
