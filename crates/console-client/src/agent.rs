//! Agent conversation session.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::client::ConsoleClient;
use crate::error::ConsoleResult;

/// Message recorded after a successful send.
#[derive(Debug, Clone, Serialize)]
pub struct AgentMessage {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A named agent posting messages to the console backend.
pub struct AgentSession {
    client: ConsoleClient,
    name: String,
    role: String,
    messages: Vec<AgentMessage>,
}

impl AgentSession {
    pub fn new(client: ConsoleClient, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
            role: role.into(),
            messages: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn messages(&self) -> &[AgentMessage] {
        &self.messages
    }

    /// Send a message; it is added to the history only if the backend
    /// accepts it.
    pub async fn send_message(&mut self, message: &str) -> ConsoleResult<serde_json::Value> {
        let reply = match self.client.send_message(&self.name, &self.role, message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(agent = %self.name, error = %e, "Error sending message");
                return Err(e);
            }
        };

        self.messages.push(AgentMessage {
            role: self.role.clone(),
            content: message.to_string(),
            timestamp: Utc::now(),
        });

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = AgentSession::new(ConsoleClient::new("http://localhost:8000"), "assistant", "assistant");
        assert_eq!(session.name(), "assistant");
        assert!(session.messages().is_empty());
    }
}
