//! Caller context for participation requests

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity and request metadata of the visitor being bucketed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorContext {
    client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_agent: Option<String>,
}

impl VisitorContext {
    /// Create a context for a known client id
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ip_address: None,
            user_agent: None,
        }
    }

    /// Create a context with a freshly generated client id
    pub fn anonymous() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Set the remote IP address
    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Get the client id
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Get the remote IP address
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// Get the user agent
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}
