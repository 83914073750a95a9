use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub String);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Slack workspace that installed the integration.
#[derive(Clone, PartialEq, Eq)]
pub struct Team {
    pub id: TeamId,
    pub name: Option<String>,
    pub access_token: String,
    pub scope: Option<String>,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|name| !name.trim().is_empty()).unwrap_or(&self.id.0)
    }
}

impl fmt::Debug for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Team")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("access_token", &redact_token(&self.access_token))
            .field("scope", &self.scope)
            .field("installed_at", &self.installed_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Keeps the token prefix (`xoxb-`, `xoxp-`) and hides the rest.
pub fn redact_token(token: &str) -> String {
    if token.is_empty() {
        return "<unset>".to_string();
    }
    match token.split_once('-') {
        Some((prefix, _)) if prefix.len() <= 5 => format!("{prefix}-***"),
        _ => "***".to_string(),
    }
}
