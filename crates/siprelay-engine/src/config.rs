//! Forwarding-engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the forwarding engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardConfig {
    /// Name this hop writes into the Via headers it adds
    pub local_name: String,

    /// Port this hop writes into the Via headers it adds
    pub local_port: u16,

    /// Drop replies whose top Via does not name this proxy
    pub check_own_via: bool,

    /// Additional names this proxy listens as, for reply Via checking
    pub aliases: Vec<String>,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        ForwardConfig {
            local_name: "127.0.0.1".to_string(),
            local_port: 5060,
            check_own_via: false,
            aliases: Vec::new(),
        }
    }
}

impl ForwardConfig {
    /// Create a configuration for a specific local name and port.
    pub fn new(local_name: impl Into<String>, local_port: u16) -> Self {
        ForwardConfig {
            local_name: local_name.into(),
            local_port,
            ..Default::default()
        }
    }

    /// Enable reply Via checking.
    pub fn with_via_checking(mut self) -> Self {
        self.check_own_via = true;
        self
    }

    /// Add a listening alias.
    pub fn with_alias(mut self, name: impl Into<String>) -> Self {
        self.aliases.push(name.into());
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.local_name.is_empty() {
            return Err("local name must not be empty".to_string());
        }
        if self.local_port == 0 {
            return Err("local port must be greater than 0".to_string());
        }
        Ok(())
    }
}
