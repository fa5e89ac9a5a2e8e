//! Configuration management for AgentLine
//!
//! Configuration is loaded from `~/.agentline/config.json` with environment
//! variable overrides. Both the `AGENTLINE_SECTION_KEY` pattern and the plain
//! deployment names (`LINE_CHANNEL_SECRET`, `TAVILY_API_KEY`, ...) are honored;
//! the `AGENTLINE_` form wins when both are set.

mod types;

pub use types::*;

use crate::error::{AgentLineError, Result};
use std::path::{Path, PathBuf};

/// Read the first non-empty environment variable among `names`.
fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|val| !val.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(names: &[&str]) -> Option<T> {
    env_first(names).and_then(|val| val.trim().parse().ok())
}

impl Config {
    /// Returns the AgentLine configuration directory path (~/.agentline)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".agentline")
    }

    /// Returns the path to the config file (~/.agentline/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        // LINE
        if let Some(val) = env_first(&["AGENTLINE_LINE_CHANNEL_SECRET", "LINE_CHANNEL_SECRET"]) {
            self.line.channel_secret = val;
        }
        if let Some(val) = env_first(&[
            "AGENTLINE_LINE_CHANNEL_ACCESS_TOKEN",
            "LINE_CHANNEL_ACCESS_TOKEN",
        ]) {
            self.line.channel_access_token = val;
        }
        if let Some(val) = env_first(&["AGENTLINE_LINE_API_BASE"]) {
            self.line.api_base = val;
        }

        // Gateway
        if let Some(val) = env_first(&["AGENTLINE_GATEWAY_HOST"]) {
            self.gateway.host = val;
        }
        if let Some(v) = env_parse(&["AGENTLINE_GATEWAY_PORT"]) {
            self.gateway.port = v;
        }
        if let Some(val) = env_first(&["AGENTLINE_GATEWAY_PATH"]) {
            self.gateway.path = val;
        }
        if let Some(v) = env_parse(&["AGENTLINE_GATEWAY_SHUTDOWN_GRACE_SECS"]) {
            self.gateway.shutdown_grace_secs = v;
        }

        // Runtime
        if let Some(val) = env_first(&["AGENTLINE_RUNTIME_URL", "AGENT_RUNTIME_URL"]) {
            self.runtime.url = val;
        }
        if let Some(v) = env_parse(&["AGENTLINE_RUNTIME_TIMEOUT_SECS"]) {
            self.runtime.timeout_secs = v;
        }
        if let Some(val) = env_first(&["AGENTLINE_RUNTIME_HOST"]) {
            self.runtime.host = val;
        }
        if let Some(v) = env_parse(&["AGENTLINE_RUNTIME_PORT"]) {
            self.runtime.port = v;
        }

        // Session
        if let Some(v) = env_parse(&["AGENTLINE_SESSION_TTL_SECS"]) {
            self.session.ttl_secs = v;
        }

        // Agent
        if let Some(val) = env_first(&["AGENTLINE_AGENT_MODEL", "MODEL_ID"]) {
            self.agent.model = val;
        }
        if let Some(v) = env_parse(&["AGENTLINE_AGENT_MAX_TOKENS"]) {
            self.agent.max_tokens = v;
        }

        // Providers
        if let Some(val) = env_first(&[
            "AGENTLINE_PROVIDERS_ANTHROPIC_API_KEY",
            "ANTHROPIC_API_KEY",
        ]) {
            let provider = self
                .providers
                .anthropic
                .get_or_insert_with(ProviderConfig::default);
            provider.api_key = Some(val);
        }
        if let Some(val) = env_first(&["AGENTLINE_PROVIDERS_ANTHROPIC_API_BASE"]) {
            let provider = self
                .providers
                .anthropic
                .get_or_insert_with(ProviderConfig::default);
            provider.api_base = Some(val);
        }

        // Tools
        if let Some(val) = env_first(&["AGENTLINE_TOOLS_WEB_SEARCH_API_KEY", "TAVILY_API_KEY"]) {
            self.tools.web_search.api_key = Some(val);
        }
        if let Some(val) = env_first(&["AGENTLINE_TOOLS_WEB_SEARCH_SEARCH_DEPTH"]) {
            self.tools.web_search.search_depth = val;
        }
        if let Some(v) = env_parse(&["AGENTLINE_TOOLS_RSS_ENABLED"]) {
            self.tools.rss.enabled = v;
        }
        if let Some(val) = env_first(&["AGENTLINE_TOOLS_RSS_DEFAULT_URL"]) {
            self.tools.rss.default_url = val;
        }
        if let Some(v) = env_parse(&["AGENTLINE_TOOLS_DOCS_ENABLED"]) {
            self.tools.docs.enabled = v;
        }
        if let Some(val) = env_first(&["AGENTLINE_TOOLS_DOCS_URL"]) {
            self.tools.docs.url = val;
        }

        // Logging
        if let Some(val) = env_first(&["AGENTLINE_LOGGING_LEVEL"]) {
            self.logging.level = val;
        }
    }

    /// Check that everything the webhook bridge needs is present.
    pub fn validate_webhook(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.line.channel_secret.trim().is_empty() {
            missing.push("line.channel_secret (LINE_CHANNEL_SECRET)");
        }
        if self.line.channel_access_token.trim().is_empty() {
            missing.push("line.channel_access_token (LINE_CHANNEL_ACCESS_TOKEN)");
        }
        if self.runtime.url.trim().is_empty() {
            missing.push("runtime.url (AGENT_RUNTIME_URL)");
        }
        if self.relay.max_message_chars == 0 {
            missing.push("relay.max_message_chars (must be > 0)");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AgentLineError::Config(format!(
                "webhook bridge is missing: {}",
                missing.join(", ")
            )))
        }
    }

    /// Check that everything the agent runtime server needs is present.
    pub fn validate_runtime(&self) -> Result<()> {
        let has_key = self
            .providers
            .anthropic
            .as_ref()
            .and_then(|p| p.api_key.as_deref())
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false);
        if !has_key {
            return Err(AgentLineError::Config(
                "agent runtime is missing: providers.anthropic.api_key (ANTHROPIC_API_KEY)"
                    .to_string(),
            ));
        }
        if self.agent.max_tool_iterations == 0 {
            return Err(AgentLineError::Config(
                "agent.max_tool_iterations must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy of this config with every secret replaced by a marker, for display.
    pub fn redacted(&self) -> Config {
        fn mask(secret: &str) -> String {
            if secret.is_empty() {
                String::new()
            } else {
                "********".to_string()
            }
        }

        let mut copy = self.clone();
        copy.line.channel_secret = mask(&copy.line.channel_secret);
        copy.line.channel_access_token = mask(&copy.line.channel_access_token);
        if let Some(provider) = copy.providers.anthropic.as_mut() {
            provider.api_key = provider.api_key.as_deref().map(mask);
        }
        copy.tools.web_search.api_key = copy.tools.web_search.api_key.as_deref().map(mask);
        copy
    }
}
