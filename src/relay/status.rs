//! Tool name to user-visible status text.

use std::collections::HashMap;

use crate::config::RelayConfig;

const FALLBACK_TEMPLATE: &str = "{tool} を実行しています...";

const DEFAULT_STATUS: &[(&str, &str)] = &[
    ("current_time", "現在時刻を確認しています..."),
    ("web_search", "ウェブ検索しています..."),
    ("search_documentation", "AWSドキュメントを検索しています..."),
    ("read_documentation", "AWSドキュメントを読んでいます..."),
    ("recommend", "関連ドキュメントを探しています..."),
    ("rss", "AWS What's New RSSを取得しています..."),
];

/// Maps tool names to the notice pushed while the tool runs.
#[derive(Debug, Clone)]
pub struct ToolStatusMap {
    entries: HashMap<String, String>,
    fallback: String,
}

impl Default for ToolStatusMap {
    fn default() -> Self {
        Self {
            entries: DEFAULT_STATUS
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect(),
            fallback: FALLBACK_TEMPLATE.to_string(),
        }
    }
}

impl ToolStatusMap {
    /// Built-in table extended (or overridden) by `relay.tool_status`, with
    /// `relay.status_fallback` as the template for unknown tools.
    pub fn from_config(config: &RelayConfig) -> Self {
        let mut map = Self::default();
        map.entries.extend(
            config
                .tool_status
                .iter()
                .map(|(name, text)| (name.clone(), text.clone())),
        );
        if !config.status_fallback.is_empty() {
            map.fallback = config.status_fallback.clone();
        }
        map
    }

    /// Status text for `tool_name`. Unknown names use the fallback template.
    pub fn describe(&self, tool_name: &str) -> String {
        match self.entries.get(tool_name) {
            Some(text) => text.clone(),
            None => self.fallback.replace("{tool}", tool_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tools() {
        let map = ToolStatusMap::default();
        assert_eq!(map.describe("current_time"), "現在時刻を確認しています...");
        assert_eq!(map.describe("web_search"), "ウェブ検索しています...");
        assert_eq!(
            map.describe("rss"),
            "AWS What's New RSSを取得しています..."
        );
    }

    #[test]
    fn test_unknown_tool_uses_template() {
        let map = ToolStatusMap::default();
        assert_eq!(map.describe("calculator"), "calculator を実行しています...");
        assert_eq!(map.describe("unknown"), "unknown を実行しています...");
    }

    #[test]
    fn test_from_config_overrides() {
        let mut config = RelayConfig::default();
        config
            .tool_status
            .insert("web_search".to_string(), "検索中...".to_string());
        config
            .tool_status
            .insert("calendar".to_string(), "予定を確認しています...".to_string());
        config.status_fallback = "Running {tool}...".to_string();

        let map = ToolStatusMap::from_config(&config);
        assert_eq!(map.describe("web_search"), "検索中...");
        assert_eq!(map.describe("calendar"), "予定を確認しています...");
        assert_eq!(map.describe("current_time"), "現在時刻を確認しています...");
        assert_eq!(map.describe("shell"), "Running shell...");
    }

    #[test]
    fn test_from_default_config_matches_builtin() {
        let map = ToolStatusMap::from_config(&RelayConfig::default());
        assert_eq!(map.describe("recommend"), "関連ドキュメントを探しています...");
        assert_eq!(map.describe("x"), "x を実行しています...");
    }
}
