//! `current_time` tool.

use async_trait::async_trait;
use chrono::{FixedOffset, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::error::{AgentLineError, Result};

use super::{Tool, ToolContext};

/// Returns the current time as RFC 3339, in UTC unless an offset is given.
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "現在時刻をISO 8601形式で返します。既定はUTCです。utc_offset_hours を指定するとその時差で返します（例: JSTは9）。"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "utc_offset_hours": {
                    "type": "integer",
                    "description": "UTCからの時差（時間単位、-12〜14）",
                    "minimum": -12,
                    "maximum": 14
                }
            }
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let now = Utc::now();
        match args.get("utc_offset_hours").and_then(Value::as_i64) {
            None => Ok(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Some(hours) => {
                let offset = offset_from_hours(hours)?;
                Ok(now
                    .with_timezone(&offset)
                    .to_rfc3339_opts(SecondsFormat::Secs, true))
            }
        }
    }
}

fn offset_from_hours(hours: i64) -> Result<FixedOffset> {
    if !(-12..=14).contains(&hours) {
        return Err(AgentLineError::Tool(format!(
            "utc_offset_hours out of range: {}",
            hours
        )));
    }
    // Range checked above, so the multiplication fits in i32.
    FixedOffset::east_opt(hours as i32 * 3600)
        .ok_or_else(|| AgentLineError::Tool(format!("invalid UTC offset: {}", hours)))
}
