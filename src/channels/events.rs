//! LINE webhook payload parsing.
//!
//! Converts the Messaging API webhook body into [`ChatEvent`]s. Only the
//! fields the bridge acts on are modeled; everything else is skipped by serde.

use serde::Deserialize;

use crate::error::{AgentLineError, Result};

// --- LINE webhook payload types ---

#[derive(Debug, Deserialize)]
struct WebhookBody {
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(rename = "type", default)]
    event_type: String,
    #[serde(default)]
    source: Option<RawSource>,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    webhook_event_id: Option<String>,
    #[serde(default)]
    delivery_context: Option<RawDeliveryContext>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSource {
    #[serde(rename = "type", default)]
    source_type: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default)]
    room_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "type", default)]
    message_type: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    mention: Option<RawMention>,
}

#[derive(Debug, Deserialize)]
struct RawMention {
    #[serde(default)]
    mentionees: Vec<RawMentionee>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMentionee {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    length: usize,
    #[serde(default)]
    is_self: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDeliveryContext {
    #[serde(default)]
    is_redelivery: bool,
}

// --- Domain types ---

/// What kind of event arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A text message
    TextMessage,
    /// Anything else (stickers, images, follows, joins, postbacks, ...)
    Other(String),
}

/// Where a message was posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationContext {
    /// One-to-one chat with the bot
    Direct,
    /// Group chat
    Group { group_id: String },
    /// Multi-person room
    Room { room_id: String },
}

impl ConversationContext {
    pub fn is_group_like(&self) -> bool {
        !matches!(self, ConversationContext::Direct)
    }
}

/// A user mention inside a text message.
///
/// `index` and `length` count characters (Unicode scalar values) of the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mention {
    pub index: usize,
    pub length: usize,
    /// Whether this mention targets the bot itself
    pub is_self: bool,
}

/// One inbound chat event, consumed once by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub kind: EventKind,
    pub sender_id: Option<String>,
    pub context: ConversationContext,
    pub text: String,
    pub mentions: Vec<Mention>,
    /// Platform-assigned id used to drop redeliveries
    pub webhook_event_id: Option<String>,
    pub is_redelivery: bool,
}

impl ChatEvent {
    /// Build a text message event. Mostly useful for tests and tooling.
    pub fn text_message(sender_id: &str, context: ConversationContext, text: &str) -> Self {
        Self {
            kind: EventKind::TextMessage,
            sender_id: Some(sender_id.to_string()),
            context,
            text: text.to_string(),
            mentions: Vec::new(),
            webhook_event_id: None,
            is_redelivery: false,
        }
    }

    pub fn with_mentions(mut self, mentions: Vec<Mention>) -> Self {
        self.mentions = mentions;
        self
    }

    pub fn with_event_id(mut self, id: &str) -> Self {
        self.webhook_event_id = Some(id.to_string());
        self
    }

    /// Whether any mention targets the bot.
    pub fn mentions_self(&self) -> bool {
        self.mentions.iter().any(|m| m.is_self)
    }

    /// Reply destination: group id, else room id, else the sender's user id.
    ///
    /// The destination doubles as the agent session id.
    pub fn destination(&self) -> Option<&str> {
        let chat_id = match &self.context {
            ConversationContext::Group { group_id } => Some(group_id.as_str()),
            ConversationContext::Room { room_id } => Some(room_id.as_str()),
            ConversationContext::Direct => None,
        };
        chat_id
            .filter(|id| !id.is_empty())
            .or_else(|| self.sender_id.as_deref().filter(|id| !id.is_empty()))
    }
}

impl From<RawEvent> for ChatEvent {
    fn from(raw: RawEvent) -> Self {
        let source = raw.source.unwrap_or(RawSource {
            source_type: String::new(),
            user_id: None,
            group_id: None,
            room_id: None,
        });

        let context = match source.source_type.as_str() {
            "group" => ConversationContext::Group {
                group_id: source.group_id.unwrap_or_default(),
            },
            "room" => ConversationContext::Room {
                room_id: source.room_id.unwrap_or_default(),
            },
            _ => ConversationContext::Direct,
        };

        let (kind, text, mentions) = match raw.message {
            Some(message) if raw.event_type == "message" && message.message_type == "text" => {
                let mentions = message
                    .mention
                    .map(|m| {
                        m.mentionees
                            .into_iter()
                            .map(|e| Mention {
                                index: e.index,
                                length: e.length,
                                is_self: e.is_self,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (EventKind::TextMessage, message.text, mentions)
            }
            Some(message) if raw.event_type == "message" => (
                EventKind::Other(format!("message:{}", message.message_type)),
                String::new(),
                Vec::new(),
            ),
            _ => (EventKind::Other(raw.event_type), String::new(), Vec::new()),
        };

        ChatEvent {
            kind,
            sender_id: source.user_id,
            context,
            text,
            mentions,
            webhook_event_id: raw.webhook_event_id,
            is_redelivery: raw
                .delivery_context
                .map(|d| d.is_redelivery)
                .unwrap_or(false),
        }
    }
}

/// Parse a verified webhook body into chat events, in delivery order.
pub fn parse_webhook(body: &[u8]) -> Result<Vec<ChatEvent>> {
    let parsed: WebhookBody = serde_json::from_slice(body)
        .map_err(|e| AgentLineError::Channel(format!("Malformed LINE webhook body: {}", e)))?;
    Ok(parsed.events.into_iter().map(ChatEvent::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_direct_text_message() {
        let body = r#"{
            "destination": "Ubot",
            "events": [{
                "type": "message",
                "mode": "active",
                "timestamp": 1700000000000,
                "replyToken": "r1",
                "webhookEventId": "01HEVENT",
                "deliveryContext": {"isRedelivery": false},
                "source": {"type": "user", "userId": "U123"},
                "message": {"type": "text", "id": "m1", "quoteToken": "q", "text": "こんにちは"}
            }]
        }"#;

        let events = parse_webhook(body.as_bytes()).unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.kind, EventKind::TextMessage);
        assert_eq!(event.context, ConversationContext::Direct);
        assert_eq!(event.text, "こんにちは");
        assert_eq!(event.destination(), Some("U123"));
        assert_eq!(event.webhook_event_id.as_deref(), Some("01HEVENT"));
        assert!(!event.is_redelivery);
    }

    #[test]
    fn test_parse_group_message_with_mentions() {
        let body = br#"{"events": [{
            "type": "message",
            "source": {"type": "group", "groupId": "C999", "userId": "U123"},
            "deliveryContext": {"isRedelivery": true},
            "message": {
                "type": "text",
                "text": "@Bot hello @Alice",
                "mention": {"mentionees": [
                    {"index": 0, "length": 4, "type": "user", "userId": "Ubot", "isSelf": true},
                    {"index": 11, "length": 6, "type": "user", "userId": "Ualice"}
                ]}
            }
        }]}"#;

        let events = parse_webhook(body).unwrap();
        let event = &events[0];
        assert_eq!(
            event.context,
            ConversationContext::Group {
                group_id: "C999".to_string()
            }
        );
        assert_eq!(event.destination(), Some("C999"));
        assert!(event.mentions_self());
        assert_eq!(event.mentions.len(), 2);
        assert!(!event.mentions[1].is_self);
        assert!(event.is_redelivery);
    }

    #[test]
    fn test_parse_room_destination() {
        let body = br#"{"events": [{
            "type": "message",
            "source": {"type": "room", "roomId": "R42", "userId": "U1"},
            "message": {"type": "text", "text": "hi"}
        }]}"#;
        let events = parse_webhook(body).unwrap();
        assert_eq!(events[0].destination(), Some("R42"));
    }

    #[test]
    fn test_non_text_events_are_other() {
        let body = br#"{"events": [
            {"type": "message", "source": {"type": "user", "userId": "U1"},
             "message": {"type": "sticker", "packageId": "1", "stickerId": "2"}},
            {"type": "follow", "source": {"type": "user", "userId": "U1"}}
        ]}"#;
        let events = parse_webhook(body).unwrap();
        assert_eq!(events[0].kind, EventKind::Other("message:sticker".to_string()));
        assert_eq!(events[1].kind, EventKind::Other("follow".to_string()));
    }

    #[test]
    fn test_empty_events_for_verification_ping() {
        // LINE's "Verify" button sends an empty event list
        let events = parse_webhook(br#"{"destination": "Ubot", "events": []}"#).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_malformed_body_is_channel_error() {
        assert!(matches!(
            parse_webhook(b"not json"),
            Err(AgentLineError::Channel(_))
        ));
    }

    #[test]
    fn test_group_without_id_falls_back_to_sender() {
        let event = ChatEvent::text_message(
            "U1",
            ConversationContext::Group {
                group_id: String::new(),
            },
            "hi",
        );
        assert_eq!(event.destination(), Some("U1"));
    }
}
