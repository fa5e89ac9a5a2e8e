//! Conversation routing: which chat events reach the agent, with what text,
//! and where the reply goes.

use std::sync::Arc;

use tracing::{info, warn};

use super::events::{ChatEvent, EventKind, Mention};
use super::{OutboundMessage, PushSender};
use crate::config::RelayConfig;
use crate::relay::{RelayOutcome, StreamRelay};
use crate::runtime::AgentRuntime;
use crate::utils::string::preview;

/// Why an event was not forwarded to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a text message
    NotText,
    /// Group or room message that does not mention the bot
    NotMentioned,
    /// No group, room or user id to reply to
    NoDestination,
    /// Nothing left to send after mention stripping
    EmptyText,
}

/// A turn ready to be sent to the agent runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedTurn {
    /// Push destination; also used as the agent session id
    pub destination: String,
    /// Text forwarded to the agent
    pub text: String,
    /// Whether the turn came from a group or room
    pub group_like: bool,
}

impl RoutedTurn {
    pub fn session_id(&self) -> &str {
        &self.destination
    }
}

/// Outcome of handling one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Skipped(SkipReason),
    Relayed(RelayOutcome),
    InvocationFailed,
}

/// Remove the bot's own mention substrings from `text`, then trim.
///
/// Offsets are character offsets. Mentions are removed from the highest index
/// down so earlier offsets stay valid; out-of-range spans are clamped.
pub fn strip_self_mentions(text: &str, mentions: &[Mention]) -> String {
    let mut chars: Vec<char> = text.chars().collect();

    let mut own: Vec<&Mention> = mentions.iter().filter(|m| m.is_self).collect();
    own.sort_by(|a, b| b.index.cmp(&a.index));

    for mention in own {
        let start = mention.index.min(chars.len());
        let end = mention.index.saturating_add(mention.length).min(chars.len());
        chars.drain(start..end);
    }

    chars.into_iter().collect::<String>().trim().to_string()
}

/// Decide whether `event` becomes an agent turn.
pub fn route_event(event: &ChatEvent) -> Result<RoutedTurn, SkipReason> {
    if event.kind != EventKind::TextMessage {
        return Err(SkipReason::NotText);
    }

    let group_like = event.context.is_group_like();
    if group_like && !event.mentions_self() {
        return Err(SkipReason::NotMentioned);
    }

    let destination = event
        .destination()
        .ok_or(SkipReason::NoDestination)?
        .to_string();

    let text = if group_like {
        strip_self_mentions(&event.text, &event.mentions)
    } else {
        event.text.clone()
    };

    if text.is_empty() {
        return Err(SkipReason::EmptyText);
    }

    Ok(RoutedTurn {
        destination,
        text,
        group_like,
    })
}

/// Drives verified webhook batches through the agent runtime and relay.
pub struct ConversationRouter {
    runtime: Arc<dyn AgentRuntime>,
    sender: Arc<dyn PushSender>,
    relay: StreamRelay,
    thinking_notice: String,
    failure_notice: String,
}

impl ConversationRouter {
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        sender: Arc<dyn PushSender>,
        config: &RelayConfig,
    ) -> Self {
        Self {
            runtime,
            relay: StreamRelay::new(Arc::clone(&sender), config),
            sender,
            thinking_notice: config.thinking_notice.clone(),
            failure_notice: config.failure_notice.clone(),
        }
    }

    /// Handle every event of one delivery, sequentially and in order.
    ///
    /// A failing turn never stops the remaining events.
    pub async fn process_batch(&self, events: Vec<ChatEvent>) -> Vec<TurnOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in &events {
            outcomes.push(self.handle_event(event).await);
        }
        outcomes
    }

    /// Handle one event end to end.
    pub async fn handle_event(&self, event: &ChatEvent) -> TurnOutcome {
        let turn = match route_event(event) {
            Ok(turn) => turn,
            Err(reason) => {
                if reason == SkipReason::NotMentioned {
                    info!("Skipping group message without bot mention");
                }
                return TurnOutcome::Skipped(reason);
            }
        };

        info!(
            sender = event.sender_id.as_deref().unwrap_or(""),
            destination = %turn.destination,
            text = %preview(&turn.text, 100),
            "Routing message to agent"
        );

        self.show_working(&turn).await;

        match self.runtime.invoke(&turn.text, turn.session_id()).await {
            Ok(lines) => TurnOutcome::Relayed(self.relay.run(&turn.destination, lines).await),
            Err(e) => {
                warn!(destination = %turn.destination, error = %e, "Agent runtime invocation failed");
                if let Err(e) = self
                    .sender
                    .push(OutboundMessage::new(&turn.destination, &self.failure_notice))
                    .await
                {
                    warn!(destination = %turn.destination, error = %e, "Failed to deliver failure notice");
                }
                TurnOutcome::InvocationFailed
            }
        }
    }

    async fn show_working(&self, turn: &RoutedTurn) {
        let result = if turn.group_like {
            self.sender
                .push(OutboundMessage::new(&turn.destination, &self.thinking_notice))
                .await
        } else {
            self.sender.show_loading(&turn.destination).await
        };
        if let Err(e) = result {
            warn!(destination = %turn.destination, error = %e, "Working indicator failed");
        }
    }
}
