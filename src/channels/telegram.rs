//! Telegram channel — long-polls the Bot API for updates.
//!
//! Converts messages and callback queries into engine events and
//! renders prompts as reply/inline keyboards.

use async_trait::async_trait;

use crate::channels::{Channel, EventStream};
use crate::error::ChannelError;
use crate::survey::{EventKind, InboundEvent, Keyboard, Prompt, RespondentMeta};

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: String,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: String, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    /// Send one prompt, splitting text that exceeds Telegram's limit.
    /// The keyboard rides on the last chunk.
    async fn send_prompt(&self, chat_id: &str, prompt: &Prompt) -> Result<(), ChannelError> {
        let chunks = split_message(&prompt.text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if i == last {
                if let Some(markup) = reply_markup(&prompt.keyboard) {
                    body["reply_markup"] = markup;
                }
            }

            let resp = self
                .client
                .post(self.api_url("sendMessage"))
                .json(&body)
                .send()
                .await
                .map_err(|e| ChannelError::SendFailed {
                    name: "telegram".into(),
                    reason: e.to_string(),
                })?;

            if !resp.status().is_success() {
                let status = resp.status();
                let err = resp.text().await.unwrap_or_default();
                return Err(ChannelError::SendFailed {
                    name: "telegram".into(),
                    reason: format!("sendMessage returned {status}: {err}"),
                });
            }
        }
        Ok(())
    }

    /// Stop the "loading" spinner on a pressed inline button.
    async fn ack_callback(&self, callback_id: &str) {
        let body = serde_json::json!({ "callback_query_id": callback_id });
        if let Err(e) = self
            .client
            .post(self.api_url("answerCallbackQuery"))
            .json(&body)
            .send()
            .await
        {
            tracing::debug!("answerCallbackQuery failed: {e}");
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let bot_token = self.bot_token.clone();
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();
        let acker = TelegramChannel::new(bot_token.clone(), vec![]);

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let url = format!("https://api.telegram.org/bot{bot_token}/getUpdates");
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                if let Some(results) = data.get("result").and_then(serde_json::Value::as_array) {
                    for update in results {
                        if let Some(uid) =
                            update.get("update_id").and_then(serde_json::Value::as_i64)
                        {
                            offset = uid + 1;
                        }

                        let Some((event, callback_id)) = event_from_update(update) else {
                            continue;
                        };

                        let mut identities = vec![event.respondent_id.as_str()];
                        if let Some(username) =
                            event.metadata.get("username").and_then(|v| v.as_str())
                        {
                            identities.push(username);
                        }
                        if !check_user_allowed(&allowed_users, identities) {
                            tracing::warn!(
                                respondent = %event.respondent_id,
                                "Telegram: ignoring update from unauthorized user"
                            );
                            continue;
                        }

                        if let Some(id) = callback_id {
                            acker.ack_callback(&id).await;
                        }

                        if tx.send(event).is_err() {
                            tracing::info!("Telegram listener channel closed");
                            return;
                        }
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn present(
        &self,
        event: &InboundEvent,
        prompts: &[Prompt],
    ) -> Result<(), ChannelError> {
        let chat_id = event
            .metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "No chat_id in event metadata".into(),
            })?;

        for prompt in prompts {
            self.send_prompt(chat_id, prompt).await?;
        }
        Ok(())
    }
}

// ── Update parsing ──────────────────────────────────────────────────

/// Convert one `getUpdates` entry into an engine event. Returns the
/// callback query id alongside, so the caller can acknowledge it.
fn event_from_update(update: &serde_json::Value) -> Option<(InboundEvent, Option<String>)> {
    if let Some(query) = update.get("callback_query") {
        let data = query.get("data").and_then(|v| v.as_str())?;
        let from = query.get("from")?;
        let chat_id = query
            .get("message")
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(serde_json::Value::as_i64)?;
        let callback_id = query.get("id").and_then(|v| v.as_str()).map(String::from);

        let event = build_event(from, chat_id, EventKind::Selection(data.to_string()));
        return Some((event, callback_id));
    }

    let message = update.get("message")?;
    let text = message.get("text").and_then(|v| v.as_str())?;
    let from = message.get("from")?;
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)?;

    let kind = match text.strip_prefix('/') {
        Some(rest) => {
            // `/command arg` → command name only; args are not used.
            let name = rest.split_whitespace().next().unwrap_or_default();
            EventKind::Command(name.to_string())
        }
        None => EventKind::Text(text.to_string()),
    };

    Some((build_event(from, chat_id, kind), None))
}

fn build_event(from: &serde_json::Value, chat_id: i64, kind: EventKind) -> InboundEvent {
    let user_id = from.get("id").and_then(serde_json::Value::as_i64).unwrap_or_default();
    let first_name = from.get("first_name").and_then(|v| v.as_str()).unwrap_or_default();
    let last_name = from.get("last_name").and_then(|v| v.as_str());
    let username = from.get("username").and_then(|v| v.as_str());
    let locale = from
        .get("language_code")
        .and_then(|v| v.as_str())
        .map(String::from);

    let display_name = match last_name {
        Some(last) => format!("{first_name} {last}"),
        None => first_name.to_string(),
    };

    InboundEvent {
        respondent_id: user_id.to_string(),
        kind,
        meta: RespondentMeta {
            display_name,
            user_id,
            locale,
            platform: "telegram".to_string(),
        },
        metadata: serde_json::json!({
            "chat_id": chat_id.to_string(),
            "username": username,
        }),
    }
}

// ── Keyboard rendering ──────────────────────────────────────────────

/// Render a prompt keyboard as Telegram `reply_markup` JSON.
fn reply_markup(keyboard: &Keyboard) -> Option<serde_json::Value> {
    match keyboard {
        Keyboard::None => None,
        Keyboard::Remove => Some(serde_json::json!({ "remove_keyboard": true })),
        Keyboard::Reply(rows) => Some(serde_json::json!({
            "keyboard": rows,
            "resize_keyboard": true,
        })),
        Keyboard::Inline(rows) => {
            let buttons: Vec<Vec<serde_json::Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|(label, data)| {
                            serde_json::json!({ "text": label, "callback_data": data })
                        })
                        .collect()
                })
                .collect();
            Some(serde_json::json!({ "inline_keyboard": buttons }))
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts at the last
/// char boundary. `max_len` is in bytes; the text is mostly Cyrillic, so
/// the cut point must never land inside a multi-byte character.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut boundary = max_len;
        while !remaining.is_char_boundary(boundary) {
            boundary -= 1;
        }

        let chunk = &remaining[..boundary];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(boundary);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { boundary } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
