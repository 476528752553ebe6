//! CLI channel — stdin/stdout REPL for local testing.
//!
//! Inline buttons can't be pressed in a terminal, so their callback
//! data is printed and a line starting with `:` replays it as a
//! selection (e.g. `:start_survey`).

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, EventStream};
use crate::error::ChannelError;
use crate::survey::{EventKind, InboundEvent, Keyboard, Prompt, RespondentMeta};

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Map one input line to an engine event kind.
fn parse_line(line: &str) -> EventKind {
    if let Some(rest) = line.strip_prefix('/') {
        let name = rest.split_whitespace().next().unwrap_or_default();
        EventKind::Command(name.to_string())
    } else if let Some(data) = line.strip_prefix(':') {
        EventKind::Selection(data.trim().to_string())
    } else {
        EventKind::Text(line.to_string())
    }
}

fn local_event(kind: EventKind) -> InboundEvent {
    InboundEvent {
        respondent_id: "local-user".to_string(),
        kind,
        meta: RespondentMeta {
            display_name: "Local User".to_string(),
            user_id: 0,
            locale: None,
            platform: "cli".to_string(),
        },
        metadata: serde_json::json!({}),
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        if tx.send(local_event(parse_line(&line))).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn present(
        &self,
        _event: &InboundEvent,
        prompts: &[Prompt],
    ) -> Result<(), ChannelError> {
        for prompt in prompts {
            println!("\n{}", prompt.text);
            match &prompt.keyboard {
                Keyboard::Reply(rows) => {
                    for row in rows {
                        println!("  [{}]", row.join("] ["));
                    }
                }
                Keyboard::Inline(rows) => {
                    for (label, data) in rows.iter().flatten() {
                        println!("  {label}  (введите :{data})");
                    }
                }
                Keyboard::Remove | Keyboard::None => {}
            }
        }
        eprint!("> ");
        Ok(())
    }
}
