//! Channel abstraction for survey I/O.
//!
//! A channel turns platform updates into [`InboundEvent`]s and renders
//! the engine's [`Prompt`]s back to the conversation.

pub mod cli;
pub mod telegram;

pub use cli::CliChannel;
pub use telegram::TelegramChannel;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;
use crate::survey::{InboundEvent, Prompt};

/// Stream of inbound events produced by a running channel.
pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start listening and return the stream of inbound events.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Render prompts back to the conversation the event came from.
    async fn present(&self, event: &InboundEvent, prompts: &[Prompt])
        -> Result<(), ChannelError>;
}
