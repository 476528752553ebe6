//! Intake service integration: the canonical submission document and the
//! two-call HTTP client (authenticate, then submit).

pub mod client;
pub mod document;

pub use client::IntakeClient;
pub use document::{ResponseEntry, RespondentProfile, SubmissionDocument};

use async_trait::async_trait;

use crate::error::SubmissionError;

/// Where completed surveys go. The engine only needs this seam; the
/// HTTP client implements it, tests substitute a recorder.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(&self, doc: &SubmissionDocument) -> Result<(), SubmissionError>;
}
