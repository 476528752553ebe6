//! Cadre Survey — Telegram questionnaire bot for the corporate talent pool.

pub mod channels;
pub mod config;
pub mod error;
pub mod intake;
pub mod survey;
