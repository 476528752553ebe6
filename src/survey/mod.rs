//! The survey flow engine: catalog, validation, flow resolution,
//! session state and event dispatch.

pub mod catalog;
pub mod engine;
pub mod flow;
pub mod session;
pub mod validate;

pub use engine::{EventKind, InboundEvent, Keyboard, Prompt, RespondentMeta, SurveyEngine};
