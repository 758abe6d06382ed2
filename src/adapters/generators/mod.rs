//! Generative text service adapters.

pub mod anthropic;
pub mod scripted;

pub use anthropic::{AnthropicConfig, AnthropicGenerator};
pub use scripted::ScriptedGenerator;
