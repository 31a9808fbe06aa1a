//! TikTok VSL carousel generator.
//!
//! One run takes a product brief and produces a 10-slide carousel: an LLM
//! writes the script, hosted image models render each slide through a
//! per-role fallback chain, and FFmpeg burns the captions on.

pub mod backend;
pub mod cli;
pub mod config;
pub mod formatter;
pub mod llm;
pub mod orchestrator;
pub mod overlay;
pub mod pipeline;
pub mod script;
pub mod types;
pub mod utils;

pub use config::Config;
pub use pipeline::{RunSummary, launch};
