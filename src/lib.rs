//! PromptPit - Multi-model prompt arena
//!
//! This library provides the core functionality for fanning a prompt out to
//! multiple LLM providers concurrently, relaying the streamed branches over
//! SSE, and judging the results incrementally via a tool-calling model.

pub mod api;
pub mod arena;
pub mod cli;
pub mod config;
pub mod limit;
pub mod logging;
pub mod metrics;
pub mod provider;
pub mod sse;
pub mod store;
