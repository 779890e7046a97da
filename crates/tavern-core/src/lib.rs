//! Conversation logic for Tavern.
//!
//! Memory stores and the prompt rendering pipeline, plus the backend traits
//! that the infrastructure layer implements. This crate depends only on
//! `tavern-types` -- never on `tavern-infra` or any HTTP crate.

pub mod chat;
pub mod llm;
pub mod memory;
pub mod model_config;
pub mod preset;
pub mod prompt;
pub mod text;
pub mod urls;
