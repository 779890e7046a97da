//! Shared domain types for Tavern.
//!
//! This crate contains the domain types used across the Tavern toolkit:
//! chat messages and their roles, the pluggable tokenizer, template profiles,
//! character personas, backend request/response shapes, configuration, and
//! the associated error types.
//!
//! No I/O and no async -- only serde, regex, rand, thiserror.

pub mod character;
pub mod config;
pub mod error;
pub mod llm;
pub mod message;
pub mod template;
pub mod tokenizer;
pub mod vision;
