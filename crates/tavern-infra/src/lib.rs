//! Infrastructure layer for Tavern.
//!
//! Implements the backend traits defined in `tavern-core` against remote
//! HTTP servers (an OpenAI-compatible text-generation server, Ollama and
//! Automatic1111 for vision), and loads the global configuration file.

pub mod config;
pub mod llm;
pub mod vision;
