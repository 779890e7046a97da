//! Prompt construction: the template engine, template profile sources, the
//! conversation renderer, and system-message templates.

pub mod engine;
pub mod profile;
pub mod renderer;
pub mod system;
