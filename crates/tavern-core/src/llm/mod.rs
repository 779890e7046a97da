//! Completion and chat backend abstractions for Tavern.
//!
//! - `CompletionBackend`: prompt string in, raw text out
//! - `ChatBackend`: message list in, one typed message out
//! - `BoxCompletionBackend` / `BoxChatBackend`: object-safe wrappers for
//!   runtime backend selection
//!
//! Implementations live in tavern-infra.

pub mod backend;
pub mod box_backend;

pub use backend::{ChatBackend, CompletionBackend};
pub use box_backend::{BoxChatBackend, BoxCompletionBackend};
