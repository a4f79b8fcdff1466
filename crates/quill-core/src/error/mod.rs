//! Error types for Quill
//!
//! Two layers of errors live here:
//! - `QuillError`: crate-wide failures (configuration, IO, serialization, HTTP setup)
//! - `OrchestrationError`: the classified outcome of a failed completion call
//!
//! Both implement `UnifiedError`, which exposes an error code, a message and
//! the retry decision in one place.

mod orchestration;
mod types;
mod user_messages;

pub use orchestration::{ErrorKind, OrchestrationError, ProviderFailure};
pub use types::{QuillError, QuillResult, UnifiedError};
pub use user_messages::{ErrorCategory, UserFriendlyError};
