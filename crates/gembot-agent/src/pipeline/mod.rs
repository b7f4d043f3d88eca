//! Channel-agnostic response pipeline.
//!
//! Chat adapters turn platform events into an [`IncomingMessage`], wrap the
//! reply side in a [`ChatSurface`] and hand both to
//! [`ResponsePipeline::handle_incoming_message`].

pub mod message;
pub mod process;
pub mod surface;

pub use message::{IncomingMessage, FALLBACK_PROMPT};
pub use process::{Outcome, ResponsePipeline, APOLOGY};
pub use surface::{ChatSurface, SurfaceError};
