//! Reply side of a chat platform, bound to the event being answered.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
#[error("reply failed: {0}")]
pub struct SurfaceError(pub String);

#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Show a typing indicator until [`stop_typing`](Self::stop_typing).
    fn start_typing(&self);

    fn stop_typing(&self);

    /// Post `text` as a reply to the originating message.
    async fn reply(&self, text: &str) -> Result<(), SurfaceError>;
}
