//! Ingestion sources
//!
//! A source delivers raw feed messages one at a time. The caller pulls the
//! next message only after it has finished with the previous one, which is
//! the only flow control the feed sees.

use async_trait::async_trait;
use reviewstream_core::Result;

pub mod memory;
pub mod websocket;

pub use memory::MemorySource;
pub use websocket::WebSocketSource;

/// Reason sent with a normal-closure close frame
pub const CLOSE_REASON: &str = "Shutting down";

/// Long-lived connection to the review feed
#[async_trait]
pub trait IngestionSource: Send {
    /// Send one `topic:{name}` directive per topic
    async fn subscribe(&mut self, topics: &[String]) -> Result<()>;

    /// Wait for the next text message. `Ok(None)` means the feed closed.
    async fn next_message(&mut self) -> Result<Option<String>>;

    /// Close the connection with a normal-closure code and `reason`.
    /// Closing twice is a no-op.
    async fn close(&mut self, reason: &str) -> Result<()>;
}
