//! WebSocket review feed

use super::IngestionSource;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reviewstream_core::{subscription_directive, Error, Result};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Connection to the push feed. Returned by [`WebSocketSource::connect`] and
/// owned by whoever drives the pipeline; closing it is explicit.
pub struct WebSocketSource {
    url: String,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl WebSocketSource {
    /// Open a connection to `url` (`ws://` or `wss://`)
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| Error::transport(format!("Failed to connect to {url}: {e}")))?;
        info!(url = %url, status = %response.status(), "WebSocket opened");

        Ok(Self {
            url: url.to_string(),
            stream,
            closed: false,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IngestionSource for WebSocketSource {
    async fn subscribe(&mut self, topics: &[String]) -> Result<()> {
        for topic in topics {
            let directive = subscription_directive(topic);
            debug!(directive = %directive, "Sending subscription");
            self.stream
                .send(Message::Text(directive))
                .await
                .map_err(|e| Error::transport(format!("Failed to subscribe to {topic}: {e}")))?;
        }
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<String>> {
        if self.closed {
            return Ok(None);
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(frame))) => {
                    match frame {
                        Some(frame) => {
                            info!(code = %frame.code, reason = %frame.reason, "WebSocket closed by server")
                        }
                        None => info!("WebSocket closed by server"),
                    }
                    self.closed = true;
                    return Ok(None);
                }
                Some(Ok(Message::Binary(data))) => {
                    warn!(len = data.len(), "Skipping binary message");
                }
                Some(Ok(_)) => {
                    // Ping/pong and raw frames are handled by tungstenite
                }
                Some(Err(tungstenite::Error::ConnectionClosed)) | None => {
                    self.closed = true;
                    return Ok(None);
                }
                Some(Err(tungstenite::Error::Utf8)) => {
                    warn!("Skipping message with invalid UTF-8");
                }
                Some(Err(e)) => {
                    return Err(Error::transport(format!("WebSocket error: {e}")));
                }
            }
        }
    }

    async fn close(&mut self, reason: &str) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        info!("Closing WebSocket connection...");
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_string().into(),
        };
        match self.stream.close(Some(frame)).await {
            Ok(()) => {
                info!("WebSocket closed");
                Ok(())
            }
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(Error::transport(format!(
                "Error closing WebSocket connection: {e}"
            ))),
        }
    }
}
