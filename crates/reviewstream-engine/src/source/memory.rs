//! In-process source over a fixed list of messages

use super::IngestionSource;
use async_trait::async_trait;
use reviewstream_core::{subscription_directive, Error, Result};
use std::collections::VecDeque;

/// Source replaying canned messages, recording what the pipeline sent back
#[derive(Debug, Default)]
pub struct MemorySource {
    messages: VecDeque<String>,
    directives: Vec<String>,
    close_reasons: Vec<String>,
    hold_open: bool,
    fail_after: Option<usize>,
    delivered: usize,
}

impl MemorySource {
    pub fn new<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            messages: messages.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Instead of reporting a closed feed once drained, wait forever
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Fail with a transport error after `n` messages were delivered
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Subscription directives received so far
    pub fn directives(&self) -> &[String] {
        &self.directives
    }

    /// Reasons passed to `close`, one entry per effective close
    pub fn close_reasons(&self) -> &[String] {
        &self.close_reasons
    }
}

#[async_trait]
impl IngestionSource for MemorySource {
    async fn subscribe(&mut self, topics: &[String]) -> Result<()> {
        self.directives
            .extend(topics.iter().map(|t| subscription_directive(t)));
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<String>> {
        if self.fail_after == Some(self.delivered) {
            return Err(Error::transport("connection reset by peer"));
        }
        match self.messages.pop_front() {
            Some(message) => {
                self.delivered += 1;
                Ok(Some(message))
            }
            None if self.hold_open => std::future::pending().await,
            None => Ok(None),
        }
    }

    async fn close(&mut self, reason: &str) -> Result<()> {
        if self.close_reasons.is_empty() {
            self.close_reasons.push(reason.to_string());
        }
        Ok(())
    }
}
