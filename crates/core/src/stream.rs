//! Reassembles incrementally streamed response tokens into one committed message.

use crate::view::{Counters, ViewEvent, ViewPort};
use tracing::debug;

/// The in-progress response.
///
/// At most one stream is ever active, and an inactive buffer is always empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StreamAggregator {
    active: bool,
    text: String,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Appends one token. The view always receives the whole buffer so partial
    /// renders are replacements, not appends.
    pub fn on_token(&mut self, token: &str, view: &mut dyn ViewPort) {
        if self.active {
            self.text.push_str(token);
            view.notify(ViewEvent::TypingUpdated(self.text.clone()));
        } else {
            self.active = true;
            self.text = token.to_string();
            view.notify(ViewEvent::TypingStarted(self.text.clone()));
        }
    }

    /// Finishes the current stream. Returns the committed text, if any.
    ///
    /// An end without a preceding token, or a stream of empty tokens, commits nothing.
    pub fn on_end(&mut self, counters: &mut Counters, view: &mut dyn ViewPort) -> Option<String> {
        if !self.active {
            debug!("Stream end without an active stream. Ignoring.");
            return None;
        }
        view.notify(ViewEvent::TypingStopped);
        let text = std::mem::take(&mut self.text);
        self.active = false;
        if text.is_empty() {
            return None;
        }

        counters.messages += 1;
        view.notify(ViewEvent::AssistantMessage(text.clone()));
        view.notify(ViewEvent::CountersChanged(*counters));
        Some(text)
    }

    /// Discards any partial stream without committing it.
    pub fn on_connection_lost(&mut self, view: &mut dyn ViewPort) {
        if self.active {
            debug!(discarded = self.text.len(), "Discarding partial stream");
            view.notify(ViewEvent::TypingStopped);
        }
        self.active = false;
        self.text.clear();
    }
}
