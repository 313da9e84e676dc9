//! Routes inbound frames to the session, the stream aggregator, and the view.

use crate::{
    protocol::ServerFrame,
    session::SessionIdentity,
    stream::StreamAggregator,
    view::{Counters, TranscriptEntry, ViewEvent, ViewPort},
};
use tracing::{debug, warn};

/// What happened to one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The frame was understood and acted on.
    Routed,
    /// The frame parsed but carried a tag this client does not handle.
    Ignored,
    /// The frame was not valid protocol and was dropped.
    Dropped,
}

/// The state a frame may touch. Borrowed from the controller for one dispatch.
pub struct Conversation<'a> {
    pub identity: &'a mut SessionIdentity,
    pub stream: &'a mut StreamAggregator,
    pub counters: &'a mut Counters,
    pub transcript: &'a mut Vec<TranscriptEntry>,
    pub view: &'a mut dyn ViewPort,
}

/// Parses and routes one raw frame.
///
/// Total by construction: malformed input is dropped with a diagnostic and
/// never reaches the connection lifecycle.
pub fn dispatch(raw: &str, conv: Conversation<'_>) -> Dispatch {
    match ServerFrame::parse(raw) {
        Ok(frame) => route(frame, conv),
        Err(e) => {
            warn!(error = %e, frame = raw, "Dropping malformed frame");
            Dispatch::Dropped
        }
    }
}

/// Routes an already parsed frame.
pub fn route(frame: ServerFrame, conv: Conversation<'_>) -> Dispatch {
    let Conversation {
        identity,
        stream,
        counters,
        transcript,
        view,
    } = conv;

    match frame {
        ServerFrame::System { message } => view.notify(ViewEvent::Notice(message)),
        ServerFrame::SessionInfo {
            session_id,
            user_id,
        } => {
            if session_id != identity.session_id() {
                warn!(
                    local = identity.session_id(),
                    remote = %session_id,
                    "Server echoed a different session id"
                );
            }
            identity.adopt(&user_id);
            view.notify(ViewEvent::SessionChanged {
                session_id: identity.session_id().to_string(),
                user_id: identity.user_id().map(str::to_string),
            });
            view.notify(ViewEvent::Notice(format!("Session ID: {session_id}")));
        }
        ServerFrame::StreamToken { token } => stream.on_token(&token, view),
        ServerFrame::StreamEnd => {
            if let Some(text) = stream.on_end(counters, view) {
                transcript.push(TranscriptEntry::Assistant(text));
            }
        }
        ServerFrame::ToolResult { tool_name, result } => {
            counters.tool_calls += 1;
            transcript.push(TranscriptEntry::Tool {
                tool_name: tool_name.clone(),
                result: result.clone(),
            });
            view.notify(ViewEvent::ToolResult { tool_name, result });
            view.notify(ViewEvent::CountersChanged(*counters));
        }
        ServerFrame::Error { message } => view.notify(ViewEvent::Notice(format!("Error: {message}"))),
        ServerFrame::Unknown => {
            debug!("Ignoring frame with unknown type");
            return Dispatch::Ignored;
        }
    }
    Dispatch::Routed
}
