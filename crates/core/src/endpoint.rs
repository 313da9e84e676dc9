//! Derives the socket and REST addresses for a session from the server origin.

use url::Url;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Unsupported server scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Server URL cannot carry a path: {0}")]
    CannotBeABase(String),
    #[error("Session id must not be empty")]
    EmptySessionId,
}

/// The chat server's http(s) origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    base: Url,
}

impl ServerEndpoint {
    pub fn new(base: Url) -> Result<Self, EndpointError> {
        match base.scheme() {
            "http" | "https" => {}
            other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
        }
        if base.cannot_be_a_base() {
            return Err(EndpointError::CannotBeABase(base.to_string()));
        }
        Ok(Self { base })
    }

    /// `ws(s)://host/ws/session/{id}`; a secure origin selects `wss`.
    pub fn socket_url(&self, session_id: &str) -> Result<Url, EndpointError> {
        let mut url = self.with_segments(&["ws", "session", session_id])?;
        let scheme = if self.base.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        url.set_scheme(scheme)
            .map_err(|_| EndpointError::UnsupportedScheme(scheme.to_string()))?;
        Ok(url)
    }

    /// `http(s)://host/api/session/{id}`.
    pub fn snapshot_url(&self, session_id: &str) -> Result<Url, EndpointError> {
        self.with_segments(&["api", "session", session_id])
    }

    fn with_segments(&self, segments: &[&str]) -> Result<Url, EndpointError> {
        if segments.last().is_some_and(|s| s.is_empty()) {
            return Err(EndpointError::EmptySessionId);
        }
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| EndpointError::CannotBeABase(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
