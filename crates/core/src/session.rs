//! Session identity: the session id the client owns and the user id the server assigns.

use crate::locator::{Locator, SESSION_PARAM, query_param, with_session_id};
use rand::Rng;
use tracing::{debug, info, warn};

const ID_PREFIX: &str = "session_";
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Generates a fresh opaque session id, e.g. `session_k3j9x0a2b`.
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{ID_PREFIX}{suffix}")
}

/// The session id/user id pair for the current conversation.
///
/// The session id is never empty. It only changes through [`SessionIdentity::rotate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    session_id: String,
    user_id: Option<String>,
}

impl SessionIdentity {
    /// Resumes the session named in the locator, or starts a new one.
    ///
    /// A synthesized id is written back with `replace`, so reloading the same
    /// entry resumes it without adding a history entry.
    pub fn resolve<L: Locator + ?Sized>(locator: &mut L) -> Self {
        if let Some(session_id) = query_param(locator.current(), SESSION_PARAM) {
            info!(%session_id, "Resuming session from locator");
            return Self {
                session_id,
                user_id: None,
            };
        }

        let session_id = generate_session_id();
        let next = with_session_id(locator.current(), &session_id);
        locator.replace(next);
        info!(%session_id, "Started new session");
        Self {
            session_id,
            user_id: None,
        }
    }

    /// Replaces this identity with a brand new session and pushes it onto the locator.
    pub fn rotate<L: Locator + ?Sized>(&mut self, locator: &mut L) {
        let mut session_id = generate_session_id();
        while session_id == self.session_id {
            session_id = generate_session_id();
        }
        let next = with_session_id(locator.current(), &session_id);
        locator.push(next);
        info!(previous = %self.session_id, %session_id, "Rotated session");
        self.session_id = session_id;
        self.user_id = None;
    }

    /// Records the user id the server assigned to this session.
    pub fn adopt(&mut self, user_id: &str) {
        match self.user_id.as_deref() {
            Some(current) if current == user_id => {
                debug!(user_id, "User id re-adopted");
            }
            Some(current) => {
                warn!(current, user_id, "Server reassigned the user id");
                self.user_id = Some(user_id.to_string());
            }
            None => self.user_id = Some(user_id.to_string()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}
