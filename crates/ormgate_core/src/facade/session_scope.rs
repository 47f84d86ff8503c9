//! Scoped session acquisition with guaranteed release.

use crate::error::{OrmError, OrmResult};
use crate::runtime::{Session, SessionFactory};
use log::{error, warn};

/// Owns one session and closes it exactly once, on `close` or on drop.
///
/// Close failures are logged and never reach the caller.
pub struct SessionScope {
    session: Box<dyn Session>,
    closed: bool,
}

impl SessionScope {
    /// Opens a session from `factory`.
    ///
    /// Failure yields no session at all: callers get `SessionOpen` and have
    /// nothing to operate on.
    pub fn open(factory: &dyn SessionFactory) -> OrmResult<Self> {
        match factory.open_session() {
            Ok(session) => Ok(Self {
                session,
                closed: false,
            }),
            Err(err) => {
                error!(
                    "event=session_open module=facade status=error error_code=session_open_failed error={}",
                    err
                );
                Err(OrmError::SessionOpen(err))
            }
        }
    }

    pub fn session(&self) -> &dyn Session {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> &mut dyn Session {
        self.session.as_mut()
    }

    /// Closes the session now instead of at drop.
    pub fn close(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.session.close() {
            warn!(
                "event=session_close module=facade status=warn error={}",
                err
            );
        }
    }
}

impl Drop for SessionScope {
    fn drop(&mut self) {
        self.close_once();
    }
}
