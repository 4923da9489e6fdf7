//! Live-connection registry.
//!
//! Owned by the server loop; tracks every accepted connection, answers
//! logged-in-name lookups for USERS and INVITE, and drives shutdown. The
//! connection count is published on a watch channel so shutdown (and tests)
//! can wait for the registry to drain without holding a reference to it.

use std::collections::HashMap;

use tokio::sync::watch;

use crate::net::inbound::ConnId;
use crate::session::Session;

pub struct SessionRegistry {
    sessions: HashMap<ConnId, Session>,
    count: watch::Sender<usize>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            sessions: HashMap::new(),
            count,
        }
    }

    pub fn register(&mut self, session: Session) {
        self.sessions.insert(session.conn_id(), session);
        self.count.send_replace(self.sessions.len());
    }

    /// Remove a connection. Dropping the returned session closes its
    /// outbound channel, which lets the writer task (and so the socket)
    /// wind down.
    pub fn unregister(&mut self, conn_id: ConnId) -> Option<Session> {
        let session = self.sessions.remove(&conn_id);
        // send_replace updates the value even with no subscriber yet, so a
        // waiter created later still sees the true count.
        self.count.send_replace(self.sessions.len());
        session
    }

    pub fn get(&self, conn_id: ConnId) -> Option<&Session> {
        self.sessions.get(&conn_id)
    }

    pub fn get_mut(&mut self, conn_id: ConnId) -> Option<&mut Session> {
        self.sessions.get_mut(&conn_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// The unique connection logged in under `name`, if any.
    /// Names are compared byte-for-byte; the scan is linear.
    pub fn lookup(&self, name: &str) -> Option<ConnId> {
        self.sessions
            .values()
            .find(|s| s.player() == Some(name))
            .map(|s| s.conn_id())
    }

    /// Names of all currently logged-in players.
    pub fn logged_in_players(&self) -> Vec<String> {
        self.sessions
            .values()
            .filter_map(|s| s.player().map(str::to_string))
            .collect()
    }

    /// A handle that resolves once the registry has drained to zero.
    /// Any number of waiters may be outstanding.
    pub fn empty_waiter(&self) -> EmptyWaiter {
        EmptyWaiter {
            rx: self.count.subscribe(),
        }
    }

    /// Cancel every connection's token.
    ///
    /// The read tasks observe cancellation and exit as if the peer had
    /// closed the socket; each then reports `Disconnected` and the server
    /// loop unregisters it. Nothing is removed here.
    pub fn shutdown_all(&self) {
        for session in self.sessions.values() {
            session.cancel();
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Future handle onto the registry count; see
/// [`SessionRegistry::empty_waiter`].
pub struct EmptyWaiter {
    rx: watch::Receiver<usize>,
}

impl EmptyWaiter {
    /// Wait until the registry is empty. Returns immediately if it already
    /// is; also returns if the registry itself has been dropped.
    pub async fn wait(mut self) {
        let _ = self.rx.wait_for(|n| *n == 0).await;
    }
}
