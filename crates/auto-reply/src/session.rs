//! Activation flag and per-participant authorization state.
//!
//! [`SessionStore`] is constructed once at startup and shared behind an
//! `Arc`. Everything lives in a single [`Session`] guarded by one
//! `std::sync::Mutex`; the lock is never held across `.await` points, so the
//! blocking mutex is fine inside async handlers.

use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard},
};

use {
    porter_common::ParticipantId,
    secrecy::{ExposeSecret, Secret},
};

/// Result of [`Session::begin_auth_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequest {
    /// The participant now has a pending password prompt.
    Pending,
    /// The participant already has access; nothing changed.
    AlreadyAuthorized,
}

/// Result of [`Session::resolve_auth_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAttempt {
    /// Password matched; the participant moved to the authorized set.
    Granted,
    /// Password did not match; the participant is still pending.
    Rejected,
    /// There was no pending request for this participant.
    NotPending,
}

/// Counts exposed for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub active: bool,
    pub pending: usize,
    pub authorized: usize,
}

/// The state itself. Reached through [`SessionStore::with_session`] when a
/// caller needs several reads and writes to happen under one lock.
pub struct Session {
    secret: Secret<String>,
    active: bool,
    pending_auth: HashSet<ParticipantId>,
    authorized: HashSet<ParticipantId>,
}

impl Session {
    fn new(secret: Secret<String>) -> Self {
        Self {
            secret,
            active: false,
            pending_auth: HashSet::new(),
            authorized: HashSet::new(),
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn begin_auth_request(&mut self, pid: &ParticipantId) -> AuthRequest {
        if self.authorized.contains(pid) {
            return AuthRequest::AlreadyAuthorized;
        }
        self.pending_auth.insert(pid.clone());
        AuthRequest::Pending
    }

    /// Compare `supplied` against the secret for a pending participant.
    ///
    /// Exact, case-sensitive comparison. A wrong password leaves the request
    /// open; there is no attempt counter.
    pub fn resolve_auth_request(&mut self, pid: &ParticipantId, supplied: &str) -> AuthAttempt {
        if !self.pending_auth.contains(pid) {
            return AuthAttempt::NotPending;
        }
        if supplied != self.secret.expose_secret() {
            return AuthAttempt::Rejected;
        }
        self.pending_auth.remove(pid);
        self.authorized.insert(pid.clone());
        AuthAttempt::Granted
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_pending(&self, pid: &ParticipantId) -> bool {
        self.pending_auth.contains(pid)
    }

    pub fn is_authorized(&self, pid: &ParticipantId) -> bool {
        self.authorized.contains(pid)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            active: self.active,
            pending: self.pending_auth.len(),
            authorized: self.authorized.len(),
        }
    }
}

/// Thread-safe handle over a [`Session`].
pub struct SessionStore {
    inner: Mutex<Session>,
}

impl SessionStore {
    /// A fresh, inactive store that grants access to holders of `secret`.
    pub fn new(secret: Secret<String>) -> Self {
        Self {
            inner: Mutex::new(Session::new(secret)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        // Every mutation is a single insert/remove/assign, so a panic elsewhere
        // cannot leave the sets half-updated; keep serving.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` with exclusive access to the session.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn activate(&self) {
        self.lock().activate();
    }

    pub fn deactivate(&self) {
        self.lock().deactivate();
    }

    pub fn begin_auth_request(&self, pid: &ParticipantId) -> AuthRequest {
        self.lock().begin_auth_request(pid)
    }

    pub fn resolve_auth_request(&self, pid: &ParticipantId, supplied: &str) -> AuthAttempt {
        self.lock().resolve_auth_request(pid, supplied)
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_active()
    }

    pub fn is_pending(&self, pid: &ParticipantId) -> bool {
        self.lock().is_pending(pid)
    }

    pub fn is_authorized(&self, pid: &ParticipantId) -> bool {
        self.lock().is_authorized(pid)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("secret", &"[REDACTED]")
            .field("state", &self.snapshot())
            .finish()
    }
}
