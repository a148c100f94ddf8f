//! Per-browser session state
//!
//! Each browser gets a session cookie on first visit. The record behind it
//! holds the onboarding flag, the chat history, the live log buffer and the
//! current prompt text. Sessions live in memory only and are dropped after a
//! period of inactivity.

use crate::logview::clean_ansi;
use crate::pipeline::ContractResult;
use crate::prompts;
use axum::http::{header, HeaderMap};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "contract_studio_session";

/// One prompt and the contract it produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exchange {
    pub prompt: String,
    pub contract: ContractResult,
}

/// Mutable UI state of one browser session
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    /// Whether the onboarding screen is still shown
    pub show_instructions: bool,
    /// Completed prompt/contract exchanges, oldest first
    pub chat_history: Vec<Exchange>,
    /// Log text of the current or most recent run, ANSI codes removed
    pub crew_log: String,
    /// Current content of the prompt text area
    pub chat_input: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            show_instructions: true,
            chat_history: Vec::new(),
            crew_log: String::new(),
            chat_input: String::new(),
        }
    }
}

impl SessionState {
    pub fn dismiss_instructions(&mut self) {
        self.show_instructions = false;
    }

    /// Overwrite the prompt text with an example; returns the example text
    pub fn apply_example(&mut self, index: usize) -> Option<&'static str> {
        let example = prompts::example(index)?;
        self.chat_input = example.prompt.to_string();
        Some(example.prompt)
    }

    /// Clear the log buffer ahead of a new run
    pub fn begin_run(&mut self, prompt: &str) {
        self.chat_input = prompt.to_string();
        self.crew_log.clear();
    }

    /// Replace the log buffer with the cleaned text of a log update
    pub fn record_log(&mut self, raw: &str) -> &str {
        self.crew_log = clean_ansi(raw);
        &self.crew_log
    }

    /// Settle the log buffer once the pipeline returns.
    ///
    /// An absent or empty final log keeps the streamed text.
    pub fn finish_log(&mut self, final_log: Option<&str>) -> &str {
        match final_log {
            Some(text) if !text.is_empty() => self.crew_log = clean_ansi(text),
            _ => self.crew_log = clean_ansi(&self.crew_log),
        }
        &self.crew_log
    }

    pub fn record_exchange(&mut self, prompt: impl Into<String>, contract: ContractResult) {
        self.chat_history.push(Exchange {
            prompt: prompt.into(),
            contract,
        });
    }
}

/// A session record and its bookkeeping
#[derive(Debug)]
pub struct Session {
    id: String,
    state: Mutex<SessionState>,
    last_seen: Mutex<Instant>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState::default()),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run `f` with exclusive access to the state.
    ///
    /// A panic while holding the lock does not make the session unusable.
    pub fn with_state<T>(&self, f: impl FnOnce(&mut SessionState) -> T) -> T {
        self.touch();
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.with_state(|state| state.clone())
    }

    fn touch(&self) {
        let mut last_seen = self
            .last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last_seen = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .elapsed()
    }
}

/// All live sessions, keyed by cookie value
pub struct SessionStore {
    sessions: DashMap<String, Arc<Session>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store that expires sessions idle for longer than `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Find the session named by the request cookie, creating one if needed.
    ///
    /// The flag is `true` when a new session was created and the cookie
    /// must be set on the response.
    pub fn resolve(&self, headers: &HeaderMap) -> (Arc<Session>, bool) {
        if let Some(id) = session_id_from_headers(headers) {
            if let Some(session) = self.get(&id) {
                return (session, false);
            }
        }

        let session = Arc::new(Session::new(Uuid::new_v4().to_string()));
        self.sessions
            .insert(session.id().to_string(), Arc::clone(&session));
        debug!(session = session.id(), "Created session");
        (session, true)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|s| Arc::clone(s.value()))
    }

    /// Discard a session; returns whether it existed
    pub fn remove(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Get the number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if there are no live sessions
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle for longer than the TTL; returns how many were dropped
    pub fn sweep_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.idle_for() <= self.ttl);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            info!(removed, remaining = self.sessions.len(), "Expired idle sessions");
        }
        removed
    }
}

/// Read the session id out of the request's `Cookie` headers
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value establishing a session
pub fn session_cookie(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}
