//! Application state managed via Dioxus context.
//!
//! `AppState` bundles the shared signals into a single struct provided via
//! `use_context_provider`. Child components retrieve it with `use_context::<AppState>()`.

use dioxus::prelude::*;
use ekraf_core::auth::AuthClient;
use ekraf_core::session::{AuthGateState, Session};
use ekraf_db::Backend;

/// Local-storage key holding the signed-in session.
pub const SESSION_KEY: &str = "ekraf.session";

/// Shared application state for the dashboard.
#[derive(Clone, Copy)]
pub struct AppState {
    /// Query backend (None until the app has picked one)
    pub backend: Signal<Option<Backend>>,
    /// Auth client for the hosted backend; None in demo mode
    pub auth: Signal<Option<AuthClient>>,
    pub gate: Signal<AuthGateState>,
    pub session: Signal<Option<Session>>,
    /// Whether the app is still starting up
    pub loading: Signal<bool>,
    /// Startup error, if any
    pub error_msg: Signal<Option<String>>,
    /// Bumped after a successful import so tables reload
    pub data_version: Signal<u64>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            backend: Signal::new(None),
            auth: Signal::new(None),
            gate: Signal::new(AuthGateState::default()),
            session: Signal::new(None),
            loading: Signal::new(true),
            error_msg: Signal::new(None),
            data_version: Signal::new(0),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.backend
            .peek()
            .as_ref()
            .map(Backend::is_local)
            .unwrap_or(false)
    }

    /// Record a signed-in session: persist it and attach its token to the
    /// remote backend so writes are authorized.
    pub fn sign_in(&mut self, session: Session) {
        store_session(&session);
        let token = Some(session.access_token.clone());
        let remote = match &*self.backend.peek() {
            Some(Backend::Remote(remote)) => Some(remote.with_access_token(token)),
            _ => None,
        };
        if let Some(remote) = remote {
            self.backend.set(Some(Backend::Remote(remote)));
        }
        self.gate.write().signed_in(session.user.clone());
        self.session.set(Some(session));
    }

    pub fn sign_out(&mut self) {
        clear_session();
        let remote = match &*self.backend.peek() {
            Some(Backend::Remote(remote)) => Some(remote.with_access_token(None)),
            _ => None,
        };
        if let Some(remote) = remote {
            self.backend.set(Some(Backend::Remote(remote)));
        }
        self.session.set(None);
        self.gate.write().signed_out();
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

pub fn load_session() -> Option<Session> {
    let raw = local_storage()?.get_item(SESSION_KEY).ok().flatten()?;
    match serde_json::from_str(&raw) {
        Ok(session) => Some(session),
        Err(e) => {
            log::warn!("[EKRAF] session: discarding unreadable stored session: {}", e);
            clear_session();
            None
        }
    }
}

pub fn store_session(session: &Session) {
    let Some(storage) = local_storage() else {
        return;
    };
    match serde_json::to_string(session) {
        Ok(raw) => {
            if storage.set_item(SESSION_KEY, &raw).is_err() {
                log::warn!("[EKRAF] session: local storage rejected the session");
            }
        }
        Err(e) => log::warn!("[EKRAF] session: failed to serialize session: {}", e),
    }
}

pub fn clear_session() {
    if let Some(storage) = local_storage() {
        if let Err(e) = storage.remove_item(SESSION_KEY) {
            log::warn!("[EKRAF] session: failed to clear stored session: {:?}", e);
        }
    }
}
