//! Signed-in user model and the auth gate state machine.
//!
//! Session checks and sign-in calls belong to the remote auth service; the
//! gate only tracks which of its three screens to show.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl User {
    /// Display name, falling back to the email address.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthForm {
    Login,
    Register,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthGateState {
    CheckingSession,
    Unauthenticated(AuthForm),
    Authenticated(User),
}

impl Default for AuthGateState {
    fn default() -> Self {
        AuthGateState::CheckingSession
    }
}

impl AuthGateState {
    /// Result of the initial session check.
    pub fn session_checked(&mut self, user: Option<User>) {
        *self = match user {
            Some(user) => AuthGateState::Authenticated(user),
            None => AuthGateState::Unauthenticated(AuthForm::Login),
        };
    }

    /// Switch between the login and register forms; no-op elsewhere.
    pub fn toggle_form(&mut self) {
        if let AuthGateState::Unauthenticated(form) = self {
            *form = match form {
                AuthForm::Login => AuthForm::Register,
                AuthForm::Register => AuthForm::Login,
            };
        }
    }

    pub fn signed_in(&mut self, user: User) {
        *self = AuthGateState::Authenticated(user);
    }

    pub fn signed_out(&mut self) {
        *self = AuthGateState::Unauthenticated(AuthForm::Login);
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            AuthGateState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}
