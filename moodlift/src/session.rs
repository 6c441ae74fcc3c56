//! Login state on top of the token store.

use crate::client::{ApiClient, ApiRequest};
use crate::token::TokenStore;
use crate::types::{AccessToken, NewUser, User};
use crate::Error;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
    /// Last login attempt failed; carries the message to surface.
    AuthError(String),
}

/// The single writer of the token store.
///
/// `is_authenticated` only reports that a token is stored. Whether the
/// server still accepts it is learned on the next call to [`current_user`],
/// which clears the store on a 401.
///
/// Concurrent `login` calls are not coordinated; callers keep at most one in
/// flight.
///
/// [`current_user`]: Session::current_user
pub struct Session {
    api: ApiClient,
    state: Mutex<SessionState>,
}

impl Session {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let state = if api.has_token() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        };
        Self {
            api,
            state: Mutex::new(state),
        }
    }

    fn tokens(&self) -> &Arc<dyn TokenStore> {
        self.api.tokens()
    }

    fn set_state(&self, next: SessionState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    /// Current state. A token removed behind our back reads as `Anonymous`.
    #[must_use]
    pub fn state(&self) -> SessionState {
        let state = self
            .state
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(SessionState::Anonymous);
        match state {
            SessionState::Authenticated if !self.tokens().has() => SessionState::Anonymous,
            other => other,
        }
    }

    /// Whether a token is stored. No I/O.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tokens().has()
    }

    /// Creates an account. Does not log in.
    ///
    /// # Errors
    /// `Validation` when the server rejects the fields (duplicate username,
    /// malformed email), `Network` on transport failure.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, Error> {
        let body = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = ApiRequest::post("auth/register").json(&body)?.anonymous();
        let user: User = self
            .api
            .execute(request)
            .await
            .map_err(|err| err.validation_on(&[400, 409, 422]))?;
        info!(username = %user.username, "registered account");
        Ok(user)
    }

    /// Exchanges credentials for a token and stores it.
    ///
    /// # Errors
    /// Returns the server's rejection (wrong credentials surface its message)
    /// or `Network`; the session then sits in `AuthError`.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), Error> {
        self.set_state(SessionState::Authenticating);
        let request = ApiRequest::post("auth/login")
            .form([("username", username), ("password", password)])
            .anonymous();

        let result = match self.api.execute::<AccessToken>(request).await {
            Ok(token) => self.tokens().set(&token.access_token),
            Err(err) => Err(err.validation_on(&[422])),
        };

        match result {
            Ok(()) => {
                self.set_state(SessionState::Authenticated);
                info!(%username, "logged in");
                Ok(())
            }
            Err(err) => {
                warn!(%username, error = %err, "login failed");
                self.set_state(SessionState::AuthError(err.message()));
                Err(err)
            }
        }
    }

    /// Fetches the profile behind the stored token.
    ///
    /// # Errors
    /// `NotAuthenticated` without a request when no token is stored;
    /// `SessionExpired` on a 401, after clearing the token; any other failure
    /// is returned as-is and leaves the token in place.
    pub async fn current_user(&self) -> Result<User, Error> {
        if !self.tokens().has() {
            return Err(Error::NotAuthenticated);
        }
        match self.api.get::<User>("auth/me").await {
            Ok(user) => {
                self.set_state(SessionState::Authenticated);
                Ok(user)
            }
            Err(err) if err.is_unauthorized() => {
                info!("stored token rejected, clearing session");
                self.tokens().clear();
                self.set_state(SessionState::Anonymous);
                Err(Error::SessionExpired)
            }
            Err(err) => {
                debug!(error = %err, "profile fetch failed, keeping token");
                Err(err)
            }
        }
    }

    /// Drops the stored token. Cannot fail.
    pub fn logout(&self) {
        self.tokens().clear();
        self.set_state(SessionState::Anonymous);
        info!("logged out");
    }
}
