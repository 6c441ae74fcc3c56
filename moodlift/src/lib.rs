pub mod client;
pub mod error;
pub mod navigator;
pub mod playlist;
pub mod session;
pub mod token;
pub mod types;
pub mod view;

pub use crate::client::{ApiClient, ApiRequest, ConnectionOutcome, ConnectionReport};
pub use crate::error::{Error, ErrorKind, ErrorReport, FieldError};
pub use crate::navigator::{MemoryNavigator, Navigator};
pub use crate::playlist::{PlaylistFlow, PlaylistOutcome, PlaylistState, Resume};
pub use crate::session::{Session, SessionState};
pub use crate::token::{MemoryTokenStore, TokenStore};

use crate::types::{Mood, MoodUpdate, NewMood, NewTransition, Transition, TransitionStat};

/// Typed operations over moods and transitions.
///
/// Authorization for admin operations is enforced by the server only.
#[derive(Debug, Clone)]
pub struct MoodClient {
    api: ApiClient,
}

impl MoodClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    fn require_token(&self) -> Result<(), Error> {
        if self.api.has_token() {
            Ok(())
        } else {
            Err(Error::NotAuthenticated)
        }
    }

    /// Retrieves all moods, in server order.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or response cannot be parsed.
    pub async fn list_moods(&self) -> Result<Vec<Mood>, Error> {
        self.api.get("moods").await
    }

    /// Retrieves a single mood.
    ///
    /// # Errors
    /// Returns an error if the mood does not exist or the request fails.
    pub async fn get_mood(&self, mood_id: i64) -> Result<Mood, Error> {
        self.api.get(&format!("moods/{mood_id}")).await
    }

    /// Creates a mood (admin).
    ///
    /// # Errors
    /// `Validation` if a mood with that name exists.
    pub async fn create_mood(&self, mood: &NewMood) -> Result<Mood, Error> {
        self.api
            .post("moods", mood)
            .await
            .map_err(|err| err.validation_on(&[400, 409, 422]))
    }

    /// Updates the set fields of a mood (admin).
    ///
    /// # Errors
    /// Returns an error if the mood does not exist or the request fails.
    pub async fn update_mood(&self, mood_id: i64, update: &MoodUpdate) -> Result<Mood, Error> {
        self.api
            .put(&format!("moods/{mood_id}"), update)
            .await
            .map_err(|err| err.validation_on(&[400, 422]))
    }

    /// Deletes a mood (admin).
    ///
    /// # Errors
    /// Returns an error if the mood does not exist or the request fails.
    pub async fn delete_mood(&self, mood_id: i64) -> Result<(), Error> {
        self.api.delete(&format!("moods/{mood_id}")).await
    }

    /// Records a move from one mood to another for the current user.
    ///
    /// # Errors
    /// `NotAuthenticated` if no token is stored or the server rejects it,
    /// `Validation` if either mood id is unknown.
    pub async fn create_transition(
        &self,
        initial_mood_id: i64,
        target_mood_id: i64,
    ) -> Result<Transition, Error> {
        self.require_token()?;
        let body = NewTransition {
            initial_mood_id,
            target_mood_id,
        };
        self.api
            .post("transitions", &body)
            .await
            .map_err(|err| err.unauthenticated_on_401().validation_on(&[400, 404, 422]))
    }

    /// Retrieves the current user's transitions, newest first.
    ///
    /// # Errors
    /// `NotAuthenticated` if no token is stored or the server rejects it.
    pub async fn list_transitions(&self) -> Result<Vec<Transition>, Error> {
        self.list_transitions_paged(None, None).await
    }

    /// Retrieves a window of the current user's transitions, newest first.
    ///
    /// # Arguments
    /// * `skip` - Number of newest transitions to skip
    /// * `limit` - Maximum number returned (server default 100)
    ///
    /// # Errors
    /// `NotAuthenticated` if no token is stored or the server rejects it.
    pub async fn list_transitions_paged(
        &self,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> Result<Vec<Transition>, Error> {
        self.require_token()?;
        let request = paged(ApiRequest::get("transitions"), skip, limit);
        self.api
            .execute(request)
            .await
            .map_err(Error::unauthenticated_on_401)
    }

    /// Retrieves transitions of all users. No authentication required.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or response cannot be parsed.
    pub async fn list_all_transitions(
        &self,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> Result<Vec<Transition>, Error> {
        let request = paged(ApiRequest::get("transitions/all"), skip, limit);
        self.api.execute(request).await
    }

    /// Retrieves one of the current user's transitions.
    ///
    /// # Errors
    /// `NotAuthenticated` without a token; `HttpStatus` 404 if the transition
    /// does not exist or belongs to someone else.
    pub async fn get_transition(&self, transition_id: i64) -> Result<Transition, Error> {
        self.require_token()?;
        self.api
            .get(&format!("transitions/{transition_id}"))
            .await
            .map_err(Error::unauthenticated_on_401)
    }

    /// Deletes one of the current user's transitions.
    ///
    /// # Errors
    /// `NotAuthenticated` without a token; `HttpStatus` 404 if not found.
    pub async fn delete_transition(&self, transition_id: i64) -> Result<(), Error> {
        self.require_token()?;
        self.api
            .delete(&format!("transitions/{transition_id}"))
            .await
            .map_err(Error::unauthenticated_on_401)
    }

    /// Most frequent mood pairs of the current user, most frequent first.
    ///
    /// # Errors
    /// `NotAuthenticated` if no token is stored or the server rejects it.
    pub async fn common_transitions(
        &self,
        limit: Option<u64>,
    ) -> Result<Vec<TransitionStat>, Error> {
        self.require_token()?;
        let mut request = ApiRequest::get("transitions/stats/common");
        if let Some(limit) = limit {
            request = request.query("limit", limit);
        }
        self.api
            .execute(request)
            .await
            .map_err(Error::unauthenticated_on_401)
    }
}

fn paged(mut request: ApiRequest, skip: Option<u64>, limit: Option<u64>) -> ApiRequest {
    if let Some(skip) = skip {
        request = request.query("skip", skip);
    }
    if let Some(limit) = limit {
        request = request.query("limit", limit);
    }
    request
}
