//! Linking the external music account and turning a transition into a
//! playlist.
//!
//! Linking leaves the host entirely (the consent screen is a full
//! navigation). The only thing that survives the round trip is the
//! `auth_status` query parameter on the return URL, so resumption is decided
//! from that parameter plus whatever transition the host has freshly loaded.

use crate::client::{ApiClient, ApiRequest, Reply};
use crate::navigator::Navigator;
use crate::types::{Playlist, PlaylistRequest, SpotifyProfile, Transition};
use crate::{Error, ErrorReport};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use url::{form_urlencoded, Url};

pub const AUTH_STATUS_PARAM: &str = "auth_status";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistState {
    Unlinked,
    CheckingLink,
    Linked,
    CreatingPlaylist { transition_id: i64 },
    PlaylistReady(Playlist),
    Error(ErrorReport),
}

impl PlaylistState {
    /// Whether a "create playlist" trigger should be enabled.
    #[must_use]
    pub const fn can_create(&self) -> bool {
        matches!(
            self,
            Self::Linked | Self::PlaylistReady(_) | Self::Error(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    Success,
    Other(String),
}

impl AuthStatus {
    fn parse(value: &str) -> Self {
        if value == "success" {
            Self::Success
        } else {
            Self::Other(value.to_string())
        }
    }
}

/// Returns `url` without the `auth_status` parameter. Other parameters keep
/// their order and their original encoding; an emptied query is removed.
#[must_use]
pub fn strip_auth_status(url: &Url) -> Url {
    take_auth_status(url).map_or_else(|| url.clone(), |(stripped, _)| stripped)
}

/// Splits the `auth_status` parameter off `url`, or `None` if it is absent.
#[must_use]
pub fn take_auth_status(url: &Url) -> Option<(Url, AuthStatus)> {
    let query = url.query()?;
    let mut status = None;
    let kept: Vec<&str> = query
        .split('&')
        .filter(|segment| {
            let pair = form_urlencoded::parse(segment.as_bytes()).next();
            match pair {
                Some((key, value)) if key == AUTH_STATUS_PARAM => {
                    status.get_or_insert_with(|| AuthStatus::parse(&value));
                    false
                }
                _ => true,
            }
        })
        .collect();
    let status = status?;

    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.set_query(Some(&kept.join("&")));
    }
    Some((stripped, status))
}

/// What happened to the playlist request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistOutcome {
    /// Created; the host was handed off to the playlist URL.
    Created(Playlist),
    /// The server answered with a redirect; the host was handed off to it.
    Redirected(Url),
}

/// What the host should do after (re)start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    /// No return marker on the location.
    NotReturning,
    /// Returned from a successful link but there is no transition to act on.
    Linked,
    /// Returned with a non-success marker.
    Denied(String),
    /// Returned from a successful link and a playlist was requested.
    Playlist(PlaylistOutcome),
}

pub struct PlaylistFlow {
    api: ApiClient,
    state: Mutex<PlaylistState>,
    in_flight: Mutex<HashSet<i64>>,
}

/// Marks a transition as having a playlist request outstanding until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<i64>>,
    transition_id: i64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.transition_id);
        }
    }
}

impl PlaylistFlow {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Mutex::new(PlaylistState::Unlinked),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn state(&self) -> PlaylistState {
        self.state
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(PlaylistState::Unlinked)
    }

    fn set_state(&self, next: PlaylistState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    /// Asks the server whether the external account is linked. Any failure,
    /// transport included, means "not linked"; it is logged, not returned.
    pub async fn probe(&self) -> bool {
        self.set_state(PlaylistState::CheckingLink);
        match self.profile().await {
            Ok(profile) => {
                debug!(spotify_id = %profile.id, "external account linked");
                self.set_state(PlaylistState::Linked);
                true
            }
            Err(err) => {
                debug!(error = %err, "external account not linked");
                self.set_state(PlaylistState::Unlinked);
                false
            }
        }
    }

    /// Profile of the linked external account.
    ///
    /// # Errors
    /// Returns an error if the account is not linked or the request fails.
    pub async fn profile(&self) -> Result<SpotifyProfile, Error> {
        self.api.get("spotify/me").await
    }

    /// Playlists previously generated for any transition.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or response cannot be parsed.
    pub async fn list_playlists(&self) -> Result<Vec<Playlist>, Error> {
        self.api.get("spotify/playlists").await
    }

    /// Hands the host off to the external consent screen. The host comes back
    /// through the server's callback with `auth_status` on its location.
    ///
    /// # Errors
    /// Returns an error if the login URL is invalid or the host cannot navigate.
    pub fn connect(&self, navigator: &mut dyn Navigator) -> Result<(), Error> {
        let url = self.api.endpoint_url("spotify/login")?;
        info!(%url, "handing off to external consent screen");
        navigator.navigate(&url)
    }

    /// Inspects the host location for a return from [`connect`]. The marker is
    /// stripped from the location before anything else happens, so a later
    /// restart from the same location does not act on it again.
    ///
    /// On a successful return with a `transition` at hand, a playlist is
    /// requested right away.
    ///
    /// # Errors
    /// Errors from [`create_playlist`].
    ///
    /// [`connect`]: PlaylistFlow::connect
    /// [`create_playlist`]: PlaylistFlow::create_playlist
    pub async fn resume<F>(
        &self,
        navigator: &mut dyn Navigator,
        transition: Option<&Transition>,
        on_created: F,
    ) -> Result<Resume, Error>
    where
        F: FnOnce(&Playlist),
    {
        let Some((stripped, status)) = take_auth_status(&navigator.location()) else {
            return Ok(Resume::NotReturning);
        };
        navigator.replace(stripped);

        match status {
            AuthStatus::Other(value) => {
                warn!(auth_status = %value, "external link was not completed");
                Ok(Resume::Denied(value))
            }
            AuthStatus::Success => {
                self.set_state(PlaylistState::Linked);
                let Some(transition) = transition else {
                    info!("external account linked, no transition to act on");
                    return Ok(Resume::Linked);
                };
                info!(
                    transition_id = transition.id,
                    "resuming playlist creation after link"
                );
                self.create_playlist(transition, navigator, on_created)
                    .await
                    .map(Resume::Playlist)
            }
        }
    }

    /// Requests a playlist for `transition`.
    ///
    /// On success `on_created` runs first, then the host is handed off to the
    /// playlist URL. A playlist URL that does not parse is a failure and
    /// nothing is notified. A redirect answer hands the host off to the redirect
    /// target instead. Failures leave the flow in `Error`; calling again
    /// retries.
    ///
    /// # Errors
    /// `PlaylistInFlight` if a request for the same transition is still
    /// outstanding, `PlaylistCreation` on a non-2xx answer, `Network` on
    /// transport failure.
    pub async fn create_playlist<F>(
        &self,
        transition: &Transition,
        navigator: &mut dyn Navigator,
        on_created: F,
    ) -> Result<PlaylistOutcome, Error>
    where
        F: FnOnce(&Playlist),
    {
        let _guard = self.begin(transition.id)?;
        self.set_state(PlaylistState::CreatingPlaylist {
            transition_id: transition.id,
        });

        let request =
            ApiRequest::post("spotify/create-playlist").json(&PlaylistRequest::from(transition))?;
        let reply = match self.api.execute_or_redirect::<Playlist>(request).await {
            Ok(reply) => reply,
            Err(err) => {
                let err = err.into_playlist_error();
                warn!(transition_id = transition.id, error = %err, "playlist creation failed");
                self.set_state(PlaylistState::Error(ErrorReport::from(&err)));
                return Err(err);
            }
        };

        match reply {
            Reply::Body(playlist) => {
                let url = match Url::parse(&playlist.playlist_url) {
                    Ok(url) => url,
                    Err(source) => {
                        let err = Error::InvalidUrl {
                            url: playlist.playlist_url.clone(),
                            source,
                        };
                        warn!(transition_id = transition.id, error = %err, "unusable playlist url");
                        self.set_state(PlaylistState::Error(ErrorReport::from(&err)));
                        return Err(err);
                    }
                };
                info!(
                    transition_id = transition.id,
                    tracks = playlist.track_count.unwrap_or(0),
                    "playlist created"
                );
                self.set_state(PlaylistState::PlaylistReady(playlist.clone()));
                on_created(&playlist);
                navigator.navigate(&url)?;
                Ok(PlaylistOutcome::Created(playlist))
            }
            Reply::Redirect(url) => {
                // The server only redirects when the link has to be redone.
                info!(%url, "playlist request redirected");
                self.set_state(PlaylistState::Unlinked);
                navigator.navigate(&url)?;
                Ok(PlaylistOutcome::Redirected(url))
            }
        }
    }

    fn begin(&self, transition_id: i64) -> Result<InFlight<'_>, Error> {
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| Error::PlaylistInFlight { transition_id })?;
        if !set.insert(transition_id) {
            return Err(Error::PlaylistInFlight { transition_id });
        }
        Ok(InFlight {
            set: &self.in_flight,
            transition_id,
        })
    }
}
