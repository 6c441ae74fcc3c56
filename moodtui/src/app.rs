//! Main application state and logic.

use crate::navigator::TuiNavigator;
use crate::state::{
    clamp_index, Focus, LoginForm, LoginMode, Screen, StatusKind, StatusMessage, STATUS_TTL,
};
use moodconfig::MoodConfig;
use moodlift::playlist::take_auth_status;
use moodlift::types::{Mood, Transition};
use moodlift::view::{Dashboard, SaveState};
use moodlift::{
    Error as MoodError, ErrorKind, MoodClient, Navigator, PlaylistFlow, PlaylistOutcome, Resume,
    Session,
};
use ratatui::widgets::TableState;
use std::time::Instant;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Main application state.
pub struct App {
    pub config: MoodConfig,
    pub session: Session,
    pub client: MoodClient,
    pub playlists: PlaylistFlow,
    pub navigator: TuiNavigator,
    pub dashboard: Dashboard,
    pub username: Option<String>,
    pub screen: Screen,
    pub focus: Focus,
    pub initial_cursor: usize,
    pub target_cursor: usize,
    pub history_state: TableState,
    pub status: Option<StatusMessage>,
    pub last_saved: Option<(i64, Instant)>,
}

impl App {
    pub fn new(
        config: MoodConfig,
        session: Session,
        client: MoodClient,
        playlists: PlaylistFlow,
        navigator: TuiNavigator,
    ) -> Self {
        let login = LoginForm::new(config.account.username.as_deref());
        Self {
            config,
            session,
            client,
            playlists,
            navigator,
            dashboard: Dashboard::new(),
            username: None,
            screen: Screen::Login(login),
            focus: Focus::Initial,
            initial_cursor: 0,
            target_cursor: 0,
            history_state: TableState::default(),
            status: None,
            last_saved: None,
        }
    }

    /// Goes straight to the dashboard when a session token is already stored.
    /// Data is loaded right away unless disabled in the config; a pending
    /// OAuth return always loads so it can be acted on.
    pub fn start(&mut self, runtime: &Runtime) {
        if !self.session.is_authenticated() {
            return;
        }
        let returning = take_auth_status(&self.navigator.location()).is_some();
        if self.config.tui.refresh_on_start || returning {
            self.enter_dashboard(runtime);
        } else {
            self.screen = Screen::Dashboard;
            self.set_status(StatusKind::Info, "Press r to load".to_string());
        }
    }

    pub fn set_status(&mut self, kind: StatusKind, text: String) {
        self.status = Some(StatusMessage {
            kind,
            text,
            created: Instant::now(),
        });
    }

    pub fn clear_expired_status(&mut self) {
        if let Some(status) = &self.status {
            if status.created.elapsed() > STATUS_TTL {
                self.status = None;
            }
        }
    }

    fn set_error(&mut self, err: &MoodError) {
        self.set_status(StatusKind::Error, err.message());
    }

    pub fn submit_login(&mut self, form: &mut LoginForm, runtime: &Runtime) -> bool {
        if let Some(field) = form.missing_field() {
            form.field = field;
            self.set_status(StatusKind::Info, format!("{} is required", field.label()));
            return false;
        }
        let username = form.username.buffer.trim().to_string();
        let password = form.password.buffer.clone();

        if form.mode == LoginMode::Register {
            let email = form.email.buffer.trim().to_string();
            let registered = runtime.block_on(self.session.register(&username, &email, &password));
            if let Err(err) = registered {
                self.set_error(&err);
                return false;
            }
            info!(%username, "registered from login screen");
        }

        form.busy = true;
        let result = runtime.block_on(self.session.login(&username, &password));
        form.busy = false;
        form.password.clear();
        match result {
            Ok(()) => {
                self.set_status(StatusKind::Success, format!("Logged in as {username}"));
                true
            }
            Err(err) => {
                self.set_error(&err);
                false
            }
        }
    }

    pub fn enter_dashboard(&mut self, runtime: &Runtime) {
        self.screen = Screen::Dashboard;
        match runtime.block_on(self.session.current_user()) {
            Ok(user) => self.username = Some(user.username),
            Err(MoodError::SessionExpired) => {
                self.to_login(
                    StatusKind::Error,
                    "Session expired, please log in again".to_string(),
                );
                return;
            }
            Err(err) => debug!(error = %err, "profile unavailable, continuing"),
        }

        self.refresh(runtime);
        if !matches!(self.screen, Screen::Dashboard) {
            return;
        }
        runtime.block_on(self.playlists.probe());
        self.resume_playlist(runtime);
    }

    fn to_login(&mut self, kind: StatusKind, message: String) {
        self.username = None;
        self.dashboard = Dashboard::new();
        self.screen = Screen::Login(LoginForm::new(self.config.account.username.as_deref()));
        self.set_status(kind, message);
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.to_login(StatusKind::Info, "Logged out".to_string());
    }

    /// Reloads moods and history; the mood selection is kept.
    pub fn refresh(&mut self, runtime: &Runtime) {
        runtime.block_on(self.dashboard.load(&self.client));
        self.after_history_change();
        self.initial_cursor = self.initial_cursor.min(self.mood_count().saturating_sub(1));
        self.target_cursor = self.target_cursor.min(self.mood_count().saturating_sub(1));

        let signed_out = matches!(
            self.dashboard.history.error(),
            Some(report) if report.kind == ErrorKind::NotAuthenticated
        );
        if signed_out {
            self.to_login(StatusKind::Error, "Please log in again".to_string());
        }
    }

    fn after_history_change(&mut self) {
        let len = self.history().len();
        if len == 0 {
            self.history_state.select(None);
        } else {
            let selected = self.history_state.selected().unwrap_or(0);
            self.history_state.select(Some(selected.min(len - 1)));
        }
    }

    /// Acts on a returned OAuth redirect in the start location, if any.
    fn resume_playlist(&mut self, runtime: &Runtime) {
        let mut created = None;
        let transition = self.dashboard.latest_transition().cloned();
        let result = runtime.block_on(self.playlists.resume(
            &mut self.navigator,
            transition.as_ref(),
            |playlist| created = Some(playlist.playlist_url.clone()),
        ));
        match result {
            Ok(Resume::NotReturning) => {}
            Ok(Resume::Linked) => {
                self.set_status(StatusKind::Success, "Spotify linked".to_string());
            }
            Ok(Resume::Denied(status)) => {
                let text = format!("Spotify link not completed: {status}");
                self.set_status(StatusKind::Error, text);
            }
            Ok(Resume::Playlist(outcome)) => self.report_playlist(&outcome, created),
            Err(err) => self.set_error(&err),
        }
    }

    pub fn moods(&self) -> &[Mood] {
        self.dashboard.moods.ready().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn history(&self) -> &[Transition] {
        self.dashboard.history.ready().map(Vec::as_slice).unwrap_or_default()
    }

    fn mood_count(&self) -> usize {
        self.moods().len()
    }

    pub fn move_selection(&mut self, delta: i32) {
        match self.focus {
            Focus::Initial => {
                let max = self.mood_count().saturating_sub(1);
                self.initial_cursor = clamp_index(self.initial_cursor, delta, max);
            }
            Focus::Target => {
                let max = self.mood_count().saturating_sub(1);
                self.target_cursor = clamp_index(self.target_cursor, delta, max);
            }
            Focus::History => {
                let len = self.history().len();
                if len == 0 {
                    return;
                }
                let selected = self.history_state.selected().unwrap_or(0);
                self.history_state
                    .select(Some(clamp_index(selected, delta, len - 1)));
            }
        }
    }

    /// Picks the mood under the cursor in the focused picker.
    pub fn pick(&mut self) {
        let cursor = match self.focus {
            Focus::Initial => self.initial_cursor,
            Focus::Target => self.target_cursor,
            Focus::History => return,
        };
        let Some(mood_id) = self.moods().get(cursor).map(|mood| mood.id) else {
            return;
        };
        if self.focus == Focus::Initial {
            self.dashboard.select_initial(mood_id);
            self.focus = Focus::Target;
        } else {
            self.dashboard.select_target(mood_id);
        }
    }

    pub fn reset_selection(&mut self) {
        self.dashboard.reset_selection();
        self.set_status(StatusKind::Info, "Selection cleared".to_string());
    }

    pub fn save(&mut self, runtime: &Runtime) {
        if !self.dashboard.can_save() {
            self.set_status(
                StatusKind::Info,
                "Pick how you feel now and how you'd like to feel".to_string(),
            );
            return;
        }
        let saved = runtime.block_on(self.dashboard.save(&self.client));
        if let Some(transition) = saved {
            self.last_saved = Some((transition.id, Instant::now()));
            self.history_state.select(Some(0));
            self.after_history_change();
            self.set_status(
                StatusKind::Success,
                format!(
                    "Recorded {} -> {}",
                    transition.initial_mood.name, transition.target_mood.name
                ),
            );
            return;
        }
        let failure = match &self.dashboard.save {
            SaveState::Failed(report) => Some(report.message.clone()),
            _ => None,
        };
        if let Some(text) = failure {
            self.set_status(StatusKind::Error, text);
        }
    }

    pub fn connect_spotify(&mut self) {
        match self.playlists.connect(&mut self.navigator) {
            Ok(()) => self.set_status(
                StatusKind::Info,
                "Finish linking in the browser, then restart with --location <url>".to_string(),
            ),
            Err(err) => self.set_error(&err),
        }
    }

    /// The transition a playlist would be built for: the highlighted history
    /// row, else the newest.
    pub fn playlist_transition(&self) -> Option<&Transition> {
        let history = self.history();
        self.history_state
            .selected()
            .and_then(|idx| history.get(idx))
            .or_else(|| self.dashboard.latest_transition())
    }

    pub fn create_playlist(&mut self, runtime: &Runtime) {
        if !self.playlists.state().can_create() {
            self.set_status(
                StatusKind::Info,
                "Link Spotify first (press c)".to_string(),
            );
            return;
        }
        let Some(transition) = self.playlist_transition().cloned() else {
            self.set_status(StatusKind::Info, "Record a transition first".to_string());
            return;
        };
        let mut created = None;
        let result = runtime.block_on(self.playlists.create_playlist(
            &transition,
            &mut self.navigator,
            |playlist| created = Some(playlist.playlist_url.clone()),
        ));
        match result {
            Ok(outcome) => self.report_playlist(&outcome, created),
            Err(err) => self.set_error(&err),
        }
    }

    fn report_playlist(&mut self, outcome: &PlaylistOutcome, created: Option<String>) {
        match outcome {
            PlaylistOutcome::Created(_) => {
                let url = created.unwrap_or_default();
                self.set_status(StatusKind::Success, format!("Playlist ready: {url}"));
            }
            PlaylistOutcome::Redirected(_) => self.set_status(
                StatusKind::Info,
                "Spotify needs to be linked again; finish in the browser".to_string(),
            ),
        }
    }
}
