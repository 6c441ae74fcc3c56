//! View state for screens that show moods and transition history.
//!
//! Each slot is a single tagged state, so "loading" and "failed" can never be
//! observed at once.

use crate::types::{Mood, Transition};
use crate::{Error, ErrorReport, MoodClient};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState<T> {
    #[default]
    Idle,
    Loading,
    Ready(T),
    Failed(ErrorReport),
}

impl<T> LoadState<T> {
    #[must_use]
    pub fn from_result(result: Result<T, Error>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(err) => Self::Failed(ErrorReport::from(&err)),
        }
    }

    #[must_use]
    pub const fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn error(&self) -> Option<&ErrorReport> {
        match self {
            Self::Failed(report) => Some(report),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
    Saved(Transition),
    Failed(ErrorReport),
}

/// The mood-picking screen: two pickers, the user's history, and the result
/// of the last save.
///
/// The selection is independent of loaded data and only changes through
/// `select_*` and `reset_selection`.
#[derive(Debug, Default)]
pub struct Dashboard {
    pub moods: LoadState<Vec<Mood>>,
    pub history: LoadState<Vec<Transition>>,
    pub save: SaveState,
    initial: Option<i64>,
    target: Option<i64>,
}

impl Dashboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads moods and history concurrently. The two requests may finish in
    /// either order; each writes only its own slot.
    pub async fn load(&mut self, client: &MoodClient) {
        self.moods = LoadState::Loading;
        self.history = LoadState::Loading;
        let (moods, history) = tokio::join!(client.list_moods(), client.list_transitions());
        self.moods = LoadState::from_result(moods);
        self.history = LoadState::from_result(history);
    }

    pub async fn reload_history(&mut self, client: &MoodClient) {
        self.history = LoadState::Loading;
        self.history = LoadState::from_result(client.list_transitions().await);
    }

    pub fn select_initial(&mut self, mood_id: i64) {
        self.initial = Some(mood_id);
    }

    pub fn select_target(&mut self, mood_id: i64) {
        self.target = Some(mood_id);
    }

    pub fn reset_selection(&mut self) {
        self.initial = None;
        self.target = None;
    }

    #[must_use]
    pub const fn selection(&self) -> (Option<i64>, Option<i64>) {
        (self.initial, self.target)
    }

    #[must_use]
    pub fn initial_mood(&self) -> Option<&Mood> {
        self.find_mood(self.initial?)
    }

    #[must_use]
    pub fn target_mood(&self) -> Option<&Mood> {
        self.find_mood(self.target?)
    }

    fn find_mood(&self, id: i64) -> Option<&Mood> {
        self.moods.ready()?.iter().find(|mood| mood.id == id)
    }

    /// Both selected moods, once both are picked and known.
    #[must_use]
    pub fn summary(&self) -> Option<(&Mood, &Mood)> {
        Some((self.initial_mood()?, self.target_mood()?))
    }

    #[must_use]
    pub const fn can_save(&self) -> bool {
        self.initial.is_some() && self.target.is_some() && !matches!(self.save, SaveState::Saving)
    }

    /// Records the selected pair, then reloads history once the save has
    /// resolved. Returns the created transition.
    pub async fn save(&mut self, client: &MoodClient) -> Option<Transition> {
        let (Some(initial), Some(target)) = (self.initial, self.target) else {
            self.save = SaveState::Failed(ErrorReport::from(Error::IncompleteSelection));
            return None;
        };
        self.save = SaveState::Saving;
        match client.create_transition(initial, target).await {
            Ok(transition) => {
                self.save = SaveState::Saved(transition.clone());
                self.reload_history(client).await;
                Some(transition)
            }
            Err(err) => {
                self.save = SaveState::Failed(ErrorReport::from(&err));
                None
            }
        }
    }

    /// The transition a playlist should be built from: the one just saved,
    /// else the newest in history.
    #[must_use]
    pub fn latest_transition(&self) -> Option<&Transition> {
        match &self.save {
            SaveState::Saved(transition) => Some(transition),
            _ => self.history.ready()?.first(),
        }
    }
}
