use moodlift::Navigator;
use tracing::{info, warn};
use url::Url;

/// Opens handoff URLs in the system browser and remembers the last one so
/// the Spotify panel can show it when no browser could be launched.
#[derive(Debug)]
pub struct TuiNavigator {
    location: Url,
    pub last_handoff: Option<Url>,
    pub browser_failed: bool,
}

impl TuiNavigator {
    pub const fn new(location: Url) -> Self {
        Self {
            location,
            last_handoff: None,
            browser_failed: false,
        }
    }
}

impl Navigator for TuiNavigator {
    fn location(&self) -> Url {
        self.location.clone()
    }

    fn replace(&mut self, url: Url) {
        self.location = url;
    }

    fn navigate(&mut self, url: &Url) -> Result<(), moodlift::Error> {
        info!(%url, "opening browser");
        self.browser_failed = match moodconfig::open_in_browser(url.as_str()) {
            Ok(()) => false,
            Err(err) => {
                warn!(error = %err, "could not launch browser");
                true
            }
        };
        self.last_handoff = Some(url.clone());
        self.location = url.clone();
        Ok(())
    }
}
