use moodlift::Navigator;
use tracing::{debug, warn};
use url::Url;

/// Hands URLs to the system browser. The "location" is the URL the command
/// was started from (a returned OAuth redirect, or the configured return URL).
pub struct BrowserNavigator {
    location: Url,
    open: bool,
}

impl BrowserNavigator {
    pub const fn new(location: Url, open: bool) -> Self {
        Self { location, open }
    }
}

impl Navigator for BrowserNavigator {
    fn location(&self) -> Url {
        self.location.clone()
    }

    fn replace(&mut self, url: Url) {
        debug!(%url, "location replaced");
        self.location = url;
    }

    fn navigate(&mut self, url: &Url) -> Result<(), moodlift::Error> {
        println!("Open in your browser: {url}");
        if self.open {
            if let Err(err) = moodconfig::open_in_browser(url.as_str()) {
                warn!(error = %err, "could not launch browser");
                eprintln!("Could not launch a browser ({err}); open the URL above manually.");
            }
        }
        self.location = url.clone();
        Ok(())
    }
}
