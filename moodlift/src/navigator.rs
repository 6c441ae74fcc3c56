use crate::Error;
use url::Url;

/// The host's notion of "the page": where it was opened and how it leaves.
///
/// `navigate` hands control to another URL entirely (any in-memory state is
/// considered lost). `replace` rewrites the visible location without
/// navigating.
pub trait Navigator {
    fn location(&self) -> Url;

    fn replace(&mut self, url: Url);

    /// # Errors
    /// Returns an error if the host cannot hand off to `url`.
    fn navigate(&mut self, url: &Url) -> Result<(), Error>;
}

/// Records navigations instead of performing them.
#[derive(Debug, Clone)]
pub struct MemoryNavigator {
    location: Url,
    visited: Vec<Url>,
}

impl MemoryNavigator {
    #[must_use]
    pub const fn new(location: Url) -> Self {
        Self {
            location,
            visited: Vec::new(),
        }
    }

    /// Every URL passed to `navigate`, oldest first.
    #[must_use]
    pub fn visited(&self) -> &[Url] {
        &self.visited
    }
}

impl Navigator for MemoryNavigator {
    fn location(&self) -> Url {
        self.location.clone()
    }

    fn replace(&mut self, url: Url) {
        self.location = url;
    }

    fn navigate(&mut self, url: &Url) -> Result<(), Error> {
        self.visited.push(url.clone());
        self.location = url.clone();
        Ok(())
    }
}
