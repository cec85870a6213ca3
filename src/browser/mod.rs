// Headless window model: the current location plus a history stack that
// records how each entry was reached.

use url::Url;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NavigationError {
    /// Carries the parser's reason only; URLs may hold credentials.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Cannot change history to a different origin: {0}")]
    CrossOrigin(String),
    #[error("Too many redirects while navigating to {0}")]
    RedirectLoop(String),
}

/// Parsed form of `window.location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Scheme with trailing colon, e.g. `https:`.
    pub protocol: String,
    pub hostname: String,
    /// `None` when the URL uses the scheme's default port.
    pub port: Option<u16>,
    pub pathname: String,
    /// Empty or `?query`.
    pub search: String,
    /// Empty or `#fragment`.
    pub hash: String,
}

impl Location {
    pub fn parse(href: &str) -> Result<Self, NavigationError> {
        let url = Url::parse(href).map_err(|e| NavigationError::InvalidUrl(e.to_string()))?;
        Ok(Self::from_url(&url))
    }

    fn from_url(url: &Url) -> Self {
        Self {
            protocol: format!("{}:", url.scheme()),
            hostname: url.host_str().unwrap_or_default().to_ascii_lowercase(),
            port: url.port(),
            pathname: url.path().to_string(),
            search: url.query().map(|q| format!("?{q}")).unwrap_or_default(),
            hash: url.fragment().map(|f| format!("#{f}")).unwrap_or_default(),
        }
    }

    /// `hostname[:port]`
    pub fn host(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.hostname, port),
            None => self.hostname.clone(),
        }
    }

    pub fn origin(&self) -> String {
        format!("{}//{}", self.protocol, self.host())
    }

    pub fn href(&self) -> String {
        format!("{}{}{}{}", self.origin(), self.pathname, self.search, self.hash)
    }

    /// Path and query without the fragment, as the router sees it.
    pub fn route_path(&self) -> String {
        format!("{}{}", self.pathname, self.search)
    }

    /// Fragment without the leading `#`.
    pub fn fragment(&self) -> &str {
        self.hash.strip_prefix('#').unwrap_or(&self.hash)
    }

    /// Resolve an absolute URL or a path against this location.
    pub fn resolve(&self, target: &str) -> Result<Location, NavigationError> {
        let base = Url::parse(&self.href())
            .map_err(|e| NavigationError::InvalidUrl(e.to_string()))?;
        let url = base
            .join(target)
            .map_err(|e| NavigationError::InvalidUrl(e.to_string()))?;
        Ok(Self::from_url(&url))
    }
}

/// The subset of `window` navigation the client needs.
pub trait Navigator {
    fn location(&self) -> &Location;

    /// Full navigation; may leave the current origin.
    fn assign(&mut self, url: &str) -> Result<(), NavigationError>;

    /// Same-origin history entry replacement, no page load.
    fn replace_state(&mut self, path: &str) -> Result<(), NavigationError>;

    /// Same-origin history push, no page load.
    fn push_state(&mut self, path: &str) -> Result<(), NavigationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Load,
    Push,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub location: Location,
    pub kind: EntryKind,
}

/// In-memory `Navigator` used by the CLI driver and the tests.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl History {
    pub fn new(href: &str) -> Result<Self, NavigationError> {
        let location = Location::parse(href)?;
        Ok(Self {
            entries: vec![HistoryEntry {
                location,
                kind: EntryKind::Load,
            }],
            cursor: 0,
        })
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.cursor]
    }

    /// Number of full page loads recorded, including the initial one.
    pub fn load_count(&self) -> usize {
        self.entries.iter().filter(|e| e.kind == EntryKind::Load).count()
    }

    pub fn back(&mut self) -> Option<&Location> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.entries[self.cursor].location)
    }

    pub fn forward(&mut self) -> Option<&Location> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(&self.entries[self.cursor].location)
    }

    fn push(&mut self, location: Location, kind: EntryKind) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistoryEntry { location, kind });
        self.cursor = self.entries.len() - 1;
    }

    fn same_origin(&self, path: &str) -> Result<Location, NavigationError> {
        let current = self.location();
        let next = current.resolve(path)?;
        if next.origin() != current.origin() {
            return Err(NavigationError::CrossOrigin(next.origin()));
        }
        Ok(next)
    }
}

impl Navigator for History {
    fn location(&self) -> &Location {
        &self.entries[self.cursor].location
    }

    fn assign(&mut self, url: &str) -> Result<(), NavigationError> {
        let next = self.location().resolve(url)?;
        tracing::debug!(origin = %next.origin(), path = %next.pathname, "full navigation");
        self.push(next, EntryKind::Load);
        Ok(())
    }

    fn replace_state(&mut self, path: &str) -> Result<(), NavigationError> {
        let next = self.same_origin(path)?;
        self.entries[self.cursor] = HistoryEntry {
            location: next,
            kind: EntryKind::Replace,
        };
        Ok(())
    }

    fn push_state(&mut self, path: &str) -> Result<(), NavigationError> {
        let next = self.same_origin(path)?;
        self.push(next, EntryKind::Push);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_omits_default_port() {
        let loc = Location::parse("https://App.Example.com:443/login").unwrap();
        assert_eq!(loc.origin(), "https://app.example.com");
        assert_eq!(loc.port, None);

        let loc = Location::parse("http://localhost:5173/dashboard?tab=1#x").unwrap();
        assert_eq!(loc.origin(), "http://localhost:5173");
        assert_eq!(loc.route_path(), "/dashboard?tab=1");
        assert_eq!(loc.fragment(), "x");
    }

    #[test]
    fn replace_state_rejects_other_origins() {
        let mut history = History::new("https://app.example.com/login").unwrap();
        let err = history.replace_state("https://acme.example.com/login").unwrap_err();
        assert_eq!(err, NavigationError::CrossOrigin("https://acme.example.com".to_string()));
    }

    #[test]
    fn replace_state_keeps_entry_count() {
        let mut history = History::new("https://acme.example.com/login#session=abc").unwrap();
        history.replace_state("/login").unwrap();
        assert_eq!(history.entries().len(), 1);
        assert_eq!(history.location().href(), "https://acme.example.com/login");
        assert_eq!(history.current().kind, EntryKind::Replace);
    }

    #[test]
    fn push_truncates_forward_entries() {
        let mut history = History::new("https://acme.example.com/").unwrap();
        history.push_state("/dashboard").unwrap();
        history.push_state("/billing").unwrap();
        assert_eq!(history.back().unwrap().pathname, "/dashboard");
        history.push_state("/login").unwrap();
        assert!(history.forward().is_none());
        assert_eq!(history.entries().len(), 3);
    }

    #[test]
    fn assign_counts_as_page_load() {
        let mut history = History::new("https://app.example.com/login").unwrap();
        history.assign("https://acme.example.com/login#session=x").unwrap();
        assert_eq!(history.load_count(), 2);
        assert_eq!(history.location().hostname, "acme.example.com");
    }

    #[test]
    fn invalid_url_errors_omit_the_url() {
        let mut history = History::new("https://app.example.com/login").unwrap();
        let err = history.assign("https://acme example.com/login#session=c2VjcmV0").unwrap_err();
        assert!(matches!(err, NavigationError::InvalidUrl(_)));
        assert!(!err.to_string().contains("session="));

        let err = Location::parse("https://acme example.com/#session=c2VjcmV0").unwrap_err();
        assert!(!err.to_string().contains("c2VjcmV0"));
    }
}
