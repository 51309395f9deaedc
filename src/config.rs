use std::time::Duration;

use url::Url;

use crate::Result;

const DEFAULT_PATH: &str = "/";
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Configuration for the connection wrapper.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Path used to derive the target when no explicit `url` is given
    pub path: String,
    /// Explicit connection target; when set it is used verbatim and `path` is ignored
    pub url: Option<Url>,
    /// Wait between detecting closure and the single scheduled retry
    pub reconnect_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: DEFAULT_PATH.to_owned(),
            url: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Where the owning context lives and whether it was reached over a secure
/// transport.
///
/// Passed in explicitly at construction instead of read from ambient globals,
/// so the wrapper stays testable in isolation.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Origin {
    /// Host (and optional port) of the owning context
    pub host: String,
    /// Whether the owning context itself was loaded over a secure scheme
    pub secure: bool,
}

impl Origin {
    #[must_use]
    pub fn new<S: Into<String>>(host: S, secure: bool) -> Self {
        Self {
            host: host.into(),
            secure,
        }
    }
}

impl Config {
    /// Resolve the connection target.
    ///
    /// An explicit `url` wins and is used verbatim. Otherwise the target is
    /// derived from the origin host and the configured path, with the secure
    /// scheme selected exactly when the origin itself is secure.
    pub fn endpoint(&self, origin: &Origin) -> Result<Url> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let scheme = if origin.secure { "wss" } else { "ws" };
        Ok(Url::parse(&format!(
            "{scheme}://{}{}",
            origin.host, self.path
        ))?)
    }
}
