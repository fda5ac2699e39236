use url::Url;

use canmon_core::{MonitorError, Result};

/// Fixed path of the streaming channel on the serving host.
pub const CHANNEL_PATH: &str = "/ws";

/// WebSocket endpoint derived from the origin that serves the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint(Url);

impl Endpoint {
    /// `https` maps to `wss`, `http` to `ws`. Host and port are kept, the
    /// path becomes [`CHANNEL_PATH`], query and fragment are dropped.
    pub fn from_origin(origin: &str) -> Result<Self> {
        let mut url = Url::parse(origin.trim())
            .map_err(|e| MonitorError::InvalidOrigin(format!("{origin}: {e}")))?;

        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(MonitorError::InvalidOrigin(format!(
                    "{origin}: unsupported scheme {other}"
                )))
            }
        };
        if matches!(url.host_str(), None | Some("")) {
            return Err(MonitorError::InvalidOrigin(format!("{origin}: missing host")));
        }

        url.set_scheme(scheme)
            .map_err(|()| MonitorError::InvalidOrigin(format!("{origin}: cannot use {scheme}")))?;
        url.set_path(CHANNEL_PATH);
        url.set_query(None);
        url.set_fragment(None);
        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_secure(&self) -> bool {
        self.0.scheme() == "wss"
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}
