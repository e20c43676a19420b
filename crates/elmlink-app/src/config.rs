//! Project configuration (`elm-link.toml`)
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 9870
//! token = "s3cret"
//!
//! [[targets]]
//! name = "app"
//! stylesheets = ["assets/app.css"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use elmlink_core::prelude::*;

/// Default config file name, looked up in the project directory
pub const CONFIG_FILE_NAME: &str = "elm-link.toml";

/// Default server port
pub const DEFAULT_PORT: u16 = 9870;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub server: ServerSettings,
    pub targets: Vec<TargetSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            targets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Connect with `wss` instead of `ws`
    pub secure: bool,
    /// WebSocket path on the server
    pub path: String,
    /// Shared secret; `None` for servers that don't require one
    pub token: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            secure: false,
            path: "/".to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetSettings {
    pub name: String,
    /// Stylesheets hot-reloaded for this target (paths or URLs the CSS
    /// fetcher understands)
    pub stylesheets: Vec<String>,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            stylesheets: Vec::new(),
        }
    }
}

/// Load settings from `<project_dir>/elm-link.toml`.
///
/// A missing file yields defaults; running without a config file is the
/// normal first-use experience. A present-but-broken file is an error.
pub fn load_settings(project_dir: &Path) -> Result<Settings> {
    let path = project_dir.join(CONFIG_FILE_NAME);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("no {CONFIG_FILE_NAME} in {}, using defaults", project_dir.display());
            return Ok(Settings::default());
        }
        Err(err) => return Err(err.into()),
    };
    toml::from_str(&text).map_err(|err| Error::config(format!("{}: {err}", path.display())))
}
