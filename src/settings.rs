//! The tool's own settings: where the store lives and how to reach it.
//!
//! Resolved by [`SettingsSources`](crate::SettingsSources) from compiled
//! defaults, `kv-bootstrap.toml` files, `KV_BOOTSTRAP__*` environment
//! variables and CLI flags, in increasing priority.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use confique::Config;

pub const APP_NAME: &str = "kv-bootstrap";

const NOT_SET: &str = "<not set>";
const MASKED: &str = "\"********\"";

#[derive(Config, Debug, Clone, PartialEq)]
pub struct Settings {
    /// Key prefix for every imported key. Trailing slashes are stripped.
    #[config(default = "", env = "KV_BOOTSTRAP__PREFIX")]
    pub prefix: String,

    /// Directory that relative include paths are resolved against.
    /// Defaults to the working directory.
    #[config(env = "KV_BOOTSTRAP__INCLUDE_ROOT")]
    pub include_root: Option<PathBuf>,

    /// Store connection.
    #[config(nested)]
    pub etcd: EtcdSettings,
}

#[derive(Config, Debug, Clone, PartialEq)]
pub struct EtcdSettings {
    /// Comma-separated endpoints. Entries without a scheme use http.
    #[config(default = "http://127.0.0.1:2379", env = "KV_BOOTSTRAP__ETCD__ENDPOINTS")]
    pub endpoints: String,

    /// How long to wait for an endpoint to accept a connection.
    #[config(default = 5000, env = "KV_BOOTSTRAP__ETCD__DIAL_TIMEOUT_MS")]
    pub dial_timeout_ms: u64,

    /// Upper bound on a single write.
    #[config(default = 3000, env = "KV_BOOTSTRAP__ETCD__REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// User for etcd authentication. Requires `password`.
    #[config(env = "KV_BOOTSTRAP__ETCD__USERNAME")]
    pub username: Option<String>,

    #[config(env = "KV_BOOTSTRAP__ETCD__PASSWORD")]
    pub password: Option<String>,
}

impl Settings {
    /// Commented TOML template built from the field docs above.
    pub fn template() -> String {
        confique::toml::template::<Settings>(confique::toml::FormatOptions::default())
    }

    /// Every setting as a `key = value` line, password masked.
    pub fn listing(&self) -> SettingsListing {
        let etcd = &self.etcd;
        let entries = vec![
            ("prefix", quoted(&self.prefix)),
            (
                "include_root",
                self.include_root
                    .as_ref()
                    .map_or_else(not_set, |dir| quoted(&dir.to_string_lossy())),
            ),
            ("etcd.endpoints", quoted(&etcd.endpoints)),
            ("etcd.dial_timeout_ms", etcd.dial_timeout_ms.to_string()),
            ("etcd.request_timeout_ms", etcd.request_timeout_ms.to_string()),
            (
                "etcd.username",
                etcd.username.as_deref().map_or_else(not_set, quoted),
            ),
            (
                "etcd.password",
                etcd.password
                    .as_ref()
                    .map_or_else(not_set, |_| MASKED.to_string()),
            ),
        ];
        SettingsListing { entries }
    }
}

fn quoted(s: &str) -> String {
    format!("{s:?}")
}

fn not_set() -> String {
    NOT_SET.to_string()
}

impl EtcdSettings {
    pub fn endpoint_list(&self) -> Vec<String> {
        self.endpoints
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Username and password, when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}

/// Output of `--print-settings`.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsListing {
    pub entries: Vec<(&'static str, String)>,
}

impl fmt::Display for SettingsListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{key} = {value}")?;
        }
        Ok(())
    }
}
