//! Where settings come from.
//!
//! Highest priority first:
//!
//! 1. command-line flags (`--prefix`, `--connect`, `--include-root`)
//! 2. `KV_BOOTSTRAP__*` environment variables
//! 3. the `--config` file
//! 4. `kv-bootstrap.toml` in the working directory
//! 5. `kv-bootstrap.toml` in the platform config directory
//!    (`~/.config/kv-bootstrap/` on Linux)
//! 6. compiled defaults
//!
//! Each source fills only the values the ones above it left open. Settings
//! files are strict: a key that is not a setting fails the whole load, so a
//! typo never silently falls back to a default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use confique::Config;
use toml::{Table, Value};
use tracing::debug;

use crate::error::BootstrapError;
use crate::settings::{APP_NAME, Settings};

pub const FILE_NAME: &str = "kv-bootstrap.toml";

type SettingsLayer = <Settings as Config>::Layer;

/// Settings given as command-line flags. `None` leaves lower sources alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagOverrides {
    pub prefix: Option<String>,
    pub endpoints: Option<String>,
    pub include_root: Option<PathBuf>,
}

impl FlagOverrides {
    fn to_layer(&self) -> Result<SettingsLayer, BootstrapError> {
        let mut table = Table::new();
        if let Some(prefix) = &self.prefix {
            table.insert("prefix".into(), Value::String(prefix.clone()));
        }
        if let Some(dir) = &self.include_root {
            let dir = dir.to_string_lossy().into_owned();
            table.insert("include_root".into(), Value::String(dir));
        }
        if let Some(endpoints) = &self.endpoints {
            let mut etcd = Table::new();
            etcd.insert("endpoints".into(), Value::String(endpoints.clone()));
            table.insert("etcd".into(), Value::Table(etcd));
        }

        Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| BootstrapError::InvalidValue {
                key: "command-line flags".into(),
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SettingsFile {
    path: PathBuf,
    required: bool,
}

/// The set of sources one run reads its [`Settings`] from.
#[derive(Debug, Clone, Default)]
pub struct SettingsSources {
    /// Lowest priority first.
    files: Vec<SettingsFile>,
    read_env: bool,
    flags: FlagOverrides,
}

impl SettingsSources {
    /// Compiled defaults only.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The platform config file, `./kv-bootstrap.toml` and the environment.
    pub fn standard() -> Self {
        let mut sources = Self::empty().with_env(true);
        match directories::ProjectDirs::from("", "", APP_NAME) {
            Some(dirs) => sources = sources.optional_file(dirs.config_dir().join(FILE_NAME)),
            None => debug!("no platform config directory"),
        }
        sources.optional_file(FILE_NAME)
    }

    /// A file read if it exists. Later files take priority over earlier ones.
    pub fn optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(SettingsFile {
            path: path.into(),
            required: false,
        });
        self
    }

    /// A file that must exist, such as the one named by `--config`.
    pub fn required_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(SettingsFile {
            path: path.into(),
            required: true,
        });
        self
    }

    pub fn with_env(mut self, read_env: bool) -> Self {
        self.read_env = read_env;
        self
    }

    pub fn flags(mut self, flags: FlagOverrides) -> Self {
        self.flags = flags;
        self
    }

    pub fn load(&self) -> Result<Settings, BootstrapError> {
        let mut builder = Settings::builder().preloaded(self.flags.to_layer()?);
        if self.read_env {
            builder = builder.env();
        }
        for file in self.files.iter().rev() {
            if let Some(layer) = read_file(file)? {
                builder = builder.preloaded(layer);
            }
        }
        Ok(builder.load()?)
    }
}

fn read_file(file: &SettingsFile) -> Result<Option<SettingsLayer>, BootstrapError> {
    let content = match fs::read_to_string(&file.path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound && !file.required => {
            debug!(path = %file.path.display(), "no settings file");
            return Ok(None);
        }
        Err(e) => {
            return Err(BootstrapError::Read {
                path: file.path.clone(),
                source: e,
            });
        }
    };
    debug!(path = %file.path.display(), "settings file loaded");
    parse_settings(&content, &file.path).map(Some)
}

/// Parse one settings file, rejecting keys that are not settings.
fn parse_settings(content: &str, path: &Path) -> Result<SettingsLayer, BootstrapError> {
    let mut unknown = Vec::new();
    let layer = serde_ignored::deserialize(toml::Deserializer::new(content), |key| {
        unknown.push(key.to_string());
    })
    .map_err(|e| BootstrapError::SettingsParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    if !unknown.is_empty() {
        return Err(BootstrapError::UnknownSettings {
            path: path.to_path_buf(),
            keys: unknown,
        });
    }
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn empty_sources_give_defaults() {
        let settings = SettingsSources::empty().load().unwrap();
        assert_eq!(settings, Settings::builder().load().unwrap());
    }

    #[test]
    fn standard_reads_env_and_cwd_file_last() {
        let sources = SettingsSources::standard();
        assert!(sources.read_env);
        assert_eq!(
            sources.files.last().map(|f| f.path.as_path()),
            Some(Path::new(FILE_NAME))
        );
        assert!(sources.files.iter().all(|f| !f.required));
    }

    #[test]
    fn later_file_fills_over_earlier() {
        let dir = TempDir::new().unwrap();
        let global = write(
            &dir,
            "global.toml",
            "prefix = \"/global\"\n[etcd]\nendpoints = \"10.0.0.1:2379\"\ndial_timeout_ms = 100\n",
        );
        let local = write(&dir, "local.toml", "prefix = \"/local\"\n");

        let settings = SettingsSources::empty()
            .optional_file(global)
            .optional_file(local)
            .load()
            .unwrap();
        assert_eq!(settings.prefix, "/local");
        assert_eq!(settings.etcd.endpoints, "10.0.0.1:2379");
        assert_eq!(settings.etcd.dial_timeout_ms, 100);
        assert_eq!(settings.etcd.request_timeout_ms, 3000);
    }

    #[test]
    fn flags_beat_files() {
        let dir = TempDir::new().unwrap();
        let file = write(
            &dir,
            "kv-bootstrap.toml",
            "prefix = \"/file\"\ninclude_root = \"/certs\"\n[etcd]\nendpoints = \"file:2379\"\n",
        );
        let flags = FlagOverrides {
            prefix: Some("/flag".into()),
            endpoints: Some("flag:2379".into()),
            include_root: None,
        };

        let settings = SettingsSources::empty()
            .required_file(file)
            .flags(flags)
            .load()
            .unwrap();
        assert_eq!(settings.prefix, "/flag");
        assert_eq!(settings.etcd.endpoints, "flag:2379");
        assert_eq!(settings.include_root, Some(PathBuf::from("/certs")));
    }

    #[test]
    fn numeric_text_stays_text_in_string_settings() {
        let dir = TempDir::new().unwrap();
        let file = write(
            &dir,
            "kv-bootstrap.toml",
            "prefix = \"2024\"\n[etcd]\nusername = \"root\"\npassword = \"123456\"\n",
        );
        let settings = SettingsSources::empty().required_file(file).load().unwrap();
        assert_eq!(settings.prefix, "2024");
        assert_eq!(settings.etcd.credentials(), Some(("root", "123456")));
    }

    #[test]
    fn missing_optional_file_skipped() {
        let dir = TempDir::new().unwrap();
        let settings = SettingsSources::empty()
            .optional_file(dir.path().join("absent.toml"))
            .load()
            .unwrap();
        assert_eq!(settings.prefix, "");
    }

    #[test]
    fn missing_required_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = SettingsSources::empty()
            .required_file(dir.path().join("absent.toml"))
            .load()
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Read { .. }));
    }

    #[test]
    fn unknown_keys_rejected() {
        let dir = TempDir::new().unwrap();
        let file = write(
            &dir,
            "kv-bootstrap.toml",
            "endpoint = \"x\"\n[etcd]\ntimeout = 5\nendpoints = \"a:2379\"\n",
        );
        let err = SettingsSources::empty().optional_file(file).load().unwrap_err();
        match err {
            BootstrapError::UnknownSettings { keys, .. } => {
                assert_eq!(keys, vec!["endpoint".to_string(), "etcd.timeout".to_string()]);
            }
            other => panic!("Expected UnknownSettings, got: {other:?}"),
        }
    }

    #[test]
    fn wrong_type_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "kv-bootstrap.toml", "[etcd]\ndial_timeout_ms = \"soon\"\n");
        let err = SettingsSources::empty().optional_file(file).load().unwrap_err();
        assert!(matches!(err, BootstrapError::SettingsParse { .. }));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "kv-bootstrap.toml", "prefix = \n");
        let err = SettingsSources::empty().optional_file(file).load().unwrap_err();
        assert!(matches!(err, BootstrapError::SettingsParse { .. }));
    }
}
