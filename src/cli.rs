//! Command-line surface.
//!
//! Flags map onto settings keys and are applied as the highest-priority layer;
//! an absent flag leaves the lower layers alone.

use std::path::PathBuf;

use clap::Parser;

use crate::sources::{FlagOverrides, SettingsSources};

const AFTER_HELP: &str = "\
Nested YAML mappings become key prefixes:

    services:
      redis_dsn: tcp://127.0.0.1:6379
      mail:
        hostname: test.example.tdl

  /services/redis_dsn     -> tcp://127.0.0.1:6379
  /services/mail/hostname -> test.example.tdl

YAML lists are file includes; the files are concatenated in order:

    ssl_certificate:
      - ./ssl/web1.example.tld.crt
      - ./ssl/ca.crt

  /ssl_certificate -> contents of both files

Existing keys are overwritten. The default endpoint is http://127.0.0.1:2379.";

/// Import a YAML file into etcd.
#[derive(Debug, Parser)]
#[command(name = "kv-bootstrap", version, after_help = AFTER_HELP)]
pub struct Cli {
    /// YAML file to import.
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Key prefix for the import, e.g. /test/bootstrap/.
    #[arg(short, long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Comma-separated etcd endpoints, e.g. 192.168.1.1:2379,192.168.1.2:2379.
    #[arg(short, long, value_name = "ENDPOINTS")]
    pub connect: Option<String>,

    /// Directory to resolve relative include paths against.
    #[arg(long, value_name = "DIR")]
    pub include_root: Option<PathBuf>,

    /// Extra settings file, applied over the discovered ones.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Walk the document and log every key without contacting etcd.
    #[arg(long)]
    pub dry_run: bool,

    /// Log debug output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the resolved settings and exit.
    #[arg(long, conflicts_with = "settings_template")]
    pub print_settings: bool,

    /// Print a commented settings file template and exit.
    #[arg(long)]
    pub settings_template: bool,
}

impl Cli {
    pub fn flag_overrides(&self) -> FlagOverrides {
        FlagOverrides {
            prefix: self.prefix.clone(),
            endpoints: self.connect.clone(),
            include_root: self.include_root.clone(),
        }
    }

    /// The standard sources plus this invocation's `--config` file and flags.
    pub fn settings_sources(&self) -> SettingsSources {
        let mut sources = SettingsSources::standard();
        if let Some(path) = &self.config {
            sources = sources.required_file(path);
        }
        sources.flags(self.flag_overrides())
    }
}
