//! Import a YAML document into etcd.
//!
//! Nested mappings become `/`-separated key paths; every leaf becomes one
//! key/value write. Lists are file includes: the listed files are read in
//! order and their contents concatenated into a single value.
//!
//! ```yaml
//! services:
//!   redis_dsn: tcp://127.0.0.1:6379
//!   nginx_hosts:
//!     web1:
//!       ssl_certificate:
//!         - ./ssl/web1.example.tld.crt
//!         - ./ssl/ca.crt
//! ```
//!
//! ```text
//! /services/redis_dsn                        -> tcp://127.0.0.1:6379
//! /services/nginx_hosts/web1/ssl_certificate -> cat web1.example.tld.crt ca.crt
//! ```
//!
//! # Pieces
//!
//! - [`load_document`] parses YAML into a [`Node`] tree of mappings,
//!   sequences and scalars.
//! - [`Flattener`] walks the tree and hands one record per leaf to a [`Sink`].
//! - [`EtcdSink`] writes records through etcd's v3 JSON gateway;
//!   [`MemorySink`] keeps them in memory for dry runs and tests.
//! - [`Settings`] holds connection settings, resolved by [`SettingsSources`]
//!   from defaults, `kv-bootstrap.toml` files, `KV_BOOTSTRAP__*` environment
//!   variables and CLI flags.
//!
//! # Failure behavior
//!
//! Writes are neither batched nor transactional. The first error (an include
//! file that cannot be read, a failed or timed-out write) stops the walk and
//! is returned to the caller. Keys written before it stay in the store.

pub mod error;

mod cli;
mod etcd;
mod flatten;
mod loader;
mod node;
mod settings;
mod sink;
mod sources;

#[cfg(test)]
mod fixtures;

pub use cli::Cli;
pub use error::BootstrapError;
pub use etcd::{EtcdSink, normalize_endpoint};
pub use flatten::{Flattener, ImportReport, WriteRecord, import};
pub use loader::{load_document, parse_document};
pub use node::Node;
pub use settings::{APP_NAME, EtcdSettings, Settings, SettingsListing};
pub use sink::{MemorySink, Sink};
pub use sources::{FILE_NAME, FlagOverrides, SettingsSources};
