//! Typed, precedence-ordered settings for Rust applications. Register a
//! setting once, then let the config file, the environment, and the command
//! line change it.
//!
//! ```ignore
//! let reg = Registry::new("myapp");
//! reg.register_flag("retries", "r", 3, "How many times to retry")?;
//! reg.register_env_var("endpoint", "https://example.com", "Service URL")?;
//! reg.set_conf_file("myapp.toml");
//!
//! reg.load()?;
//! let rest = reg.parse_env_args()?;
//! let retries = reg.get_int("retries")?;
//! ```
//!
//! That sequence applies `MYAPP_RETRIES` and `MYAPP_ENDPOINT` from the
//! environment, then `retries` and `endpoint` from `myapp.toml`, then
//! `-retries=N` from the command line, and hands back the arguments that
//! were not flags.
//!
//! # Settings and kinds
//!
//! A setting has a name, a type fixed by its registered value (bool, int,
//! int64, string, or an opaque payload), and a [`Kind`]. The kind decides
//! which sources may change it:
//!
//! | Kind          | config file | env | flags |
//! |---------------|:-----------:|:---:|:-----:|
//! | `Basic`       |             |     |       |
//! | `ConfFileVar` |      x      |     |       |
//! | `EnvVar`      |      x      |  x  |       |
//! | `Flag`        |      x      |  x  |   x   |
//!
//! Application code may change any of them with [`Registry::set`]. `Core`
//! settings are frozen at their registered value; nothing changes them.
//!
//! # Layer precedence
//!
//! Values resolve through four layers, lowest to highest:
//!
//! ```text
//!   registered value         reg.register_flag("retries", "r", 3, ..)
//!        ↑ overridden by
//!   environment              MYAPP_RETRIES=5
//!        ↑ overridden by
//!   config file              retries = 7
//!        ↑ overridden by
//!   flags                    -retries=9
//! ```
//!
//! Once flags are parsed the environment and the config file can no longer
//! write; late loads fail with [`SetfigError::LockedAfterFlags`].
//!
//! # Config files
//!
//! One file, picked with [`Registry::set_conf_file`]. The extension selects
//! the decoder: `.json`, `.toml`, or `.yaml`/`.yml`. Only top-level keys that
//! name a file-enabled setting are applied; every other key is ignored. A
//! missing file is skipped unless [`Registry::require_conf_file`] is on.
//!
//! # Flags
//!
//! Flags are parsed by a [`FlagParser`]. With the `clap` feature (on by
//! default) that is [`ClapFlagParser`], which accepts `-name=value`,
//! `-name value`, bare `-name` for bools, and one short alias per flag.
//! Parsing stops at the first non-flag argument or `--`.
//!
//! # Errors and logging
//!
//! Every fallible call returns [`SetfigError`]. Loaders stop at the first
//! failure and leave their phase open so the call can be retried. State
//! changes are reported as `tracing` events at `debug` and `trace` level;
//! errors are returned, never logged.
//!
//! # The default registry
//!
//! The [`global`] module holds a process-wide registry named after the
//! executable, with free functions forwarding to it.

pub mod error;
pub mod types;
pub mod value;

mod builder;
#[cfg(feature = "clap")]
mod cli;
mod env;
mod file;
mod flags;
pub mod global;
mod ops;
mod registry;
mod setting;

#[cfg(test)]
mod fixtures;

pub use builder::{RegistryBuilder, env_lookup_fn};
#[cfg(feature = "clap")]
pub use cli::ClapFlagParser;
pub use env::{EnvLookup, env_var_name, process_env};
pub use error::{FormatReason, SetfigError};
pub use file::{ConfFormat, Decoder, SerdeDecoder};
pub use flags::{FlagParser, FlagSpec, ParsedFlags};
pub use ops::{Listing, SettingInfo};
pub use registry::{Input, Registry};
pub use setting::{Setting, SettingDef};
pub use types::{Kind, Permissions, Source, ValueType};
pub use value::{FromValue, Opaque, Value, parse_bool};
