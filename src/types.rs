//! Vocabulary shared by the registry, the update engine, and the loaders.
//!
//! # Kinds and the mutability lattice
//!
//! Every setting is registered with a [`Kind`]. The kind fixes, once and for
//! all, which [`Source`]s may change the setting afterwards:
//!
//! | Kind          | config file | env | flags | frozen |
//! |---------------|:-----------:|:---:|:-----:|:------:|
//! | `Basic`       |             |     |       |        |
//! | `Core`        |             |     |       |   x    |
//! | `ConfFileVar` |      x      |     |       |        |
//! | `EnvVar`      |      x      |  x  |       |        |
//! | `Flag`        |      x      |  x  |   x   |        |
//!
//! Higher kinds subsume the sources of lower ones. `Basic` settings are only
//! writable programmatically; `Core` settings not at all.
//!
//! The table lives in exactly one place, [`Kind::permissions`], and the
//! update engine asks [`Permissions::allows`] instead of repeating the rules.

use std::fmt;

use serde::Serialize;

/// The scalar type of a setting. Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Int,
    Int64,
    String,
    Opaque,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Int64 => "int64",
            ValueType::String => "string",
            ValueType::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

/// Precedence class of a setting, ordered from least to most permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Basic,
    Core,
    ConfFileVar,
    EnvVar,
    Flag,
}

impl Kind {
    pub const ALL: [Kind; 5] = [
        Kind::Basic,
        Kind::Core,
        Kind::ConfFileVar,
        Kind::EnvVar,
        Kind::Flag,
    ];

    /// The mutability flags implied by this kind.
    pub const fn permissions(self) -> Permissions {
        match self {
            Kind::Basic => Permissions {
                conf_file: false,
                env: false,
                flag: false,
                core: false,
            },
            Kind::Core => Permissions {
                conf_file: false,
                env: false,
                flag: false,
                core: true,
            },
            Kind::ConfFileVar => Permissions {
                conf_file: true,
                env: false,
                flag: false,
                core: false,
            },
            Kind::EnvVar => Permissions {
                conf_file: true,
                env: true,
                flag: false,
                core: false,
            },
            Kind::Flag => Permissions {
                conf_file: true,
                env: true,
                flag: true,
                core: false,
            },
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Basic => "basic",
            Kind::Core => "core",
            Kind::ConfFileVar => "conf-file var",
            Kind::EnvVar => "env var",
            Kind::Flag => "flag",
        };
        f.write_str(name)
    }
}

/// Where an update comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Application code calling [`Registry::set`](crate::Registry::set) and friends.
    Programmatic,
    ConfFile,
    Env,
    Flag,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::Programmatic => "code",
            Source::ConfFile => "the config file",
            Source::Env => "the environment",
            Source::Flag => "flags",
        };
        f.write_str(name)
    }
}

/// Mutability flags of one setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub conf_file: bool,
    pub env: bool,
    pub flag: bool,
    pub core: bool,
}

impl Permissions {
    /// Whether `source` may write a setting with these flags.
    ///
    /// Core settings refuse every source, including programmatic writes.
    pub const fn allows(self, source: Source) -> bool {
        if self.core {
            return false;
        }
        match source {
            Source::Programmatic => true,
            Source::ConfFile => self.conf_file,
            Source::Env => self.env,
            Source::Flag => self.flag,
        }
    }
}
