use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::env::{self, EnvLookup};
use crate::file::{Decoder, SerdeDecoder};
use crate::flags::FlagParser;
use crate::registry::{Registry, State};

/// Builder for a [`Registry`] and its collaborators.
///
/// Controls three orthogonal concerns:
///
/// - **Identity**: [`name()`](Self::name) scopes env var names (`{NAME}_{SETTING}`).
/// - **Sources**: [`conf_file()`](Self::conf_file), [`use_env()`](Self::use_env),
///   [`use_flags()`](Self::use_flags) and friends pick which layers load.
/// - **Collaborators**: [`decoder()`](Self::decoder),
///   [`flag_parser()`](Self::flag_parser) and [`env_lookup()`](Self::env_lookup)
///   replace the file decoder, the argument parser, and the environment.
pub struct RegistryBuilder {
    name: Option<String>,
    conf_file: Option<PathBuf>,
    require_conf_file: bool,
    use_conf_file: bool,
    use_env: bool,
    use_flags: bool,
    decoder: Option<Box<dyn Decoder>>,
    flag_parser: Option<Box<dyn FlagParser>>,
    env_lookup: Option<EnvLookup>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            conf_file: None,
            require_conf_file: false,
            use_conf_file: true,
            use_env: true,
            use_flags: true,
            decoder: None,
            flag_parser: None,
            env_lookup: None,
        }
    }

    /// Registry name (default: the executable's file stem).
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Config file to load. Its extension picks the format.
    pub fn conf_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.conf_file = Some(path.into());
        self
    }

    /// Make a missing config file an error (default: `false`).
    pub fn require_conf_file(mut self, required: bool) -> Self {
        self.require_conf_file = required;
        self
    }

    pub fn use_conf_file(mut self, enabled: bool) -> Self {
        self.use_conf_file = enabled;
        self
    }

    pub fn use_env(mut self, enabled: bool) -> Self {
        self.use_env = enabled;
        self
    }

    pub fn use_flags(mut self, enabled: bool) -> Self {
        self.use_flags = enabled;
        self
    }

    /// Replace the config file decoder (default: [`SerdeDecoder`]).
    pub fn decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    /// Replace the flag parser (default: `ClapFlagParser` with the `clap` feature).
    pub fn flag_parser(mut self, parser: impl FlagParser + 'static) -> Self {
        self.flag_parser = Some(Box::new(parser));
        self
    }

    /// Replace the environment lookup (default: the process environment).
    pub fn env_lookup(mut self, lookup: EnvLookup) -> Self {
        self.env_lookup = Some(lookup);
        self
    }

    /// Resolve the effective registry name.
    fn effective_name(&self) -> String {
        self.name.clone().unwrap_or_else(executable_name)
    }

    pub fn build(self) -> Registry {
        let name = self.effective_name();

        let mut state = State::new();
        state.conf_file = self.conf_file;
        state.require_conf_file = self.require_conf_file;
        state.use_conf_file = self.use_conf_file;
        state.use_env = self.use_env;
        state.use_flags = self.use_flags;

        tracing::trace!(registry = %name, "registry built");
        Registry {
            name,
            state: RwLock::new(state),
            decoder: self.decoder.unwrap_or_else(|| Box::new(SerdeDecoder)),
            flag_parser: self.flag_parser.or_else(default_flag_parser),
            env_lookup: self.env_lookup.unwrap_or_else(env::process_env),
        }
    }
}

#[cfg(feature = "clap")]
fn default_flag_parser() -> Option<Box<dyn FlagParser>> {
    Some(Box::new(crate::cli::ClapFlagParser))
}

#[cfg(not(feature = "clap"))]
fn default_flag_parser() -> Option<Box<dyn FlagParser>> {
    None
}

/// File stem of the running executable, or `"app"` if it cannot be determined.
pub(crate) fn executable_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .or_else(|| {
            std::env::args_os().next().and_then(|a| {
                PathBuf::from(a)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
        })
        .unwrap_or_else(|| "app".to_string())
}

/// Shorthand for an [`EnvLookup`] from a plain closure.
pub fn env_lookup_fn(f: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> EnvLookup {
    Arc::new(f)
}
