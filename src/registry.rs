//! The setting registry and its update engine.
//!
//! A [`Registry`] maps setting names to [`Setting`] records and keeps two
//! auxiliary indexes: short flag alias → long name, and the set of names the
//! config file may touch. All of it sits behind one `parking_lot::RwLock`.
//! Reads share the lock; registration, updates, and the loaders take it
//! exclusively. Loaders never hold it across I/O.
//!
//! Every write funnels through [`State::update`] (or [`State::override_value`]
//! for the flag path), which applies the same checks in the same order:
//!
//! 1. the setting exists,
//! 2. it is not a core setting,
//! 3. env and file writes are refused once flags have been parsed,
//! 4. the source is allowed by the setting's kind,
//! 5. the input converts to the setting's type.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use parking_lot::RwLock;

use crate::builder::RegistryBuilder;
use crate::env::EnvLookup;
use crate::error::SetfigError;
use crate::file::Decoder;
use crate::flags::FlagParser;
use crate::setting::{Setting, SettingDef};
use crate::types::{Kind, Source, ValueType};
use crate::value::{FromValue, Value};

/// Input to the update engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Text from the environment, a flag, or application code.
    Text(String),
    /// A value decoded from a config file.
    Untyped(serde_json::Value),
    /// An already-typed value.
    Typed(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlagState {
    Unparsed,
    Parsing,
    Parsed,
}

/// Everything guarded by the registry lock.
pub(crate) struct State {
    pub(crate) settings: BTreeMap<String, Setting>,
    pub(crate) shorts: HashMap<String, String>,
    pub(crate) conf_file_vars: BTreeSet<String>,

    pub(crate) conf_file: Option<PathBuf>,
    pub(crate) require_conf_file: bool,
    pub(crate) use_conf_file: bool,
    pub(crate) use_env: bool,
    pub(crate) use_flags: bool,

    pub(crate) env_loaded: bool,
    pub(crate) conf_file_loaded: bool,
    pub(crate) flags: FlagState,
    pub(crate) visited: Vec<String>,
}

impl State {
    pub(crate) fn new() -> Self {
        Self {
            settings: BTreeMap::new(),
            shorts: HashMap::new(),
            conf_file_vars: BTreeSet::new(),
            conf_file: None,
            require_conf_file: false,
            use_conf_file: true,
            use_env: true,
            use_flags: true,
            env_loaded: false,
            conf_file_loaded: false,
            flags: FlagState::Unparsed,
            visited: Vec::new(),
        }
    }

    fn register(&mut self, def: SettingDef) -> Result<(), SetfigError> {
        if def.name.is_empty() {
            return Err(SetfigError::EmptyName);
        }
        if self.settings.contains_key(&def.name) {
            return Err(SetfigError::DuplicateName(def.name));
        }
        if let Some(short) = &def.short
            && let Some(bound_to) = self.shorts.get(short)
        {
            return Err(SetfigError::DuplicateShort {
                short: short.clone(),
                bound_to: bound_to.clone(),
            });
        }
        // Multi-character aliases live in the long-flag namespace, so they
        // may not collide with a name, in either direction.
        if def.kind == Kind::Flag
            && let Some(short) = &def.short
            && short.chars().count() > 1
            && (*short == def.name || self.settings.contains_key(short))
        {
            return Err(SetfigError::DuplicateShort {
                short: short.clone(),
                bound_to: short.clone(),
            });
        }
        if def.name.chars().count() > 1
            && let Some(bound_to) = self.shorts.get(&def.name)
        {
            return Err(SetfigError::DuplicateShort {
                short: def.name.clone(),
                bound_to: bound_to.clone(),
            });
        }

        let setting = Setting::from_def(def);
        if setting.kind == Kind::Flag
            && let Some(short) = &setting.short
        {
            self.shorts.insert(short.clone(), setting.name.clone());
        }
        if setting.is_conf_file_var() {
            self.conf_file_vars.insert(setting.name.clone());
        }
        tracing::trace!(setting = %setting.name, kind = %setting.kind, ty = %setting.value_type, "registered setting");
        self.settings.insert(setting.name.clone(), setting);
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<&Setting, SetfigError> {
        self.settings
            .get(name)
            .ok_or_else(|| SetfigError::SettingNotFound(name.to_string()))
    }

    /// The update engine. The only path, besides overrides, that changes a value.
    pub(crate) fn update(
        &mut self,
        source: Source,
        name: &str,
        input: Input,
    ) -> Result<(), SetfigError> {
        let flags_parsed = self.flags == FlagState::Parsed;
        let setting = self
            .settings
            .get_mut(name)
            .ok_or_else(|| SetfigError::SettingNotFound(name.to_string()))?;

        if setting.is_core() {
            return Err(SetfigError::Immutable(name.to_string()));
        }
        if flags_parsed && matches!(source, Source::ConfFile | Source::Env) {
            return Err(SetfigError::LockedAfterFlags {
                name: name.to_string(),
                origin: source,
            });
        }
        if !setting.permissions.allows(source) {
            return Err(SetfigError::SourceNotPermitted {
                name: name.to_string(),
                origin: source,
            });
        }

        let value = convert(setting, input)?;
        tracing::debug!(setting = name, %source, %value, "setting updated");
        setting.value = value;
        Ok(())
    }

    /// The flag write path: flag settings only, never core ones.
    pub(crate) fn override_value(&mut self, name: &str, value: Value) -> Result<(), SetfigError> {
        let setting = self
            .settings
            .get_mut(name)
            .ok_or_else(|| SetfigError::SettingNotFound(name.to_string()))?;
        if !setting.is_flag() || setting.is_core() {
            return Err(SetfigError::NotOverridable(name.to_string()));
        }
        let value = convert(setting, Input::Typed(value))?;
        tracing::debug!(setting = name, %value, "setting overridden");
        setting.value = value;
        Ok(())
    }
}

fn convert(setting: &Setting, input: Input) -> Result<Value, SetfigError> {
    let ty = setting.value_type;
    let conversion_error = |text: String| SetfigError::ConversionError {
        name: setting.name.clone(),
        text,
        target: ty,
    };
    match input {
        Input::Text(text) => Value::parse(ty, &text).ok_or_else(|| conversion_error(text)),
        Input::Untyped(raw) => Value::from_untyped(ty, &raw).ok_or_else(|| {
            let text = match raw {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            conversion_error(text)
        }),
        Input::Typed(value) => value.coerce(ty).map_err(|v| SetfigError::TypeMismatch {
            name: setting.name.clone(),
            is: ty,
            want: v.value_type(),
        }),
    }
}

/// A named set of settings fed by env vars, a config file, and flags.
///
/// ```ignore
/// let reg = Registry::new("app");
/// reg.register_flag("retries", "r", 3, "How many times to retry")?;
/// reg.set_conf_file("app.toml");
/// reg.load()?;
/// let rest = reg.parse_env_args()?;
/// let retries = reg.get_int("retries")?;
/// ```
pub struct Registry {
    pub(crate) name: String,
    pub(crate) state: RwLock<State>,
    pub(crate) decoder: Box<dyn Decoder>,
    pub(crate) flag_parser: Option<Box<dyn FlagParser>>,
    pub(crate) env_lookup: EnvLookup,
}

impl Registry {
    /// A registry with default collaborators. `name` scopes its env vars.
    pub fn new(name: &str) -> Self {
        RegistryBuilder::new().name(name).build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // -- Registration -----------------------------------------------------------

    /// Register a setting. Fails on an empty or taken name, or a taken short alias.
    pub fn register(&self, def: SettingDef) -> Result<(), SetfigError> {
        self.state.write().register(def)
    }

    /// A setting only code can change.
    pub fn register_basic(
        &self,
        name: &str,
        value: impl Into<Value>,
        usage: &str,
    ) -> Result<(), SetfigError> {
        self.register(SettingDef::new(Kind::Basic, name, value).usage(usage))
    }

    /// A setting frozen at its registered value.
    pub fn register_core(
        &self,
        name: &str,
        value: impl Into<Value>,
        usage: &str,
    ) -> Result<(), SetfigError> {
        self.register(SettingDef::new(Kind::Core, name, value).usage(usage))
    }

    /// A setting the config file may change.
    pub fn register_conf_file_var(
        &self,
        name: &str,
        value: impl Into<Value>,
        usage: &str,
    ) -> Result<(), SetfigError> {
        self.register(SettingDef::new(Kind::ConfFileVar, name, value).usage(usage))
    }

    /// A setting the config file and the environment may change.
    pub fn register_env_var(
        &self,
        name: &str,
        value: impl Into<Value>,
        usage: &str,
    ) -> Result<(), SetfigError> {
        self.register(SettingDef::new(Kind::EnvVar, name, value).usage(usage))
    }

    /// A setting every source may change. `short` may be empty.
    pub fn register_flag(
        &self,
        name: &str,
        short: &str,
        value: impl Into<Value>,
        usage: &str,
    ) -> Result<(), SetfigError> {
        self.register(
            SettingDef::new(Kind::Flag, name, value)
                .short(short)
                .usage(usage),
        )
    }

    // -- Updates ----------------------------------------------------------------

    /// Run one write through the update engine.
    pub fn update(&self, source: Source, name: &str, input: Input) -> Result<(), SetfigError> {
        self.state.write().update(source, name, input)
    }

    /// Set a value from code. Refused only for core settings.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), SetfigError> {
        self.update(Source::Programmatic, name, Input::Typed(value.into()))
    }

    /// Set a value from code, converting from text.
    pub fn set_str(&self, name: &str, text: &str) -> Result<(), SetfigError> {
        self.update(Source::Programmatic, name, Input::Text(text.to_string()))
    }

    /// Replace the value of a flag setting, as the flag driver does.
    pub fn override_value(&self, name: &str, value: impl Into<Value>) -> Result<(), SetfigError> {
        self.state.write().override_value(name, value.into())
    }

    // -- Reads ------------------------------------------------------------------

    pub fn contains(&self, name: &str) -> bool {
        self.state.read().settings.contains_key(name)
    }

    /// Registered setting names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.state.read().settings.keys().cloned().collect()
    }

    /// A snapshot of one setting record.
    pub fn setting(&self, name: &str) -> Result<Setting, SetfigError> {
        self.state.read().lookup(name).cloned()
    }

    /// The current value, whatever its type.
    pub fn get_value(&self, name: &str) -> Result<Value, SetfigError> {
        Ok(self.state.read().lookup(name)?.value.clone())
    }

    /// The current value as `T`. Fails if the setting holds another type.
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T, SetfigError> {
        let state = self.state.read();
        let setting = state.lookup(name)?;
        T::from_value(&setting.value).ok_or_else(|| SetfigError::TypeMismatch {
            name: name.to_string(),
            is: setting.value_type,
            want: T::TYPE,
        })
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, SetfigError> {
        self.get(name)
    }

    pub fn get_int(&self, name: &str) -> Result<i32, SetfigError> {
        self.get(name)
    }

    pub fn get_int64(&self, name: &str) -> Result<i64, SetfigError> {
        self.get(name)
    }

    pub fn get_string(&self, name: &str) -> Result<String, SetfigError> {
        self.get(name)
    }

    /// The payload of an opaque setting, downcast to `T`.
    pub fn get_opaque<T: std::any::Any + Send + Sync>(
        &self,
        name: &str,
    ) -> Result<std::sync::Arc<T>, SetfigError> {
        let state = self.state.read();
        let setting = state.lookup(name)?;
        let mismatch = || SetfigError::TypeMismatch {
            name: name.to_string(),
            is: setting.value_type,
            want: ValueType::Opaque,
        };
        match &setting.value {
            Value::Opaque(o) => o.downcast::<T>().ok_or_else(mismatch),
            _ => Err(mismatch()),
        }
    }

    // Non-erroring reads: any error yields the zero value.

    pub fn bool(&self, name: &str) -> bool {
        self.get_bool(name).unwrap_or_default()
    }

    pub fn int(&self, name: &str) -> i32 {
        self.get_int(name).unwrap_or_default()
    }

    pub fn int64(&self, name: &str) -> i64 {
        self.get_int64(name).unwrap_or_default()
    }

    pub fn string(&self, name: &str) -> String {
        self.get_string(name).unwrap_or_default()
    }

    // -- Materialization --------------------------------------------------------

    /// Load the environment, then the config file. Flags are parsed separately
    /// with [`parse_flags`](Self::parse_flags). Calling it again after both
    /// loaders finished does nothing.
    pub fn load(&self) -> Result<(), SetfigError> {
        self.load_env()?;
        self.load_conf_file()
    }

    /// Whether every enabled source has been applied.
    pub fn is_configured(&self) -> bool {
        let state = self.state.read();
        (!state.use_conf_file || state.conf_file_loaded)
            && (!state.use_env || state.env_loaded)
            && (!state.use_flags || state.flags == FlagState::Parsed)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .field("settings", &self.state.read().settings.len())
            .finish_non_exhaustive()
    }
}
