//! The process-wide default registry.
//!
//! Built on first use and named after the running executable, so its env
//! vars are `{EXECUTABLE}_{SETTING}`. The free functions here forward to it;
//! applications that want several registries create their own with
//! [`Registry::new`] instead.

use std::path::PathBuf;
use std::sync::LazyLock;

use crate::error::SetfigError;
use crate::registry::Registry;
use crate::setting::SettingDef;
use crate::value::{FromValue, Value};

static DEFAULT: LazyLock<Registry> = LazyLock::new(|| Registry::builder().build());

/// The default registry.
pub fn registry() -> &'static Registry {
    &DEFAULT
}

pub fn register(def: SettingDef) -> Result<(), SetfigError> {
    DEFAULT.register(def)
}

pub fn register_basic(name: &str, value: impl Into<Value>, usage: &str) -> Result<(), SetfigError> {
    DEFAULT.register_basic(name, value, usage)
}

pub fn register_core(name: &str, value: impl Into<Value>, usage: &str) -> Result<(), SetfigError> {
    DEFAULT.register_core(name, value, usage)
}

pub fn register_conf_file_var(
    name: &str,
    value: impl Into<Value>,
    usage: &str,
) -> Result<(), SetfigError> {
    DEFAULT.register_conf_file_var(name, value, usage)
}

pub fn register_env_var(
    name: &str,
    value: impl Into<Value>,
    usage: &str,
) -> Result<(), SetfigError> {
    DEFAULT.register_env_var(name, value, usage)
}

pub fn register_flag(
    name: &str,
    short: &str,
    value: impl Into<Value>,
    usage: &str,
) -> Result<(), SetfigError> {
    DEFAULT.register_flag(name, short, value, usage)
}

pub fn set_conf_file(path: impl Into<PathBuf>) {
    DEFAULT.set_conf_file(path)
}

/// Load env vars, then the config file, into the default registry.
pub fn load() -> Result<(), SetfigError> {
    DEFAULT.load()
}

pub fn parse_flags<S: AsRef<str>>(args: &[S]) -> Result<Vec<String>, SetfigError> {
    DEFAULT.parse_flags(args)
}

pub fn parse_env_args() -> Result<Vec<String>, SetfigError> {
    DEFAULT.parse_env_args()
}

pub fn get<T: FromValue>(name: &str) -> Result<T, SetfigError> {
    DEFAULT.get(name)
}

pub fn get_value(name: &str) -> Result<Value, SetfigError> {
    DEFAULT.get_value(name)
}

pub fn get_bool(name: &str) -> Result<bool, SetfigError> {
    DEFAULT.get_bool(name)
}

pub fn get_int(name: &str) -> Result<i32, SetfigError> {
    DEFAULT.get_int(name)
}

pub fn get_int64(name: &str) -> Result<i64, SetfigError> {
    DEFAULT.get_int64(name)
}

pub fn get_string(name: &str) -> Result<String, SetfigError> {
    DEFAULT.get_string(name)
}

pub fn set(name: &str, value: impl Into<Value>) -> Result<(), SetfigError> {
    DEFAULT.set(name, value)
}

pub fn override_value(name: &str, value: impl Into<Value>) -> Result<(), SetfigError> {
    DEFAULT.override_value(name, value)
}

pub fn visited() -> Vec<String> {
    DEFAULT.visited()
}
