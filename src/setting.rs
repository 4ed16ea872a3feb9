//! Setting records and their registration descriptors.

use crate::types::{Kind, Permissions, ValueType};
use crate::value::Value;

/// Everything needed to register one setting.
///
/// The setting's type is the type of `value`.
///
/// ```ignore
/// registry.register(SettingDef::new(Kind::Flag, "retries", 3).short("r").usage("Retry count"))?;
/// ```
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub(crate) kind: Kind,
    pub(crate) name: String,
    pub(crate) short: Option<String>,
    pub(crate) value: Value,
    pub(crate) default_text: Option<String>,
    pub(crate) usage: String,
}

impl SettingDef {
    pub fn new(kind: Kind, name: &str, value: impl Into<Value>) -> Self {
        Self {
            kind,
            name: name.to_string(),
            short: None,
            value: value.into(),
            default_text: None,
            usage: String::new(),
        }
    }

    /// Short alias. Only bound when the kind is [`Kind::Flag`]; an empty
    /// string means no alias.
    pub fn short(mut self, short: &str) -> Self {
        self.short = (!short.is_empty()).then(|| short.to_string());
        self
    }

    pub fn usage(mut self, usage: &str) -> Self {
        self.usage = usage.to_string();
        self
    }

    /// Replace the default text derived from the value. Mostly useful for
    /// opaque settings, whose values have no text of their own.
    pub fn default_text(mut self, text: &str) -> Self {
        self.default_text = Some(text.to_string());
        self
    }
}

/// A registered setting: metadata plus current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    pub(crate) name: String,
    pub(crate) short: Option<String>,
    pub(crate) value_type: ValueType,
    pub(crate) value: Value,
    pub(crate) default_text: String,
    pub(crate) usage: String,
    pub(crate) kind: Kind,
    pub(crate) permissions: Permissions,
}

impl Setting {
    pub(crate) fn from_def(def: SettingDef) -> Self {
        let default_text = def
            .default_text
            .unwrap_or_else(|| def.value.to_string());
        Self {
            value_type: def.value.value_type(),
            permissions: def.kind.permissions(),
            name: def.name,
            short: def.short,
            value: def.value,
            default_text,
            usage: def.usage,
            kind: def.kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short(&self) -> Option<&str> {
        self.short.as_deref()
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn default_text(&self) -> &str {
        &self.default_text
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    pub fn is_conf_file_var(&self) -> bool {
        self.permissions.conf_file
    }

    pub fn is_env_var(&self) -> bool {
        self.permissions.env
    }

    pub fn is_flag(&self) -> bool {
        self.permissions.flag
    }

    pub fn is_core(&self) -> bool {
        self.permissions.core
    }

    /// Flags are built for flag settings with a type the parser understands.
    pub(crate) fn takes_flags(&self) -> bool {
        self.is_flag() && self.value_type != ValueType::Opaque
    }
}
