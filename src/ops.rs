//! Inspection: listing the registry's settings and describing one of them.
//!
//! [`Listing`] displays as `name = value` lines and serializes for machine
//! output. [`SettingInfo`] displays with its usage text as a `#` comment.

use std::fmt;

use serde::Serialize;

use crate::error::SetfigError;
use crate::registry::Registry;
use crate::setting::Setting;
use crate::types::{Kind, ValueType};

/// A snapshot of one setting, rendered as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingInfo {
    pub name: String,
    pub kind: Kind,
    pub value_type: ValueType,
    pub value: String,
    pub default_text: String,
    pub usage: String,
}

impl From<&Setting> for SettingInfo {
    fn from(s: &Setting) -> Self {
        Self {
            name: s.name.clone(),
            kind: s.kind,
            value_type: s.value_type,
            value: s.value.to_string(),
            default_text: s.default_text.clone(),
            usage: s.usage.clone(),
        }
    }
}

impl fmt::Display for SettingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.usage.lines() {
            writeln!(f, "# {line}")?;
        }
        write!(f, "{} = {}", self.name, self.value)
    }
}

/// Every setting of a registry, sorted by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Listing {
    pub entries: Vec<SettingInfo>,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, info) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{} = {}", info.name, info.value)?;
        }
        Ok(())
    }
}

impl Registry {
    pub fn list(&self) -> Listing {
        let state = self.state.read();
        Listing {
            entries: state.settings.values().map(SettingInfo::from).collect(),
        }
    }

    /// One setting with its usage text.
    pub fn describe(&self, name: &str) -> Result<SettingInfo, SetfigError> {
        let state = self.state.read();
        state
            .settings
            .get(name)
            .map(SettingInfo::from)
            .ok_or_else(|| SetfigError::SettingNotFound(name.to_string()))
    }
}
