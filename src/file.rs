//! Config file loading: format detection, reading, decoding, and applying.
//!
//! The registry owns format detection; decoding is delegated to a [`Decoder`].
//! The file is read and decoded without holding the registry lock. Only the
//! final walk over the decoded mapping takes the write lock.
//!
//! Only top-level keys are matched against setting names. A nested table such
//! as `[logging]` is ignored unless a setting is literally named `logging`.

use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value as Untyped};

use crate::error::{FormatReason, SetfigError};
use crate::registry::{Input, Registry};
use crate::types::Source;

/// Config file encodings the registry recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfFormat {
    /// Pick the format from the last `.`-separated component of the file name.
    pub fn from_path(path: &Path) -> Result<ConfFormat, SetfigError> {
        let unsupported = |reason| SetfigError::UnsupportedFormat {
            path: path.display().to_string(),
            reason,
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| unsupported(FormatReason::EmptyName))?;

        let ext = match file_name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
            _ => return Err(unsupported(FormatReason::NoExtension)),
        };

        match ext.as_str() {
            "json" | "jsn" | "cjsn" | "cjson" => Ok(ConfFormat::Json),
            "toml" | "tml" => Ok(ConfFormat::Toml),
            "yaml" | "yml" => Ok(ConfFormat::Yaml),
            _ => Err(unsupported(FormatReason::UnknownExtension(ext))),
        }
    }
}

impl fmt::Display for ConfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfFormat::Json => "JSON",
            ConfFormat::Toml => "TOML",
            ConfFormat::Yaml => "YAML",
        })
    }
}

/// Turns config file bytes into a mapping of top-level keys to untyped values.
pub trait Decoder: Send + Sync {
    fn decode(
        &self,
        format: ConfFormat,
        bytes: &[u8],
    ) -> Result<Map<String, Untyped>, Box<dyn Error + Send + Sync>>;
}

/// Default decoder: `serde_json`, `toml`, and `serde_yaml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeDecoder;

impl Decoder for SerdeDecoder {
    fn decode(
        &self,
        format: ConfFormat,
        bytes: &[u8],
    ) -> Result<Map<String, Untyped>, Box<dyn Error + Send + Sync>> {
        let value: Untyped = match format {
            ConfFormat::Json => serde_json::from_slice(bytes)?,
            ConfFormat::Toml => toml::from_str(std::str::from_utf8(bytes)?)?,
            ConfFormat::Yaml if bytes.iter().all(u8::is_ascii_whitespace) => {
                return Ok(Map::new());
            }
            ConfFormat::Yaml => match serde_yaml::from_slice(bytes)? {
                // A document holding only comments or `~` has no keys.
                Untyped::Null => return Ok(Map::new()),
                value => value,
            },
        };
        match value {
            Untyped::Object(map) => Ok(map),
            other => Err(format!("top-level {format} value is not a mapping: {other}").into()),
        }
    }
}

/// Read a config file. `Ok(None)` means the file does not exist.
fn read_conf_file(path: &Path) -> Result<Option<Vec<u8>>, SetfigError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SetfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

impl Registry {
    /// Point the registry at a config file. Re-arms the file loader if the
    /// path changed.
    pub fn set_conf_file(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut state = self.state.write();
        if state.conf_file.as_ref() != Some(&path) {
            state.conf_file = Some(path);
            state.conf_file_loaded = false;
        }
    }

    pub fn conf_file(&self) -> Option<PathBuf> {
        self.state.read().conf_file.clone()
    }

    /// Make a missing config file an error instead of a silent no-op.
    pub fn require_conf_file(&self, required: bool) {
        self.state.write().require_conf_file = required;
    }

    /// Load the configured file and apply its top-level keys.
    ///
    /// A no-op when file loading is disabled, already done, or no file is
    /// configured. Stops at the first failing key.
    pub fn load_conf_file(&self) -> Result<(), SetfigError> {
        let (path, required) = {
            let mut state = self.state.write();
            if !state.use_conf_file || state.conf_file_loaded {
                return Ok(());
            }
            match state.conf_file.clone() {
                Some(path) => (path, state.require_conf_file),
                None => {
                    state.conf_file_loaded = true;
                    return Ok(());
                }
            }
        };

        let format = ConfFormat::from_path(&path)?;
        let Some(bytes) = read_conf_file(&path)? else {
            if required {
                return Err(SetfigError::MissingConfFile(path));
            }
            tracing::debug!(path = %path.display(), "config file absent, skipping");
            self.state.write().conf_file_loaded = true;
            return Ok(());
        };

        let mapping =
            self.decoder
                .decode(format, &bytes)
                .map_err(|e| SetfigError::DecoderError {
                    path: path.clone(),
                    message: e.to_string(),
                })?;

        let mut state = self.state.write();
        let mut applied = 0usize;
        for (key, raw) in mapping {
            if !state.conf_file_vars.contains(&key) {
                tracing::trace!(key = %key, "ignoring config file key");
                continue;
            }
            state.update(Source::ConfFile, &key, Input::Untyped(raw))?;
            applied += 1;
        }
        state.conf_file_loaded = true;
        tracing::debug!(path = %path.display(), %format, applied, "config file loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::setting::SettingDef;
    use crate::types::Kind;
    use std::fs;
    use tempfile::TempDir;

    fn format_of(name: &str) -> Result<ConfFormat, SetfigError> {
        ConfFormat::from_path(Path::new(name))
    }

    #[test]
    fn recognizes_all_extensions() {
        for ext in ["json", "jsn", "cjsn", "cjson"] {
            assert_eq!(format_of(&format!("cfg.{ext}")).unwrap(), ConfFormat::Json);
        }
        for ext in ["toml", "tml"] {
            assert_eq!(format_of(&format!("cfg.{ext}")).unwrap(), ConfFormat::Toml);
        }
        for ext in ["yaml", "yml"] {
            assert_eq!(format_of(&format!("cfg.{ext}")).unwrap(), ConfFormat::Yaml);
        }
    }

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(format_of("CFG.JSON").unwrap(), ConfFormat::Json);
        assert_eq!(format_of("app.Yml").unwrap(), ConfFormat::Yaml);
    }

    #[test]
    fn only_last_component_counts() {
        assert_eq!(format_of("app.json.toml").unwrap(), ConfFormat::Toml);
        assert_eq!(format_of("/etc/app.d/settings.yaml").unwrap(), ConfFormat::Yaml);
        assert!(matches!(
            format_of("app.toml.bak"),
            Err(SetfigError::UnsupportedFormat {
                reason: FormatReason::UnknownExtension(ext),
                ..
            }) if ext == "bak"
        ));
    }

    #[test]
    fn empty_name_is_unsupported() {
        assert!(matches!(
            format_of(""),
            Err(SetfigError::UnsupportedFormat {
                reason: FormatReason::EmptyName,
                ..
            })
        ));
    }

    #[test]
    fn missing_extension_is_unsupported() {
        for name in ["settings", "settings."] {
            assert!(matches!(
                format_of(name),
                Err(SetfigError::UnsupportedFormat {
                    reason: FormatReason::NoExtension,
                    ..
                })
            ));
        }
    }

    #[test]
    fn decodes_json_toml_yaml() {
        let json = SerdeDecoder
            .decode(ConfFormat::Json, br#"{"debug": true, "port": 80}"#)
            .unwrap();
        assert_eq!(json["debug"], Untyped::Bool(true));

        let toml = SerdeDecoder
            .decode(ConfFormat::Toml, b"debug = false\n[logging]\nlevel = \"info\"\n")
            .unwrap();
        assert_eq!(toml["debug"], Untyped::Bool(false));
        assert!(toml["logging"].is_object());

        let yaml = SerdeDecoder
            .decode(ConfFormat::Yaml, b"name: alpha\nport: 8080\n")
            .unwrap();
        assert_eq!(yaml["name"], Untyped::String("alpha".into()));
        assert_eq!(yaml["port"].as_i64(), Some(8080));
    }

    #[test]
    fn empty_yaml_is_empty_mapping() {
        let map = SerdeDecoder.decode(ConfFormat::Yaml, b"").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn non_mapping_top_level_fails() {
        assert!(SerdeDecoder.decode(ConfFormat::Json, b"[1, 2]").is_err());
        assert!(SerdeDecoder.decode(ConfFormat::Yaml, b"- a\n- b\n").is_err());
    }

    #[test]
    fn malformed_file_fails() {
        assert!(SerdeDecoder.decode(ConfFormat::Json, b"{debug: ").is_err());
        assert!(SerdeDecoder.decode(ConfFormat::Toml, b"= nope").is_err());
    }

    // --- loader ---

    fn registry_with_file(dir: &TempDir, name: &str, content: &str) -> Registry {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        let reg = Registry::new("app");
        reg.set_conf_file(path);
        reg
    }

    #[test]
    fn loads_registered_keys() {
        let dir = TempDir::new().unwrap();
        let reg = registry_with_file(&dir, "cfg.json", r#"{"debug": true, "port": 9090}"#);
        reg.register_conf_file_var("debug", false, "").unwrap();
        reg.register_env_var("port", 80, "").unwrap();

        reg.load_conf_file().unwrap();
        assert!(reg.get_bool("debug").unwrap());
        assert_eq!(reg.get_int("port").unwrap(), 9090);
    }

    #[test]
    fn ignores_unknown_and_non_file_keys() {
        let dir = TempDir::new().unwrap();
        let reg = registry_with_file(
            &dir,
            "cfg.toml",
            "name = \"beta\"\nmode = \"fast\"\nunknown = 1\n[logging]\nlevel = \"debug\"\n",
        );
        reg.register_core("name", "alpha", "").unwrap();
        reg.register_basic("mode", "slow", "").unwrap();

        reg.load_conf_file().unwrap();
        assert_eq!(reg.get_string("name").unwrap(), "alpha");
        assert_eq!(reg.get_string("mode").unwrap(), "slow");
    }

    #[test]
    fn conversion_failure_stops_the_load() {
        let dir = TempDir::new().unwrap();
        let reg = registry_with_file(&dir, "cfg.yaml", "port: eighty\n");
        reg.register_conf_file_var("port", 80, "").unwrap();

        let err = reg.load_conf_file().unwrap_err();
        assert!(matches!(err, SetfigError::ConversionError { ref name, .. } if name == "port"));
        assert_eq!(reg.get_int("port").unwrap(), 80);
        assert!(!reg.state.read().conf_file_loaded);
    }

    #[test]
    fn missing_optional_file_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let reg = Registry::new("app");
        reg.set_conf_file(dir.path().join("absent.json"));
        reg.register_conf_file_var("debug", false, "").unwrap();

        reg.load_conf_file().unwrap();
        assert!(!reg.get_bool("debug").unwrap());
    }

    #[test]
    fn missing_required_file_fails() {
        let dir = TempDir::new().unwrap();
        let reg = Registry::new("app");
        reg.set_conf_file(dir.path().join("absent.json"));
        reg.require_conf_file(true);

        assert!(matches!(
            reg.load_conf_file(),
            Err(SetfigError::MissingConfFile(_))
        ));
    }

    #[test]
    fn unsupported_extension_fails_before_reading() {
        let reg = Registry::new("app");
        reg.set_conf_file("/definitely/not/here/settings.ini");
        assert!(matches!(
            reg.load_conf_file(),
            Err(SetfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn decode_failure_names_the_file() {
        let dir = TempDir::new().unwrap();
        let reg = registry_with_file(&dir, "broken.json", "{not json");
        let err = reg.load_conf_file().unwrap_err();
        match err {
            SetfigError::DecoderError { path, .. } => assert!(path.ends_with("broken.json")),
            other => panic!("Expected DecoderError, got {other:?}"),
        }
    }

    #[test]
    fn no_file_configured_is_a_no_op() {
        let reg = Registry::new("app");
        reg.load_conf_file().unwrap();
        assert!(reg.state.read().conf_file_loaded);
    }

    #[test]
    fn second_load_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{"level": 1}"#).unwrap();
        let reg = Registry::new("app");
        reg.set_conf_file(&path);
        reg.register_conf_file_var("level", 0, "").unwrap();
        reg.load_conf_file().unwrap();

        reg.set("level", 5).unwrap();
        reg.load_conf_file().unwrap();
        assert_eq!(reg.get_int("level").unwrap(), 5);
    }

    #[test]
    fn changing_the_path_rearms_the_loader() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.toml");
        fs::write(&first, r#"{"level": 1}"#).unwrap();
        fs::write(&second, "level = 2\n").unwrap();

        let reg = Registry::new("app");
        reg.register_conf_file_var("level", 0, "").unwrap();
        reg.set_conf_file(&first);
        reg.load_conf_file().unwrap();
        assert_eq!(reg.get_int("level").unwrap(), 1);

        reg.set_conf_file(&second);
        reg.load_conf_file().unwrap();
        assert_eq!(reg.get_int("level").unwrap(), 2);
    }

    #[test]
    fn file_updates_are_locked_after_flags() {
        let dir = TempDir::new().unwrap();
        let reg = registry_with_file(&dir, "cfg.json", r#"{"retries": 4}"#);
        reg.register_flag("retries", "", 3, "").unwrap();
        reg.state.write().flags = crate::registry::FlagState::Parsed;

        assert!(matches!(
            reg.load_conf_file(),
            Err(SetfigError::LockedAfterFlags { .. })
        ));
    }
}
