//! Flag parsing: the parser collaborator and the driver that feeds the registry.
//!
//! The registry does not lex argument vectors itself. It hands a
//! [`FlagParser`] one [`FlagSpec`] per flag-enabled setting and gets back
//! the flags that were actually present ("visited") plus the leftover
//! arguments. The default parser is clap-based (see `ClapFlagParser`); tests
//! use a scripted one.
//!
//! Parsing is all-or-nothing: if the parser fails, or any visited value does
//! not convert to its setting's type, no setting changes.

use std::error::Error;
use std::ffi::OsString;

use parking_lot::RwLock;

use crate::error::SetfigError;
use crate::registry::{FlagState, Registry, State};
use crate::types::ValueType;
use crate::value::Value;

/// One variable the parser should accept.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagSpec {
    pub name: String,
    pub short: Option<String>,
    pub value_type: ValueType,
    pub default_text: String,
    pub usage: String,
}

/// What a parser saw in an argument vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFlags {
    /// Flags present in the input as `(name, value text)`. The name is
    /// either a long name or a short alias.
    pub visited: Vec<(String, String)>,
    /// Arguments left after flag parsing stopped.
    pub remaining: Vec<String>,
}

pub trait FlagParser: Send + Sync {
    fn parse(
        &self,
        program: &str,
        specs: &[FlagSpec],
        args: &[String],
    ) -> Result<ParsedFlags, Box<dyn Error + Send + Sync>>;

    /// Human-readable help for `specs`.
    fn usage(&self, program: &str, specs: &[FlagSpec]) -> String {
        let mut out = format!("Usage of {program}:\n");
        for spec in specs {
            out.push_str(&format!(
                "  -{} {}\n    \t{} (default {})\n",
                spec.name, spec.value_type, spec.usage, spec.default_text
            ));
        }
        out
    }
}

impl Registry {
    /// Parse `args` as flags and apply the visited ones.
    ///
    /// Returns the non-flag arguments. When flags are disabled or were already
    /// parsed, nothing is consumed and `args` comes back as-is. A failed parse
    /// leaves the registry untouched and may be retried.
    pub fn parse_flags<S: AsRef<str>>(&self, args: &[S]) -> Result<Vec<String>, SetfigError> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();

        let specs = {
            let mut state = self.state.write();
            if !state.use_flags || state.flags != FlagState::Unparsed {
                return Ok(args);
            }
            state.flags = FlagState::Parsing;
            flag_specs(&state)
        };
        let mut guard = ParsingGuard {
            state: &self.state,
            armed: true,
        };

        let Some(parser) = self.flag_parser.as_deref() else {
            return Err(SetfigError::FlagParseError(
                "no flag parser configured".into(),
            ));
        };

        let parsed = parser
            .parse(&self.name, &specs, &args)
            .map_err(|e| SetfigError::FlagParseError(e.to_string()))?;

        let mut state = self.state.write();
        let names = apply_visited(&mut state, &parsed.visited)?;
        tracing::debug!(registry = %self.name, visited = ?names, "flags parsed");
        state.visited = names;
        state.flags = FlagState::Parsed;
        guard.armed = false;
        Ok(parsed.remaining)
    }

    /// Parse the process arguments, minus the program name.
    ///
    /// An argument that is not valid Unicode is a [`SetfigError::FlagParseError`].
    pub fn parse_env_args(&self) -> Result<Vec<String>, SetfigError> {
        let args = unicode_args(std::env::args_os().skip(1))?;
        self.parse_flags(&args)
    }

    /// Names of the flags set by the last successful parse, in lexical order.
    pub fn visited(&self) -> Vec<String> {
        self.state.read().visited.clone()
    }

    pub fn is_visited(&self, name: &str) -> bool {
        self.state.read().visited.iter().any(|v| v == name)
    }

    pub fn flags_parsed(&self) -> bool {
        self.state.read().flags == FlagState::Parsed
    }

    /// Help text for the registry's flags, rendered by the flag parser.
    pub fn flag_usage(&self) -> String {
        let specs = flag_specs(&self.state.read());
        match self.flag_parser.as_deref() {
            Some(parser) => parser.usage(&self.name, &specs),
            None => String::new(),
        }
    }
}

/// Puts an interrupted parse back to `Unparsed`, including when the parser
/// panics. Disarmed once the parse succeeds.
struct ParsingGuard<'a> {
    state: &'a RwLock<State>,
    armed: bool,
}

impl Drop for ParsingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.write().flags = FlagState::Unparsed;
        }
    }
}

fn unicode_args(args: impl Iterator<Item = OsString>) -> Result<Vec<String>, SetfigError> {
    args.map(|arg| {
        arg.into_string().map_err(|bad| {
            SetfigError::FlagParseError(format!(
                "argument is not valid unicode: {}",
                bad.to_string_lossy()
            ))
        })
    })
    .collect()
}

fn flag_specs(state: &State) -> Vec<FlagSpec> {
    state
        .settings
        .values()
        .filter(|s| s.takes_flags())
        .map(|s| FlagSpec {
            name: s.name.clone(),
            short: s.short.clone(),
            value_type: s.value_type,
            default_text: s.default_text.clone(),
            usage: s.usage.clone(),
        })
        .collect()
}

/// Resolve, convert, then override. Returns the applied names, sorted.
fn apply_visited(
    state: &mut State,
    visited: &[(String, String)],
) -> Result<Vec<String>, SetfigError> {
    let values = resolve_visited(state, visited)?;
    let mut names = Vec::with_capacity(values.len());
    for (name, value) in values {
        state.override_value(&name, value)?;
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// Map visited flag names to long names and convert their text.
///
/// Later occurrences of the same flag win.
fn resolve_visited(
    state: &State,
    visited: &[(String, String)],
) -> Result<Vec<(String, Value)>, SetfigError> {
    let mut out: Vec<(String, Value)> = Vec::with_capacity(visited.len());
    for (flag, text) in visited {
        let name = if state.settings.contains_key(flag) {
            flag.clone()
        } else {
            state
                .shorts
                .get(flag)
                .cloned()
                .ok_or_else(|| SetfigError::FlagParseError(format!("unknown flag -{flag}")))?
        };
        let setting = state
            .settings
            .get(&name)
            .filter(|s| s.takes_flags())
            .ok_or_else(|| SetfigError::FlagParseError(format!("unknown flag -{flag}")))?;
        let value = Value::parse(setting.value_type, text).ok_or_else(|| {
            SetfigError::FlagParseError(format!(
                "invalid value \"{text}\" for flag -{flag}: expected {}",
                setting.value_type
            ))
        })?;
        out.retain(|(n, _)| n != &name);
        out.push((name, value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::ScriptedParser;

    fn registry(parser: ScriptedParser) -> Registry {
        Registry::builder()
            .name("app")
            .flag_parser(parser)
            .build()
    }

    #[test]
    fn visited_flags_are_applied() {
        let reg = registry(ScriptedParser::visiting(&[("retries", "9")], &["cmd"]));
        reg.register_flag("retries", "", 3, "").unwrap();

        let rest = reg.parse_flags(&["-retries=9", "cmd"]).unwrap();
        assert_eq!(rest, vec!["cmd".to_string()]);
        assert_eq!(reg.get_int("retries").unwrap(), 9);
        assert_eq!(reg.visited(), vec!["retries".to_string()]);
        assert!(reg.flags_parsed());
    }

    #[test]
    fn short_names_resolve_to_long() {
        let reg = registry(ScriptedParser::visiting(&[("b", "true")], &[]));
        reg.register_flag("v", "b", false, "").unwrap();

        reg.parse_flags(&["-b=true"]).unwrap();
        assert!(reg.get_bool("v").unwrap());
        assert!(reg.is_visited("v"));
        assert!(!reg.is_visited("b"));
    }

    #[test]
    fn visited_is_sorted_and_deduplicated() {
        let reg = registry(ScriptedParser::visiting(
            &[("zeta", "1"), ("alpha", "2"), ("zeta", "3")],
            &[],
        ));
        reg.register_flag("zeta", "", 0, "").unwrap();
        reg.register_flag("alpha", "", 0, "").unwrap();

        reg.parse_flags::<&str>(&[]).unwrap();
        assert_eq!(reg.visited(), vec!["alpha".to_string(), "zeta".to_string()]);
        assert_eq!(reg.get_int("zeta").unwrap(), 3);
    }

    #[test]
    fn specs_skip_opaque_and_non_flags() {
        let parser = ScriptedParser::visiting(&[], &[]);
        let seen = parser.seen_specs();
        let reg = registry(parser);
        reg.register_flag("retries", "r", 3, "Retry count").unwrap();
        reg.register_flag("blob", "", Value::opaque(1u8), "").unwrap();
        reg.register_env_var("mode", "slow", "").unwrap();

        reg.parse_flags::<&str>(&[]).unwrap();
        let specs = seen.lock().clone();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "retries");
        assert_eq!(specs[0].short.as_deref(), Some("r"));
        assert_eq!(specs[0].value_type, ValueType::Int);
        assert_eq!(specs[0].default_text, "3");
        assert_eq!(specs[0].usage, "Retry count");
    }

    #[test]
    fn parser_failure_leaves_registry_untouched_and_retryable() {
        let reg = registry(ScriptedParser::failing("flag provided but not defined: -nope"));
        reg.register_flag("retries", "", 3, "").unwrap();

        let err = reg.parse_flags(&["-nope"]).unwrap_err();
        assert!(err.to_string().contains("flag provided but not defined: -nope"));
        assert_eq!(reg.get_int("retries").unwrap(), 3);
        assert!(!reg.flags_parsed());
        assert_eq!(reg.state.read().flags, FlagState::Unparsed);
    }

    #[test]
    fn bad_value_is_a_parse_error_and_applies_nothing() {
        let reg = registry(ScriptedParser::visiting(
            &[("alpha", "5"), ("retries", "lots")],
            &[],
        ));
        reg.register_flag("alpha", "", 0, "").unwrap();
        reg.register_flag("retries", "", 3, "").unwrap();

        let err = reg.parse_flags::<&str>(&[]).unwrap_err();
        assert!(matches!(err, SetfigError::FlagParseError(_)));
        assert_eq!(reg.get_int("alpha").unwrap(), 0);
        assert_eq!(reg.get_int("retries").unwrap(), 3);
        assert!(!reg.flags_parsed());
    }

    #[test]
    fn second_parse_consumes_nothing() {
        let reg = registry(ScriptedParser::visiting(&[("retries", "9")], &[]));
        reg.register_flag("retries", "", 3, "").unwrap();
        reg.parse_flags(&["-retries=9"]).unwrap();

        let rest = reg.parse_flags(&["-retries=1", "x"]).unwrap();
        assert_eq!(rest, vec!["-retries=1".to_string(), "x".to_string()]);
        assert_eq!(reg.get_int("retries").unwrap(), 9);
    }

    #[test]
    fn disabled_flags_consume_nothing() {
        let reg = Registry::builder()
            .name("app")
            .use_flags(false)
            .flag_parser(ScriptedParser::visiting(&[("retries", "9")], &[]))
            .build();
        reg.register_flag("retries", "", 3, "").unwrap();

        let rest = reg.parse_flags(&["-retries=9"]).unwrap();
        assert_eq!(rest, vec!["-retries=9".to_string()]);
        assert_eq!(reg.get_int("retries").unwrap(), 3);
    }

    #[test]
    fn env_and_file_are_locked_after_parse() {
        let reg = registry(ScriptedParser::visiting(&[], &[]));
        reg.register_flag("retries", "", 3, "").unwrap();
        reg.parse_flags::<&str>(&[]).unwrap();

        assert!(matches!(
            reg.update(crate::Source::Env, "retries", crate::Input::Text("4".into())),
            Err(SetfigError::LockedAfterFlags { .. })
        ));
        reg.override_value("retries", 5).unwrap();
        assert_eq!(reg.get_int("retries").unwrap(), 5);
    }

    #[test]
    fn panicking_parser_leaves_flags_unparsed() {
        struct Exploding;
        impl FlagParser for Exploding {
            fn parse(
                &self,
                _program: &str,
                _specs: &[FlagSpec],
                _args: &[String],
            ) -> Result<ParsedFlags, Box<dyn Error + Send + Sync>> {
                panic!("parser exploded");
            }
        }

        let reg = Registry::builder().name("app").flag_parser(Exploding).build();
        reg.register_flag("retries", "", 3, "").unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            reg.parse_flags(&["-retries=9"])
        }));
        assert!(result.is_err());
        assert_eq!(reg.state.read().flags, FlagState::Unparsed);
        assert_eq!(reg.get_int("retries").unwrap(), 3);
    }

    #[test]
    fn missing_parser_is_an_error_and_retryable() {
        let reg = Registry::builder().name("app").build();
        let reg = Registry {
            flag_parser: None,
            ..reg
        };
        assert!(matches!(
            reg.parse_flags(&["-x"]),
            Err(SetfigError::FlagParseError(_))
        ));
        assert_eq!(reg.state.read().flags, FlagState::Unparsed);
    }

    #[test]
    fn unicode_args_pass_through() {
        let args = vec![OsString::from("-retries=9"), OsString::from("cmd")];
        assert_eq!(
            unicode_args(args.into_iter()).unwrap(),
            vec!["-retries=9".to_string(), "cmd".to_string()]
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_unicode_arg_is_a_parse_error() {
        use std::os::unix::ffi::OsStringExt;

        let args = vec![
            OsString::from("-name"),
            OsString::from_vec(vec![b'a', 0xff, b'b']),
        ];
        let err = unicode_args(args.into_iter()).unwrap_err();
        assert!(matches!(err, SetfigError::FlagParseError(ref m) if m.contains("not valid unicode")));
    }

    #[test]
    fn default_usage_lists_flags() {
        let parser = ScriptedParser::visiting(&[], &[]);
        let reg = registry(parser);
        reg.register_flag("retries", "r", 3, "Retry count").unwrap();
        let usage = reg.flag_usage();
        assert!(usage.contains("-retries"));
        assert!(usage.contains("Retry count"));
        assert!(usage.contains("default 3"));
    }
}
