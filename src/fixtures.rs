#[cfg(test)]
pub mod test {
    use std::collections::HashMap;
    use std::error::Error;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::env::EnvLookup;
    use crate::flags::{FlagParser, FlagSpec, ParsedFlags};

    /// A synthetic environment holding exactly `vars`.
    pub fn env_from(vars: &[(&str, &str)]) -> EnvLookup {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(move |name| vars.get(name).cloned())
    }

    // -- Scripted flag parser ---------------------------------------------------

    /// A [`FlagParser`] that ignores its input and replays a fixed outcome.
    ///
    /// Records the specs it was handed so tests can inspect them.
    pub struct ScriptedParser {
        outcome: Result<ParsedFlags, String>,
        seen: Arc<Mutex<Vec<FlagSpec>>>,
    }

    impl ScriptedParser {
        /// Report `visited` as `(flag, text)` pairs and `remaining` as leftovers.
        pub fn visiting(visited: &[(&str, &str)], remaining: &[&str]) -> Self {
            Self {
                outcome: Ok(ParsedFlags {
                    visited: visited
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                    remaining: remaining.iter().map(|s| s.to_string()).collect(),
                }),
                seen: Arc::default(),
            }
        }

        /// Fail every parse with `message`.
        pub fn failing(message: &str) -> Self {
            Self {
                outcome: Err(message.to_string()),
                seen: Arc::default(),
            }
        }

        pub fn seen_specs(&self) -> Arc<Mutex<Vec<FlagSpec>>> {
            Arc::clone(&self.seen)
        }
    }

    impl FlagParser for ScriptedParser {
        fn parse(
            &self,
            _program: &str,
            specs: &[FlagSpec],
            _args: &[String],
        ) -> Result<ParsedFlags, Box<dyn Error + Send + Sync>> {
            *self.seen.lock() = specs.to_vec();
            self.outcome.clone().map_err(Into::into)
        }
    }

    #[test]
    fn env_from_returns_only_given_vars() {
        let env = env_from(&[("APP_X", "1")]);
        assert_eq!(env("APP_X").as_deref(), Some("1"));
        assert_eq!(env("APP_Y"), None);
    }

    #[test]
    fn scripted_parser_replays_outcome() {
        let parser = ScriptedParser::visiting(&[("a", "1")], &["rest"]);
        let parsed = parser.parse("p", &[], &[]).unwrap();
        assert_eq!(parsed.visited, vec![("a".to_string(), "1".to_string())]);
        assert_eq!(parsed.remaining, vec!["rest".to_string()]);

        let failing = ScriptedParser::failing("boom");
        assert_eq!(failing.parse("p", &[], &[]).unwrap_err().to_string(), "boom");
    }
}
