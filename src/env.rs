//! Environment variable loading.
//!
//! Each env-enabled setting maps to one variable, `{REGISTRY}_{SETTING}`,
//! uppercased as a whole:
//!
//! | Registry | Setting       | Env var             |
//! |----------|---------------|---------------------|
//! | `app`    | `retries`     | `APP_RETRIES`       |
//! | `myapp`  | `max_workers` | `MYAPP_MAX_WORKERS` |
//!
//! Unset and empty variables are skipped; the setting keeps whatever a lower
//! layer (or its default) gave it.

use std::sync::Arc;

use crate::error::SetfigError;
use crate::registry::{Input, Registry};
use crate::types::Source;

/// Looks up one environment variable by name.
///
/// Injectable so tests can pass synthetic data instead of the process env.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Lookup backed by the process environment. Non-UTF-8 values count as unset.
pub fn process_env() -> EnvLookup {
    Arc::new(|name| std::env::var(name).ok())
}

/// Name of the environment variable feeding `setting` in registry `registry`.
pub fn env_var_name(registry: &str, setting: &str) -> String {
    format!("{registry}_{setting}").to_uppercase()
}

impl Registry {
    /// Apply environment variables to every env-enabled setting.
    ///
    /// Settings are walked in name order. The walk stops at the first value
    /// that fails to convert; settings before it keep their new values and
    /// the env phase stays incomplete so a later call retries it.
    pub fn load_env(&self) -> Result<(), SetfigError> {
        let targets: Vec<(String, String)> = {
            let state = self.state.read();
            if !state.use_env || state.env_loaded {
                return Ok(());
            }
            state
                .settings
                .values()
                .filter(|s| s.is_env_var())
                .map(|s| (s.name.clone(), env_var_name(&self.name, &s.name)))
                .collect()
        };

        // Lookups happen without the lock held.
        let found: Vec<(String, String)> = targets
            .into_iter()
            .filter_map(|(setting, var)| {
                (self.env_lookup)(&var)
                    .filter(|v| !v.is_empty())
                    .map(|v| (setting, v))
            })
            .collect();

        let mut state = self.state.write();
        if state.env_loaded {
            return Ok(());
        }
        for (setting, text) in &found {
            state.update(Source::Env, setting, Input::Text(text.clone()))?;
        }
        state.env_loaded = true;
        tracing::debug!(registry = %self.name, applied = found.len(), "environment loaded");
        Ok(())
    }
}
