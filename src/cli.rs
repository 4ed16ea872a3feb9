//! Clap-backed flag parser.
//!
//! This module is the **optional integration layer** between the registry
//! and the [clap](https://docs.rs/clap) parser, compiled only with the `clap`
//! Cargo feature (on by default). The registry only ever talks to it through
//! the [`FlagParser`] trait, so any other parser can replace it.
//!
//! Flags follow the single-dash convention common to settings-driven tools:
//!
//! | Input            | Meaning                                  |
//! |------------------|------------------------------------------|
//! | `-retries=9`     | long flag with an inline value           |
//! | `-retries 9`     | long flag, value in the next argument    |
//! | `--retries=9`    | same as `-retries=9`                     |
//! | `-v`             | bool flag, set to `true`                 |
//! | `-v=false`       | bool flag with an explicit value         |
//! | `-b=true`        | short alias                              |
//!
//! Bool flags never consume the next argument. Parsing stops at the first
//! non-flag argument or at `--`; everything from there on is returned as
//! remaining arguments. Unknown flags are errors.
//!
//! Clap only understands `--long`, so single-dash long flags are rewritten
//! before clap sees them. Short aliases of one character become clap shorts;
//! longer aliases become hidden long aliases.

use std::error::Error;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, Command};

use crate::flags::{FlagParser, FlagSpec, ParsedFlags};
use crate::types::ValueType;

const REMAINING: &str = "__remaining";

/// Default [`FlagParser`], built on clap.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClapFlagParser;

impl FlagParser for ClapFlagParser {
    fn parse(
        &self,
        program: &str,
        specs: &[FlagSpec],
        args: &[String],
    ) -> Result<ParsedFlags, Box<dyn Error + Send + Sync>> {
        let command = build_command(program, specs);
        let normalized = normalize_args(specs, args);
        let matches = command.try_get_matches_from(normalized)?;

        let mut visited = Vec::new();
        for spec in specs {
            if matches.value_source(&spec.name) != Some(ValueSource::CommandLine) {
                continue;
            }
            if let Some(text) = matches.try_get_one::<String>(&spec.name)? {
                visited.push((spec.name.clone(), text.clone()));
            }
        }

        let remaining = matches
            .try_get_many::<String>(REMAINING)?
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default();

        Ok(ParsedFlags { visited, remaining })
    }

    fn usage(&self, program: &str, specs: &[FlagSpec]) -> String {
        build_command(program, specs).render_help().to_string()
    }
}

fn build_command(program: &str, specs: &[FlagSpec]) -> Command {
    let claims_help = specs
        .iter()
        .any(|s| s.name == "help" || s.short.as_deref() == Some("h"));
    let mut command = Command::new(program.to_string())
        .no_binary_name(true)
        .disable_version_flag(true)
        .disable_help_flag(claims_help)
        .arg(
            Arg::new(REMAINING)
                .num_args(0..)
                .trailing_var_arg(true)
                .action(ArgAction::Append)
                .hide(true),
        );
    for spec in specs {
        let alias_taken = spec
            .short
            .as_deref()
            .is_some_and(|short| specs.iter().any(|s| s.name == short));
        command = command.arg(build_arg(spec, alias_taken));
    }
    command
}

/// `alias_taken` drops a short alias that another flag already uses as its name.
fn build_arg(spec: &FlagSpec, alias_taken: bool) -> Arg {
    let help = if spec.usage.is_empty() {
        format!("(default {})", spec.default_text)
    } else {
        format!("{} (default {})", spec.usage, spec.default_text)
    };

    let mut arg = Arg::new(spec.name.clone())
        .long(spec.name.clone())
        .help(help)
        .action(ArgAction::Set);

    arg = match spec.value_type {
        ValueType::Bool => arg
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true"),
        _ => arg.num_args(1).allow_hyphen_values(true),
    };

    match spec.short.as_deref() {
        Some(short) if short.chars().count() == 1 => {
            if let Some(c) = short.chars().next() {
                arg = arg.short(c);
            }
        }
        Some(short) if !alias_taken => arg = arg.alias(short.to_string()),
        _ => {}
    }
    arg
}

/// Rewrite single-dash long flags (`-name`, `-name=v`) into `--name` form.
///
/// A registered name always wins; `-x` stays a clap short only when `x` is a
/// one-character short alias and not also a name. Stops at `--` or the first
/// non-flag argument. Values of non-bool flags given as a separate argument
/// are skipped over.
fn normalize_args(specs: &[FlagSpec], args: &[String]) -> Vec<String> {
    let by_name = |name: &str| specs.iter().find(|s| s.name == name);
    let by_short = |name: &str| specs.iter().find(|s| s.short.as_deref() == Some(name));

    let mut out = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--" || !arg.starts_with('-') || arg == "-" {
            out.push(arg.clone());
            out.extend(iter.cloned());
            break;
        }

        let double = arg.starts_with("--");
        let body = arg.strip_prefix("--").unwrap_or(&arg[1..]);
        let (name, has_value) = match body.split_once('=') {
            Some((name, _)) => (name, true),
            None => (body, false),
        };

        let named = by_name(name);
        let as_short = named.is_none() && name.chars().count() == 1;
        if double || as_short {
            out.push(arg.clone());
        } else {
            out.push(format!("-{arg}"));
        }

        let takes_value = named
            .or_else(|| by_short(name))
            .is_some_and(|s| s.value_type != ValueType::Bool);
        if !has_value && takes_value {
            if let Some(value) = iter.next() {
                out.push(value.clone());
            }
        }
    }
    out
}
