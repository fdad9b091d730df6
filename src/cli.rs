//! Clap adapter for tagbind.
//!
//! Compiled only with the `clap` Cargo feature (on by default). It turns a
//! [`FlagSet`] into a runtime-built [`clap::Command`] and feeds whatever the
//! user typed back into the flag set as explicit values:
//!
//! - string flags take one value (`--host x`, `--host=x`, `-H x`)
//! - bool flags are switches; `--debug` means true, `--debug=false` is accepted
//! - int flags parse as `i64`, negative numbers included
//! - string-array flags append on every occurrence (`--tag a --tag b`)
//!
//! Defaults are not handed to clap. Only values clap reports as coming from
//! the command line are applied, so defaults and looked-up values stay
//! distinguishable from explicit ones.

use std::ffi::OsString;

use clap::parser::ValueSource as ClapValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::trace;

use crate::error::TagbindError;
use crate::flags::{Flag, FlagKind, FlagSet, FlagValue, ValueSource};

impl FlagSet {
    /// Build a clap command with one argument per registered flag.
    pub fn command(&self, name: &str) -> Command {
        self.iter()
            .fold(Command::new(name.to_string()), |cmd, flag| cmd.arg(to_arg(flag)))
    }

    /// Parse `args` (program name first) and apply them as explicit values.
    pub fn parse_from<I, T>(&mut self, args: I) -> Result<(), TagbindError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command("tagbind").try_get_matches_from(args)?;
        self.apply_matches(&matches)
    }

    /// Apply every flag value clap saw on the command line.
    pub fn apply_matches(&mut self, matches: &ArgMatches) -> Result<(), TagbindError> {
        let plan: Vec<(String, FlagKind)> =
            self.iter().map(|f| (f.name().to_string(), f.kind())).collect();

        for (name, kind) in plan {
            if matches.value_source(&name) != Some(ClapValueSource::CommandLine) {
                continue;
            }
            let value = match kind {
                FlagKind::Str => matches
                    .try_get_one::<String>(&name)
                    .map_err(matches_error)?
                    .map(|s| FlagValue::Str(s.clone())),
                FlagKind::Bool => matches
                    .try_get_one::<bool>(&name)
                    .map_err(matches_error)?
                    .map(|b| FlagValue::Bool(*b)),
                FlagKind::Int => matches
                    .try_get_one::<i64>(&name)
                    .map_err(matches_error)?
                    .map(|i| FlagValue::Int(*i)),
                FlagKind::StrArray => matches
                    .try_get_many::<String>(&name)
                    .map_err(matches_error)?
                    .map(|items| FlagValue::StrArray(items.cloned().collect())),
            };
            if let Some(value) = value {
                trace!(flag = %name, value = %value, "flag set on command line");
                self.set_value(&name, value, ValueSource::CommandLine)?;
            }
        }
        Ok(())
    }
}

fn matches_error(e: clap::parser::MatchesError) -> TagbindError {
    TagbindError::Cli(clap::Error::raw(
        clap::error::ErrorKind::InvalidValue,
        e.to_string(),
    ))
}

fn to_arg(flag: &Flag) -> Arg {
    let mut arg = Arg::new(flag.name().to_string())
        .long(flag.name().to_string())
        .help(help_text(flag));
    if let Some(short) = flag.short() {
        arg = arg.short(short);
    }

    match flag.kind() {
        FlagKind::Str => arg.action(ArgAction::Set).value_name("string"),
        FlagKind::Bool => arg
            .action(ArgAction::Set)
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .value_parser(parse_bool_arg),
        FlagKind::Int => arg
            .action(ArgAction::Set)
            .value_name("int")
            .allow_negative_numbers(true)
            .value_parser(clap::value_parser!(i64)),
        FlagKind::StrArray => arg.action(ArgAction::Append).value_name("string"),
    }
}

fn parse_bool_arg(raw: &str) -> Result<bool, String> {
    match FlagValue::parse(FlagKind::Bool, raw)? {
        FlagValue::Bool(b) => Ok(b),
        other => Err(format!("expected a bool, got {other}")),
    }
}

fn help_text(flag: &Flag) -> String {
    let default = flag.default_value();
    if *default == flag.kind().zero() {
        flag.desc().to_string()
    } else if flag.desc().is_empty() {
        format!("(default {default})")
    } else {
        format!("{} (default {default})", flag.desc())
    }
}
