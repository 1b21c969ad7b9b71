//! `regencron` — regenerate build-tag package repositories on a schedule.
//!
//! Meant to run unattended (cron, systemd timer): validate config, list the
//! hub's tags, select the ones matching the configured patterns, regenerate
//! each, and exit with a code a monitoring system can act on.

mod logging;

use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use regencron_core::config::{Config, Overrides, CONFIG_SECTION, DEFAULT_CONFIG_PATH};
use regencron_core::hub::HubClient;
use regencron_core::orchestrator::regen_all;
use regencron_core::resolver::select_tags;
use regencron_core::RegencronError;

#[derive(Parser)]
#[command(
    name = "regencron",
    about = "Regenerate the package repos of matching build-system tags",
    version
)]
struct Cli {
    /// Location of the config file
    #[arg(long, value_name = "PATH", env = "REGENCRON_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Output debug messages
    #[arg(long)]
    debug: bool,

    /// Logfile to write output to (overrides the config file)
    #[arg(long, value_name = "PATH")]
    logfile: Option<PathBuf>,

    /// Don't regen, just print the tags that would be regenerated
    #[arg(long)]
    dry_run: bool,

    /// With --dry-run, print the selected tags as JSON
    #[arg(long, requires = "dry_run")]
    json: bool,

    /// Wait for each regen to complete before starting the next (default: false)
    #[arg(long, overrides_with = "no_wait")]
    wait: bool,

    #[arg(long, overrides_with = "wait")]
    no_wait: bool,

    /// On regen failure, keep going with the remaining tags instead of exiting (default: false)
    #[arg(long, overrides_with = "no_continue_on_failure")]
    continue_on_failure: bool,

    #[arg(long, overrides_with = "continue_on_failure")]
    no_continue_on_failure: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            debug: self.debug.then_some(true),
            wait: tristate(self.wait, self.no_wait),
            continue_on_failure: tristate(self.continue_on_failure, self.no_continue_on_failure),
            logfile: self.logfile.clone(),
        }
    }
}

/// Explicit flag beats its inverse; neither means "defer to the config".
fn tristate(yes: bool, no: bool) -> Option<bool> {
    if yes {
        Some(true)
    } else if no {
        Some(false)
    } else {
        None
    }
}

fn main() {
    let cli = Cli::parse();
    let debug = cli.debug;

    if let Err(err) = try_main(cli) {
        report_error(&err, debug);
        let code = err
            .downcast_ref::<RegencronError>()
            .map(RegencronError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn try_main(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(&cli.config)?;
    config.apply_overrides(&cli.overrides());

    logging::init(config.debug, config.logfile.as_deref())
        .context("failed to set up logging")?;

    let hub = HubClient::new(
        config.client.clone(),
        cli.config.clone(),
        CONFIG_SECTION,
        config.debug,
    );

    info!("regencron starting");

    if !cli.dry_run {
        hub.verify_auth()?;
    }

    let tags = hub.list_tags()?;
    let selected = select_tags(&tags, &config.included_tags)?;
    if selected.is_empty() {
        return Err(RegencronError::NoMatchingTags {
            patterns: config.included_tags.clone(),
        }
        .into());
    }

    if cli.dry_run {
        print_selection(&selected, cli.json)?;
        return Ok(());
    }

    let failed = regen_all(&hub, selected, config.wait, config.continue_on_failure)?;
    if !failed.is_empty() {
        return Err(RegencronError::RegenFailed {
            failed: failed.into_iter().collect(),
        }
        .into());
    }

    info!("regencron successful");
    Ok(())
}

fn print_selection(tags: &BTreeSet<String>, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "tags": tags }))?);
    } else {
        println!("Would regen the following tags:");
        for tag in tags {
            println!("{tag}");
        }
    }
    Ok(())
}

/// Route the fatal error to whatever sinks exist. Before `logging::init`
/// (config errors) nothing is listening, and in non-interactive runs the
/// console sink is absent, so mirror to stderr in both cases.
fn report_error(err: &anyhow::Error, debug: bool) {
    if logging::is_initialized() {
        if debug {
            error!("{err:?}");
        } else {
            error!("{err:#}");
        }
    }
    if !logging::is_initialized() || !std::io::stderr().is_terminal() {
        if debug {
            eprintln!("error: {err:?}");
        } else {
            eprintln!("error: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tristate_prefers_the_explicit_flag() {
        assert_eq!(tristate(true, false), Some(true));
        assert_eq!(tristate(false, true), Some(false));
        assert_eq!(tristate(false, false), None);
    }

    #[test]
    fn cli_flags_map_to_overrides() {
        let cli = Cli::parse_from(["regencron", "--debug", "--no-wait"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.debug, Some(true));
        assert_eq!(overrides.wait, Some(false));
        assert_eq!(overrides.continue_on_failure, None);
    }

    #[test]
    fn omitted_flags_leave_overrides_unset() {
        let cli = Cli::parse_from(["regencron"]);
        let overrides = cli.overrides();
        assert_eq!(overrides.debug, None);
        assert_eq!(overrides.wait, None);
        assert_eq!(overrides.continue_on_failure, None);
        assert!(overrides.logfile.is_none());
    }

    #[test]
    fn later_flag_wins_when_both_forms_are_given() {
        let cli = Cli::parse_from(["regencron", "--wait", "--no-wait"]);
        assert_eq!(cli.overrides().wait, Some(false));
    }

    #[test]
    fn json_requires_dry_run() {
        assert!(Cli::try_parse_from(["regencron", "--json"]).is_err());
        assert!(Cli::try_parse_from(["regencron", "--dry-run", "--json"]).is_ok());
    }
}
