//! Adapter around the external hub command-line client.
//!
//! Every call is one synchronous invocation of
//! `<client> -q --config=<path> --profile=<section> <args...>` with both
//! output streams captured. Non-zero exit codes are not errors at this
//! layer; each operation decides what they mean. No retries.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, error, info};

use crate::error::{RegencronError, Result};
use crate::orchestrator::Regenerator;

// ---------------------------------------------------------------------------
// HubOutput
// ---------------------------------------------------------------------------

/// Captured result of one client invocation. Stdout and stderr are always
/// captured together and decoded lossily — the client may emit bytes in a
/// legacy single-byte encoding.
#[derive(Debug)]
pub struct HubOutput {
    /// `None` when the client was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl HubOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// One-stop diagnostic string for log and error messages.
    pub fn describe(&self) -> String {
        let status = match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_owned(),
        };
        format!("{status}\nstdout:\n{}\nstderr:\n{}", self.stdout, self.stderr)
    }
}

// ---------------------------------------------------------------------------
// HubClient
// ---------------------------------------------------------------------------

/// Runs hub client subcommands against a fixed `(config, profile)` binding
/// established at construction.
pub struct HubClient {
    client: PathBuf,
    config_path: PathBuf,
    profile: String,
    debug: bool,
}

impl HubClient {
    pub fn new(
        client: PathBuf,
        config_path: PathBuf,
        profile: impl Into<String>,
        debug: bool,
    ) -> Self {
        Self {
            client,
            config_path,
            profile: profile.into(),
            debug,
        }
    }

    fn base_args(&self) -> Vec<OsString> {
        let mut config = OsString::from("--config=");
        config.push(self.config_path.as_os_str());
        vec![
            OsString::from("-q"),
            config,
            OsString::from(format!("--profile={}", self.profile)),
        ]
    }

    /// Invoke the client once, blocking until it exits.
    pub fn run(&self, args: &[&str]) -> io::Result<HubOutput> {
        let mut cmd = Command::new(&self.client);
        cmd.args(self.base_args());
        cmd.args(args);
        if self.debug {
            debug!("running {cmd:?}");
        }
        let output = cmd.output()?;
        Ok(HubOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Fetch the full tag list. Unauthenticated.
    pub fn list_tags(&self) -> Result<Vec<String>> {
        let out = self
            .run(&["--noauth", "list-tags"])
            .map_err(|e| RegencronError::TagList(format!("failed to invoke hub client: {e}")))?;
        if !out.success() {
            return Err(RegencronError::TagList(out.describe()));
        }
        Ok(out.stdout.lines().map(str::to_owned).collect())
    }

    /// Authenticated no-op, used to verify credentials before doing work.
    pub fn verify_auth(&self) -> Result<()> {
        let out = self
            .run(&["hello"])
            .map_err(|e| RegencronError::Auth(format!("failed to invoke hub client: {e}")))?;
        if !out.success() {
            return Err(RegencronError::Auth(out.describe()));
        }
        Ok(())
    }

    /// Regenerate the repo for one tag. With `wait` the call blocks until
    /// the remote action completes; without it the exit code only reflects
    /// that the action was queued.
    pub fn regen_tag(&self, tag: &str, wait: bool) -> Result<bool> {
        let out = if wait {
            info!("launching regen-repo for tag {tag}");
            self.run(&["regen-repo", tag])?
        } else {
            info!("queueing regen-repo for tag {tag}");
            self.run(&["regen-repo", "--nowait", tag])?
        };
        if !out.success() {
            error!("regen-repo {tag} failed: {}", out.describe());
            return Ok(false);
        }
        debug!("regen-repo {tag} succeeded: {}", out.describe());
        Ok(true)
    }
}

impl Regenerator for HubClient {
    fn regen_tag(&self, tag: &str, wait: bool) -> Result<bool> {
        HubClient::regen_tag(self, tag, wait)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
