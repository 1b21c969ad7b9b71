//! Configuration loading and validation.
//!
//! The config file is INI because the same file is handed verbatim to the
//! external hub client (`--config=<path> --profile=regencron`): the
//! `[regencron]` section doubles as the client's connection profile, so the
//! `server`/`authtype`/`cert`/`principal` keys validated here are the exact
//! keys the client will read back.

use std::path::{Path, PathBuf};

use globset::Glob;
use ini::{Ini, Properties};

use crate::error::{RegencronError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/regencron/regencron.conf";
pub const CONFIG_SECTION: &str = "regencron";
pub const DEFAULT_CLIENT: &str = "koji";

const SERVER_SCHEME: &str = "https://";
const SERVER_SUFFIX: &str = "/kojihub";

// ---------------------------------------------------------------------------
// AuthType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    Ssl,
    Gssapi,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Ssl => "ssl",
            AuthType::Gssapi => "gssapi",
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Validated configuration. Built once at startup and immutable afterwards,
/// except for [`Config::apply_overrides`] which folds in command-line flags.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: String,
    pub authtype: AuthType,
    pub cert: Option<String>,
    pub principal: Option<String>,
    pub included_tags: Vec<String>,
    pub logfile: Option<PathBuf>,
    /// Hub client executable. Resolved via PATH unless an absolute path is
    /// configured.
    pub client: PathBuf,
    pub debug: bool,
    pub wait: bool,
    pub continue_on_failure: bool,
}

/// Command-line values that take precedence over the config file. `None`
/// means the flag was not given and the config value applies.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub debug: Option<bool>,
    pub wait: Option<bool>,
    pub continue_on_failure: Option<bool>,
    pub logfile: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let ini = Ini::load_from_file(path)
            .map_err(|e| RegencronError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_ini(&ini)
    }

    pub fn from_ini_str(data: &str) -> Result<Self> {
        let ini = Ini::load_from_str(data)
            .map_err(|e| RegencronError::Config(format!("malformed config: {e}")))?;
        Self::from_ini(&ini)
    }

    /// Validate the parsed INI and build a `Config`. Checks run in a fixed
    /// order and short-circuit on the first failure, before any remote call
    /// is attempted.
    fn from_ini(ini: &Ini) -> Result<Self> {
        let section = ini.section(Some(CONFIG_SECTION)).ok_or_else(|| {
            RegencronError::Config(format!("[{CONFIG_SECTION}] section missing"))
        })?;

        let server = require(section, "server")?.to_owned();
        let authtype_raw = require(section, "authtype")?;
        let included_raw = require(section, "included_tags")?;

        if !server.starts_with(SERVER_SCHEME) {
            return Err(RegencronError::Config(
                "server is not an HTTPS URL".to_owned(),
            ));
        }
        if !server.ends_with(SERVER_SUFFIX) {
            return Err(RegencronError::Config(format!(
                "server is not a hub XMLRPC endpoint ({SERVER_SUFFIX})"
            )));
        }

        let authtype = match authtype_raw {
            "ssl" => AuthType::Ssl,
            "gssapi" => AuthType::Gssapi,
            other => {
                return Err(RegencronError::Config(format!(
                    "authtype '{other}' is not 'ssl' or 'gssapi'"
                )))
            }
        };

        let cert = optional(section, "cert").map(str::to_owned);
        let principal = optional(section, "principal").map(str::to_owned);
        match authtype {
            AuthType::Ssl if cert.is_none() => {
                return Err(RegencronError::Config(
                    "cert not provided for ssl authtype".to_owned(),
                ))
            }
            AuthType::Gssapi if principal.is_none() => {
                return Err(RegencronError::Config(
                    "principal not provided for gssapi authtype".to_owned(),
                ))
            }
            _ => {}
        }

        let included_tags: Vec<String> = included_raw
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        for pattern in &included_tags {
            Glob::new(pattern).map_err(|e| {
                RegencronError::Config(format!("invalid tag pattern '{pattern}': {e}"))
            })?;
        }

        Ok(Config {
            server,
            authtype,
            cert,
            principal,
            included_tags,
            logfile: optional(section, "logfile").map(PathBuf::from),
            client: optional(section, "client")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CLIENT)),
            debug: get_bool(section, "debug")?,
            wait: get_bool(section, "wait")?,
            continue_on_failure: get_bool(section, "continue_on_failure")?,
        })
    }

    /// Fold command-line flags over the config-file values. A flag that was
    /// explicitly given wins; an omitted flag leaves the config value alone.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(debug) = overrides.debug {
            self.debug = debug;
        }
        if let Some(wait) = overrides.wait {
            self.wait = wait;
        }
        if let Some(cont) = overrides.continue_on_failure {
            self.continue_on_failure = cont;
        }
        if let Some(logfile) = &overrides.logfile {
            self.logfile = Some(logfile.clone());
        }
    }
}

fn require<'a>(section: &'a Properties, key: &str) -> Result<&'a str> {
    match section.get(key) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(RegencronError::Config(format!("{key} not provided"))),
    }
}

fn optional<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).filter(|value| !value.is_empty())
}

/// Booleans accept the usual INI spellings, case-insensitive. A missing key
/// defaults to false; an unparseable value is a config error.
fn get_bool(section: &Properties, key: &str) -> Result<bool> {
    let Some(raw) = section.get(key) else {
        return Ok(false);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        _ => Err(RegencronError::Config(format!("'{key}' must be a boolean"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_SSL: &str = "\
[regencron]
server = https://hub.example.org/kojihub
authtype = ssl
cert = /etc/pki/regencron/client.pem
included_tags = build-* extra-?
";

    const VALID_GSSAPI: &str = "\
[regencron]
server = https://hub.example.org/kojihub
authtype = gssapi
principal = regencron/host.example.org@EXAMPLE.ORG
included_tags = build-*
";

    fn config_error(data: &str) -> String {
        match Config::from_ini_str(data) {
            Err(RegencronError::Config(msg)) => msg,
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn valid_ssl_config_parses() {
        let config = Config::from_ini_str(VALID_SSL).unwrap();
        assert_eq!(config.server, "https://hub.example.org/kojihub");
        assert_eq!(config.authtype, AuthType::Ssl);
        assert_eq!(config.cert.as_deref(), Some("/etc/pki/regencron/client.pem"));
        assert_eq!(config.included_tags, vec!["build-*", "extra-?"]);
        assert_eq!(config.client, PathBuf::from("koji"));
        assert!(!config.debug && !config.wait && !config.continue_on_failure);
    }

    #[test]
    fn valid_gssapi_config_parses() {
        let config = Config::from_ini_str(VALID_GSSAPI).unwrap();
        assert_eq!(config.authtype, AuthType::Gssapi);
        assert_eq!(config.authtype.as_str(), "gssapi");
        assert!(config.principal.is_some());
        assert!(config.cert.is_none());
    }

    #[test]
    fn missing_section_is_rejected() {
        let msg = config_error("[other]\nserver = x\n");
        assert!(msg.contains("[regencron] section missing"));
    }

    #[test]
    fn missing_required_keys_are_rejected() {
        for key in ["server", "authtype", "included_tags"] {
            let data = VALID_SSL
                .lines()
                .filter(|line| !line.starts_with(key))
                .collect::<Vec<_>>()
                .join("\n");
            let msg = config_error(&data);
            assert!(msg.contains(&format!("{key} not provided")), "{msg}");
        }
    }

    #[test]
    fn empty_required_key_is_rejected() {
        let data = VALID_SSL.replace(
            "server = https://hub.example.org/kojihub",
            "server =",
        );
        assert!(config_error(&data).contains("server not provided"));
    }

    #[test]
    fn non_https_server_is_rejected() {
        let data = VALID_SSL.replace("https://", "http://");
        assert!(config_error(&data).contains("not an HTTPS URL"));
    }

    #[test]
    fn wrong_endpoint_path_is_rejected() {
        let data = VALID_SSL.replace("/kojihub", "/other");
        assert!(config_error(&data).contains("/kojihub"));
    }

    #[test]
    fn ssl_without_cert_is_rejected() {
        let data = VALID_SSL.replace("cert = /etc/pki/regencron/client.pem", "");
        assert!(config_error(&data).contains("cert not provided"));
    }

    #[test]
    fn gssapi_without_principal_is_rejected() {
        let data = VALID_GSSAPI
            .replace("principal = regencron/host.example.org@EXAMPLE.ORG", "");
        assert!(config_error(&data).contains("principal not provided"));
    }

    #[test]
    fn unknown_authtype_is_rejected() {
        let data = VALID_SSL.replace("authtype = ssl", "authtype = kerberos");
        assert!(config_error(&data).contains("'kerberos'"));
    }

    #[test]
    fn invalid_glob_pattern_is_rejected() {
        let data = VALID_SSL.replace("included_tags = build-* extra-?", "included_tags = build-[");
        assert!(config_error(&data).contains("invalid tag pattern"));
    }

    #[test]
    fn boolean_spellings_parse() {
        for (raw, expected) in [
            ("1", true),
            ("yes", true),
            ("True", true),
            ("on", true),
            ("0", false),
            ("no", false),
            ("False", false),
            ("off", false),
        ] {
            let data = format!("{VALID_SSL}wait = {raw}\n");
            let config = Config::from_ini_str(&data).unwrap();
            assert_eq!(config.wait, expected, "wait = {raw}");
        }
    }

    #[test]
    fn non_boolean_value_is_rejected() {
        let data = format!("{VALID_SSL}debug = maybe\n");
        assert!(config_error(&data).contains("'debug' must be a boolean"));
    }

    #[test]
    fn client_key_overrides_the_default_executable() {
        let data = format!("{VALID_SSL}client = /usr/local/bin/hubctl\n");
        let config = Config::from_ini_str(&data).unwrap();
        assert_eq!(config.client, PathBuf::from("/usr/local/bin/hubctl"));
    }

    #[test]
    fn explicit_flags_override_config_values() {
        let data = format!("{VALID_SSL}wait = true\ncontinue_on_failure = true\n");
        let mut config = Config::from_ini_str(&data).unwrap();
        config.apply_overrides(&Overrides {
            wait: Some(false),
            ..Overrides::default()
        });
        assert!(!config.wait);
        // untouched options keep their config values
        assert!(config.continue_on_failure);
        assert!(!config.debug);
    }

    #[test]
    fn omitted_flags_fall_back_to_config() {
        let data = format!("{VALID_SSL}debug = true\n");
        let mut config = Config::from_ini_str(&data).unwrap();
        config.apply_overrides(&Overrides::default());
        assert!(config.debug);
    }

    #[test]
    fn logfile_flag_overrides_config_key() {
        let data = format!("{VALID_SSL}logfile = /var/log/regencron.log\n");
        let mut config = Config::from_ini_str(&data).unwrap();
        config.apply_overrides(&Overrides {
            logfile: Some(PathBuf::from("/tmp/override.log")),
            ..Overrides::default()
        });
        assert_eq!(config.logfile, Some(PathBuf::from("/tmp/override.log")));
    }

    #[test]
    fn load_reports_a_missing_file_as_a_config_error() {
        let err = Config::load(Path::new("/nonexistent/regencron.conf")).unwrap_err();
        assert!(matches!(err, RegencronError::Config(_)));
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG);
    }
}
