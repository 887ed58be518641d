use super::defaults::{
    DEFAULT_LISTING_ARGS, DEFAULT_LISTING_COMMAND, DEFAULT_LISTING_SERVER_NAME, ROBOTS_BYPASS_FLAG,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Launch configuration for the listings MCP server subprocess.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ListingServerConfig {
    pub name: String,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub workdir: Option<PathBuf>,
    /// Pass the robots-exclusion bypass flag to the server on startup.
    pub ignore_robots: bool,
}

impl ListingServerConfig {
    /// Arguments the subprocess is actually launched with. The robots bypass
    /// flag is appended exactly once when enabled.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        if self.ignore_robots && !args.iter().any(|arg| arg == ROBOTS_BYPASS_FLAG) {
            args.push(ROBOTS_BYPASS_FLAG.to_string());
        }
        args
    }
}

impl Default for ListingServerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_LISTING_SERVER_NAME.to_string(),
            command: PathBuf::from(DEFAULT_LISTING_COMMAND),
            args: DEFAULT_LISTING_ARGS.iter().map(|s| s.to_string()).collect(),
            env: HashMap::new(),
            workdir: None,
            ignore_robots: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawListingServer {
    #[serde(default = "default_server_name")]
    name: String,
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    workdir: Option<String>,
    #[serde(default = "default_true")]
    ignore_robots: bool,
}

fn default_server_name() -> String {
    DEFAULT_LISTING_SERVER_NAME.to_string()
}

fn default_true() -> bool {
    true
}

impl RawListingServer {
    pub(crate) fn command_is_empty(&self) -> bool {
        self.command.trim().is_empty()
    }
}

impl From<RawListingServer> for ListingServerConfig {
    fn from(raw: RawListingServer) -> Self {
        let expand = |s: &str| -> String {
            shellexpand::full(s)
                .map(|cow| cow.into_owned())
                .unwrap_or_else(|_| s.to_string())
        };

        Self {
            name: raw.name,
            command: PathBuf::from(expand(&raw.command)),
            args: raw.args.iter().map(|arg| expand(arg)).collect(),
            env: raw.env,
            workdir: raw.workdir.map(|dir| PathBuf::from(expand(&dir))),
            ignore_robots: raw.ignore_robots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn expands_env_vars_in_command_and_args() {
        unsafe {
            env::set_var("TEST_LISTING_ROOT", "/opt/listing");
            env::set_var("TEST_LISTING_ARG", "server-pkg");
        }

        let raw = RawListingServer {
            name: "test-server".to_string(),
            command: "${TEST_LISTING_ROOT}/bin/npx".to_string(),
            args: vec!["-y".to_string(), "${TEST_LISTING_ARG}".to_string()],
            env: HashMap::new(),
            workdir: Some("${TEST_LISTING_ROOT}/work".to_string()),
            ignore_robots: true,
        };

        let config = ListingServerConfig::from(raw);

        let cmd = config.command.to_str().expect("valid utf8");
        assert!(cmd.contains("/opt/listing/bin/npx"));
        assert!(config.args.contains(&"server-pkg".to_string()));
        let workdir = config.workdir.expect("workdir exists");
        assert!(workdir.to_str().expect("valid utf8").contains("/opt/listing/work"));

        unsafe {
            env::remove_var("TEST_LISTING_ROOT");
            env::remove_var("TEST_LISTING_ARG");
        }
    }

    #[test]
    fn launch_args_append_robots_bypass_once() {
        let config = ListingServerConfig::default();
        let args = config.launch_args();
        assert_eq!(
            args.iter().filter(|arg| *arg == ROBOTS_BYPASS_FLAG).count(),
            1
        );
        // flag goes last so the package arguments stay in front
        assert_eq!(args.last().map(String::as_str), Some(ROBOTS_BYPASS_FLAG));
    }

    #[test]
    fn launch_args_do_not_duplicate_explicit_flag() {
        let mut config = ListingServerConfig::default();
        config.args.push(ROBOTS_BYPASS_FLAG.to_string());
        let args = config.launch_args();
        assert_eq!(
            args.iter().filter(|arg| *arg == ROBOTS_BYPASS_FLAG).count(),
            1
        );
    }

    #[test]
    fn launch_args_respect_disabled_bypass() {
        let config = ListingServerConfig {
            ignore_robots: false,
            ..ListingServerConfig::default()
        };
        assert!(!config.launch_args().contains(&ROBOTS_BYPASS_FLAG.to_string()));
    }
}
