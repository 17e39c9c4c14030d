//! Command line and hook environment parsing.

use std::path::PathBuf;

use clap::Parser;
use ircbridge_telemetry::LogFormat;

/// Arguments for a hook run. The agent supplies most of them through the environment.
#[derive(Debug, Parser)]
#[command(
    name = "ircbridge-charm",
    about = "Juju operator for the matrix-appservice-irc bridge"
)]
pub struct Cli {
    /// Hook or action being dispatched, e.g. `hooks/config-changed`.
    #[arg(long, env = "JUJU_DISPATCH_PATH")]
    pub dispatch_path: String,
    /// Unit running the hook.
    #[arg(long, env = "JUJU_UNIT_NAME")]
    pub unit_name: String,
    /// Model the unit belongs to.
    #[arg(long, env = "JUJU_MODEL_NAME", default_value = "")]
    pub model_name: String,
    /// Relation the hook concerns, set by the agent for relation hooks.
    #[arg(long, env = "JUJU_RELATION_ID")]
    pub relation_id: Option<String>,
    /// Log output format (`json` or `pretty`).
    #[arg(long, env = "IRCBRIDGE_LOG_FORMAT", value_parser = parse_log_format)]
    pub log_format: Option<LogFormat>,
    /// Alternate filesystem root for the bridge's configuration and unit files.
    #[arg(long, env = "IRCBRIDGE_ROOT")]
    pub root: Option<PathBuf>,
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse().map_err(|_| format!("unknown log format '{input}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn explicit_arguments_parse() -> Result<(), Box<dyn Error>> {
        let cli = Cli::try_parse_from([
            "ircbridge-charm",
            "--dispatch-path",
            "hooks/config-changed",
            "--unit-name",
            "irc-bridge/0",
            "--model-name",
            "chat",
            "--log-format",
            "json",
        ])?;
        assert_eq!(cli.dispatch_path, "hooks/config-changed");
        assert_eq!(cli.unit_name, "irc-bridge/0");
        assert_eq!(cli.model_name, "chat");
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(cli.root.is_none());
        assert!(cli.relation_id.is_none());
        Ok(())
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!(parse_log_format("xml").is_err());
        assert_eq!(parse_log_format("pretty"), Ok(LogFormat::Pretty));
    }
}
