//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored text
    Text,
    /// JSON output
    Json,
}

/// CLI arguments for tool-relay
#[derive(Parser, Debug)]
#[command(name = "tool-relay")]
#[command(author, version, about = "Dispatch tool calls to worker queues and relay their results")]
#[command(long_about = r#"
tool-relay runs tools asynchronously behind an HTTP API.

A backend node (`serve`) accepts run requests, queues them for its worker
slots and records every execution. Callers (`call`) receive the result as a
pushed callback, or poll the backend when no callback arrives in time.

Configuration files are loaded from (in priority order):
1. TOOL_RELAY_* environment variables (TOOL_RELAY_SERVER__BIND=...)
2. --config <path>     Explicit config file
3. ./relay.toml        Project-level config
4. ~/.config/tool-relay/config.toml   Global config

Example:
  tool-relay serve
  tool-relay tools
  tool-relay call divide --arg a=10 --arg b=2
  tool-relay call uppercase --json '{"text": "hello"}'
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long, global = true)]
    pub show_config: bool,

    /// Also write diagnostic logs to daily-rolling files in this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backend node: HTTP routes plus worker slots for the built-in tools
    Serve {
        /// Listen address (overrides [server].bind)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Worker slots per queue (overrides [workers].slots)
        #[arg(long, value_name = "N")]
        slots: Option<usize>,
    },

    /// Discover tools across all configured backends
    Tools,

    /// Run a tool and wait for its result
    Call {
        /// Tool name
        tool: String,

        /// Argument as key=value; values are read as JSON when they parse
        #[arg(short, long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,

        /// All arguments as one JSON object (merged before --arg)
        #[arg(long, value_name = "OBJECT")]
        json: Option<String>,
    },

    /// Show the execution record for an id on the first backend
    Status {
        execution_id: String,
    },

    /// Register a tool descriptor (JSON file) with the first backend
    Register {
        /// Path to the descriptor JSON
        descriptor: PathBuf,
    },
}

/// Build the argument object for `call` from `--json` and `--arg` values.
///
/// `--arg` entries override keys from `--json`. A value that parses as JSON
/// (`10`, `true`, `[1,2]`) keeps its type; anything else is a string.
pub fn parse_call_args(pairs: &[String], json: Option<&str>) -> Result<Value, String> {
    let mut args = match json {
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err("--json must be a JSON object".to_string()),
            Err(e) => return Err(format!("invalid --json: {}", e)),
        },
        None => Map::new(),
    };

    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            return Err(format!("expected KEY=VALUE, got '{}'", pair));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("empty argument name in '{}'", pair));
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        args.insert(key.to_string(), value);
    }

    Ok(Value::Object(args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_subcommand() {
        let cli = Cli::parse_from([
            "tool-relay", "call", "divide", "--arg", "a=10", "-a", "b=2", "-o", "json",
        ]);
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Command::Call { tool, args, json } => {
                assert_eq!(tool, "divide");
                assert_eq!(args, vec!["a=10", "b=2"]);
                assert!(json.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["tool-relay", "serve", "--slots", "3", "-vv", "--no-config"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.no_config);
        assert!(matches!(cli.command, Command::Serve { slots: Some(3), .. }));
    }

    #[test]
    fn test_parse_call_args_types() {
        let args = parse_call_args(
            &["a=10".to_string(), "text=hello world".to_string(), "flag=true".to_string()],
            None,
        )
        .unwrap();
        assert_eq!(args, json!({"a": 10, "text": "hello world", "flag": true}));
    }

    #[test]
    fn test_parse_call_args_merges_json() {
        let args = parse_call_args(&["b=3".to_string()], Some(r#"{"a": 1, "b": 2}"#)).unwrap();
        assert_eq!(args, json!({"a": 1, "b": 3}));
    }

    #[test]
    fn test_parse_call_args_errors() {
        assert!(parse_call_args(&["novalue".to_string()], None).is_err());
        assert!(parse_call_args(&["=1".to_string()], None).is_err());
        assert!(parse_call_args(&[], Some("[1, 2]")).is_err());
        assert!(parse_call_args(&[], Some("{oops")).is_err());
    }
}
