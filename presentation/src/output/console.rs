//! Console output formatter for tool-relay results

use colored::Colorize;
use relay_domain::{
    BackendEndpoint, ExecutionOutcome, ExecutionRecord, ExecutionStatus, ToolDescriptor,
};
use serde_json::{Value, json};

/// Formats command results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Discovered tools plus the backends that could not be reached
    pub fn format_tools(tools: &[ToolDescriptor], failed: &[(BackendEndpoint, String)]) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Available Tools"));
        output.push('\n');

        if tools.is_empty() {
            output.push_str(&format!("\n{}\n", "No tools found.".yellow()));
        }

        for tool in tools {
            output.push_str(&format!(
                "\n{} {} {}\n",
                tool.name.bold(),
                format!("v{}", tool.version).dimmed(),
                format!("[{}]", tool.queue).cyan()
            ));
            if !tool.description.is_empty() {
                output.push_str(&Self::indent(&tool.description, "  "));
                output.push('\n');
            }
            for arg in tool.args_schema.args() {
                let marker = if arg.required { "*" } else { " " };
                output.push_str(&format!(
                    "  {}{} {}\n",
                    marker.red(),
                    arg.name,
                    format!("<{}>", arg.arg_type.as_str()).dimmed()
                ));
            }
        }

        if !failed.is_empty() {
            output.push_str(&Self::section_header("Unreachable backends"));
            for (backend, reason) in failed {
                output.push_str(&format!("  {} {}: {}\n", "x".red(), backend, reason));
            }
        }

        output
    }

    pub fn tools_json(tools: &[ToolDescriptor], failed: &[(BackendEndpoint, String)]) -> String {
        let failed: Vec<Value> = failed
            .iter()
            .map(|(backend, reason)| json!({"backend": backend.as_str(), "error": reason}))
            .collect();
        Self::pretty(&json!({"tools": tools, "failed_backends": failed}))
    }

    /// Result of a `call`
    pub fn format_outcome(tool: &str, outcome: &ExecutionOutcome) -> String {
        match outcome {
            ExecutionOutcome::Completed(value) => format!(
                "{} {}\n{}",
                "v".green(),
                tool.bold(),
                Self::indent(&Self::value_text(value), "  ")
            ),
            ExecutionOutcome::Failed(error) => format!(
                "{} {} {}\n  {}",
                "x".red(),
                tool.bold(),
                format!("({})", error.code).red(),
                error.message
            ),
        }
    }

    pub fn outcome_json(outcome: &ExecutionOutcome) -> String {
        let value = match outcome {
            ExecutionOutcome::Completed(result) => json!({"status": "completed", "result": result}),
            ExecutionOutcome::Failed(error) => json!({
                "status": "error",
                "error": error.message,
                "code": error.code,
            }),
        };
        Self::pretty(&value)
    }

    /// Execution record from a status request
    pub fn format_record(execution_id: &str, record: &ExecutionRecord) -> String {
        let status = match record.status {
            ExecutionStatus::Pending => record.status.as_str().yellow(),
            ExecutionStatus::Completed => record.status.as_str().green(),
            ExecutionStatus::Error => record.status.as_str().red(),
        };

        let mut output = format!(
            "{} {}\n{} {}\n{} {}\n{} {}\n",
            "Execution:".cyan().bold(),
            execution_id,
            "Tool:".cyan().bold(),
            record.tool,
            "Status:".cyan().bold(),
            status,
            "Args:".cyan().bold(),
            record.args
        );
        if record.is_terminal() {
            output.push_str(&format!(
                "{}\n{}\n",
                "Result:".cyan().bold(),
                Self::indent(&Self::value_text(&record.result), "  ")
            ));
        }
        if let Some(updated) = &record.updated_at {
            output.push_str(&format!("{} {}\n", "Updated:".dimmed(), updated));
        }
        output
    }

    pub fn record_json(execution_id: &str, record: &ExecutionRecord) -> String {
        let mut value = serde_json::to_value(record).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.insert("execution_id".to_string(), json!(execution_id));
        }
        Self::pretty(&value)
    }

    pub fn format_registered(name: &str, backend: &BackendEndpoint) -> String {
        format!("{} Registered {} with {}", "v".green(), name.bold(), backend)
    }

    /// Startup banner of `serve`
    pub fn format_serve_banner(base_url: &str, queues: &[(String, usize)]) -> String {
        let mut output = format!(
            "{} {}\n",
            "Backend listening on".cyan().bold(),
            base_url.bold()
        );
        for (queue, slots) in queues {
            output.push_str(&format!("  {} {} ({} slots)\n", "->".cyan(), queue, slots));
        }
        output.push_str(&format!("{}", "Press Ctrl-C to stop.".dimmed()));
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn pretty(value: &Value) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Strings print bare, everything else as pretty JSON
    fn value_text(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => Self::pretty(other),
        }
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
