//! CLI argument definitions for agentflow.

use af_core::export::N8N_FILE_NAME;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// agentflow -- describe an automation in plain English, get an n8n workflow.
#[derive(Parser)]
#[command(name = "agentflow", version, about = "Natural-language to automation workflow builder")]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a workflow from a plain-English request.
    Generate {
        /// The automation request, e.g. "When a Jotform is submitted, send a WhatsApp to +123".
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,

        /// Write the workflow as n8n JSON to this file.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Write the workflow to `workflow.n8n.json` in the current directory.
        #[arg(long, conflicts_with = "output")]
        save: bool,

        /// Print the whole outcome as JSON instead of a readable report.
        #[arg(long)]
        json: bool,

        /// Append a `workflow_generated` event to this SQLite event log.
        #[arg(long)]
        log_db: Option<PathBuf>,
    },

    /// Validate an existing n8n workflow JSON file.
    Validate {
        file: PathBuf,
    },

    /// Show the phones, emails, channels and times found in a piece of text.
    Extract {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Convert a recurrence phrase ("every day at 9am") to a schedule expression.
    Schedule {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List logged events.
    Events {
        /// SQLite event log to read.
        #[arg(long)]
        log_db: PathBuf,

        /// Maximum number of events to show.
        #[arg(long, default_value_t = 20)]
        limit: u32,

        /// Only show events of this type.
        #[arg(long = "type")]
        event_type: Option<String>,
    },
}

/// `--output` wins; `--save` falls back to the default export file name.
pub fn output_path(output: Option<PathBuf>, save: bool) -> Option<PathBuf> {
    output.or_else(|| save.then(|| PathBuf::from(N8N_FILE_NAME)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_args(args: &[&str]) -> (Option<PathBuf>, bool) {
        let argv = ["agentflow", "generate", "every", "hour"].iter().chain(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Generate { output, save, .. } => (output, save),
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn save_uses_default_file_name() {
        let (output, save) = generate_args(&["--save"]);
        assert_eq!(output_path(output, save), Some(PathBuf::from("workflow.n8n.json")));
    }

    #[test]
    fn explicit_output_and_no_output() {
        let (output, save) = generate_args(&["--output", "daily.json"]);
        assert_eq!(output_path(output, save), Some(PathBuf::from("daily.json")));

        let (output, save) = generate_args(&[]);
        assert_eq!(output_path(output, save), None);
    }

    #[test]
    fn save_conflicts_with_output() {
        let argv = ["agentflow", "generate", "hi", "--save", "--output", "x.json"];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
