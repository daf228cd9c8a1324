//! CLI module for Epochly.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{preview, Output};

use clap::{Parser, Subcommand};

/// Epochly - YouTube transcripts, summaries and quizzes
///
/// Fetches video transcripts through a chain of fallback strategies and turns
/// them into summaries and multiple-choice quizzes with a caller-supplied LLM key.
#[derive(Parser, Debug)]
#[command(name = "epochly")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Fetch a video transcript, optionally summarizing it
    Transcript {
        /// YouTube URL or video ID
        url: String,

        /// Summary instructions; a summary is generated only when given
        #[arg(short, long)]
        instructions: Option<String>,

        /// LLM API key
        #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// LLM provider
        #[arg(long, default_value = "groq")]
        provider: String,
    },

    /// Generate a multiple-choice quiz from a transcript file
    Quiz {
        /// Transcript file, or '-' for stdin
        input: String,

        /// Number of questions
        #[arg(short = 'n', long)]
        num_questions: Option<usize>,

        /// Print questions as JSON instead of formatted text
        #[arg(long)]
        json: bool,

        /// LLM API key
        #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// LLM provider
        #[arg(long, default_value = "groq")]
        provider: String,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_quiz() {
        let cli = Cli::try_parse_from(["epochly", "-v", "quiz", "notes.txt", "-n", "3"]).unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Quiz {
                input,
                num_questions,
                provider,
                ..
            } => {
                assert_eq!(input, "notes.txt");
                assert_eq!(num_questions, Some(3));
                assert_eq!(provider, "groq");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
