use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by the translating subcommands; each overrides the config file
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TranslateFlags {
    /// Source language name used in prompts (e.g. English)
    #[arg(long)]
    pub source_lang: Option<String>,

    /// Target language name used in prompts (e.g. Korean)
    #[arg(short, long)]
    pub target_lang: Option<String>,

    /// Character budget per batch
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Ask the model to deliberate before translating
    #[arg(long)]
    pub reasoning: bool,

    /// File holding a context guide to follow
    #[arg(long, conflicts_with = "analyze")]
    pub context: Option<PathBuf>,

    /// Generate a context guide from the subtitle before translating
    #[arg(long)]
    pub analyze: bool,

    /// Retry failed batches once more after the first pass
    #[arg(long)]
    pub retry_failed: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a single subtitle file
    Translate {
        /// Input subtitle file
        #[arg(short, long)]
        input: PathBuf,

        /// Output subtitle file (defaults to <stem>.<target>.srt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a JSON report with per-batch diagnostics
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        flags: TranslateFlags,
    },

    /// Translate every subtitle file in a directory
    Batch {
        /// Input directory containing subtitle files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory for translated files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Directory for per-file JSON reports
        #[arg(long)]
        report_dir: Option<PathBuf>,

        #[command(flatten)]
        flags: TranslateFlags,
    },

    /// Produce a style and glossary guide for a subtitle file
    Analyze {
        /// Input subtitle file
        #[arg(short, long)]
        input: PathBuf,

        /// Write the guide here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source language name
        #[arg(long)]
        source_lang: Option<String>,

        /// Target language name
        #[arg(short, long)]
        target_lang: Option<String>,
    },

    /// Parse and chunk a subtitle file without translating it
    Inspect {
        /// Input subtitle file
        #[arg(short, long)]
        input: PathBuf,

        /// Character budget per batch
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write the default configuration
    Init {
        /// Destination path
        #[arg(short, long, default_value = "jimaku.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_flags_parse() {
        let args = Args::try_parse_from([
            "jimaku", "translate", "-i", "movie.srt", "-t", "Japanese", "--chunk-size", "800", "--reasoning",
        ])
        .unwrap();

        match args.command {
            Commands::Translate { input, output, flags, .. } => {
                assert_eq!(input, PathBuf::from("movie.srt"));
                assert!(output.is_none());
                assert_eq!(flags.target_lang.as_deref(), Some("Japanese"));
                assert_eq!(flags.chunk_size, Some(800));
                assert!(flags.reasoning);
            }
            _ => panic!("expected translate command"),
        }
    }

    #[test]
    fn test_context_conflicts_with_analyze() {
        let result = Args::try_parse_from([
            "jimaku", "translate", "-i", "movie.srt", "--context", "guide.txt", "--analyze",
        ]);
        assert!(result.is_err());
    }
}
