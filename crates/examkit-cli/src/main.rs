//! examkit CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{ArgGroup, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "examkit", version, about = "Timed IELTS-style exam sessions and scoring")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check exam documents for authoring problems
    Validate {
        /// Path to an exam file (.json or .toml) or a directory of them
        #[arg(long)]
        exam: PathBuf,
    },

    /// Show the steps and answer slots of an exam
    Inspect {
        /// Path to an exam file
        #[arg(long)]
        exam: PathBuf,
    },

    /// Run a session over an answer sheet and grade it
    #[command(group(ArgGroup::new("source").required(true).args(["exam", "test_id"])))]
    Score {
        /// Exam file to grade locally
        #[arg(long, conflicts_with = "backend")]
        exam: Option<PathBuf>,

        /// Test id to fetch from a configured backend
        #[arg(long)]
        test_id: Option<String>,

        /// Answer sheet JSON: {"answers": [...], "writing": [...], "timeTakenSecs": n}
        #[arg(long)]
        answers: PathBuf,

        /// Score only this step (0-based), as single-part practice
        #[arg(long)]
        practice_step: Option<usize>,

        /// Writing grading route when one is asked for: standard, ai
        #[arg(long, default_value = "standard")]
        writing_route: String,

        /// Backend name from the config (default: the config's default_backend)
        #[arg(long)]
        backend: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Directory to save the result JSON in
        #[arg(long)]
        output: Option<PathBuf>,

        /// Save the result JSON to the config's output_dir
        #[arg(long)]
        save: bool,
    },

    /// Create starter config and a sample exam
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examkit=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { exam } => commands::validate::execute(exam),
        Commands::Inspect { exam } => commands::inspect::execute(exam),
        Commands::Score {
            exam,
            test_id,
            answers,
            practice_step,
            writing_route,
            backend,
            config,
            format,
            output,
            save,
        } => {
            commands::score::execute(commands::score::ScoreArgs {
                exam,
                test_id,
                answers,
                practice_step,
                writing_route,
                backend,
                config,
                format,
                output,
                save,
            })
            .await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
