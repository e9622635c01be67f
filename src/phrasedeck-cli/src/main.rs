//! Phrasedeck CLI - batch text-to-speech narration
//!
//! Reads a comma-separated file and produces one narrated audio file
//! per row, speaking every non-blank cell with configurable silence
//! before, after, and between segments.

use clap::Parser;
use colored::Colorize;
use phrasedeck_core::{
    AudioFormat, BatchCallback, BatchConfig, BatchEvent, BatchRunner, Config, Provider,
    SilenceSpec, build_synthesizer,
};
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

#[derive(Parser)]
#[command(
    name = "phrasedeck",
    version,
    about = "Batch text-to-speech narration from CSV rows",
    long_about = "Reads a comma-separated input file and produces one narrated audio file per row, with configurable silence before, after, and between the spoken segments. Vendor API keys are read from the environment."
)]
struct Cli {
    /// CSV file containing the texts to narrate
    #[arg(long, value_name = "PATH")]
    input_file: PathBuf,

    /// Directory to save the generated audio files
    #[arg(long, value_name = "PATH", default_value = ".")]
    output_dir: PathBuf,

    /// Voice ID to use for synthesis
    #[arg(long, value_name = "ID")]
    voice_id: String,

    /// Silence before and after each row's audio (in milliseconds)
    #[arg(long, value_name = "MS", default_value = "0")]
    padding: u64,

    /// Silence between spoken segments within a row (in milliseconds)
    #[arg(
        long = "in-between-silence",
        alias = "silence-in-between",
        value_name = "MS",
        default_value = "0"
    )]
    in_between_silence: u64,

    /// Format of the output audio files (mp3 or wav)
    #[arg(long, value_name = "FORMAT", default_value = "mp3")]
    output_format: String,

    /// Prefix for the generated filenames (defaults to the voice ID)
    #[arg(long, value_name = "PREFIX")]
    output_prefix: Option<String>,

    /// TTS vendor to use (elevenlabs or openai)
    #[arg(long, value_name = "PROVIDER")]
    provider: Option<String>,

    /// TOML file with synthesis tuning overrides
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(provider) = &cli.provider {
        config.synthesis.provider = Provider::from_str(provider)?;
    }
    let output_format = AudioFormat::from_str(&cli.output_format)?;

    // Print header
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  {} - batch narration", "Phrasedeck".bold())
            .bright_blue()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!(
        "{} {}",
        "Input:".bold(),
        cli.input_file.display().to_string().bright_white()
    );
    println!(
        "{} {} ({})",
        "Voice:".bold(),
        cli.voice_id.bright_cyan(),
        config.synthesis.provider.to_string().yellow()
    );
    println!(
        "{} {} padding, {} between segments, {} output",
        "Silence:".bold(),
        format!("{}ms", cli.padding).bright_white(),
        format!("{}ms", cli.in_between_silence).bright_white(),
        output_format.to_string().bright_white()
    );
    println!();
    println!("{}", "─".repeat(70).dimmed());

    let synthesizer = build_synthesizer(&config.synthesis)?;

    let batch = BatchConfig {
        input_file: cli.input_file,
        output_dir: cli.output_dir,
        voice_id: cli.voice_id,
        output_prefix: cli.output_prefix,
        output_format,
        silence: SilenceSpec {
            padding_ms: cli.padding,
            gap_ms: cli.in_between_silence,
        },
        synthesis: config.synthesis,
    };

    let runner = BatchRunner::new(batch, synthesizer).with_callback(create_console_callback());
    let summary = runner.run().await?;

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!(
            "  Done: {} file(s), {:.1}s of audio.",
            summary.rows_written,
            summary.total_duration_ms as f64 / 1000.0
        )
        .bright_green()
        .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();

    Ok(())
}

/// Create a callback that prints batch events to the console.
fn create_console_callback() -> BatchCallback {
    Box::new(move |event| match event {
        BatchEvent::RowStart {
            index,
            cells,
            spoken,
        } => {
            println!(
                "{} {} {}",
                "▶".bright_cyan(),
                format!("row {}", index + 1).bright_cyan().bold(),
                format!("({} of {} cells spoken)", spoken, cells).dimmed()
            );
        }
        BatchEvent::RowWritten {
            index: _,
            path,
            duration_ms,
        } => {
            println!(
                "  {} {} {}",
                "✓".bright_green(),
                path.display(),
                format!("({:.1}s)", duration_ms as f64 / 1000.0).dimmed()
            );
        }
        BatchEvent::BatchEnd { .. } => {
            // Handled in run
        }
    })
}
