//! lyrictime CLI: align lyrics to ASR output, tap timings, migrate tables,
//! and tune the preview offset.

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use lyrictime_core::align::run_alignment;
use lyrictime_core::align::tokens::{tokens_from_file, write_token_csv};
use lyrictime_core::config::{AlignConfig, Granularity};
use lyrictime_core::interactive::{
    manual_segments, tune, CommandRenderer, SystemClock, TapRecorder, TuneRequest, TunerOutcome,
};
use lyrictime_core::lyrics::{line_texts, read_lyrics};
use lyrictime_core::timing::{migrate_dir, migrate_file, write_canonical};

// ─── Top-level CLI ───────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "lyrictime",
    about = "Line-level lyric timing from ASR output or live tapping",
    version
)]
struct Cli {
    /// Show verbose output
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Align lyric lines against ASR word timings
    Align(AlignArgs),
    /// Dump the ASR token stream as CSV
    Tokens(TokensArgs),
    /// Record line timings by pressing Enter as each line is sung
    Tap(TapArgs),
    /// Rewrite legacy timing tables in canonical form
    Migrate(MigrateArgs),
    /// Nudge the global offset against a rendered preview
    Tune(TuneArgs),
}

// ─── Align ───────────────────────────────────────────────────────

#[derive(Args, Debug)]
struct AlignArgs {
    /// Lyric text file, one line per lyric line
    #[arg(long)]
    lyrics: PathBuf,

    /// ASR output JSON
    #[arg(long)]
    asr: PathBuf,

    /// Canonical timing CSV to write
    #[arg(long)]
    output: PathBuf,

    /// JSON file with alignment settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tokens searched ahead of the cursor per line
    #[arg(long)]
    window_size: Option<usize>,

    /// Minimum similarity to accept a match (0.0-1.0)
    #[arg(long)]
    min_score: Option<f64>,

    /// Use every timed record, including segments that contain words
    #[arg(long, default_value_t = false)]
    all_records: bool,
}

#[derive(Args, Debug)]
struct TokensArgs {
    /// ASR output JSON
    #[arg(long)]
    asr: PathBuf,

    /// CSV to write
    #[arg(long)]
    output: PathBuf,

    /// Use every timed record, including segments that contain words
    #[arg(long, default_value_t = false)]
    all_records: bool,
}

// ─── Manual / maintenance ────────────────────────────────────────

#[derive(Args, Debug)]
struct TapArgs {
    /// Lyric text file
    #[arg(long)]
    lyrics: PathBuf,

    /// Canonical timing CSV to write
    #[arg(long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct MigrateArgs {
    /// Convert every *.csv in this directory
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    dir: Option<PathBuf>,

    /// Convert a single file
    #[arg(long)]
    file: Option<PathBuf>,

    /// Span given to the last line when an end time must be inferred (seconds)
    #[arg(long, default_value_t = 2.0)]
    default_span: f64,
}

#[derive(Args, Debug)]
#[command(allow_negative_numbers = true)]
struct TuneArgs {
    /// Song identifier passed to the renderer
    #[arg(long)]
    slug: String,

    /// Audio the preview is rendered against
    #[arg(long)]
    audio: PathBuf,

    /// Canonical timing CSV for the song
    #[arg(long)]
    timings: PathBuf,

    /// Starting offset in seconds when no saved offset exists
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    base_offset: f64,

    /// Preview renderer program
    #[arg(long)]
    render_cmd: String,

    /// Extra renderer argument; `{slug}` and `{offset}` are substituted
    #[arg(long = "render-arg", allow_hyphen_values = true)]
    render_args: Vec<String>,
}

// ─── Main ────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Command::Align(args) => run_align(args),
        Command::Tokens(args) => run_tokens(args),
        Command::Tap(args) => run_tap(args),
        Command::Migrate(args) => run_migrate(args),
        Command::Tune(args) => run_tune(args),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

fn granularity(all_records: bool) -> Granularity {
    if all_records {
        Granularity::All
    } else {
        Granularity::Finest
    }
}

// ─── Subcommands ─────────────────────────────────────────────────

fn run_align(args: AlignArgs) -> Result<i32> {
    let mut config = match &args.config {
        Some(path) => AlignConfig::from_json_file(path)?,
        None => AlignConfig::default(),
    };
    if let Some(w) = args.window_size {
        config.window_size = w;
    }
    if let Some(s) = args.min_score {
        config.min_score = s;
    }
    if args.all_records {
        config.granularity = Granularity::All;
    }

    let report = run_alignment(&args.lyrics, &args.asr, &args.output, &config)?;
    println!(
        "{}: {}/{} lines timed",
        args.output.display(),
        report.matched,
        report.lines
    );
    Ok(0)
}

fn run_tokens(args: TokensArgs) -> Result<i32> {
    let tokens = tokens_from_file(&args.asr, granularity(args.all_records))?;
    write_token_csv(&args.output, &tokens)?;
    Ok(0)
}

fn run_tap(args: TapArgs) -> Result<i32> {
    let lines = read_lyrics(&args.lyrics)?;
    log::info!("Loaded {} lyric lines from {}", lines.len(), args.lyrics.display());

    let stdin = io::stdin();
    let mut recorder = TapRecorder::new(stdin.lock(), io::stdout(), SystemClock::new());
    let session = recorder.record(&lines)?;

    if !session.timings.is_empty() {
        let segments = manual_segments(&session.timings, &line_texts(&lines));
        write_canonical(&args.output, &segments)
            .with_context(|| format!("Failed to save taps to {}", args.output.display()))?;
        log::info!(
            "Wrote {} tapped lines to {}",
            segments.len(),
            args.output.display()
        );
    }
    Ok(if session.aborted { 1 } else { 0 })
}

fn run_migrate(args: MigrateArgs) -> Result<i32> {
    if let Some(dir) = &args.dir {
        let report = migrate_dir(dir, args.default_span)?;
        return Ok(report.exit_code());
    }
    match &args.file {
        Some(path) => {
            let rows = migrate_file(path, args.default_span)?;
            println!("Fixed: {} ({} rows)", path.display(), rows);
            Ok(0)
        }
        None => bail!("Either --dir or --file is required"),
    }
}

fn run_tune(args: TuneArgs) -> Result<i32> {
    let request = TuneRequest {
        slug: args.slug,
        base_offset: args.base_offset,
        audio_path: args.audio,
        timings_path: args.timings,
    };
    let renderer = CommandRenderer::new(&args.render_cmd, &args.render_args);

    let stdin = io::stdin();
    match tune(&request, renderer, stdin.lock(), io::stdout())? {
        TunerOutcome::Locked(offset) => {
            println!("{:.2}", offset);
            Ok(0)
        }
        TunerOutcome::Aborted => Ok(1),
    }
}
