//! CLI binary for docquiz.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GeneratorConfig` / `GenerationSettings` and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docquiz::{
    export_json, export_to_dir, sample_quiz, Difficulty, Document, GenerationSettings,
    GeneratorConfig, PersistencePolicy, PersistenceStatus, ProgressEvent, ProgressSink,
    QuizGenerator, QuizId, QuizStore, Stage, StaticClient,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress sink using indicatif ────────────────────────────────────────

/// Renders pipeline checkpoints as a 0–100 % bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Generating");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressSink for CliProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.bar.set_position(event.progress as u64);
        self.bar.set_message(dim(&event.step));
        if event.progress >= 100 {
            self.bar.finish_and_clear();
        }
    }

    fn on_failure(&self, stage: Stage, error: &str) {
        self.bar.abandon();
        // Keep the one-line summary tidy; the full error is printed by main.
        let first_line = error.lines().next().unwrap_or(error);
        eprintln!("{} failed during {:?}: {}", red("✘"), stage, red(first_line));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate a quiz from a text file (saved to the local store)
  docquiz generate notes.txt

  # Fewer, harder questions without explanations
  docquiz generate --mcq-count 5 --short-answer-count 2 --difficulty hard --no-explanations notes.txt

  # Offline placeholder quiz (no API key needed)
  docquiz generate --mock notes.txt --json

  # Use another provider through edgequake-llm
  docquiz generate --provider openai --model gpt-4.1-mini notes.txt

  # Manage saved quizzes
  docquiz list
  docquiz show quiz_1767225600000_1a2b3c4d
  docquiz export quiz_1767225600000_1a2b3c4d -o ./exports
  docquiz delete quiz_1767225600000_1a2b3c4d

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default backend)
  OPENAI_API_KEY          OpenAI API key (with --provider openai)
  ANTHROPIC_API_KEY       Anthropic API key (with --provider anthropic)
  DOCQUIZ_STORE_DIR       Directory for saved quizzes (default: ./.docquiz)
  RUST_LOG                Override log filter (e.g. docquiz=debug)
"#;

/// Generate quizzes and study guides from documents using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "docquiz",
    version,
    about = "Generate quizzes and study guides from documents using LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding saved quizzes.
    #[arg(long, global = true, env = "DOCQUIZ_STORE_DIR", default_value = ".docquiz")]
    store_dir: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCQUIZ_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "DOCQUIZ_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a quiz from a document.
    Generate(GenerateArgs),

    /// List saved quizzes, newest first.
    List {
        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print a saved quiz.
    Show {
        id: String,

        /// Output the full record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete a saved quiz.
    Delete { id: String },

    /// Write a saved quiz to `<document>_quiz.json`.
    Export {
        id: String,

        /// Output directory, or `-` for stdout.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    /// Document to read (.pdf, .doc, .docx, .txt).
    input: PathBuf,

    /// Number of multiple-choice questions.
    #[arg(long, env = "DOCQUIZ_MCQ_COUNT", default_value_t = 10)]
    mcq_count: u32,

    /// Number of short-answer questions.
    #[arg(long, env = "DOCQUIZ_SHORT_ANSWER_COUNT", default_value_t = 5)]
    short_answer_count: u32,

    /// Question difficulty.
    #[arg(long, env = "DOCQUIZ_DIFFICULTY", value_enum, default_value = "medium")]
    difficulty: DifficultyArg,

    /// Omit MCQ explanations.
    #[arg(long)]
    no_explanations: bool,

    /// Model ID (default: gemini-2.0-flash).
    #[arg(long, env = "DOCQUIZ_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider: openai, anthropic, gemini, ollama, …
    #[arg(long, env = "DOCQUIZ_PROVIDER")]
    provider: Option<String>,

    /// Serve a placeholder quiz instead of calling a model.
    #[arg(long)]
    mock: bool,

    /// Inference call timeout in seconds.
    #[arg(long, env = "DOCQUIZ_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Retries on transient inference failures.
    #[arg(long, env = "DOCQUIZ_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Fail when the model returns a different number of questions.
    #[arg(long)]
    strict_counts: bool,

    /// Do not save the quiz to the store.
    #[arg(long)]
    no_save: bool,

    /// Fail the run if the quiz cannot be saved.
    #[arg(long, conflicts_with = "no_save")]
    require_save: bool,

    /// Also export the quiz JSON into this directory.
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Print the full package as JSON instead of a summary.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOCQUIZ_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(v: DifficultyArg) -> Self {
        match v {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Medium => Difficulty::Medium,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = match cli.command {
        Command::Generate(ref args) => !cli.quiet && !args.no_progress && !args.json,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let store = QuizStore::open_dir(&cli.store_dir);

    match cli.command {
        Command::Generate(ref args) => run_generate(&cli, args, store, show_progress).await,
        Command::List { json } => run_list(&store, json).await,
        Command::Show { ref id, json } => run_show(&store, id, json).await,
        Command::Delete { ref id } => run_delete(&store, id, cli.quiet).await,
        Command::Export { ref id, ref output } => run_export(&store, id, output, cli.quiet).await,
    }
}

async fn run_generate(
    cli: &Cli,
    args: &GenerateArgs,
    store: QuizStore,
    show_progress: bool,
) -> Result<()> {
    let settings = GenerationSettings::new(
        args.mcq_count,
        args.short_answer_count,
        args.difficulty.clone().into(),
        !args.no_explanations,
    );

    let document = Document::from_path(&args.input)
        .await
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    let config = build_config(args)?;
    let mut generator = QuizGenerator::new(config);
    if !args.no_save {
        generator = generator.with_store(store);
    }
    if args.mock {
        let placeholder = serde_json::to_string(&sample_quiz(&settings, document.name()))
            .context("Failed to build placeholder quiz")?;
        generator = generator.with_client(Arc::new(StaticClient::new(placeholder)));
    }

    let doc_name = document.name().to_string();
    let result = if show_progress {
        generator.generate(document, &settings, &CliProgress::new()).await
    } else {
        generator
            .generate(document, &settings, &docquiz::NoopProgressSink)
            .await
    };
    let output = match result {
        Ok(o) => o,
        Err(e) => {
            let kind = e.kind();
            return Err(anyhow::Error::new(e).context(format!("Quiz generation failed ({kind:?})")));
        }
    };

    if let Some(ref dir) = args.export_dir {
        let path = export_to_dir(&output.package.data, &doc_name, dir)
            .await
            .context("Failed to export quiz")?;
        if !cli.quiet {
            eprintln!("{} exported to {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    if args.json {
        let json = serde_json::to_string_pretty(&output.package)
            .context("Failed to serialise quiz")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        let count = &output.package.metadata.questions_count;
        eprintln!(
            "{} {} questions ({} MCQ, {} short answer) from {}",
            green("✔"),
            bold(&count.total.to_string()),
            count.mcqs,
            count.short_answers,
            bold(&doc_name),
        );
        match output.persistence {
            PersistenceStatus::Saved => eprintln!("   saved as {}", cyan(output.id.as_str())),
            PersistenceStatus::Disabled => eprintln!("   {}", dim("not saved (--no-save)")),
            PersistenceStatus::Failed(ref e) => {
                eprintln!("   {} not saved: {}", red("⚠"), red(&e.to_string()))
            }
        }
    }
    print_quiz(&output.package.data);
    Ok(())
}

/// Map CLI args to `GeneratorConfig`.
fn build_config(args: &GenerateArgs) -> Result<GeneratorConfig> {
    let mut builder = GeneratorConfig::builder()
        .inference_timeout_secs(args.timeout)
        .max_retries(args.max_retries)
        .strict_counts(args.strict_counts)
        .persistence(if args.require_save {
            PersistencePolicy::Required
        } else {
            PersistencePolicy::BestEffort
        });

    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }

    builder.build().context("Invalid configuration")
}

async fn run_list(store: &QuizStore, json: bool) -> Result<()> {
    let records = store.get_all().await.context("Failed to read quiz store")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&records).context("Failed to serialise records")?
        );
        return Ok(());
    }

    if records.is_empty() {
        eprintln!("{}", dim("No saved quizzes."));
        return Ok(());
    }
    for r in &records {
        println!(
            "{}  {}  {:>3} questions  {}",
            cyan(r.id.as_str()),
            dim(&r.saved_at.format("%Y-%m-%d %H:%M").to_string()),
            r.metadata.questions_count.total,
            r.metadata.file_name,
        );
    }
    Ok(())
}

async fn run_show(store: &QuizStore, id: &str, json: bool) -> Result<()> {
    let record = store
        .get_by_id(&QuizId::new(id))
        .await
        .context("Failed to read quiz store")?
        .with_context(|| format!("No saved quiz with id '{id}'"))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&record).context("Failed to serialise record")?
        );
    } else {
        println!("{}", bold(&record.metadata.file_name));
        print_quiz(&record.data);
    }
    Ok(())
}

async fn run_delete(store: &QuizStore, id: &str, quiet: bool) -> Result<()> {
    let removed = store
        .delete_by_id(&QuizId::new(id))
        .await
        .context("Failed to update quiz store")?;
    if !removed {
        anyhow::bail!("No saved quiz with id '{id}'");
    }
    if !quiet {
        eprintln!("{} deleted {}", green("✔"), id);
    }
    Ok(())
}

async fn run_export(store: &QuizStore, id: &str, output: &Path, quiet: bool) -> Result<()> {
    let record = store
        .get_by_id(&QuizId::new(id))
        .await
        .context("Failed to read quiz store")?
        .with_context(|| format!("No saved quiz with id '{id}'"))?;

    if output == Path::new("-") {
        println!("{}", export_json(&record.data).context("Failed to serialise quiz")?);
        return Ok(());
    }

    let path = export_to_dir(&record.data, &record.metadata.file_name, output)
        .await
        .context("Failed to export quiz")?;
    if !quiet {
        eprintln!("{} {}", green("✔"), bold(&path.display().to_string()));
    }
    Ok(())
}

/// Human-readable rendering of a quiz on stdout.
fn print_quiz(quiz: &docquiz::QuizResult) {
    let a = &quiz.analysis;
    println!(
        "\n{}  {}  ({}, ~{})",
        bold("Topics:"),
        a.main_topics.join(", "),
        a.difficulty_level,
        a.estimated_study_time
    );

    println!("\n{}", bold("Multiple choice"));
    for (i, q) in quiz.mcqs.iter().enumerate() {
        println!("{:>3}. {}", i + 1, q.question);
        for (j, opt) in q.options.iter().enumerate() {
            let letter = (b'A' + j as u8) as char;
            if j == q.correct_answer as usize {
                println!("       {} {}", green(&format!("{letter})")), green(opt));
            } else {
                println!("       {letter}) {opt}");
            }
        }
        if let Some(ref e) = q.explanation {
            println!("       {}", dim(e));
        }
    }

    println!("\n{}", bold("Short answer"));
    for (i, q) in quiz.short_answer_questions.iter().enumerate() {
        println!("{:>3}. {}", i + 1, q.question);
        for p in &q.key_points {
            println!("       • {}", dim(p));
        }
    }

    println!("\n{}\n{}", bold("Study guide"), quiz.study_guide.summary);
    for c in &quiz.study_guide.important_concepts {
        println!("  • {c}");
    }
    if !quiz.study_guide.suggested_readings.is_empty() {
        println!("{}", bold("Suggested readings"));
        for r in &quiz.study_guide.suggested_readings {
            println!("  • {r}");
        }
    }
}
