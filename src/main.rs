//! CLI entry point for `mboxtune`.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mboxtune::config::Config;
use mboxtune::enhance::{
    enhance_unresolved, EnhancementReport, FixedPromptEnhancer, HeuristicEnhancer, PromptEnhancer,
};
use mboxtune::export::{self, ExportSummary};
use mboxtune::filter::ContentFilter;
use mboxtune::model::pair::{Dataset, DatasetStats};
use mboxtune::pipeline::Pipeline;

#[derive(Parser)]
#[command(
    name = "mboxtune",
    version,
    about = "Build a fine-tuning dataset from the emails you wrote",
    long_about = "Reads an MBOX export (for example Gmail Takeout), pairs your replies with the \
                  messages they answer, drops automated and low-content mail, and writes \
                  training/validation JSONL files in chat format."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, enhance and write the training and validation files
    Prepare {
        path: PathBuf,
        /// Your email address; messages from it are your responses
        #[arg(long, env = "MBOXTUNE_OWNER")]
        owner: Option<String>,
        /// Output directory for the JSONL files
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// Use the fallback prompt for every unresolved message
        #[arg(long)]
        no_enhance: bool,
        #[arg(long)]
        json: bool,
    },
    /// Run the extraction pipeline and print what it found
    Stats {
        path: PathBuf,
        #[arg(long, env = "MBOXTUNE_OWNER")]
        owner: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Clean text read from stdin and print its filter verdict
    Classify {
        /// Subject line to classify together with the body
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long)]
        json: bool,
    },
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = mboxtune::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Prepare {
            path,
            owner,
            output,
            no_enhance,
            json,
        } => cmd_prepare(&config, &path, owner.as_deref(), &output, no_enhance, json),
        Commands::Stats { path, owner, json } => cmd_stats(&config, &path, owner.as_deref(), json),
        Commands::Classify { subject, json } => cmd_classify(&config, &subject, json),
        Commands::InitConfig { force } => cmd_init_config(&config, force),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = mboxtune::config::log_file_path(config);
    let log_dir = mboxtune::config::cache_dir(config);
    let file_name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "mboxtune.log".into());

    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, file_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxtune", &mut std::io::stdout());
    Ok(())
}

fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

fn cmd_init_config(config: &Config, force: bool) -> anyhow::Result<()> {
    if let Some(path) = mboxtune::config::config_file_path() {
        if path.exists() && !force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
    }
    let path = mboxtune::config::save_config(config)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Run the pipeline over an MBOX file with a progress bar.
fn run_pipeline(pipeline: &Pipeline, path: &Path) -> anyhow::Result<(Dataset, u64, Duration)> {
    if !path.exists() {
        anyhow::bail!("MBOX file not found: {}", path.display());
    }

    let file_size = std::fs::metadata(path)?.len();
    let pb = ProgressBar::new(file_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} Reading mail [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let dataset = pipeline.run_mbox(
        path,
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    )?;
    pb.finish_and_clear();

    Ok((dataset, file_size, start.elapsed()))
}

/// Extract pairs, enhance unresolved messages, and write the dataset.
fn cmd_prepare(
    config: &Config,
    path: &Path,
    owner: Option<&str>,
    output: &Path,
    no_enhance: bool,
    json: bool,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config, owner)?;
    let (mut dataset, file_size, elapsed) = run_pipeline(&pipeline, path)?;

    let unresolved: Vec<_> = dataset.drain_unresolved().collect();
    let mut enhancer: Box<dyn PromptEnhancer> = if no_enhance {
        Box::new(FixedPromptEnhancer::new(&config.enhancer.fallback_prompt))
    } else {
        Box::new(HeuristicEnhancer::new(&config.enhancer.fallback_prompt))
    };
    let (enhanced, report) = enhance_unresolved(enhancer.as_mut(), unresolved, &config.enhancer);

    let examples = export::build_examples(std::mem::take(&mut dataset.pairs), enhanced, &config.dataset);
    let final_dataset = export::finalize(examples, &config.dataset);
    let summary = export::write_dataset(output, &final_dataset, &config.dataset)?;

    if json {
        print_summary_json(path, file_size, &dataset.stats, elapsed, Some((&report, &summary)))?;
    } else {
        print_summary_table(path, file_size, &dataset.stats, elapsed);
        print_export_table(&report, &summary);
    }
    Ok(())
}

/// Run the pipeline and print the summary only.
fn cmd_stats(config: &Config, path: &Path, owner: Option<&str>, json: bool) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config, owner)?;
    let (dataset, file_size, elapsed) = run_pipeline(&pipeline, path)?;

    if json {
        print_summary_json(path, file_size, &dataset.stats, elapsed, None)?;
    } else {
        print_summary_table(path, file_size, &dataset.stats, elapsed);
        println!("  {:<22} {}", "Reply pairs", dataset.pairs.len());
        println!("  {:<22} {}", "Need a prompt", dataset.unresolved.len());
        println!();
    }
    Ok(())
}

/// Sanitize stdin and print the verdict.
fn cmd_classify(config: &Config, subject: &str, json: bool) -> anyhow::Result<()> {
    let filter = ContentFilter::new(&config.filter)?;

    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;
    let clean = mboxtune::clean::sanitize(&raw);
    let verdict = filter.classify(&clean, subject);

    if json {
        let output = serde_json::json!({
            "verdict": verdict,
            "clean_text": clean,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{verdict}");
    }
    Ok(())
}

/// Print pipeline statistics in a human-readable table.
fn print_summary_table(path: &Path, file_size: u64, stats: &DatasetStats, elapsed: Duration) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<22} {}", "File", path.display());
    println!("  {:<22} {}", "File size", format_size(file_size, BINARY));
    println!("  {:<22} {}", "Messages", stats.total_records);
    println!("  {:<22} {}", "Parsed", stats.total_parsed);
    if stats.parse_failures > 0 {
        println!("  {:<22} {}", "Parse failures", stats.parse_failures);
    }
    println!("  {:<22} {}", "Sent by you", stats.outbound);
    println!("  {:<22} {}", "Received", stats.inbound);
    println!("  {:<22} {}", "Duplicates removed", stats.duplicates_removed);
    println!("  {:<22} {:.2?}", "Processing time", elapsed);

    if !stats.dropped_by_reason.is_empty() {
        println!();
        println!("  Filtered out ({}):", stats.dropped_total());
        for (reason, count) in &stats.dropped_by_reason {
            println!("    {count:>6}  {reason}");
        }
    }
    if !stats.inbound_filtered_by_reason.is_empty() {
        println!();
        println!(
            "  Not usable as prompts ({}):",
            stats.inbound_filtered_total()
        );
        for (reason, count) in &stats.inbound_filtered_by_reason {
            println!("    {count:>6}  {reason}");
        }
    }
    println!();
}

fn print_export_table(report: &EnhancementReport, summary: &ExportSummary) {
    use humansize::{format_size, BINARY};

    println!("  {:<22} {}", "Synthetic prompts", report.requested);
    if report.fallbacks > 0 {
        println!("  {:<22} {}", "Fallback prompts", report.fallbacks);
    }
    println!(
        "  {:<22} {} ({})",
        "Training examples",
        summary.training_examples,
        summary.training_path.display()
    );
    println!(
        "  {:<22} {} ({})",
        "Validation examples",
        summary.validation_examples,
        summary.validation_path.display()
    );
    println!(
        "  {:<22} {}",
        "Written",
        format_size(summary.bytes_written, BINARY)
    );
    println!("  {:<22} ~{}", "Estimated tokens", summary.estimated_tokens);
    println!();
}

/// Print statistics (and export results, if any) as JSON.
fn print_summary_json(
    path: &Path,
    file_size: u64,
    stats: &DatasetStats,
    elapsed: Duration,
    export: Option<(&EnhancementReport, &ExportSummary)>,
) -> anyhow::Result<()> {
    let mut output = serde_json::json!({
        "file": path.to_string_lossy(),
        "file_size": file_size,
        "processing_time_ms": elapsed.as_millis(),
        "stats": stats,
    });
    if let Some((report, summary)) = export {
        output["enhancement"] = serde_json::to_value(report)?;
        output["export"] = serde_json::to_value(summary)?;
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
