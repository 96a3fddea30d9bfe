//! CLI entry point for `mailsite`.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailsite::config::{self, Config};
use mailsite::model::rendition::Rendition;
use mailsite::pipeline::{Pipeline, RunSummary};
use mailsite::source;

#[derive(Parser)]
#[command(
    name = "mailsite",
    version,
    about = "Turn a mailbox into a static HTML site",
    long_about = "Reads messages from an IMAPS folder, an MBOX file or a directory of .eml \
                  files, writes one \
                  HTML page per message with its attachments and image renditions, and an \
                  index page listing every message by date."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to $MAILSITE_CONFIG or the user config dir)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the site
    Run(RunArgs),
    /// Validate the configuration and templates without writing anything
    Check(RunArgs),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Values that override the configuration file.
#[derive(clap::Args)]
struct RunArgs {
    /// MBOX file or directory of .eml files (replaces a configured server)
    #[arg(short, long, value_name = "PATH")]
    source: Option<PathBuf>,

    /// Folder to read on the configured IMAPS server
    #[arg(long, value_name = "NAME")]
    folder: Option<String>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Template directory
    #[arg(short, long, value_name = "DIR")]
    templates: Option<PathBuf>,

    /// Only process messages whose subject contains this text
    #[arg(long, value_name = "TEXT")]
    search: Option<String>,

    /// Re-render pages that already exist
    #[arg(long)]
    overwrite: bool,

    /// Keep every copy of identical attachments
    #[arg(long)]
    no_dedup: bool,

    /// Image rendition as "name height width [fill]"; replaces configured renditions
    #[arg(short, long, value_name = "SPEC")]
    rendition: Vec<Rendition>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref())?;

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Run(args) => cmd_run(config, &args),
        Commands::Check(args) => cmd_check(config, &args),
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

    let log_dir = config::log_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailsite.log");
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

/// Fold command-line overrides into the loaded configuration and validate it.
fn resolve(mut config: Config, args: &RunArgs) -> anyhow::Result<Config> {
    if let Some(path) = &args.source {
        config.source.path = Some(path.clone());
        config.source.url = None;
    }
    if let Some(folder) = &args.folder {
        config.source.folder = Some(folder.clone());
    }
    if let Some(dir) = &args.output {
        config.output.dir = dir.clone();
    }
    if let Some(dir) = &args.templates {
        config.templates.dir = Some(dir.clone());
    }
    if let Some(subject) = &args.search {
        config.source.search_subject = Some(subject.clone());
    }
    if args.overwrite {
        config.output.overwrite = true;
    }
    if args.no_dedup {
        config.attachments.dedup = false;
    }
    if !args.rendition.is_empty() {
        config.attachments.renditions = args.rendition.clone();
    }
    config.validate()?;
    Ok(config)
}

fn cmd_run(config: Config, args: &RunArgs) -> anyhow::Result<()> {
    let config = resolve(config, args)?;

    let mut pipeline = Pipeline::from_config(&config)?;
    let mut mailbox =
        source::open_configured(&config.source).context("could not open the mail source")?;
    let messages = source::fetch(mailbox.as_mut(), config.source.search_subject.as_deref())?;

    let pb = ProgressBar::new(messages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Writing pages [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let summary = pipeline.run(&messages, &|done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    })?;
    pb.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&config, &summary, start.elapsed());
    }
    Ok(())
}

fn cmd_check(config: Config, args: &RunArgs) -> anyhow::Result<()> {
    let config = resolve(config, args)?;
    Pipeline::from_config(&config)?;
    if let Some(path) = config.source.path.as_deref() {
        if !path.exists() {
            anyhow::bail!("mail source not found: {}", path.display());
        }
    }
    let mut shown = config;
    if shown.source.password.is_some() {
        shown.source.password = Some("********".to_string());
    }
    print!("{}", toml::to_string_pretty(&shown)?);
    eprintln!("  Configuration OK");
    Ok(())
}

fn print_summary(config: &Config, summary: &RunSummary, elapsed: std::time::Duration) {
    use humansize::{format_size, BINARY};
    println!();
    println!("  Site written to {}", config.output.dir.display());
    println!("  {:<25} {}", "Messages", summary.processed);
    println!("  {:<25} {}", "Pages written", summary.written);
    println!("  {:<25} {}", "Pages unchanged", summary.skipped);
    println!("  {:<25} {}", "Failed", summary.failed);
    println!(
        "  {:<25} {} ({})",
        "Attachments",
        summary.attachments,
        format_size(summary.attachment_bytes, BINARY)
    );
    println!("  {:<25} {:.2?}", "Time", elapsed);
    println!();
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailsite", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
