use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use papersum_core::config_file::{self, ConfigFile, WORKSPACE_CONFIG_NAME};
use papersum_core::credentials::API_KEY_ENV;
use papersum_core::provider::GeminiClient;
use papersum_core::{
    ApiKey, BatchRunner, ProgressEvent, RunContext, discover_sources, generate_id, load_api_key,
    load_prompt,
};

mod output;

use output::ColorMode;

/// PaperSum - Summarize research paper PDFs with a generative model
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize every PDF in the papers directory
    Run(RunArgs),

    /// Print the artifact id derived from each filename
    Id {
        /// Filenames (base names, e.g. paper.pdf)
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Write a starter settings file into the workspace
    Init {
        /// Workspace root
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Workspace root; relative paths in settings resolve against it
    #[arg(long, default_value = ".")]
    workspace: PathBuf,

    /// Directory containing the PDFs to summarize
    #[arg(long)]
    papers: Option<PathBuf>,

    /// Root directory for timestamped run output
    #[arg(long)]
    output: Option<PathBuf>,

    /// Settings file (TOML, or JSON with a .json extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file holding the provider API key
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Prompt file sent with every paper
    #[arg(long)]
    prompt: Option<PathBuf>,

    /// Model name or alias (overrides settings)
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature (overrides settings)
    #[arg(long)]
    temperature: Option<f64>,

    /// Print each summary to the console as it completes
    #[arg(long)]
    print_summaries: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Dry run: list discovered papers and their ids without summarizing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let _guard = init_tracing(args.log_file.as_deref())?;
            run(args).await
        }
        Command::Id { names } => {
            let mut stdout = std::io::stdout();
            for name in names {
                writeln!(stdout, "{}  {}", generate_id(&name), name)?;
            }
            Ok(())
        }
        Command::Init { workspace } => init(&workspace),
    }
}

/// Console logging goes to stderr at `error` unless `RUST_LOG` says
/// otherwise; per-item failures are already shown in the report. With
/// `--log-file`, logs go to that file at `info` instead.
fn init_tracing(
    log_file: Option<&Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = |default: &str| {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter("info"))
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter("error"))
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn init(workspace: &Path) -> anyhow::Result<()> {
    let path = workspace.join(WORKSPACE_CONFIG_NAME);
    config_file::save_config(&path, &ConfigFile::starter())
        .map_err(|e| anyhow::anyhow!("Cannot write {}: {}", path.display(), e))?;
    println!("Settings written to {}", path.display());
    Ok(())
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    // Resolve configuration: CLI flags > workspace settings > platform settings
    let mut settings = config_file::load_config(args.config.as_deref(), &args.workspace)?;
    settings.apply_overrides(args.model.clone(), args.temperature);
    let model = settings.model_config()?;

    let mut paths = settings.resolve_paths(&args.workspace);
    if let Some(p) = args.papers {
        paths.papers = p;
    }
    if let Some(p) = args.output {
        paths.output = p;
    }
    if let Some(p) = args.prompt {
        paths.prompt = p;
    }
    if let Some(p) = args.key_file {
        paths.api_key = p;
    }

    let color = ColorMode(!args.no_color);
    let mut stdout = std::io::stdout();

    let prompt = load_prompt(&paths.prompt)?;

    if args.dry_run {
        let sources = discover_sources(&paths.papers)?;
        output::print_dry_run(&mut stdout, &paths.papers, &sources, &model, color)?;
        return Ok(());
    }

    let api_key = match std::env::var(API_KEY_ENV).ok().and_then(ApiKey::new) {
        Some(key) => key,
        None => load_api_key(&paths.api_key)?,
    };

    let provider = settings.provider.clone().unwrap_or_default();
    let client = GeminiClient::with_options(
        api_key,
        provider.base_url,
        provider.timeout_secs.map(Duration::from_secs),
    )?;

    let mut runner = BatchRunner::new(
        Arc::new(client),
        model,
        prompt,
        RunContext::now(&paths.output),
    );
    output::print_run_header(
        &mut stdout,
        &paths.papers,
        runner.provider_name(),
        runner.run_context(),
        runner.config(),
        color,
    )?;
    tracing::info!(
        provider = runner.provider_name(),
        model = runner.config().model_name(),
        temperature = runner.config().temperature(),
        output = %runner.run_context().output_dir().display(),
        "starting run"
    );

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:40.cyan/dim}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let print_summaries = args.print_summaries;
    let progress_cb = |event: ProgressEvent| {
        match &event {
            ProgressEvent::Discovered { total } => {
                bar.set_length(*total as u64);
                if *total > 0 {
                    bar.enable_steady_tick(Duration::from_millis(120));
                }
            }
            ProgressEvent::Started { file, .. } => bar.set_message(file.clone()),
            ProgressEvent::Succeeded { .. } | ProgressEvent::Failed { .. } => bar.inc(1),
        }
        bar.suspend(|| {
            let mut out = std::io::stdout();
            let _ = output::print_progress(&mut out, &event, print_summaries, color);
            let _ = out.flush();
        });
    };

    let report = runner.run_all(&paths.papers, progress_cb).await;
    bar.finish_and_clear();
    let report = report?;

    output::print_report(&mut stdout, &report, color)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "papersum",
            "run",
            "--workspace",
            "ws",
            "--model",
            "test",
            "--temperature",
            "0",
            "--dry-run",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.workspace, PathBuf::from("ws"));
        assert_eq!(args.model.as_deref(), Some("test"));
        assert_eq!(args.temperature, Some(0.0));
        assert!(args.dry_run);
        assert!(!args.print_summaries);
    }

    #[test]
    fn id_requires_a_name() {
        assert!(Cli::try_parse_from(["papersum", "id"]).is_err());
    }

    #[test]
    fn init_writes_loadable_settings_once() {
        let dir = TempDir::new().unwrap();
        init(dir.path()).unwrap();

        let settings =
            config_file::load_from_path(&dir.path().join(WORKSPACE_CONFIG_NAME)).unwrap();
        let model = settings.model_config().unwrap();
        assert_eq!(model.model_name(), "gemini-2.0-flash-lite");

        assert!(init(dir.path()).is_err());
    }
}
