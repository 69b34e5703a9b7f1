mod client;
mod error;
mod images;
mod prompts;
mod router;
mod runner;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::client::ChatCompletionsClient;
use crate::error::PipelineError;
use crate::images::PageImage;
use crate::router::Router;
use crate::runner::Mode;
use crate::settings::{MatchMode, Settings};

#[derive(Parser)]
#[command(
    name = "vision_prechunk",
    about = "Classify scanned legal pages with a vision model and extract cover-page metadata and TOC structure"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every page and write caption / TOC extractions
    Run {
        /// Max images to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[command(flatten)]
        opts: Overrides,
    },
    /// Classify pages and print their labels; nothing is written
    Classify {
        /// Max images to classify (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[command(flatten)]
        opts: Overrides,
    },
    /// List the images that would be processed
    List {
        #[command(flatten)]
        opts: Overrides,
    },
}

/// Command-line overrides, applied on top of the settings file and `VPC_*` env vars.
#[derive(Args)]
struct Overrides {
    /// Settings file (default: ./vision_prechunk.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding the page images
    #[arg(long)]
    input: Option<PathBuf>,
    /// Output directory for cover-page metadata
    #[arg(long)]
    caption_dir: Option<PathBuf>,
    /// Output directory for table-of-contents structure
    #[arg(long)]
    toc_dir: Option<PathBuf>,
    #[arg(long)]
    model: Option<String>,
    /// Chat completions endpoint
    #[arg(long)]
    api_url: Option<String>,
    /// Response length cap sent with every request
    #[arg(long)]
    max_tokens: Option<u32>,
    /// Image file extension to pick up (e.g. jpg)
    #[arg(long)]
    extension: Option<String>,
    /// Pages processed concurrently
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,
    /// Abort the whole run on the first failed page
    #[arg(long, overrides_with = "no_strict")]
    strict: bool,
    /// Keep going past failed pages even if the settings say strict
    #[arg(long, overrides_with = "strict")]
    no_strict: bool,
    #[arg(long, value_enum)]
    match_mode: Option<MatchMode>,
    /// Per-request timeout in seconds (default: none)
    #[arg(long)]
    timeout: Option<u64>,
}

impl Overrides {
    fn into_settings(self) -> Result<Settings, PipelineError> {
        let mut s = Settings::load(self.config.as_deref())?;
        if let Some(v) = self.input {
            s.input_dir = v;
        }
        if let Some(v) = self.caption_dir {
            s.caption_dir = v;
        }
        if let Some(v) = self.toc_dir {
            s.toc_dir = v;
        }
        if let Some(v) = self.model {
            s.model = v;
        }
        if let Some(v) = self.api_url {
            s.api_url = v;
        }
        if let Some(v) = self.max_tokens {
            s.max_tokens = v;
        }
        if let Some(v) = self.extension {
            s.image_extension = v;
        }
        if let Some(v) = self.concurrency {
            s.concurrency = v;
        }
        if self.strict {
            s.strict = true;
        }
        if self.no_strict {
            s.strict = false;
        }
        if let Some(v) = self.match_mode {
            s.match_mode = v;
        }
        if let Some(v) = self.timeout {
            s.request_timeout_secs = Some(v);
        }
        s.validate()?;
        Ok(s)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List { opts } => {
            let settings = opts.into_settings()?;
            let images = load_images(&settings, None)?;
            for image in &images {
                println!("{}", image.path.display());
            }
            println!(
                "{} *{} images in {}",
                images.len(),
                settings.extension_suffix(),
                settings.input_dir.display()
            );
            Ok(())
        }
        Commands::Run { limit, opts } => {
            let settings = opts.into_settings()?;
            let images = load_images(&settings, limit)?;
            runner::prepare_output_dirs(&settings).await?;
            if images.is_empty() {
                println!("No images found in {}.", settings.input_dir.display());
                return Ok(());
            }
            info!(?settings, "Starting run");
            println!(
                "Processing {} images ({} at a time)...",
                images.len(),
                settings.concurrency
            );

            let router = Arc::new(Router::new(ChatCompletionsClient::new(&settings)?, &settings));
            let report = runner::run(router, images, &settings, Mode::Extract).await?;
            report.print();

            if report.failures.is_empty() {
                Ok(())
            } else {
                Err(anyhow::anyhow!(
                    "{} of {} images failed",
                    report.failures.len(),
                    report.images
                ))
            }
        }
        Commands::Classify { limit, opts } => {
            let settings = opts.into_settings()?;
            let images = load_images(&settings, limit)?;
            if images.is_empty() {
                println!("No images found in {}.", settings.input_dir.display());
                return Ok(());
            }

            let router = Arc::new(Router::new(ChatCompletionsClient::new(&settings)?, &settings));
            let mut report = runner::run(router, images, &settings, Mode::ClassifyOnly).await?;
            report.outcomes.sort_by(|a, b| a.file_name.cmp(&b.file_name));

            println!("{:<32} | {:<28} | {}", "Image", "Routed as", "Label");
            println!("{}", "-".repeat(100));
            for o in &report.outcomes {
                let routed = o
                    .categories
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(" + ");
                let label = o.label.split_whitespace().collect::<Vec<_>>().join(" ");
                println!(
                    "{:<32} | {:<28} | {}",
                    truncate(&o.file_name, 32),
                    routed,
                    truncate(&label, 60)
                );
            }
            println!();
            report.print();
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_images(settings: &Settings, limit: Option<usize>) -> Result<Vec<PageImage>, PipelineError> {
    let mut images = images::list_images(&settings.input_dir, &settings.extension_suffix())?;
    if let Some(n) = limit {
        images.truncate(n);
    }
    Ok(images)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
