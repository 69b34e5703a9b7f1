use std::sync::Arc;

use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::client::VisionClient;
use crate::error::PipelineError;
use crate::images::PageImage;
use crate::router::{Category, PageOutcome, Router};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Classify, then run the matching extraction and write its file.
    Extract,
    /// Classify only; nothing is written.
    ClassifyOnly,
}

/// Totals for one pass over the input directory.
#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub images: usize,
    pub cover_pages: usize,
    pub tables_of_contents: usize,
    pub unrecognized: usize,
    pub files_written: usize,
    pub outcomes: Vec<PageOutcome>,
    /// (image file name, error message)
    pub failures: Vec<(String, String)>,
}

impl RunReport {
    fn new(images: usize) -> Self {
        RunReport {
            started_at: Local::now(),
            images,
            cover_pages: 0,
            tables_of_contents: 0,
            unrecognized: 0,
            files_written: 0,
            outcomes: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn record(&mut self, outcome: PageOutcome) {
        for category in &outcome.categories {
            match category {
                Category::CoverPage => self.cover_pages += 1,
                Category::TableOfContents => self.tables_of_contents += 1,
                Category::Unrecognized => self.unrecognized += 1,
            }
        }
        self.files_written += outcome.written.len();
        self.outcomes.push(outcome);
    }

    pub fn print(&self) {
        println!(
            "Run started {}: {} images, {} cover pages, {} tables of contents, {} other, {} files written.",
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.images,
            self.cover_pages,
            self.tables_of_contents,
            self.unrecognized,
            self.files_written,
        );
        if !self.failures.is_empty() {
            println!("\n--- Failures ({}) ---", self.failures.len());
            for (image, error) in &self.failures {
                println!("  {}: {}", image, error);
            }
        }
    }
}

pub async fn prepare_output_dirs(settings: &Settings) -> Result<(), PipelineError> {
    for dir in [&settings.caption_dir, &settings.toc_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| PipelineError::OutputDirectory {
                path: dir.clone(),
                source,
            })?;
    }
    Ok(())
}

/// Run every image through the router with at most `settings.concurrency` pages in
/// flight. In strict mode the first failure cancels the rest and is returned;
/// otherwise failures are collected in the report.
pub async fn run<C: VisionClient + 'static>(
    router: Arc<Router<C>>,
    images: Vec<PageImage>,
    settings: &Settings,
    mode: Mode,
) -> Result<RunReport, PipelineError> {
    if mode == Mode::Extract {
        prepare_output_dirs(settings).await?;
    }

    let total = images.len();
    let mut report = RunReport::new(total);
    let semaphore = Arc::new(Semaphore::new(settings.concurrency));

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel::<(String, Result<PageOutcome, PipelineError>)>(
        settings.concurrency * 2,
    );

    let mut handles: Vec<(String, JoinHandle<()>)> = Vec::with_capacity(total);
    for image in images {
        let router = Arc::clone(&router);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();
        let name = image.file_name.clone();

        let handle = tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let result = match mode {
                Mode::Extract => router.process(&image).await,
                Mode::ClassifyOnly => router.classify(&image).await.map(|(label, categories)| {
                    PageOutcome {
                        file_name: image.file_name.clone(),
                        label,
                        categories,
                        written: Vec::new(),
                    }
                }),
            };
            let _ = tx.send((image.file_name, result)).await;
        });
        handles.push((name, handle));
    }

    // rx closes once every task has dropped its sender
    drop(tx);

    while let Some((image, result)) = rx.recv().await {
        pb.inc(1);
        match result {
            Ok(outcome) => report.record(outcome),
            Err(e) if settings.strict => {
                for (_, handle) in &handles {
                    handle.abort();
                }
                pb.finish_and_clear();
                return Err(e);
            }
            Err(e) => {
                warn!("Failed on {}: {}", image, e);
                report.failures.push((image, e.to_string()));
            }
        }
    }
    pb.finish_and_clear();

    for (image, handle) in handles {
        if let Err(e) = handle.await {
            let err = PipelineError::Task(format!("{image}: {e}"));
            if settings.strict {
                return Err(err);
            }
            warn!("{}", err);
            report.failures.push((image, err.to_string()));
        }
    }

    info!(
        "Processed {} images ({} failed)",
        report.images,
        report.failures.len()
    );
    Ok(report)
}
