pub mod category;

use std::path::PathBuf;

use tracing::info;

use crate::client::VisionClient;
use crate::error::PipelineError;
use crate::images::PageImage;
use crate::prompts::{CLASSIFY_PROMPT, METADATA_PROMPT, TOC_PROMPT};
use crate::settings::{MatchMode, Settings};
pub use category::{parse_label, Category};

/// What happened to one page.
#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub file_name: String,
    pub label: String,
    pub categories: Vec<Category>,
    pub written: Vec<PathBuf>,
}

/// Classify-then-extract for a single page image.
pub struct Router<C> {
    client: C,
    caption_dir: PathBuf,
    toc_dir: PathBuf,
    match_mode: MatchMode,
}

impl<C: VisionClient> Router<C> {
    pub fn new(client: C, settings: &Settings) -> Self {
        Router {
            client,
            caption_dir: settings.caption_dir.clone(),
            toc_dir: settings.toc_dir.clone(),
            match_mode: settings.match_mode,
        }
    }

    /// Ask the model for the page's category. Returns the raw label and its parse.
    pub async fn classify(&self, image: &PageImage) -> Result<(String, Vec<Category>), PipelineError> {
        info!("Classifying {}...", image.file_name);
        let label = self.infer(image, CLASSIFY_PROMPT).await?;
        info!("  Category: {}", label);
        let categories = parse_label(&label, self.match_mode);
        Ok((label, categories))
    }

    pub async fn process(&self, image: &PageImage) -> Result<PageOutcome, PipelineError> {
        let (label, categories) = self.classify(image).await?;

        let mut written = Vec::new();
        for &category in &categories {
            let Some(path) = self.output_path(category, &image.stem) else {
                continue;
            };
            let prompt = match category {
                Category::TableOfContents => {
                    info!("  Extracting table of contents structure from {}...", image.file_name);
                    TOC_PROMPT
                }
                _ => {
                    info!("  Extracting metadata from {}...", image.file_name);
                    METADATA_PROMPT
                }
            };

            // Written verbatim; no trimming or validation of the model's answer.
            let text = self.infer(image, prompt).await?;
            tokio::fs::write(&path, text.as_bytes())
                .await
                .map_err(|source| PipelineError::WriteOutput {
                    path: path.clone(),
                    source,
                })?;
            info!("  {} written to {}", category, path.display());
            written.push(path);
        }

        Ok(PageOutcome {
            file_name: image.file_name.clone(),
            label,
            categories,
            written,
        })
    }

    /// `caption_<stem>.txt` or `toc_<stem>.txt` in the category's folder.
    pub fn output_path(&self, category: Category, stem: &str) -> Option<PathBuf> {
        match category {
            Category::CoverPage => Some(self.caption_dir.join(format!("caption_{stem}.txt"))),
            Category::TableOfContents => Some(self.toc_dir.join(format!("toc_{stem}.txt"))),
            Category::Unrecognized => None,
        }
    }

    async fn infer(&self, image: &PageImage, prompt: &str) -> Result<String, PipelineError> {
        self.client
            .infer(&image.path, prompt)
            .await
            .map_err(|source| PipelineError::Inference {
                image: image.file_name.clone(),
                source,
            })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::client::VisionClient;
    use crate::error::InferenceError;
    use crate::prompts::{CLASSIFY_PROMPT, METADATA_PROMPT, TOC_PROMPT};

    /// Answers from a table keyed by (file name, prompt kind) and records every call.
    #[derive(Default)]
    pub struct ScriptedClient {
        answers: HashMap<(String, &'static str), Result<String, String>>,
        calls: Mutex<Vec<(String, &'static str)>>,
    }

    pub fn prompt_kind(prompt: &str) -> &'static str {
        match prompt {
            p if p == CLASSIFY_PROMPT => "classify",
            p if p == METADATA_PROMPT => "metadata",
            p if p == TOC_PROMPT => "toc",
            _ => "unknown",
        }
    }

    impl ScriptedClient {
        pub fn answer(mut self, file: &str, kind: &'static str, text: &str) -> Self {
            self.answers.insert((file.to_string(), kind), Ok(text.to_string()));
            self
        }

        pub fn fail(mut self, file: &str, kind: &'static str, message: &str) -> Self {
            self.answers.insert((file.to_string(), kind), Err(message.to_string()));
            self
        }

        pub fn calls_for(&self, file: &str) -> Vec<&'static str> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(f, _)| f == file)
                .map(|(_, k)| *k)
                .collect()
        }
    }

    #[async_trait]
    impl VisionClient for ScriptedClient {
        async fn infer(&self, image: &Path, prompt: &str) -> Result<String, InferenceError> {
            let file = image.file_name().unwrap().to_string_lossy().into_owned();
            let kind = prompt_kind(prompt);
            self.calls.lock().unwrap().push((file.clone(), kind));
            match self.answers.get(&(file, kind)) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(msg)) => Err(InferenceError::MalformedResponse(msg.clone())),
                None => Ok("Other".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedClient;
    use super::*;
    use std::fs;

    const METADATA_BLOCK: &str = "Filing attorneys and full name of law firm: Jane Roe, Roe & Partners LLP\n\
Named plaintiffs: Acme Corp\n\
Named defendants: John Smith\n\
Court: Superior Court Of California, County Of Alameda\n\
Case number: RG21-123456\n\
Filing date: 2021-03-04\n\
Document title: COMPLAINT FOR DAMAGES";

    struct Fixture {
        _dir: tempfile::TempDir,
        settings: Settings,
    }

    fn fixture(pages: &[&str]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            input_dir: dir.path().join("images"),
            caption_dir: dir.path().join("captions"),
            toc_dir: dir.path().join("toc"),
            ..Settings::default()
        };
        fs::create_dir_all(&settings.input_dir).unwrap();
        fs::create_dir_all(&settings.caption_dir).unwrap();
        fs::create_dir_all(&settings.toc_dir).unwrap();
        for page in pages {
            fs::write(settings.input_dir.join(page), b"jpeg").unwrap();
        }
        Fixture {
            _dir: dir,
            settings,
        }
    }

    fn page(settings: &Settings, name: &str) -> PageImage {
        PageImage::new(settings.input_dir.join(name))
    }

    fn dir_entries(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn cover_page_writes_caption_only() {
        let fx = fixture(&["page1.jpg"]);
        let client = ScriptedClient::default()
            .answer("page1.jpg", "classify", "Pleading cover page")
            .answer("page1.jpg", "metadata", METADATA_BLOCK);
        let router = Router::new(client, &fx.settings);

        let outcome = router.process(&page(&fx.settings, "page1.jpg")).await.unwrap();

        assert_eq!(outcome.categories, vec![Category::CoverPage]);
        let caption = fx.settings.caption_dir.join("caption_page1.txt");
        assert_eq!(outcome.written, vec![caption.clone()]);
        assert_eq!(fs::read_to_string(caption).unwrap(), METADATA_BLOCK);
        assert!(dir_entries(&fx.settings.toc_dir).is_empty());
        assert_eq!(router.client.calls_for("page1.jpg"), vec!["classify", "metadata"]);
    }

    #[tokio::test]
    async fn toc_page_writes_toc_only() {
        let fx = fixture(&["page2.jpg"]);
        let client = ScriptedClient::default()
            .answer("page2.jpg", "classify", "Pleading table of contents")
            .answer("page2.jpg", "toc", "# INTRODUCTION\n## A. Background");
        let router = Router::new(client, &fx.settings);

        router.process(&page(&fx.settings, "page2.jpg")).await.unwrap();

        assert_eq!(
            fs::read_to_string(fx.settings.toc_dir.join("toc_page2.txt")).unwrap(),
            "# INTRODUCTION\n## A. Background"
        );
        assert!(dir_entries(&fx.settings.caption_dir).is_empty());
        assert_eq!(router.client.calls_for("page2.jpg"), vec!["classify", "toc"]);
    }

    #[tokio::test]
    async fn unrecognized_page_writes_nothing() {
        let fx = fixture(&["page3.jpg"]);
        let client = ScriptedClient::default().answer("page3.jpg", "classify", "Form");
        let router = Router::new(client, &fx.settings);

        let outcome = router.process(&page(&fx.settings, "page3.jpg")).await.unwrap();

        assert_eq!(outcome.categories, vec![Category::Unrecognized]);
        assert!(outcome.written.is_empty());
        assert!(dir_entries(&fx.settings.caption_dir).is_empty());
        assert!(dir_entries(&fx.settings.toc_dir).is_empty());
        assert_eq!(router.client.calls_for("page3.jpg"), vec!["classify"]);
    }

    #[tokio::test]
    async fn label_with_both_triggers_writes_both_files() {
        let fx = fixture(&["page4.jpg"]);
        let client = ScriptedClient::default()
            .answer(
                "page4.jpg",
                "classify",
                "Pleading cover page, or maybe Pleading table of contents",
            )
            .answer("page4.jpg", "metadata", "Court: N/A")
            .answer("page4.jpg", "toc", "# ARGUMENT");
        let router = Router::new(client, &fx.settings);

        let outcome = router.process(&page(&fx.settings, "page4.jpg")).await.unwrap();

        assert_eq!(outcome.written.len(), 2);
        assert_eq!(dir_entries(&fx.settings.caption_dir), vec!["caption_page4.txt"]);
        assert_eq!(dir_entries(&fx.settings.toc_dir), vec!["toc_page4.txt"]);
    }

    #[tokio::test]
    async fn first_match_mode_extracts_once() {
        let mut fx = fixture(&["page4.jpg"]);
        fx.settings.match_mode = MatchMode::FirstMatch;
        let client = ScriptedClient::default()
            .answer("page4.jpg", "classify", "Pleading cover page / table of contents")
            .answer("page4.jpg", "metadata", "Court: N/A");
        let router = Router::new(client, &fx.settings);

        router.process(&page(&fx.settings, "page4.jpg")).await.unwrap();

        assert_eq!(dir_entries(&fx.settings.caption_dir), vec!["caption_page4.txt"]);
        assert!(dir_entries(&fx.settings.toc_dir).is_empty());
    }

    #[tokio::test]
    async fn rerun_overwrites_instead_of_appending() {
        let fx = fixture(&["page1.jpg"]);
        let client = ScriptedClient::default()
            .answer("page1.jpg", "classify", "Pleading cover page")
            .answer("page1.jpg", "metadata", METADATA_BLOCK);
        let router = Router::new(client, &fx.settings);
        let image = page(&fx.settings, "page1.jpg");

        router.process(&image).await.unwrap();
        let first = fs::read_to_string(fx.settings.caption_dir.join("caption_page1.txt")).unwrap();
        router.process(&image).await.unwrap();
        let second = fs::read_to_string(fx.settings.caption_dir.join("caption_page1.txt")).unwrap();

        assert_eq!(first, second);
        assert_eq!(second, METADATA_BLOCK);
    }

    #[tokio::test]
    async fn extraction_failure_is_reported_with_image_name() {
        let fx = fixture(&["page1.jpg"]);
        let client = ScriptedClient::default()
            .answer("page1.jpg", "classify", "Pleading cover page")
            .fail("page1.jpg", "metadata", "truncated body");
        let router = Router::new(client, &fx.settings);

        let err = router.process(&page(&fx.settings, "page1.jpg")).await.unwrap_err();

        assert!(matches!(&err, PipelineError::Inference { image, .. } if image == "page1.jpg"));
        assert!(dir_entries(&fx.settings.caption_dir).is_empty());
    }

    #[tokio::test]
    async fn missing_output_dir_is_a_write_error() {
        let fx = fixture(&["page2.jpg"]);
        fs::remove_dir(&fx.settings.toc_dir).unwrap();
        let client = ScriptedClient::default()
            .answer("page2.jpg", "classify", "Pleading table of contents")
            .answer("page2.jpg", "toc", "# INTRODUCTION");
        let router = Router::new(client, &fx.settings);

        let err = router.process(&page(&fx.settings, "page2.jpg")).await.unwrap_err();
        assert!(matches!(err, PipelineError::WriteOutput { .. }));
    }

    #[test]
    fn output_names_follow_stem() {
        let fx = fixture(&[]);
        let router = Router::new(ScriptedClient::default(), &fx.settings);
        assert_eq!(
            router.output_path(Category::CoverPage, "scan.007"),
            Some(fx.settings.caption_dir.join("caption_scan.007.txt"))
        );
        assert_eq!(
            router.output_path(Category::TableOfContents, "page2"),
            Some(fx.settings.toc_dir.join("toc_page2.txt"))
        );
        assert_eq!(router.output_path(Category::Unrecognized, "page3"), None);
    }
}
