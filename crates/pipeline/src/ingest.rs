//! Ingestion: annotate every image in a directory through the oracle.
//!
//! Files are processed one at a time, in name order. Each image is
//! normalized into the byte budget, base64-encoded, sent to the oracle with
//! the fixed instruction, and the JSON object in the reply is written to
//! `<output_dir>/<stem>.json`. A failure on one file is logged and recorded
//! in the [`IngestReport`]; it never stops the batch. Only setup problems
//! (missing input directory, output directory not creatable) are fatal.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tagtally_core::annotation::{annotation_file_name, to_pretty_json, AnnotationRecord};
use tagtally_core::assets::{scan_images, ImageAsset};
use tagtally_core::error::CoreError;
use tagtally_core::extract::{extract_json_object, ExtractError};
use tagtally_core::normalize::{encode_base64, normalize_file, NormalizeError};
use tagtally_core::prompt::ANNOTATION_INSTRUCTION;
use tagtally_oracle::{AnnotationOracle, OracleError};

use crate::config::IngestConfig;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal setup errors that end an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Input directory {} does not exist or is not a directory", .0.display())]
    MissingInputDir(PathBuf),

    #[error("Cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot list input directory: {0}")]
    Scan(#[from] CoreError),

    #[error("Input scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Why a single image could not be annotated. Recovered by the batch loop.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Oracle reply is not a usable annotation: {0}")]
    Annotation(#[source] CoreError),

    #[error("Failed to serialize annotation: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image normalization task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Outcome of an ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Annotation files written, in processing order.
    pub written: Vec<PathBuf>,
    /// Image file names skipped because their annotation already existed.
    pub skipped: Vec<String>,
    /// Image file names that failed.
    pub failed: Vec<String>,
    /// Image file names whose annotation replaced one written earlier in
    /// the same run because the two images share a stem.
    pub overwritten: Vec<String>,
}

impl IngestReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of images visited.
    pub fn total(&self) -> usize {
        self.written.len() + self.skipped.len() + self.failed.len() + self.overwritten.len()
    }
}

// ---------------------------------------------------------------------------
// Batch loop
// ---------------------------------------------------------------------------

/// Annotate every image in `config.input_dir`.
pub async fn run_ingestion<O: AnnotationOracle>(
    config: &IngestConfig,
    oracle: &O,
) -> Result<IngestReport, IngestError> {
    let input_is_dir = tokio::fs::metadata(&config.input_dir)
        .await
        .is_ok_and(|m| m.is_dir());
    if !input_is_dir {
        return Err(IngestError::MissingInputDir(config.input_dir.clone()));
    }
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|source| IngestError::OutputDir {
            path: config.output_dir.clone(),
            source,
        })?;

    let input_dir = config.input_dir.clone();
    let assets = tokio::task::spawn_blocking(move || scan_images(&input_dir)).await??;
    tracing::info!(
        images = assets.len(),
        input_dir = %config.input_dir.display(),
        output_dir = %config.output_dir.display(),
        target_bytes = config.target_bytes,
        "Starting ingestion",
    );

    let mut report = IngestReport::default();
    let mut stems = HashSet::new();

    for asset in &assets {
        if !stems.insert(asset.stem.as_str()) {
            tracing::warn!(
                file = %asset.file_name,
                "Another image shares this file stem; its annotation will be overwritten",
            );
        }

        let output_path = config.output_dir.join(annotation_file_name(&asset.stem));

        if config.skip_existing
            && tokio::fs::try_exists(&output_path).await.unwrap_or(false)
        {
            tracing::info!(file = %asset.file_name, "Annotation exists, skipping");
            report.skipped.push(asset.file_name.clone());
            continue;
        }

        match annotate_image(config, oracle, asset, &output_path).await {
            Ok(()) if report.written.contains(&output_path) => {
                tracing::warn!(
                    file = %asset.file_name,
                    output = %output_path.display(),
                    "Annotation overwritten by an image with the same stem",
                );
                report.overwritten.push(asset.file_name.clone());
            }
            Ok(()) => {
                tracing::info!(
                    file = %asset.file_name,
                    output = %output_path.display(),
                    "Annotation written",
                );
                report.written.push(output_path);
            }
            Err(e) => {
                tracing::error!(file = %asset.file_name, error = %e, "Failed to annotate image");
                report.failed.push(asset.file_name.clone());
            }
        }
    }

    tracing::info!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        overwritten = report.overwritten.len(),
        failed = report.failed.len(),
        "Ingestion finished",
    );
    Ok(report)
}

/// Run the full per-image chain and persist the annotation.
///
/// Nothing is written at `output_path` unless every step succeeds.
pub async fn annotate_image<O: AnnotationOracle>(
    config: &IngestConfig,
    oracle: &O,
    asset: &ImageAsset,
    output_path: &Path,
) -> Result<(), FileError> {
    let source = asset.clone();
    let target = config.target_bytes;
    let normalize = config.normalize.clone();
    let (info, normalized) = tokio::task::spawn_blocking(move || {
        let info = source.probe().ok();
        normalize_file(&source.path, target, &normalize).map(|n| (info, n))
    })
    .await??;

    tracing::debug!(
        file = %asset.file_name,
        original_bytes = asset.byte_size,
        original_width = info.map(|i| i.width),
        original_height = info.map(|i| i.height),
        format = ?info.and_then(|i| i.format),
        bytes = normalized.bytes.len(),
        width = normalized.width,
        height = normalized.height,
        quality = normalized.quality,
        "Image normalized",
    );

    let image_b64 = encode_base64(&normalized.bytes);
    drop(normalized);

    let reply = oracle.annotate(&image_b64, ANNOTATION_INSTRUCTION).await?;
    let value = extract_json_object(&reply)?;
    AnnotationRecord::from_value_strict(&value).map_err(FileError::Annotation)?;

    let bytes = to_pretty_json(&value).map_err(FileError::Serialize)?;
    write_atomically(output_path, &bytes).await
}

/// Write to a temporary sibling, then rename into place.
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), FileError> {
    let tmp = path.with_extension("json.tmp");
    let result = async {
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(source) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(FileError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use base64::Engine as _;
    use image::{Rgb, RgbImage};

    use super::*;

    const REPLY: &str = "```json\n{\"keywords\": [\"sky\", \"tree\"], \"context\": {\"time\": \"evening\"}}\n```";

    /// Replies with `REPLY`, except for the calls listed in `fail_calls`
    /// (0-based), which fail with a permanent API error.
    struct FakeOracle {
        calls: AtomicUsize,
        fail_calls: Vec<usize>,
        reply: String,
        payloads: Mutex<Vec<String>>,
    }

    impl FakeOracle {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_calls: Vec::new(),
                reply: REPLY.to_string(),
                payloads: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(fail_calls: Vec<usize>) -> Self {
            Self {
                fail_calls,
                ..Self::new()
            }
        }

        fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                ..Self::new()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AnnotationOracle for FakeOracle {
        async fn annotate(
            &self,
            image_b64: &str,
            _instruction: &str,
        ) -> Result<String, OracleError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.payloads
                .lock()
                .expect("payload lock")
                .push(image_b64.to_string());
            if self.fail_calls.contains(&call) {
                return Err(OracleError::ApiError {
                    status: 400,
                    body: "rejected".into(),
                });
            }
            Ok(self.reply.clone())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        config: IngestConfig,
    }

    fn fixture(images: &[&str]) -> Fixture {
        let dir = tempfile::tempdir().expect("create temp dir");
        let input = dir.path().join("dist");
        std::fs::create_dir(&input).expect("mkdir input");
        for (i, name) in images.iter().enumerate() {
            let shade = (i * 40) as u8;
            RgbImage::from_pixel(24, 16, Rgb([shade, 100, 200]))
                .save(input.join(name))
                .expect("save image");
        }
        let config = IngestConfig::new(input, dir.path().join("json_outputs"));
        Fixture { _dir: dir, config }
    }

    fn output_names(config: &IngestConfig) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&config.output_dir)
            .expect("read output dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn writes_one_annotation_per_image() {
        let fx = fixture(&["a.png", "b.jpg", "c.bmp"]);
        let oracle = FakeOracle::new();

        let report = run_ingestion(&fx.config, &oracle).await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.written.len(), 3);
        assert_eq!(output_names(&fx.config), vec!["a.json", "b.json", "c.json"]);
        assert_eq!(oracle.call_count(), 3);
    }

    #[tokio::test]
    async fn one_failure_is_isolated() {
        let fx = fixture(&["a.png", "b.png", "c.png", "d.png"]);
        let oracle = FakeOracle::failing_on(vec![1]);

        let report = run_ingestion(&fx.config, &oracle).await.unwrap();

        assert_eq!(report.failed, vec!["b.png"]);
        assert_eq!(report.written.len(), 3);
        assert_eq!(report.total(), 4);
        assert_eq!(output_names(&fx.config), vec!["a.json", "c.json", "d.json"]);
    }

    #[tokio::test]
    async fn written_file_is_pretty_json_without_fences() {
        let fx = fixture(&["photo.jpeg"]);
        run_ingestion(&fx.config, &FakeOracle::new()).await.unwrap();

        let text = std::fs::read_to_string(fx.config.output_dir.join("photo.json")).unwrap();
        assert!(!text.contains("```"));
        assert!(text.contains("\n    \"keywords\": ["));
        let record = AnnotationRecord::from_json_str(&text).unwrap();
        assert_eq!(record.keywords, vec!["sky", "tree"]);
        assert_eq!(record.context.time, "evening");
    }

    #[tokio::test]
    async fn oracle_receives_jpeg_within_budget() {
        let fx = fixture(&["a.png"]);
        let oracle = FakeOracle::new();
        run_ingestion(&fx.config, &oracle).await.unwrap();

        let payloads = oracle.payloads.lock().unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&payloads[0])
            .unwrap();
        assert!(bytes.len() as f64 <= fx.config.target_bytes as f64 * 1.1);
        let format = image::guess_format(&bytes).unwrap();
        assert_eq!(format, image::ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn non_json_reply_fails_without_output() {
        let fx = fixture(&["a.png"]);
        let oracle = FakeOracle::replying("Sorry, I can't help with that.");

        let report = run_ingestion(&fx.config, &oracle).await.unwrap();

        assert_eq!(report.failed, vec!["a.png"]);
        assert!(output_names(&fx.config).is_empty());
    }

    #[tokio::test]
    async fn wrongly_shaped_reply_fails() {
        let fx = fixture(&["a.png"]);
        let oracle = FakeOracle::replying(r#"{"keywords": "sky, tree"}"#);

        let report = run_ingestion(&fx.config, &oracle).await.unwrap();

        assert_eq!(report.failed, vec!["a.png"]);
        assert!(output_names(&fx.config).is_empty());
    }

    #[tokio::test]
    async fn undecodable_image_fails_before_oracle_call() {
        let fx = fixture(&["good.png"]);
        std::fs::write(fx.config.input_dir.join("broken.png"), b"not an image").unwrap();
        let oracle = FakeOracle::new();

        let report = run_ingestion(&fx.config, &oracle).await.unwrap();

        assert_eq!(report.failed, vec!["broken.png"]);
        assert_eq!(report.written.len(), 1);
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn shared_stem_is_reported_as_overwritten() {
        let fx = fixture(&["a.jpg", "a.png", "b.png"]);
        let oracle = FakeOracle::new();

        let report = run_ingestion(&fx.config, &oracle).await.unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.overwritten, vec!["a.png"]);
        assert_eq!(report.total(), 3);
        assert_eq!(oracle.call_count(), 3);
        assert_eq!(output_names(&fx.config), vec!["a.json", "b.json"]);
    }

    #[tokio::test]
    async fn reply_with_mistyped_context_fails_ingestion() {
        let fx = fixture(&["a.png"]);
        let oracle = FakeOracle::replying(r#"{"keywords": ["sky"], "context": {"time": 7}}"#);

        let report = run_ingestion(&fx.config, &oracle).await.unwrap();

        assert_eq!(report.failed, vec!["a.png"]);
        assert!(output_names(&fx.config).is_empty());
    }

    #[tokio::test]
    async fn non_image_files_are_ignored() {
        let fx = fixture(&["a.png"]);
        std::fs::write(fx.config.input_dir.join("notes.txt"), b"hello").unwrap();

        let report = run_ingestion(&fx.config, &FakeOracle::new()).await.unwrap();

        assert_eq!(report.total(), 1);
    }

    #[tokio::test]
    async fn skip_existing_leaves_previous_output() {
        let mut fx = fixture(&["a.png", "b.png"]);
        fx.config.skip_existing = true;
        std::fs::create_dir_all(&fx.config.output_dir).unwrap();
        std::fs::write(fx.config.output_dir.join("a.json"), b"{\"keywords\": []}").unwrap();
        let oracle = FakeOracle::new();

        let report = run_ingestion(&fx.config, &oracle).await.unwrap();

        assert_eq!(report.skipped, vec!["a.png"]);
        assert_eq!(report.written.len(), 1);
        assert_eq!(oracle.call_count(), 1);
        let kept = std::fs::read_to_string(fx.config.output_dir.join("a.json")).unwrap();
        assert_eq!(kept, "{\"keywords\": []}");
    }

    #[tokio::test]
    async fn output_dir_creation_is_idempotent() {
        let fx = fixture(&["a.png"]);
        run_ingestion(&fx.config, &FakeOracle::new()).await.unwrap();
        let report = run_ingestion(&fx.config, &FakeOracle::new()).await.unwrap();
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn missing_input_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = IngestConfig::new(dir.path().join("nope"), dir.path().join("out"));

        let result = run_ingestion(&config, &FakeOracle::new()).await;

        assert_matches!(result, Err(IngestError::MissingInputDir(_)));
    }

    #[tokio::test]
    async fn output_dir_blocked_by_file_is_fatal() {
        let fx = fixture(&["a.png"]);
        std::fs::write(&fx.config.output_dir, b"i am a file").unwrap();

        let result = run_ingestion(&fx.config, &FakeOracle::new()).await;

        assert_matches!(result, Err(IngestError::OutputDir { .. }));
    }
}
