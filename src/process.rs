//! Pipeline entry points.
//!
//! [`Pipeline`] owns the configuration, the resolved overlay font and the
//! exporter. One call runs ingest → annotate → export synchronously; the
//! async wrappers move that work onto Tokio's blocking pool.

use crate::config::PipelineConfig;
use crate::error::{ErrorKind, StampError};
use crate::font::OverlayFont;
use crate::output::{PipelineOutput, PipelineStats, UploadedAsset};
use crate::pipeline::annotate::annotate_image;
use crate::pipeline::export::{DocumentExporter, PdfiumExporter};
use crate::pipeline::ingest::stage_upload;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Result of one file in a batch run.
#[derive(Debug)]
pub struct FileResult {
    /// Path the bytes were read from.
    pub source: PathBuf,
    pub result: Result<PipelineOutput, StampError>,
}

/// The annotate-and-export pipeline.
///
/// Cheap to share behind an [`Arc`]; every method takes `&self`.
pub struct Pipeline {
    config: PipelineConfig,
    font: OverlayFont,
    exporter: Arc<dyn DocumentExporter>,
}

impl Pipeline {
    /// Create the output directories, resolve the overlay font and bind
    /// PDFium.
    pub fn new(config: PipelineConfig) -> Result<Self, StampError> {
        let exporter = PdfiumExporter::new(config.pdfium_lib_path.as_deref())?;
        Self::with_exporter(config, Arc::new(exporter))
    }

    /// Like [`Pipeline::new`] but with a caller-supplied exporter.
    pub fn with_exporter(
        config: PipelineConfig,
        exporter: Arc<dyn DocumentExporter>,
    ) -> Result<Self, StampError> {
        config.ensure_dirs()?;
        let font = OverlayFont::resolve(&config);
        Ok(Self {
            config,
            font,
            exporter,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn font(&self) -> &OverlayFont {
        &self.font
    }

    /// Run one upload through all three stages.
    ///
    /// `None` models a request that carried no file: it fails with
    /// [`StampError::MissingFile`] before anything is written. A failing
    /// stage stops the chain; artifacts of earlier stages stay on disk.
    pub fn run(&self, upload: Option<&UploadedAsset>) -> Result<PipelineOutput, StampError> {
        let total_start = Instant::now();

        // ── Step 1: Ingest ───────────────────────────────────────────────
        let step = Instant::now();
        let staged = stage_upload(&self.config.upload_dir, upload).inspect_err(log_failure)?;
        let ingest_ms = step.elapsed().as_millis() as u64;

        // ── Step 2: Annotate ─────────────────────────────────────────────
        let step = Instant::now();
        let annotated =
            annotate_image(&staged.path, &self.config, &self.font).inspect_err(log_failure)?;
        let annotate_ms = step.elapsed().as_millis() as u64;

        // ── Step 3: Export ───────────────────────────────────────────────
        let step = Instant::now();
        let document = self
            .exporter
            .export(&annotated.path, &self.config.pdf_dir, &self.config.page_layout)
            .inspect_err(log_failure)?;
        let export_ms = step.elapsed().as_millis() as u64;

        let stats = PipelineStats {
            ingest_ms,
            annotate_ms,
            export_ms,
            total_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Processed '{}' → {} + {} in {}ms",
            staged.filename,
            annotated.path.display(),
            document.path.display(),
            stats.total_ms
        );

        Ok(PipelineOutput {
            staged,
            annotated,
            document,
            stats,
        })
    }

    /// Run a present upload through the pipeline.
    pub fn process(&self, upload: &UploadedAsset) -> Result<PipelineOutput, StampError> {
        self.run(Some(upload))
    }

    /// [`Pipeline::run`] on the blocking pool.
    pub async fn process_async(
        self: &Arc<Self>,
        upload: Option<UploadedAsset>,
    ) -> Result<PipelineOutput, StampError> {
        let pipeline = Arc::clone(self);
        tokio::task::spawn_blocking(move || pipeline.run(upload.as_ref()))
            .await
            .map_err(|e| StampError::Internal(format!("pipeline task failed: {e}")))?
    }

    /// Run local files through the pipeline, at most `concurrency` at a time.
    ///
    /// Each file's name becomes the upload name. Results come back in input
    /// order; one file failing does not stop the others.
    pub async fn process_files(
        self: &Arc<Self>,
        paths: &[PathBuf],
        concurrency: usize,
        progress: Option<ProgressCallback>,
    ) -> Vec<FileResult> {
        let progress = progress.unwrap_or_else(|| Arc::new(NoopProgressCallback) as ProgressCallback);
        let total = paths.len();
        progress.on_batch_start(total);

        let mut indexed: Vec<(usize, FileResult)> =
            stream::iter(paths.iter().cloned().enumerate().map(|(idx, source)| {
                let pipeline = Arc::clone(self);
                let progress = Arc::clone(&progress);
                async move {
                    let name = upload_name(&source);
                    progress.on_file_start(&name);
                    let result = match tokio::fs::read(&source).await {
                        Ok(bytes) => {
                            pipeline
                                .process_async(Some(UploadedAsset::new(name.clone(), bytes)))
                                .await
                        }
                        Err(e) => Err(StampError::SourceReadFailed {
                            path: source.clone(),
                            source: e,
                        }),
                    };
                    match &result {
                        Ok(output) => progress.on_file_complete(&name, output),
                        Err(e) => progress.on_file_error(&name, e),
                    }
                    (idx, FileResult { source, result })
                }
            }))
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        indexed.sort_by_key(|(idx, _)| *idx);
        let succeeded = indexed.iter().filter(|(_, r)| r.result.is_ok()).count();
        progress.on_batch_complete(total, succeeded);

        indexed.into_iter().map(|(_, r)| r).collect()
    }
}

fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn log_failure(e: &StampError) {
    match e.kind() {
        ErrorKind::InvalidInput => warn!("Rejected upload at {} stage: {}", e.stage(), e),
        ErrorKind::Processing => error!("{} stage failed: {}", e.stage(), e),
    }
}
