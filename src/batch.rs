use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::features::{FeatureExtractor, FeatureRow};

/// Shared stop flag. Cloning hands out another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Rectangular feature table; rows follow the input order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    /// `(rows, feature columns)`, the filename column not included.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }
}

#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: Error,
}

#[derive(Debug)]
pub struct BatchReport {
    pub matrix: FeatureMatrix,
    pub failures: Vec<Failure>,
}

/// Expands directories to their files whose extension is one of
/// `extensions` (case-insensitive), sorted by path. Plain files are kept as
/// given, in argument order.
pub fn discover_images(inputs: &[PathBuf], extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(input)? {
            let path = entry?.path();
            let matches = path
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy();
                    extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
                })
                .unwrap_or(false);
            if path.is_file() && matches {
                found.push(path);
            }
        }
        found.sort();
        debug!("{}: {} images", input.display(), found.len());
        paths.extend(found);
    }
    Ok(paths)
}

type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

/// Runs the feature pipeline over many files on a bounded worker pool.
pub struct BatchExtractor {
    extractor: FeatureExtractor,
    threads: Option<usize>,
    cancel: CancelToken,
    progress: Option<Box<ProgressFn>>,
}

impl BatchExtractor {
    pub fn new(extractor: FeatureExtractor) -> BatchExtractor {
        BatchExtractor {
            extractor,
            threads: None,
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    /// Worker count; rayon's default when unset.
    pub fn threads(mut self, threads: Option<usize>) -> BatchExtractor {
        self.threads = threads;
        self
    }

    pub fn cancel_token(mut self, cancel: CancelToken) -> BatchExtractor {
        self.cancel = cancel;
        self
    }

    /// Called with `(finished, total)` after every image, failed ones included.
    pub fn on_progress<F>(mut self, f: F) -> BatchExtractor
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    fn process(&self, path: &Path, finished: &AtomicUsize, total: usize) -> Result<FeatureRow> {
        debug!("extracting features from {}", path.display());
        let result = self.extractor.extract_file(path);
        let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(progress) = &self.progress {
            progress(done, total);
        }
        result
    }

    /// Extracts one row per readable image. Unreadable images are reported
    /// as failures and skipped. A cancelled batch returns `Error::Cancelled`
    /// and drops whatever was already computed.
    pub fn run(&self, paths: &[PathBuf]) -> Result<BatchReport> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| Error::InvalidParameter(format!("cannot start worker pool: {}", e)))?;

        info!(
            "collecting {} features from {} images",
            self.extractor.width(),
            paths.len()
        );

        /* one slot per input, written only by the task for that index */
        let mut slots: Vec<Option<Result<FeatureRow>>> = (0..paths.len()).map(|_| None).collect();
        let finished = AtomicUsize::new(0);
        pool.install(|| {
            slots
                .par_iter_mut()
                .zip(paths.par_iter())
                .for_each(|(slot, path)| {
                    if self.cancel.is_cancelled() {
                        return;
                    }
                    *slot = Some(self.process(path, &finished, paths.len()));
                })
        });

        if self.cancel.is_cancelled() {
            warn!(
                "batch stopped after {} of {} images",
                finished.load(Ordering::SeqCst),
                paths.len()
            );
            return Err(Error::Cancelled);
        }

        let mut rows = Vec::with_capacity(paths.len());
        let mut failures = Vec::new();
        for (path, slot) in paths.iter().zip(slots) {
            match slot {
                Some(Ok(row)) => rows.push(row),
                Some(Err(error)) => {
                    warn!("skipping {}: {}", path.display(), error);
                    failures.push(Failure {
                        path: path.clone(),
                        error,
                    });
                }
                None => {}
            }
        }

        info!(
            "collected features of shape ({}, {}), {} failed",
            rows.len(),
            self.extractor.width(),
            failures.len()
        );
        Ok(BatchReport {
            matrix: FeatureMatrix {
                columns: self.extractor.column_names(),
                rows,
            },
            failures,
        })
    }
}
