//! Folder processing: automatic analysis of every image in a directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisResult, Analyzer};
use crate::error::EdgeError;
use crate::grid::Roi;
use crate::overlay::render_roi_only;

/// Which files to pick up and where overlays go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Accepted file extensions, compared case-insensitively.
    pub extensions: Vec<String>,
    /// Appended to the folder name and to each output file stem.
    pub output_suffix: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["jpg".to_string(), "jpeg".to_string()],
            output_suffix: "_processed".to_string(),
        }
    }
}

/// Outcome of one folder run.
#[derive(Debug)]
pub struct BatchReport {
    /// Measurements keyed by file name.
    pub results: BTreeMap<String, AnalysisResult>,
    /// Images that produced no measurement, with the reason.
    pub failures: Vec<(String, EdgeError)>,
    /// Directory the overlays were written to.
    pub output_folder: PathBuf,
    /// Cancellation was requested before every image was processed.
    pub cancelled: bool,
}

/// Matching regular files in `folder`, sorted by file name.
pub fn list_images(folder: &Path, config: &BatchConfig) -> Result<Vec<PathBuf>, EdgeError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| config.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// `<folder>/<folder name><suffix>`.
pub fn output_folder_for(folder: &Path, config: &BatchConfig) -> Result<PathBuf, EdgeError> {
    let folder = folder.canonicalize()?;
    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "images".to_string());
    Ok(folder.join(format!("{}{}", name, config.output_suffix)))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Analyze one file and write its overlay. Images without an edge still get
/// an overlay with the ROI circle only.
fn process_image(path: &Path, out_dir: &Path, analyzer: &Analyzer) -> Result<AnalysisResult, EdgeError> {
    let cfg = analyzer.config();
    let gray = image::open(path)?.to_luma8();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let out_path = out_dir.join(format!("{}{}.jpg", stem, cfg.batch.output_suffix));

    match analyzer.analyze_automatic(&gray) {
        Ok(auto) => {
            auto.analysis.overlay.save(&out_path)?;
            Ok(auto.analysis.result)
        }
        Err(e) if e.is_no_edge() => {
            let roi = Roi::for_grid(&gray, cfg.roi_diameter)?;
            render_roi_only(&gray, &roi, &cfg.overlay).save(&out_path)?;
            Err(e)
        }
        Err(e) => Err(e),
    }
}

/// Run automatic analysis on every matching image in `folder`.
///
/// Per-image failures are logged and collected, never fatal. `progress`
/// receives the completed percentage after each image, in increasing
/// order. Setting `cancel` stops picking up new images.
pub fn analyze_folder(
    folder: &Path,
    analyzer: &Analyzer,
    progress: Option<&(dyn Fn(f64) + Sync)>,
    cancel: Option<&AtomicBool>,
) -> Result<BatchReport, EdgeError> {
    let batch_cfg = &analyzer.config().batch;
    let files = list_images(folder, batch_cfg)?;
    let output_folder = output_folder_for(folder, batch_cfg)?;
    std::fs::create_dir_all(&output_folder)?;
    tracing::info!(
        "processing {} images from {} into {}",
        files.len(),
        folder.display(),
        output_folder.display()
    );

    let total = files.len();
    let done = Mutex::new(0usize);
    let is_cancelled = || cancel.map_or(false, |c| c.load(Ordering::Relaxed));

    let run_one = |path: &PathBuf| -> Option<(String, Result<AnalysisResult, EdgeError>)> {
        if is_cancelled() {
            return None;
        }
        let name = file_name_of(path);
        let outcome = process_image(path, &output_folder, analyzer);
        match &outcome {
            Ok(r) => tracing::info!(
                "{}: angle={:.3} contrast={:.3} blurriness={:.5}",
                name,
                r.angle_degrees,
                r.contrast,
                r.blurriness
            ),
            Err(e) => tracing::warn!("{}: {}", name, e),
        }
        report_progress(&done, total, progress);
        Some((name, outcome))
    };

    #[cfg(feature = "rayon")]
    let outcomes: Vec<_> = files.par_iter().filter_map(run_one).collect();

    #[cfg(not(feature = "rayon"))]
    let outcomes: Vec<_> = files.iter().filter_map(run_one).collect();

    let cancelled = outcomes.len() < total;
    let mut results = BTreeMap::new();
    let mut failures = Vec::new();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(r) => {
                results.insert(name, r);
            }
            Err(e) => failures.push((name, e)),
        }
    }
    if cancelled {
        tracing::info!("batch cancelled after {} of {} images", results.len() + failures.len(), total);
    }

    Ok(BatchReport {
        results,
        failures,
        output_folder,
        cancelled,
    })
}

/// Count one finished image and report the percentage.
///
/// Counter and callback share one lock so reports arrive in increasing
/// order. A poisoned lock (a panicking callback) is recovered.
fn report_progress(done: &Mutex<usize>, total: usize, progress: Option<&(dyn Fn(f64) + Sync)>) {
    let mut n = done.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("progress lock poisoned, recovering");
        poisoned.into_inner()
    });
    *n += 1;
    if let Some(cb) = progress {
        cb(*n as f64 / total as f64 * 100.0);
    }
}
