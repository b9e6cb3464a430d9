use crate::canvas::{pad_to_canvas, CanvasSize};
use crate::discovery::find_sources;
use crate::error::ExportError;
use crate::loader::{display_name, load_composited};
use image::ImageFormat;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Everything one export run needs, as entered in the window.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub input: String,
    pub output_dir: String,
    pub flatten: bool,
    pub same_canvas: bool,
    /// Mirror the input folder's subdirectories instead of writing every PNG side by side.
    pub keep_structure: bool,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            input: String::new(),
            output_dir: String::new(),
            flatten: false,
            same_canvas: true,
            keep_structure: false,
        }
    }
}

impl ExportRequest {
    /// Resolve the input and output paths, rejecting empty fields.
    pub fn validate(&self) -> Result<(PathBuf, PathBuf), ExportError> {
        let input = self.input.trim();
        if input.is_empty() {
            return Err(ExportError::MissingInput(
                "an input PSD file or a folder containing PSDs",
            ));
        }
        let output_dir = self.output_dir.trim();
        if output_dir.is_empty() {
            return Err(ExportError::MissingInput("an output folder"));
        }
        Ok((PathBuf::from(input), PathBuf::from(output_dir)))
    }
}

/// Receives the user-facing progress lines of a run.
pub trait ExportLogger {
    fn line(&mut self, message: String);
}

impl ExportLogger for Vec<String> {
    fn line(&mut self, message: String) {
        self.push(message);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Exported { output: PathBuf },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportResult {
    pub source: PathBuf,
    pub outcome: ExportOutcome,
}

impl ExportResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ExportOutcome::Exported { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported: usize,
    pub failed: usize,
}

impl ExportSummary {
    pub fn from_results(results: &[ExportResult]) -> Self {
        let exported = results.iter().filter(|r| r.is_success()).count();
        Self {
            exported,
            failed: results.len() - exported,
        }
    }
}

/// Forwards lines to the run's logger and mirrors them to the `log` facade.
struct RunLog<'a> {
    sink: &'a mut dyn ExportLogger,
}

impl RunLog<'_> {
    fn info(&mut self, message: String) {
        log::info!("{}", message);
        self.sink.line(message);
    }

    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.sink.line(message);
    }

    fn error(&mut self, message: String) {
        log::error!("{}", message);
        self.sink.line(message);
    }
}

/// Run a complete export synchronously.
pub fn run_export(request: &ExportRequest, logger: &mut dyn ExportLogger) -> Vec<ExportResult> {
    run_export_cancellable(request, logger, &AtomicBool::new(false))
}

/// Run an export, checking `cancel` before each file is touched.
///
/// Per-file failures are recorded and never stop the run. Results come back in
/// discovery order, one per file processed.
pub fn run_export_cancellable(
    request: &ExportRequest,
    logger: &mut dyn ExportLogger,
    cancel: &AtomicBool,
) -> Vec<ExportResult> {
    let mut log = RunLog { sink: logger };

    let (input, output_dir) = match request.validate() {
        Ok(paths) => paths,
        Err(e) => {
            log.error(format!("❗ {}", e));
            return Vec::new();
        }
    };

    let sources = find_sources(&input);
    if sources.is_empty() {
        log.error(format!("❗ {}", ExportError::NoFilesFound(input)));
        return Vec::new();
    }
    log.info(format!("Found {} PSD file(s).", sources.len()));

    let canvas = if request.same_canvas {
        let canvas = measure_canvas(&sources, request.flatten, &mut log, cancel);
        if cancel.load(Ordering::Relaxed) {
            log.warn("Export cancelled.".to_string());
            return Vec::new();
        }
        canvas
    } else {
        None
    };

    if let Err(e) = fs::create_dir_all(&output_dir) {
        let message = format!("Cannot create output folder {}: {}", output_dir.display(), e);
        log.error(format!("[ERROR] {}", message));
        return sources
            .into_iter()
            .map(|source| ExportResult {
                source,
                outcome: ExportOutcome::Failed {
                    message: message.clone(),
                },
            })
            .collect();
    }

    let input_root = if input.is_dir() { Some(input.as_path()) } else { None };
    let mut written: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut results = Vec::with_capacity(sources.len());

    for source in sources {
        if cancel.load(Ordering::Relaxed) {
            log.warn("Export cancelled.".to_string());
            break;
        }

        let name = display_name(&source);
        let relative = if request.keep_structure { input_root } else { None };
        let output = output_path(&source, relative, &output_dir);

        let outcome = match export_one(&source, &output, request.flatten, canvas) {
            Ok(()) => {
                if let Some(previous) = written.insert(output.clone(), source.clone()) {
                    log.warn(format!(
                        "[WARN] {} overwrites {} exported from {}",
                        name,
                        display_name(&output),
                        previous.display()
                    ));
                }
                log.info(format!("[OK] {} -> {}", name, display_name(&output)));
                ExportOutcome::Exported { output }
            }
            Err(e) => {
                let message = e.detail();
                log.error(format!("[ERROR] {}: {}", name, message));
                ExportOutcome::Failed { message }
            }
        };
        results.push(ExportResult { source, outcome });
    }

    let summary = ExportSummary::from_results(&results);
    log.info(format!(
        "✔ Export finished: {} exported, {} failed.",
        summary.exported, summary.failed
    ));
    results
}

/// First pass of a "same canvas" run: the largest width and height among the
/// files that decode. `None` when nothing could be measured.
fn measure_canvas(
    sources: &[PathBuf],
    flatten: bool,
    log: &mut RunLog,
    cancel: &AtomicBool,
) -> Option<CanvasSize> {
    log.info("Analyzing canvas sizes...".to_string());

    let mut size: Option<CanvasSize> = None;
    for source in sources {
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        match load_composited(source, flatten) {
            Ok(img) => size
                .get_or_insert_with(CanvasSize::default)
                .include(img.width(), img.height()),
            Err(e) => log.error(format!("[ERROR] Analyze {}: {}", display_name(source), e.detail())),
        }
    }

    match size {
        Some(size) => log.info(format!(
            "All PNGs will be padded to: {} x {}",
            size.width, size.height
        )),
        None => log.warn(
            "[WARN] No file could be measured; PNGs keep their own size.".to_string(),
        ),
    }
    size
}

fn export_one(
    source: &Path,
    output: &Path,
    flatten: bool,
    canvas: Option<CanvasSize>,
) -> Result<(), ExportError> {
    let img = load_composited(source, flatten)?;
    let img = match canvas {
        Some(size) => pad_to_canvas(&img, size.width, size.height),
        None => img,
    };

    let file = display_name(source);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| ExportError::write(file.clone(), e))?;
    }
    img.save_with_format(output, ImageFormat::Png)
        .map_err(|e| ExportError::write(file, e))
}

/// `<stem>.png` in the output folder, below the source's relative folder when
/// `input_root` is given.
fn output_path(source: &Path, input_root: Option<&Path>, output_dir: &Path) -> PathBuf {
    let mut file_name = source.file_stem().unwrap_or_default().to_os_string();
    file_name.push(".png");

    let relative_dir = input_root
        .zip(source.parent())
        .and_then(|(root, parent)| parent.strip_prefix(root).ok());

    match relative_dir {
        Some(dir) => output_dir.join(dir).join(file_name),
        None => output_dir.join(file_name),
    }
}
