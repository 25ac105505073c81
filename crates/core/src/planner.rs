//! Task planner.
//!
//! Turns a directory scan or an explicit file selection into an ordered list
//! of conversion tasks with resolved, collision-free output paths.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::format::TargetFormat;
use crate::task::ConversionTask;

/// Validation errors raised before any task runs.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The scanned directory contains no convertible files.
    #[error("No convertible files found under {}", .root.display())]
    NoInputFiles {
        /// The scanned root.
        root: PathBuf,
    },

    /// File mode was requested with an empty selection.
    #[error("No files selected")]
    NoFilesSelected,

    /// The scan root does not exist.
    #[error("Folder does not exist: {}", .root.display())]
    RootNotFound {
        /// The missing root.
        root: PathBuf,
    },

    /// An output root is required but none was chosen.
    #[error("No output folder chosen")]
    NoOutputRoot,

    /// The directory scan itself failed.
    #[error("Failed to scan {}: {source}", .root.display())]
    ScanFailed {
        /// The scanned root.
        root: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Planning options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOptions {
    /// Target format; decides accepted input extensions and the output
    /// extension.
    pub format: TargetFormat,
    /// Whether directory mode descends into subdirectories.
    #[serde(default)]
    pub include_subdirs: bool,
    /// Place each output next to its input instead of under `output_root`.
    #[serde(default)]
    pub same_location: bool,
    /// Output root, required unless `same_location` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_root: Option<PathBuf>,
    /// Overwrite existing outputs. When false, colliding output names get a
    /// ` (n)` suffix.
    #[serde(default)]
    pub overwrite: bool,
}

impl PlanOptions {
    /// Options converting in place with collision avoidance.
    pub fn same_location(format: TargetFormat) -> Self {
        Self {
            format,
            include_subdirs: false,
            same_location: true,
            output_root: None,
            overwrite: false,
        }
    }

    /// Options writing into `output_root` with collision avoidance.
    pub fn into_folder(format: TargetFormat, output_root: impl Into<PathBuf>) -> Self {
        Self {
            format,
            include_subdirs: false,
            same_location: false,
            output_root: Some(output_root.into()),
            overwrite: false,
        }
    }
}

/// Plans tasks from a directory scan.
///
/// Files are matched against the format's accepted extensions, recursively
/// when `include_subdirs` is set, and returned in a deterministic sorted
/// order. An empty match set is a validation error.
pub fn plan_directory(root: &Path, opts: &PlanOptions) -> Result<Vec<ConversionTask>, PlannerError> {
    if !root.is_dir() {
        return Err(PlannerError::RootNotFound {
            root: root.to_path_buf(),
        });
    }

    let mut inputs = Vec::new();
    collect_files(root, opts.format, opts.include_subdirs, &mut inputs).map_err(|source| {
        PlannerError::ScanFailed {
            root: root.to_path_buf(),
            source,
        }
    })?;
    inputs.sort();

    if inputs.is_empty() {
        return Err(PlannerError::NoInputFiles {
            root: root.to_path_buf(),
        });
    }

    debug!(root = %root.display(), files = inputs.len(), "Planning directory conversion");
    build_tasks(&inputs, Some(root), opts)
}

/// Plans tasks from an explicit file collection.
///
/// The collection must be non-empty; entries are used in the given order.
pub fn plan_files(paths: &[PathBuf], opts: &PlanOptions) -> Result<Vec<ConversionTask>, PlannerError> {
    if paths.is_empty() {
        return Err(PlannerError::NoFilesSelected);
    }
    debug!(files = paths.len(), "Planning file-list conversion");
    build_tasks(paths, None, opts)
}

fn collect_files(
    dir: &Path,
    format: TargetFormat,
    recursive: bool,
    out: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                collect_files(&path, format, recursive, out)?;
            }
        } else if format.accepts_input(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// Resolves output paths and applies collision avoidance.
///
/// `scan_root` is present in directory mode; outputs mirror the input's
/// relative position under it.
fn build_tasks(
    inputs: &[PathBuf],
    scan_root: Option<&Path>,
    opts: &PlanOptions,
) -> Result<Vec<ConversionTask>, PlannerError> {
    let ext = opts.format.extension();
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    let mut tasks = Vec::with_capacity(inputs.len());

    for input in inputs {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = format!("{stem}.{ext}");

        let output = if opts.same_location {
            input
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(&file_name)
        } else {
            let output_root = opts.output_root.as_deref().ok_or(PlannerError::NoOutputRoot)?;
            let sub = scan_root
                .and_then(|root| input.parent().and_then(|p| p.strip_prefix(root).ok()))
                .unwrap_or_else(|| Path::new(""));
            output_root.join(sub).join(&file_name)
        };

        let output = if opts.overwrite {
            claimed.insert(output.clone());
            output
        } else {
            resolve_collision(output, &mut claimed)
        };

        tasks.push(ConversionTask::new(input.clone(), output));
    }

    Ok(tasks)
}

/// Appends ` (n)` to the stem until the path is neither on disk nor claimed
/// by an earlier task of the same plan.
fn resolve_collision(candidate: PathBuf, claimed: &mut HashSet<PathBuf>) -> PathBuf {
    if !candidate.exists() && !claimed.contains(&candidate) {
        claimed.insert(candidate.clone());
        return candidate;
    }

    let stem = candidate
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = candidate
        .extension()
        .map(|e| e.to_string_lossy().into_owned());
    let parent = candidate.parent().unwrap_or_else(|| Path::new("")).to_path_buf();

    let mut counter = 1u32;
    loop {
        let name = match &ext {
            Some(e) => format!("{stem} ({counter}).{e}"),
            None => format!("{stem} ({counter})"),
        };
        let next = parent.join(name);
        if !next.exists() && !claimed.contains(&next) {
            claimed.insert(next.clone());
            return next;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_directory_scan_flat() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a.hwp"));
        touch(&dir.path().join("b.hwpx"));
        touch(&dir.path().join("skip.txt"));
        touch(&dir.path().join("sub/c.hwp"));

        let opts = PlanOptions::same_location(TargetFormat::Pdf);
        let tasks = plan_directory(dir.path(), &opts).unwrap();

        let names: Vec<String> = tasks.iter().map(|t| t.file_name()).collect();
        assert_eq!(names, vec!["a.hwp", "b.hwpx"]);
        assert!(tasks.iter().all(|t| t.status == TaskStatus::Pending));
    }

    #[test]
    fn test_directory_scan_recursive() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a.hwp"));
        touch(&dir.path().join("sub/c.hwp"));
        touch(&dir.path().join("sub/deeper/d.hwpx"));

        let opts = PlanOptions {
            include_subdirs: true,
            ..PlanOptions::same_location(TargetFormat::Pdf)
        };
        let tasks = plan_directory(dir.path(), &opts).unwrap();
        assert_eq!(tasks.len(), 3);
    }

    #[test]
    fn test_hwpx_target_only_matches_hwp() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a.hwp"));
        touch(&dir.path().join("b.hwpx"));

        let opts = PlanOptions::same_location(TargetFormat::Hwpx);
        let tasks = plan_directory(dir.path(), &opts).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].file_name(), "a.hwp");
    }

    #[test]
    fn test_empty_directory_is_validation_error() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("readme.txt"));

        let opts = PlanOptions::same_location(TargetFormat::Pdf);
        let err = plan_directory(dir.path(), &opts).unwrap_err();
        assert!(matches!(err, PlannerError::NoInputFiles { .. }));
    }

    #[test]
    fn test_missing_root_is_validation_error() {
        let opts = PlanOptions::same_location(TargetFormat::Pdf);
        let err = plan_directory(Path::new("/definitely/not/here"), &opts).unwrap_err();
        assert!(matches!(err, PlannerError::RootNotFound { .. }));
    }

    #[test]
    fn test_empty_file_list_is_validation_error() {
        let opts = PlanOptions::same_location(TargetFormat::Pdf);
        let err = plan_files(&[], &opts).unwrap_err();
        assert!(matches!(err, PlannerError::NoFilesSelected));
    }

    #[test]
    fn test_same_location_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("report.hwp");
        touch(&input);

        let opts = PlanOptions::same_location(TargetFormat::Pdf);
        let tasks = plan_files(&[input.clone()], &opts).unwrap();
        assert_eq!(tasks[0].output_path, dir.path().join("report.pdf"));
    }

    #[test]
    fn test_output_root_mirrors_relative_subpath() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        touch(&dir.path().join("a.hwp"));
        touch(&dir.path().join("sub/b.hwp"));

        let opts = PlanOptions {
            include_subdirs: true,
            ..PlanOptions::into_folder(TargetFormat::Pdf, out.path())
        };
        let tasks = plan_directory(dir.path(), &opts).unwrap();

        let outputs: HashSet<PathBuf> = tasks.iter().map(|t| t.output_path.clone()).collect();
        assert!(outputs.contains(&out.path().join("a.pdf")));
        assert!(outputs.contains(&out.path().join("sub/b.pdf")));
    }

    #[test]
    fn test_file_mode_flattens_into_output_root() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let input = dir.path().join("nested/report.hwp");
        touch(&input);

        let opts = PlanOptions::into_folder(TargetFormat::Pdf, out.path());
        let tasks = plan_files(&[input], &opts).unwrap();
        assert_eq!(tasks[0].output_path, out.path().join("report.pdf"));
    }

    #[test]
    fn test_missing_output_root_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.hwp");
        touch(&input);

        let opts = PlanOptions {
            output_root: None,
            ..PlanOptions::into_folder(TargetFormat::Pdf, "unused")
        };
        let err = plan_files(&[input], &opts).unwrap_err();
        assert!(matches!(err, PlannerError::NoOutputRoot));
    }

    #[test]
    fn test_collision_with_existing_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.hwp");
        touch(&input);
        touch(&dir.path().join("a.pdf"));

        let opts = PlanOptions::same_location(TargetFormat::Pdf);
        let tasks = plan_files(&[input], &opts).unwrap();
        assert_eq!(tasks[0].output_path, dir.path().join("a (1).pdf"));
    }

    #[test]
    fn test_collision_counter_advances() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.hwp");
        touch(&input);
        touch(&dir.path().join("a.pdf"));
        touch(&dir.path().join("a (1).pdf"));

        let opts = PlanOptions::same_location(TargetFormat::Pdf);
        let tasks = plan_files(&[input], &opts).unwrap();
        assert_eq!(tasks[0].output_path, dir.path().join("a (2).pdf"));
    }

    #[test]
    fn test_collision_between_tasks_in_same_plan() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        // Two inputs with the same stem from different folders, flattened
        // into one output root.
        let first = dir.path().join("one/report.hwp");
        let second = dir.path().join("two/report.hwp");
        touch(&first);
        touch(&second);

        let opts = PlanOptions::into_folder(TargetFormat::Pdf, out.path());
        let tasks = plan_files(&[first, second], &opts).unwrap();

        assert_eq!(tasks[0].output_path, out.path().join("report.pdf"));
        assert_eq!(tasks[1].output_path, out.path().join("report (1).pdf"));
    }

    #[test]
    fn test_overwrite_disables_collision_avoidance() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.hwp");
        touch(&input);
        touch(&dir.path().join("a.pdf"));

        let opts = PlanOptions {
            overwrite: true,
            ..PlanOptions::same_location(TargetFormat::Pdf)
        };
        let tasks = plan_files(&[input], &opts).unwrap();
        assert_eq!(tasks[0].output_path, dir.path().join("a.pdf"));
    }

    #[test]
    fn test_all_outputs_unique_after_planning() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let inputs: Vec<PathBuf> = (0..4)
            .map(|i| {
                let p = dir.path().join(format!("d{i}/same.hwp"));
                touch(&p);
                p
            })
            .collect();

        let opts = PlanOptions::into_folder(TargetFormat::Pdf, out.path());
        let tasks = plan_files(&inputs, &opts).unwrap();

        let unique: HashSet<&PathBuf> = tasks.iter().map(|t| &t.output_path).collect();
        assert_eq!(unique.len(), tasks.len());
    }
}
