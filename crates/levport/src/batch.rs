//! Batch mode: translate every level file in a directory.
//!
//! Files are listed up front, checked for output collisions, then
//! translated in parallel. One file failing never stops the others; the
//! report is sorted by file name whatever order the workers finish in.

use crate::config::LevportConfig;
use crate::pipeline::translate;
use levport_syntax::Diagnostic;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Files in the level directory that hold shared library code or data
/// rather than a level description.
pub const SKIPPED_FILES: &[&str] = &[
    "nhlib.lua",
    "nhcore.lua",
    "themerms.lua",
    "quest.lua",
    "dungeon.lua",
];

const SKIP_REASON: &str = "library/data, not a level description";

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to list {}: {source}", .path.display())]
    List {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("{first} and {second} would both be written to {}", .output.display())]
    OutputCollision {
        first: String,
        second: String,
        output: PathBuf,
    },

    #[error("failed to create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileStatus {
    Translated,
    Failed,
    Skipped { reason: String },
}

/// Result for a single file in a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub name: String,
    #[serde(flatten)]
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    /// I/O failure reading the input or writing the output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    fn skipped(name: String) -> Self {
        Self {
            name,
            status: FileStatus::Skipped {
                reason: SKIP_REASON.to_string(),
            },
            output: None,
            diagnostics: Vec::new(),
            error: None,
        }
    }

    fn failed(name: String, error: String) -> Self {
        Self {
            name,
            status: FileStatus::Failed,
            output: None,
            diagnostics: Vec::new(),
            error: Some(error),
        }
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| !d.is_fatal()).count()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_fatal()).count() + usize::from(self.error.is_some())
    }

    /// One status line for the terminal.
    pub fn status_line(&self) -> String {
        match &self.status {
            FileStatus::Translated => {
                let output = self
                    .output
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                match self.warning_count() {
                    0 => format!("ok    {} -> {}", self.name, output),
                    n => format!("ok    {} -> {} ({} warning{})", self.name, output, n, plural(n)),
                }
            }
            FileStatus::Failed => {
                let n = self.error_count();
                format!("FAIL  {} ({} error{})", self.name, n, plural(n))
            }
            FileStatus::Skipped { reason } => format!("skip  {}: {}", self.name, reason),
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Aggregated report across a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub translated: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchReport {
    fn new(mut files: Vec<FileReport>) -> Self {
        files.sort_by(|a, b| a.name.cmp(&b.name));
        let count = |f: fn(&FileStatus) -> bool| files.iter().filter(|r| f(&r.status)).count();
        let translated = count(|s| matches!(s, FileStatus::Translated));
        let failed = count(|s| matches!(s, FileStatus::Failed));
        let skipped = count(|s| matches!(s, FileStatus::Skipped { .. }));
        Self {
            files,
            translated,
            failed,
            skipped,
        }
    }

    /// Returns true if any file failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn tally_line(&self) -> String {
        format!(
            "{} translated, {} failed, {} skipped",
            self.translated, self.failed, self.skipped
        )
    }

    /// Status lines, diagnostics of failed files, and the final tally.
    pub fn format_text(&self) -> String {
        let mut lines = Vec::new();
        for file in &self.files {
            lines.push(file.status_line());
            if file.status == FileStatus::Failed {
                for diagnostic in &file.diagnostics {
                    lines.push(format!("      {}:{}", file.name, diagnostic));
                }
                if let Some(error) = &file.error {
                    lines.push(format!("      {}", error));
                }
            }
        }
        lines.push(self.tally_line());
        lines.join("\n")
    }
}

/// `*.lua` files directly inside `dir`, sorted by name.
pub fn list_inputs(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut inputs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| BatchError::List {
            path: dir.to_path_buf(),
            source,
        })?;
        let is_lua = entry.path().extension().is_some_and(|ext| ext == "lua");
        if entry.file_type().is_file() && is_lua {
            inputs.push(entry.into_path());
        }
    }
    Ok(inputs)
}

/// Output path for one input.
pub fn output_path(output_dir: &Path, input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{stem}.{extension}"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reject jobs whose outputs coincide. Paths are compared case-insensitively
/// so a batch behaves the same on case-insensitive file systems.
pub fn check_collisions(jobs: &[(PathBuf, PathBuf)]) -> Result<(), BatchError> {
    let mut seen: HashMap<String, &Path> = HashMap::new();
    for (input, output) in jobs {
        let key = output.to_string_lossy().to_lowercase();
        if let Some(first) = seen.insert(key, input) {
            return Err(BatchError::OutputCollision {
                first: file_name(first),
                second: file_name(input),
                output: output.clone(),
            });
        }
    }
    Ok(())
}

/// Translate every level file in `input_dir` into `output_dir`.
pub fn run_batch(
    input_dir: &Path,
    output_dir: &Path,
    config: &LevportConfig,
) -> Result<BatchReport, BatchError> {
    let inputs = list_inputs(input_dir)?;

    let mut reports = Vec::new();
    let mut jobs = Vec::new();
    for input in inputs {
        let name = file_name(&input);
        if SKIPPED_FILES.contains(&name.as_str()) {
            info!(file = %name, "skipped");
            reports.push(FileReport::skipped(name));
        } else {
            let output = output_path(output_dir, &input, config.extension());
            jobs.push((input, output));
        }
    }
    check_collisions(&jobs)?;

    std::fs::create_dir_all(output_dir).map_err(|source| BatchError::CreateDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    info!(files = jobs.len(), "translating");
    let translated: Vec<FileReport> = jobs
        .par_iter()
        .map(|(input, output)| translate_file(input, output, config))
        .collect();
    reports.extend(translated);

    Ok(BatchReport::new(reports))
}

fn translate_file(input: &Path, output: &Path, config: &LevportConfig) -> FileReport {
    let name = file_name(input);

    let source = match std::fs::read_to_string(input) {
        Ok(source) => source,
        Err(e) => {
            warn!(file = %name, error = %e, "read failed");
            return FileReport::failed(name, format!("failed to read {}: {}", input.display(), e));
        }
    };

    let translation = translate(&source, &name, config);
    let diagnostics = translation.diagnostics.into_vec();

    let Some(text) = translation.output else {
        warn!(file = %name, "translation failed");
        return FileReport {
            name,
            status: FileStatus::Failed,
            output: None,
            diagnostics,
            error: None,
        };
    };

    if let Err(e) = std::fs::write(output, text) {
        warn!(file = %name, error = %e, "write failed");
        return FileReport {
            diagnostics,
            ..FileReport::failed(name, format!("failed to write {}: {}", output.display(), e))
        };
    }

    info!(file = %name, output = %output.display(), "translated");
    FileReport {
        name,
        status: FileStatus::Translated,
        output: Some(output.to_path_buf()),
        diagnostics,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_list_inputs_is_sorted_and_shallow() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.lua", "");
        write(dir.path(), "a.lua", "");
        write(dir.path(), "notes.txt", "");
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        write(&dir.path().join("sub"), "c.lua", "");

        let names: Vec<String> = list_inputs(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, ["a.lua", "b.lua"]);
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("out"), Path::new("levels/bigrm-1.lua"), "js"),
            PathBuf::from("out/bigrm-1.js")
        );
    }

    #[test]
    fn test_collisions_are_rejected() {
        let jobs = vec![
            (PathBuf::from("in/Tower1.lua"), PathBuf::from("out/Tower1.js")),
            (PathBuf::from("in/tower1.lua"), PathBuf::from("out/tower1.js")),
        ];
        let err = check_collisions(&jobs).unwrap_err();
        assert!(matches!(
            err,
            BatchError::OutputCollision { ref first, ref second, .. }
                if first == "Tower1.lua" && second == "tower1.lua"
        ));

        let distinct = vec![
            (PathBuf::from("in/a.lua"), PathBuf::from("out/a.js")),
            (PathBuf::from("in/b.lua"), PathBuf::from("out/b.js")),
        ];
        assert!(check_collisions(&distinct).is_ok());
    }

    #[test]
    fn test_run_batch() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(input.path(), "good.lua", "des.room()\n");
        write(input.path(), "bad.lua", "for i = 1, rnd(3) do add(i) end\n");
        write(input.path(), "nhlib.lua", "function percent(n) end\n");

        let out_dir = output.path().join("js");
        let report = run_batch(input.path(), &out_dir, &LevportConfig::default()).unwrap();

        assert_eq!(report.translated, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert!(report.has_failures());

        let names: Vec<&str> = report.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["bad.lua", "good.lua", "nhlib.lua"]);

        assert!(out_dir.join("good.js").is_file());
        assert!(!out_dir.join("bad.js").exists());
        assert!(!out_dir.join("nhlib.js").exists());

        let text = report.format_text();
        assert!(text.contains("FAIL  bad.lua"));
        assert!(text.contains("skip  nhlib.lua: library/data, not a level description"));
        assert!(text.ends_with("1 translated, 1 failed, 1 skipped"));
    }

    #[test]
    fn test_report_serializes_status() {
        let report = BatchReport::new(vec![
            FileReport::skipped("quest.lua".into()),
            FileReport::failed("x.lua".into(), "failed to read x.lua".into()),
        ]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["skipped"], 1);
        assert_eq!(json["files"][0]["name"], "quest.lua");
        assert_eq!(json["files"][0]["status"], "skipped");
        assert_eq!(json["files"][1]["status"], "failed");
        assert_eq!(json["files"][1]["error"], "failed to read x.lua");
    }
}
