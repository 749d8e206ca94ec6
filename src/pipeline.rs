use crate::{
    config::Config,
    error::{Error, Result},
    file::{FileRef, FileWriter},
    scanner::{ScanStats, Scanner},
    worker::{Outcome, Worker, WorkerKind},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// A file whose processing failed.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    /// Path relative to the scan root
    pub path: String,

    /// Error description
    pub error: String,
}

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// Scanner statistics
    pub scan: ScanStats,

    /// Files handed to the workers
    pub selected_files: usize,

    /// Files changed by at least one worker
    pub modified_files: usize,

    /// Files no worker needed to change
    pub unchanged_files: usize,

    /// Files left alone on purpose
    pub skipped_files: usize,

    /// Files whose processing failed
    pub failed_files: usize,

    /// Modifications per worker
    pub per_worker: BTreeMap<WorkerKind, usize>,

    /// Failure details
    pub failures: Vec<FileFailure>,

    /// Errors behind `failures`
    #[serde(skip)]
    pub errors: Vec<Error>,

    /// Whether writes were suppressed
    pub dry_run: bool,

    /// Total execution time
    pub duration: Duration,
}

impl PipelineStats {
    /// Returns true if every selected file was processed without error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed_files == 0
    }

    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║            srcpatch Summary                           ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Files Selected:       {:>8}                        ║",
            self.selected_files
        );
        println!(
            "║   - Modified:         {:>8}                        ║",
            self.modified_files
        );
        println!(
            "║   - Unchanged:        {:>8}                        ║",
            self.unchanged_files
        );
        println!(
            "║   - Skipped:          {:>8}                        ║",
            self.skipped_files
        );
        println!(
            "║   - Failed:           {:>8}                        ║",
            self.failed_files
        );
        println!(
            "║ Scan Errors:          {:>8}                        ║",
            self.scan.errors
        );
        println!(
            "║ Time:                 {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        println!("╚═══════════════════════════════════════════════════════╝");

        for failure in &self.failures {
            println!("  ✗ {}: {}", failure.path, failure.error);
        }

        if self.dry_run {
            println!("Would modify {} files (dry run)", self.modified_files);
        } else {
            println!("Modified {} files", self.modified_files);
        }
    }

    /// Collects the recorded failures into one error, if any.
    #[must_use]
    pub fn failure_error(&self) -> Option<Error> {
        if self.errors.is_empty() {
            return None;
        }

        Some(Error::multiple(self.errors.clone()))
    }
}

/// Per-file result of running all workers.
enum FileResult {
    Modified,
    Unchanged,
    Skipped,
}

/// Applies the configured workers to every selected file.
pub struct Pipeline {
    config: Config,
    scanner: Scanner,
    workers: Vec<Worker>,
    writer: FileWriter,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let scanner = Scanner::new(&config)?;
        let workers = Worker::ordered(&config);
        let writer = FileWriter::new(config.dry_run, config.backup_existing);

        Ok(Self {
            config,
            scanner,
            workers,
            writer,
        })
    }

    /// Returns the workers in the order they are applied.
    #[must_use]
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// Scans the root directory and applies every worker to every file.
    ///
    /// Files are processed one at a time. An error on one file stops the
    /// remaining workers for that file only; it is recorded in the returned
    /// statistics and processing moves on to the next file.
    ///
    /// # Errors
    ///
    /// Per-file problems never fail the run; they are reported through
    /// [`PipelineStats::failures`] and [`PipelineStats::failure_error`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use srcpatch::{Config, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .root_dir("./src")
    ///     .prepend_header("stdafx.h")
    ///     .build()?;
    ///
    /// let stats = Pipeline::new(config)?.run()?;
    /// stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(root_dir = %self.config.root_dir.display()))]
    pub fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let mut stats = PipelineStats {
            dry_run: self.config.dry_run,
            ..PipelineStats::default()
        };

        if self.workers.is_empty() {
            info!("No worker enabled; nothing to do");
            return Ok(stats);
        }

        if self.config.dry_run {
            warn!("Dry run mode enabled - no files will be written");
        }

        let selection = self.scanner.scan();
        stats.scan = selection.stats;
        stats.selected_files = selection.files.len();

        info!("Selected {} files", stats.selected_files);

        for file in &selection.files {
            match self.process_file(file, &mut stats.per_worker) {
                Ok(FileResult::Modified) => {
                    stats.modified_files += 1;
                    if self.config.dry_run {
                        info!("Would write to {}", file.relative_path);
                    } else {
                        info!("Wrote to {}", file.relative_path);
                    }
                }
                Ok(FileResult::Unchanged) => stats.unchanged_files += 1,
                Ok(FileResult::Skipped) => stats.skipped_files += 1,
                Err(e) => {
                    warn!("Failed to process {}: {}", file.relative_path, e);
                    stats.failed_files += 1;
                    stats.failures.push(FileFailure {
                        path: file.relative_path.clone(),
                        error: e.to_string(),
                    });
                    stats.errors.push(e);
                }
            }
        }

        stats.duration = start_time.elapsed();

        if !stats.failures.is_empty() {
            warn!(
                "Encountered {} errors during processing",
                stats.failures.len()
            );
        }

        info!(
            "✓ Processed {} files in {:.2}s",
            stats.selected_files,
            stats.duration.as_secs_f64()
        );

        Ok(stats)
    }

    /// Runs every worker over one in-memory copy of `file`, then writes the
    /// result once. Dry runs see exactly the content a real run would write.
    fn process_file(
        &self,
        file: &FileRef,
        per_worker: &mut BTreeMap<WorkerKind, usize>,
    ) -> Result<FileResult> {
        let mut content = file.read_bytes()?;
        let mut modified = Vec::new();
        let mut skipped = false;

        for worker in &self.workers {
            match worker.transform(file, &mut content)? {
                Outcome::Modified { detail } => {
                    debug!("{}: {}", file.relative_path, detail);
                    modified.push(worker.kind());
                }
                Outcome::Unchanged => {}
                Outcome::Skipped { reason } => {
                    debug!("{}: skipped ({})", file.relative_path, reason);
                    skipped = true;
                    break;
                }
            }
        }

        if modified.is_empty() {
            return Ok(if skipped {
                FileResult::Skipped
            } else {
                FileResult::Unchanged
            });
        }

        self.writer.replace(file, &content)?;

        for kind in modified {
            *per_worker.entry(kind).or_default() += 1;
        }

        Ok(FileResult::Modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FileFilterConfig;
    use assert_fs::prelude::*;
    use encoding_rs::WINDOWS_1251;

    fn cpp_filter() -> FileFilterConfig {
        FileFilterConfig::new().extensions(vec!["cpp".into(), "h".into()])
    }

    #[test]
    fn test_pipeline_prepends_to_selected_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.cpp").write_str("int main(){}").unwrap();
        temp.child("b.h").write_str("int b;").unwrap();
        temp.child("skip/ignored.cpp").write_str("int c;").unwrap();
        temp.child("a.txt").write_str("notes").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .file_filter_config(cpp_filter().exclude_directories(vec!["skip".into()]))
            .prepend_header("stdafx.h")
            .build()
            .unwrap();

        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.selected_files, 2);
        assert_eq!(stats.modified_files, 2);
        assert!(stats.is_success());
        temp.child("a.cpp")
            .assert("#include \"stdafx.h\"\nint main(){}");
        temp.child("b.h").assert("#include \"stdafx.h\"\nint b;");
        temp.child("skip/ignored.cpp").assert("int c;");
        temp.child("a.txt").assert("notes");
    }

    #[test]
    fn test_pipeline_normalizes_before_prepending() {
        let temp = assert_fs::TempDir::new().unwrap();
        let (bytes, _, _) = WINDOWS_1251.encode("// Привет\nint x;\n");
        temp.child("ru.cpp").write_binary(&bytes).unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .file_filter_config(cpp_filter())
            .prepend_header("stdafx.h")
            .normalize_encoding(true)
            .source_encoding("windows-1251")
            .build()
            .unwrap();

        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.modified_files, 1);
        assert_eq!(stats.per_worker[&WorkerKind::NormalizeEncoding], 1);
        assert_eq!(stats.per_worker[&WorkerKind::PrependHeader], 1);
        temp.child("ru.cpp")
            .assert("#include \"stdafx.h\"\n// Привет\nint x;\n");
    }

    #[test]
    fn test_pipeline_is_idempotent() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.cpp").write_str("int main(){}").unwrap();

        let build = || {
            Config::builder()
                .root_dir(temp.path())
                .file_filter_config(cpp_filter())
                .prepend_header("stdafx.h")
                .normalize_encoding(true)
                .build()
                .unwrap()
        };

        Pipeline::new(build()).unwrap().run().unwrap();
        let second = Pipeline::new(build()).unwrap().run().unwrap();

        assert_eq!(second.modified_files, 0);
        assert_eq!(second.unchanged_files, 1);
        temp.child("a.cpp")
            .assert("#include \"stdafx.h\"\nint main(){}");
    }

    #[test]
    fn test_pipeline_continues_after_failure() {
        let temp = assert_fs::TempDir::new().unwrap();
        let mut truncated_utf16 = vec![0xFF, 0xFE, b'a', 0x00];
        truncated_utf16.push(b'b');
        temp.child("a_broken.cpp")
            .write_binary(&truncated_utf16)
            .unwrap();
        temp.child("b_fine.cpp").write_str("int b;").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .file_filter_config(cpp_filter())
            .prepend_header("stdafx.h")
            .normalize_encoding(true)
            .build()
            .unwrap();

        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.failed_files, 1);
        assert_eq!(stats.modified_files, 1);
        assert!(!stats.is_success());
        assert!(stats.failures[0].path.contains("a_broken.cpp"));
        assert!(matches!(
            stats.failure_error(),
            Some(Error::Multiple { count: 1, .. })
        ));
        temp.child("b_fine.cpp").assert("#include \"stdafx.h\"\nint b;");
        assert_eq!(
            std::fs::read(temp.child("a_broken.cpp").path()).unwrap(),
            truncated_utf16
        );
    }

    #[test]
    fn test_pipeline_skips_binary_entirely() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("blob.h").write_binary(&[0u8, 1, 2, 3]).unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .file_filter_config(cpp_filter())
            .prepend_header("stdafx.h")
            .normalize_encoding(true)
            .build()
            .unwrap();

        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.skipped_files, 1);
        assert_eq!(
            std::fs::read(temp.child("blob.h").path()).unwrap(),
            vec![0u8, 1, 2, 3]
        );
    }

    #[test]
    fn test_pipeline_dry_run() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.cpp").write_str("int main(){}").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .prepend_header("stdafx.h")
            .dry_run(true)
            .build()
            .unwrap();

        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert!(stats.dry_run);
        assert_eq!(stats.modified_files, 1);
        temp.child("a.cpp").assert("int main(){}");
    }

    #[test]
    fn test_pipeline_without_workers_does_not_scan() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.cpp").write_str("int main(){}").unwrap();

        let config = Config::builder().root_dir(temp.path()).build().unwrap();
        let pipeline = Pipeline::new(config).unwrap();
        assert!(pipeline.workers().is_empty());

        let stats = pipeline.run().unwrap();

        assert_eq!(stats.selected_files, 0);
        assert_eq!(stats.scan.total_files, 0);
    }

    #[test]
    fn test_pipeline_missing_root_is_partial_result() {
        let config = Config::builder()
            .root_dir("/nonexistent/path/that/should/not/exist")
            .prepend_header("stdafx.h")
            .build()
            .unwrap();

        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.selected_files, 0);
        assert_eq!(stats.scan.errors, 1);
        assert!(stats.is_success());
    }

    #[test]
    fn test_stats_serialize() {
        let mut stats = PipelineStats::default();
        stats.per_worker.insert(WorkerKind::PrependHeader, 3);

        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["per_worker"]["prepend_header"], 3);
        assert_eq!(json["modified_files"], 0);
    }

    #[test]
    fn test_dry_run_matches_real_run() {
        let utf16_with_include: Vec<u8> = [0xFF, 0xFE]
            .into_iter()
            .chain(
                "#include \"stdafx.h\"\nint x;\n"
                    .encode_utf16()
                    .flat_map(u16::to_le_bytes),
            )
            .collect();

        let run = |dry_run: bool| {
            let temp = assert_fs::TempDir::new().unwrap();
            temp.child("wide.cpp")
                .write_binary(&utf16_with_include)
                .unwrap();

            let config = Config::builder()
                .root_dir(temp.path())
                .file_filter_config(cpp_filter())
                .prepend_header("stdafx.h")
                .normalize_encoding(true)
                .dry_run(dry_run)
                .build()
                .unwrap();

            let stats = Pipeline::new(config).unwrap().run().unwrap();
            let written = std::fs::read(temp.child("wide.cpp").path()).unwrap();
            (stats, written)
        };

        let (dry, dry_bytes) = run(true);
        let (real, real_bytes) = run(false);

        assert_eq!(dry.per_worker, real.per_worker);
        assert_eq!(dry.per_worker.get(&WorkerKind::NormalizeEncoding), Some(&1));
        assert_eq!(dry.per_worker.get(&WorkerKind::PrependHeader), None);
        assert_eq!(dry_bytes, utf16_with_include);
        assert_eq!(real_bytes, b"#include \"stdafx.h\"\nint x;\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_pipeline_continues_after_write_failure() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a_locked.cpp").write_str("int a;").unwrap();
        temp.child("b_open.cpp").write_str("int b;").unwrap();

        let locked = temp.child("a_locked.cpp");
        let mut permissions = std::fs::metadata(locked.path()).unwrap().permissions();
        permissions.set_readonly(true);
        std::fs::set_permissions(locked.path(), permissions).unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .file_filter_config(cpp_filter())
            .prepend_header("stdafx.h")
            .build()
            .unwrap();

        let stats = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(stats.failed_files, 1);
        assert!(matches!(stats.errors[0], Error::Write { .. }));
        assert!(stats.failures[0].path.contains("a_locked.cpp"));
        assert_eq!(stats.per_worker.get(&WorkerKind::PrependHeader), Some(&1));
        locked.assert("int a;");
        temp.child("b_open.cpp").assert("#include \"stdafx.h\"\nint b;");

        let leftovers: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".srcpatch.tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
