//! Results directory storage
//!
//! Writes a finished suite in the allure results layout: one
//! `<uuid>-result.json` per test, one `<uuid>-container.json` per container
//! and one file per attachment, named by the attachment's `source`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::SuiteResult;
use crate::models::{Attachment, Container, Step, TestResult};

const RESULT_SUFFIX: &str = "-result.json";
const CONTAINER_SUFFIX: &str = "-container.json";
const ATTACHMENT_MARKER: &str = "-attachment";

/// Counts of files produced by one write
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub results: usize,
    pub containers: usize,
    pub attachments: usize,
}

/// Writer for an allure results directory
pub struct ResultsWriter {
    base_dir: PathBuf,
}

impl ResultsWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Ensure the results directory exists
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create results directory {}",
                self.base_dir.display()
            )
        })
    }

    /// Remove files left by a previous run.
    ///
    /// Only files this writer produces are deleted.
    pub fn clean(&self) -> Result<usize> {
        if !self.base_dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            let owned = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| {
                    n.ends_with(RESULT_SUFFIX)
                        || n.ends_with(CONTAINER_SUFFIX)
                        || n.contains(ATTACHMENT_MARKER)
                })
                .unwrap_or(false);

            if owned && path.is_file() {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }

        debug!("Removed {} files from {}", removed, self.base_dir.display());
        Ok(removed)
    }

    /// Write every record of a suite plus the suite container
    pub fn write_suite(&self, suite: &SuiteResult) -> Result<WriteStats> {
        self.ensure_dir()?;
        let mut stats = WriteStats::default();

        for record in suite.get_all_test_results() {
            stats.attachments += self.write_result(&record.result)?;
            stats.results += 1;
            stats.attachments += self.write_container(&record.container)?;
            stats.containers += 1;
        }

        stats.attachments += self.write_container(&suite.container())?;
        stats.containers += 1;

        info!(
            "Wrote {} results, {} containers and {} attachments to {}",
            stats.results,
            stats.containers,
            stats.attachments,
            self.base_dir.display()
        );
        Ok(stats)
    }

    /// Write one result and its attachments, returning the attachment count
    pub fn write_result(&self, result: &TestResult) -> Result<usize> {
        let path = self.base_dir.join(format!("{}{}", result.uuid, RESULT_SUFFIX));
        self.write_json(&path, result)?;

        let mut written = self.write_attachments(&result.attachments)?;
        written += self.write_step_attachments(&result.steps)?;
        Ok(written)
    }

    /// Write one container and the attachments of its hook steps
    pub fn write_container(&self, container: &Container) -> Result<usize> {
        let path = self
            .base_dir
            .join(format!("{}{}", container.uuid, CONTAINER_SUFFIX));
        self.write_json(&path, container)?;

        let mut written = self.write_step_attachments(&container.befores)?;
        written += self.write_step_attachments(&container.afters)?;
        Ok(written)
    }

    fn write_step_attachments(&self, steps: &[Step]) -> Result<usize> {
        let mut written = 0;
        for step in steps {
            written += self.write_attachments(&step.attachments)?;
            written += self.write_step_attachments(&step.steps)?;
        }
        Ok(written)
    }

    fn write_attachments(&self, attachments: &[Attachment]) -> Result<usize> {
        for attachment in attachments {
            let path = self.base_dir.join(&attachment.source);
            fs::write(&path, &attachment.content)
                .with_context(|| format!("Failed to write attachment {}", path.display()))?;
        }
        Ok(attachments.len())
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, value)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Read every `*-result.json` in `dir`, ordered by test name.
///
/// Files that fail to parse are skipped with a debug log.
pub fn load_results(dir: &Path) -> Result<Vec<TestResult>> {
    load_suffixed(dir, RESULT_SUFFIX).map(|mut results: Vec<TestResult>| {
        results.sort_by(|a, b| a.name.cmp(&b.name).then(a.start.cmp(&b.start)));
        results
    })
}

/// Read every `*-container.json` in `dir`
pub fn load_containers(dir: &Path) -> Result<Vec<Container>> {
    load_suffixed(dir, CONTAINER_SUFFIX).map(|mut containers: Vec<Container>| {
        containers.sort_by(|a, b| a.name.cmp(&b.name));
        containers
    })
}

fn load_suffixed<T: serde::de::DeserializeOwned>(dir: &Path, suffix: &str) -> Result<Vec<T>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read results directory {}", dir.display()))?;

    let mut items = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(suffix))
            .unwrap_or(false);
        if !matches {
            continue;
        }

        match load_from_path(&path) {
            Ok(item) => items.push(item),
            Err(e) => debug!("Failed to load {}: {}", path.display(), e),
        }
    }
    Ok(items)
}

fn load_from_path<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).context("Failed to open results file")?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).context("Failed to parse results file")
}
