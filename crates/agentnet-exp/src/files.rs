//! Per-trial CSV files fed by the file-backed output caches.

use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentnet_core::errors::SimError;
use log::trace;

use crate::output::Cache;

#[derive(Debug)]
pub(crate) struct TrialFiles {
    directory: PathBuf,
    prefix: String,
    header: Vec<String>,
    caches: Vec<Arc<Cache>>,
}

impl TrialFiles {
    pub(crate) fn new(
        directory: &Path,
        project: &str,
        exp_id: u32,
        header: Vec<String>,
        caches: Vec<Arc<Cache>>,
    ) -> Self {
        Self {
            directory: directory.to_path_buf(),
            prefix: format!("{project}_e{exp_id}_t"),
            header,
            caches,
        }
    }

    pub(crate) fn path(&self, trial_id: u16) -> PathBuf {
        self.directory.join(format!("{}{trial_id}.csv", self.prefix))
    }

    pub(crate) fn header(&self) -> &[String] {
        &self.header
    }

    /// Creates or truncates the trial's file and writes the header line.
    pub(crate) fn create(&self, trial_id: u16) -> Result<(), SimError> {
        let path = self.path(trial_id);
        fs::create_dir_all(&self.directory)
            .map_err(|err| SimError::io("output-dir-create", self.directory.display(), err))?;
        let file =
            File::create(&path).map_err(|err| SimError::io("output-create", path.display(), err))?;
        let mut writer = csv_writer(file);
        writer
            .write_record(&self.header)
            .map_err(|err| SimError::io("output-write", path.display(), err))?;
        writer
            .flush()
            .map_err(|err| SimError::io("output-write", path.display(), err))
    }

    /// Appends every pending row of `trial_id`, popping the caches in lockstep.
    ///
    /// Nothing is drained when the file cannot be opened.
    pub(crate) fn write_cached_steps(&self, trial_id: u16) -> Result<usize, SimError> {
        let Some(lead) = self.caches.first() else {
            return Ok(0);
        };
        if lead.is_empty_for(trial_id) {
            return Ok(0);
        }
        let path = self.path(trial_id);
        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|err| SimError::io("output-open", path.display(), err))?;
        let mut writer = csv_writer(file);
        let mut written = 0;
        while !lead.is_empty_for(trial_id) {
            let mut record = Vec::with_capacity(self.header.len());
            for cache in &self.caches {
                if let Some(row) = cache.pop_front_row(trial_id) {
                    record.extend(row.iter().map(ToString::to_string));
                }
            }
            writer
                .write_record(&record)
                .map_err(|err| SimError::io("output-write", path.display(), err))?;
            written += 1;
        }
        writer
            .flush()
            .map_err(|err| SimError::io("output-write", path.display(), err))?;
        trace!("flushed {written} rows to {}", path.display());
        Ok(written)
    }
}

fn csv_writer(file: File) -> csv::Writer<BufWriter<File>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(BufWriter::new(file))
}
