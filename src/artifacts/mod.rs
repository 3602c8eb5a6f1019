pub mod storage;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::results::run::{ArtifactPath, RunRecord};
use crate::story::file_safe;

pub use storage::{ArtifactStorage, RedisArtifactStorage};

/// Allocates per-run artifact files under `<output_dir>/artifacts/` and
/// uploads them once the sweep is over.
#[derive(Debug, Clone, Default)]
pub struct ArtifactManager {
    artifact_dir: Option<PathBuf>,
    upload_bucket: Option<String>,
}

impl ArtifactManager {
    pub fn new(output_dir: Option<&Path>, upload_bucket: Option<&str>) -> Self {
        Self {
            artifact_dir: output_dir.map(|dir| dir.join("artifacts")),
            upload_bucket: upload_bucket.map(str::to_string),
        }
    }

    pub fn upload_bucket(&self) -> Option<&str> {
        self.upload_bucket.as_deref()
    }

    /// Opens a fresh file for `name`, or a discard sink when there is no
    /// output directory.
    pub(crate) fn open<'a>(
        &self,
        run: &'a mut RunRecord,
        name: &str,
    ) -> Result<ArtifactHandle<'a>> {
        let sink = match &self.artifact_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let path = dir.join(format!(
                    "{}_{}",
                    file_safe(name),
                    Uuid::new_v4().simple()
                ));
                let file = File::create(&path)?;
                Sink::File { file, path }
            }
            None => Sink::Discard,
        };
        Ok(ArtifactHandle {
            run,
            name: name.to_string(),
            sink: Some(sink),
        })
    }

    /// Lists every local artifact of every run for upload to `bucket`.
    pub(crate) fn plan_upload(bucket: &str, runs: &[RunRecord]) -> UploadPlan {
        let runs = runs
            .iter()
            .enumerate()
            .filter_map(|(run, record)| {
                let files: Vec<PendingUpload> = record
                    .iter_artifacts_indexed()
                    .filter_map(|(entry, slot, name, path)| match path {
                        ArtifactPath::Local(local) => Some(PendingUpload {
                            entry,
                            slot,
                            name: name.to_string(),
                            local: local.clone(),
                        }),
                        ArtifactPath::Remote(_) => None,
                    })
                    .collect();
                (!files.is_empty()).then_some(RunUpload { run, files })
            })
            .collect();
        UploadPlan {
            bucket: bucket.to_string(),
            runs,
        }
    }

    /// Commits the remote identifiers of one run. The run is left alone
    /// when any of its paths changed since the plan was taken.
    pub(crate) fn apply_rewrites(runs: &mut [RunRecord], rewrites: RunRewrites) -> usize {
        let Some(record) = runs.get_mut(rewrites.run) else {
            return 0;
        };
        let artifacts = record.artifacts_mut();
        let unchanged = rewrites.paths.iter().all(|(entry, slot, local, _)| {
            matches!(
                artifacts.get(*entry).and_then(|(_, paths)| paths.get(*slot)),
                Some(ArtifactPath::Local(path)) if path == local
            )
        });
        if !unchanged {
            debug!(run = rewrites.run, "artifacts changed during upload; keeping local paths");
            return 0;
        }
        let count = rewrites.paths.len();
        for (entry, slot, _, remote) in rewrites.paths {
            artifacts[entry].1[slot] = ArtifactPath::Remote(remote);
        }
        count
    }
}

struct PendingUpload {
    entry: usize,
    slot: usize,
    name: String,
    local: PathBuf,
}

struct RunUpload {
    run: usize,
    files: Vec<PendingUpload>,
}

/// Local artifacts captured from the sweep, uploadable without holding
/// on to it.
pub struct UploadPlan {
    bucket: String,
    runs: Vec<RunUpload>,
}

/// Remote identifiers for every local artifact of one run.
pub struct RunRewrites {
    run: usize,
    paths: Vec<(usize, usize, PathBuf, String)>,
}

impl UploadPlan {
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Uploads run by run and stops at the first failure. Returns the
    /// rewrites of every run that uploaded completely, and the error that
    /// stopped the upload, if any.
    pub fn execute(self, storage: &dyn ArtifactStorage) -> (Vec<RunRewrites>, Option<Error>) {
        let mut done = Vec::with_capacity(self.runs.len());
        for run in self.runs {
            let mut paths = Vec::with_capacity(run.files.len());
            for file in run.files {
                let remote_name = format!("{}_{}", file_safe(&file.name), Uuid::new_v4());
                match storage.insert(&self.bucket, &remote_name, &file.local) {
                    Ok(remote) => {
                        debug!(artifact = %file.name, local = %file.local.display(), %remote, "uploaded artifact");
                        paths.push((file.entry, file.slot, file.local, remote));
                    }
                    Err(err) => return (done, Some(err.into())),
                }
            }
            done.push(RunRewrites { run: run.run, paths });
        }
        (done, None)
    }
}

enum Sink {
    File { file: File, path: PathBuf },
    Discard,
}

/// Writable artifact scoped to the open run. Dropping the handle closes
/// the file and records its path on the run, including during unwinding.
pub struct ArtifactHandle<'a> {
    run: &'a mut RunRecord,
    name: String,
    sink: Option<Sink>,
}

impl ArtifactHandle<'_> {
    /// Local path of the artifact; `None` for a discard handle.
    pub fn path(&self) -> Option<&Path> {
        match &self.sink {
            Some(Sink::File { path, .. }) => Some(path),
            _ => None,
        }
    }
}

impl Write for ArtifactHandle<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.sink {
            Some(Sink::File { file, .. }) => file.write(buf),
            _ => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Some(Sink::File { file, .. }) => file.flush(),
            _ => Ok(()),
        }
    }
}

impl Drop for ArtifactHandle<'_> {
    fn drop(&mut self) {
        if let Some(Sink::File { file, path }) = self.sink.take() {
            drop(file);
            self.run.add_artifact(&self.name, ArtifactPath::Local(path));
        }
    }
}
