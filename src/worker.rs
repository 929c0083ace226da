//! Chunk workers: one thread, one private file handle, one job at a time.

use crate::aggregate::AggregatorEvent;
use crate::chunk::{finalize, ChunkJob, ChunkResult};
use crate::error::VerifyError;
use crossbeam_channel::{bounded, Receiver, Sender};
use indicatif::ProgressBar;
use log::debug;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::thread::{self, JoinHandle};

const READ_BUFFER_SIZE: usize = 1024 * 1024;

pub(crate) enum WorkerMessage {
    Job(ChunkJob),
    Shutdown,
}

/// Worker state before its thread starts. Holding one keeps its file open.
pub(crate) struct ChunkWorker {
    id: usize,
    file: File,
    jobs: Receiver<WorkerMessage>,
    results: Sender<AggregatorEvent>,
    progress: Option<ProgressBar>,
}

/// Dispatcher side of a running worker.
pub(crate) struct WorkerHandle {
    id: usize,
    jobs: Sender<WorkerMessage>,
    thread: JoinHandle<()>,
}

impl ChunkWorker {
    /// Open a dedicated read handle for worker `id`.
    ///
    /// The returned sender is a rendezvous channel: a send only completes
    /// once the worker is idle and takes the message.
    pub(crate) fn open(
        id: usize,
        path: &Path,
        results: Sender<AggregatorEvent>,
        progress: Option<ProgressBar>,
    ) -> Result<(Self, Sender<WorkerMessage>), VerifyError> {
        let file = File::open(path).map_err(|source| VerifyError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let (tx, rx) = bounded(0);
        Ok((
            Self {
                id,
                file,
                jobs: rx,
                results,
                progress,
            },
            tx,
        ))
    }

    pub(crate) fn spawn(self, jobs: Sender<WorkerMessage>) -> WorkerHandle {
        let id = self.id;
        let thread = thread::spawn(move || self.run());
        WorkerHandle { id, jobs, thread }
    }

    fn run(mut self) {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        while let Ok(message) = self.jobs.recv() {
            let job = match message {
                WorkerMessage::Job(job) => job,
                WorkerMessage::Shutdown => break,
            };
            debug!(
                "Worker {} hashing chunk {} ({} bytes at {})",
                self.id, job.index, job.length, job.offset
            );
            let (event, failed) = match self.hash_job(job, &mut buf) {
                Ok(result) => (AggregatorEvent::Chunk(result), false),
                Err(e) => (AggregatorEvent::Failed(e), true),
            };
            if self.results.send(event).is_err() || failed {
                break;
            }
        }
        debug!("Worker {} exiting", self.id);
    }

    fn hash_job(&mut self, job: ChunkJob, buf: &mut [u8]) -> Result<ChunkResult, VerifyError> {
        self.file.seek(SeekFrom::Start(job.offset))?;
        let mut hasher = Md5::new();
        let mut remaining = job.length;
        while remaining > 0 {
            let want = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
            let n = match self.file.read(&mut buf[..want]) {
                Ok(0) => {
                    return Err(VerifyError::ShortRead {
                        index: job.index,
                        expected: job.length,
                        actual: job.length - remaining,
                    })
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            hasher.update(&buf[..n]);
            remaining -= n as u64;
            if let Some(pb) = self.progress.as_ref() {
                pb.inc(n as u64);
            }
        }
        Ok(ChunkResult {
            index: job.index,
            digest: finalize(hasher),
        })
    }
}

impl WorkerHandle {
    /// Hand over a job, blocking while the worker is busy. Returns false if
    /// the worker has already stopped.
    pub(crate) fn submit(&self, job: ChunkJob) -> bool {
        self.jobs.send(WorkerMessage::Job(job)).is_ok()
    }

    /// Wait for the in-flight job, stop the worker and join its thread.
    pub(crate) fn shutdown(self) -> Result<(), VerifyError> {
        let WorkerHandle { id, jobs, thread } = self;
        // A worker that already stopped has dropped its receiver.
        let _ = jobs.send(WorkerMessage::Shutdown);
        drop(jobs);
        thread
            .join()
            .map_err(|_| VerifyError::ThreadPanicked(format!("worker {id}")))
    }
}
