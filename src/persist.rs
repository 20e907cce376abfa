use crate::error::{ResultsError, ResultsResult};
use crate::results::{ResultsStore, ScoreRecord, StoredResult};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

struct PersistJob {
    generation: u64,
    record: ScoreRecord,
}

/// Result of one save, tagged with the session generation it belongs to.
#[derive(Debug)]
pub struct PersistOutcome {
    pub generation: u64,
    pub result: ResultsResult<StoredResult>,
}

/// Owns the results store on a background thread so a slow or failing write
/// never stalls the session loop.
///
/// Each completed session submits at most one job. Jobs are not retried.
pub struct PersistWorker {
    jobs: Option<Sender<PersistJob>>,
    outcomes: Receiver<PersistOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl PersistWorker {
    pub fn spawn<S: ResultsStore + Send + 'static>(mut store: S) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<PersistJob>();
        let (outcome_tx, outcome_rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            for job in job_rx {
                let result = store.save(&job.record);
                match &result {
                    Ok(stored) => debug!(id = stored.id, generation = job.generation, "result saved"),
                    Err(e) => warn!(error = %e, generation = job.generation, "result save failed"),
                }
                let outcome = PersistOutcome {
                    generation: job.generation,
                    result,
                };
                if outcome_tx.send(outcome).is_err() {
                    break;
                }
            }
        });

        Self {
            jobs: Some(job_tx),
            outcomes: outcome_rx,
            handle: Some(handle),
        }
    }

    pub fn submit(&self, generation: u64, record: ScoreRecord) -> ResultsResult<()> {
        let jobs = self.jobs.as_ref().ok_or(ResultsError::WorkerGone)?;
        jobs.send(PersistJob { generation, record })
            .map_err(|_| ResultsError::WorkerGone)
    }

    pub fn try_recv(&self) -> Option<PersistOutcome> {
        self.outcomes.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<PersistOutcome> {
        self.outcomes.recv_timeout(timeout).ok()
    }
}

impl Drop for PersistWorker {
    fn drop(&mut self) {
        // Closing the job channel lets the worker finish queued saves and exit.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for PersistWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistWorker")
            .field("running", &self.jobs.is_some())
            .finish()
    }
}
