//! Coarse parallelism: independent whole runs (parameter sweeps, ensembles
//! of initial conditions) dispatched onto a bounded pool of worker threads.
//! Each run owns its integrator, state matrix, and scratch buffers
//! exclusively, so workers share nothing but the job queue.

use anyhow::{anyhow, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    pending: Mutex<usize>,
    all_done: Condvar,
}

/// A fixed-size pool of worker threads executing queued runs.
///
/// Within one run there is no suspension and no cancellation: a dispatched
/// run either finishes or aborts on its own. Dropping the pool closes the
/// queue and joins the workers.
pub struct RunPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    state: Arc<PoolState>,
}

impl RunPool {
    /// `workers = None` caps the pool at the available parallelism, which
    /// preserves the one-run-per-processor behavior of the original
    /// dispatcher without its busy-wait.
    pub fn new(workers: Option<usize>) -> Self {
        let count = workers
            .unwrap_or_else(|| {
                thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let state = Arc::new(PoolState {
            pending: Mutex::new(0),
            all_done: Condvar::new(),
        });

        let workers = (0..count)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    debug!(worker = id, "run pool worker started");
                    loop {
                        let job = receiver.lock().unwrap().recv();
                        let Ok(job) = job else { break };
                        if catch_unwind(AssertUnwindSafe(job)).is_err() {
                            warn!(worker = id, "dispatched run panicked");
                        }
                        let mut pending = state.pending.lock().unwrap();
                        *pending -= 1;
                        if *pending == 0 {
                            state.all_done.notify_all();
                        }
                    }
                    debug!(worker = id, "run pool worker stopped");
                })
            })
            .collect();

        Self {
            sender: Some(sender),
            workers,
            state,
        }
    }

    /// Queues one independent run. The returned handle yields the run's
    /// result; the pool keeps no copy.
    pub fn dispatch<F, T>(&self, run: F) -> RunHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        *self.state.pending.lock().unwrap() += 1;
        let job: Job = Box::new(move || {
            // The receiver may have been dropped; the run's work is done
            // either way.
            let _ = tx.send(run());
        });
        self.sender
            .as_ref()
            .expect("sender lives until drop")
            .send(job)
            .expect("workers live until drop");
        RunHandle { receiver: rx }
    }

    /// Blocks until every dispatched run has completed or `timeout`
    /// elapses. Returns `false` on timeout; in-flight runs continue
    /// regardless (best-effort waiting, not a deadline).
    pub fn wait(&self, timeout: Duration) -> bool {
        let pending = self.state.pending.lock().unwrap();
        let (_guard, result) = self
            .state
            .all_done
            .wait_timeout_while(pending, timeout, |pending| *pending > 0)
            .unwrap();
        !result.timed_out()
    }
}

impl Drop for RunPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// One dispatched run's pending result.
pub struct RunHandle<T> {
    receiver: Receiver<T>,
}

impl<T> RunHandle<T> {
    /// Blocks until the run produces its result. Errors if the run panicked
    /// before sending one.
    pub fn join(self) -> Result<T> {
        self.receiver
            .recv()
            .map_err(|_| anyhow!("Run finished without a result (worker panicked)."))
    }
}
