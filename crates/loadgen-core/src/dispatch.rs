use std::future::Future;
use std::time::Instant;

use loadgen_common::{LoadgenError, Result};
use tokio::sync::mpsc;

use crate::outcome::{ErrorKind, Outcome};

/// Fire-all-then-join fan-out: every unit of work gets its own task, none are queued.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(concurrency: usize) -> Result<Self> {
        if concurrency < 1 {
            return Err(LoadgenError::InvalidConfig("concurrency must be >= 1".into()));
        }
        Ok(Self { concurrency })
    }

    pub fn concurrency(&self) -> usize { self.concurrency }

    /// Spawns `make_unit(i)` for every index and returns once all of them reported.
    ///
    /// Outcomes come back in completion order; `on_outcome` sees each one as it arrives.
    /// The result always holds exactly `concurrency` outcomes.
    pub async fn run<F, Fut, O>(&self, mut make_unit: F, mut on_outcome: O) -> Vec<Outcome>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Outcome> + Send + 'static,
        O: FnMut(&Outcome),
    {
        let n = self.concurrency;
        let started = Instant::now();
        let (tx, mut rx) = mpsc::channel::<Outcome>(n);
        let mut handles = Vec::with_capacity(n);
        for index in 0..n {
            let unit = make_unit(index);
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                let outcome = unit.await;
                let _ = tx.send(outcome).await;
            }));
        }
        drop(tx);
        tracing::info!(target: "dispatch", units = n, "dispatched");

        let mut outcomes = Vec::with_capacity(n);
        let mut reported = vec![false; n];
        while let Some(outcome) = rx.recv().await {
            if let Some(seen) = reported.get_mut(outcome.index) { *seen = true; }
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        // the channel only closes once every task is gone
        for (index, handle) in handles.into_iter().enumerate() {
            let joined = handle.await;
            if reported[index] { continue; }
            if let Err(err) = joined {
                tracing::error!(target: "dispatch", index, "unit of work did not report: {}", err);
            }
            let outcome = Outcome::failure(index, started.elapsed(), ErrorKind::TaskFailed);
            on_outcome(&outcome);
            outcomes.push(outcome);
        }
        tracing::info!(target: "dispatch", units = outcomes.len(), elapsed = started.elapsed().as_secs_f64(), "all units joined");
        outcomes
    }
}
