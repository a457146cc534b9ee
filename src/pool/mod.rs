//! Parallel walk generation.
//!
//! [`WalkPool`] runs one task per selected entity on a rayon thread pool.
//! Tasks send `(entity, walks)` over a bounded channel to a single writer
//! thread, the only code that touches the [`WalkWriter`]. A failing task is
//! logged and counted; a failing sink stops the run.

pub mod writer;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::error::{ConfigError, OutputError, SamplerError, WalkResult};
use crate::select::EntitySet;
use crate::walk::{WalkGenerator, entity_rng};

pub use writer::{WalkSink, WalkWriter, read_walk_file};

/// Optional caps on how much work is dispatched.
///
/// Limits are checked before a task starts; a running task is never
/// interrupted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchLimits {
    /// Stop dispatching after this many entities.
    pub max_tasks: Option<usize>,
    /// Stop dispatching once this much time has elapsed.
    pub time_limit: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Worker threads (at least 1).
    pub threads: usize,
    /// Bound of the worker → writer channel, in entities.
    pub channel_capacity: usize,
    /// Base seed for per-entity RNGs; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub limits: DispatchLimits,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            channel_capacity: 1024,
            seed: None,
            limits: DispatchLimits::default(),
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Entities handed to the pool.
    pub selected: usize,
    /// Tasks that completed, including those that produced no walks.
    pub processed: usize,
    /// Tasks that returned an error or panicked.
    pub failed: usize,
    /// Entities never dispatched because of a limit or an aborted run.
    pub skipped: usize,
    /// Entities that got fewer walks than requested.
    pub under_filled: usize,
    pub walks_written: u64,
    pub elapsed: Duration,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} entities selected, {} processed, {} failed, {} skipped, {} under-filled; \
             {} walks written in {:.2?}",
            self.selected,
            self.processed,
            self.failed,
            self.skipped,
            self.under_filled,
            self.walks_written,
            self.elapsed
        )
    }
}

/// Fixed-size worker pool feeding a single walk writer.
#[derive(Debug, Clone)]
pub struct WalkPool {
    config: PoolConfig,
}

#[derive(Default)]
struct Counters {
    dispatched: AtomicUsize,
    processed: AtomicUsize,
    failed: AtomicUsize,
    under_filled: AtomicUsize,
}

impl WalkPool {
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Generate walks for every entity and write them through `writer`.
    ///
    /// The writer is closed when all tasks have finished. On a sink error
    /// no further tasks are dispatched and the error is returned once the
    /// pool has drained.
    pub fn run<G: WalkGenerator>(
        &self,
        generator: &G,
        entities: &EntitySet,
        writer: WalkWriter,
    ) -> WalkResult<RunSummary> {
        if self.config.threads == 0 {
            return Err(ConfigError::Invalid {
                message: "threads must be >= 1".into(),
            }
            .into());
        }
        if self.config.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                message: "channel_capacity must be >= 1".into(),
            }
            .into());
        }
        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .thread_name(|i| format!("walk-worker-{i}"))
            .build()
            .map_err(|e| ConfigError::Invalid {
                message: format!("cannot start worker threads: {e}"),
            })?;

        let started = Instant::now();
        let selected = entities.len();
        let requested = generator.requested_walks();
        let abort = AtomicBool::new(false);
        let counters = Counters::default();
        let (tx, rx) = mpsc::sync_channel::<(Arc<str>, Vec<String>)>(self.config.channel_capacity);

        tracing::info!(
            entities = selected,
            threads = self.config.threads,
            "starting walk generation"
        );

        let write_outcome = std::thread::scope(|scope| {
            let writer = &writer;
            let abort = &abort;
            let handle = std::thread::Builder::new()
                .name("walk-writer".into())
                .spawn_scoped(scope, move || -> Result<(), OutputError> {
                    let progress_every = (selected / 10).max(1);
                    let mut received = 0usize;
                    for (entity, walks) in rx {
                        received += 1;
                        let checkpoint = received % progress_every == 0;
                        let written = writer
                            .write_entity(&entity, &walks)
                            .and_then(|()| if checkpoint { writer.flush() } else { Ok(()) });
                        if let Err(e) = written {
                            abort.store(true, Ordering::SeqCst);
                            tracing::error!(entity = %entity, error = %e, "walk output failed, stopping");
                            return Err(e);
                        }
                        if checkpoint {
                            tracing::info!(
                                done = received,
                                total = selected,
                                walks = writer.lines_written(),
                                "progress"
                            );
                        }
                    }
                    Ok(())
                });
            let handle = match handle {
                Ok(handle) => handle,
                Err(e) => return Err(OutputError::Write { source: e }),
            };

            workers.install(|| {
                entities.par_iter().for_each_with(tx, |tx, entity| {
                    if !self.may_dispatch(abort, &counters, started) {
                        return;
                    }
                    let Some(walks) = self.run_task(generator, entity) else {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        return;
                    };
                    counters.processed.fetch_add(1, Ordering::Relaxed);
                    if walks.len() < requested {
                        counters.under_filled.fetch_add(1, Ordering::Relaxed);
                    }
                    if tx.send((Arc::clone(entity), walks)).is_err() {
                        abort.store(true, Ordering::SeqCst);
                    }
                });
            });

            handle.join().map_err(|_| OutputError::WriterPanicked)?
        });

        if let Err(e) = write_outcome {
            if let Err(close_err) = writer.close() {
                tracing::debug!(error = %close_err, "closing walk writer after failure");
            }
            return Err(e.into());
        }
        writer.close()?;

        let processed = counters.processed.into_inner();
        let failed = counters.failed.into_inner();
        let summary = RunSummary {
            selected,
            processed,
            failed,
            skipped: selected - processed - failed,
            under_filled: counters.under_filled.into_inner(),
            walks_written: writer.lines_written(),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            processed = summary.processed,
            failed = summary.failed,
            skipped = summary.skipped,
            under_filled = summary.under_filled,
            walks = summary.walks_written,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "walk generation finished"
        );
        Ok(summary)
    }

    fn may_dispatch(&self, abort: &AtomicBool, counters: &Counters, started: Instant) -> bool {
        if abort.load(Ordering::SeqCst) {
            return false;
        }
        let limits = &self.config.limits;
        if limits.time_limit.is_some_and(|limit| started.elapsed() >= limit) {
            return false;
        }
        let n = counters.dispatched.fetch_add(1, Ordering::SeqCst);
        limits.max_tasks.is_none_or(|max| n < max)
    }

    /// Run one entity's task, containing errors and panics.
    fn run_task<G: WalkGenerator>(&self, generator: &G, entity: &Arc<str>) -> Option<Vec<String>> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut rng = entity_rng(self.config.seed, entity);
            generator.walks_for(entity, &mut rng)
        }));
        let error = match outcome {
            Ok(Ok(walks)) => return Some(walks),
            Ok(Err(e)) => e,
            Err(payload) => SamplerError::TaskFailed {
                entity: entity.to_string(),
                message: panic_message(payload.as_ref()),
            },
        };
        tracing::warn!(entity = %entity, error = %error, "walk task failed");
        None
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
