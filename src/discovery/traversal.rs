//! Concurrent, deduplicated walk of the module reference graph
//!
//! # Design
//!
//! ```text
//!   seed ──► work queue (SegQueue) ──pop batch──► seen-set (DashSet) dedup
//!                 ▲                                      │ unseen paths
//!                 │ references, after the batch          ▼
//!                 │                        ┌─ worker ─ permit ─ read/hash/stat ─┐
//!            coordinator ◄── completion ───┼─ worker ─ permit ─ read/hash/stat ─┤
//!                 │          order         └─ worker ─ permit ─ read/hash/stat ─┘
//!                 ▼
//!          DiscoveryRun (Iterator) ◄── bounded channel
//! ```
//!
//! The coordinator waits for a whole batch before pushing the references it
//! found, so an empty queue after a batch means no more work will ever arrive.

use super::cancel::CancellationToken;
use super::error::{ModuleReadError, Result};
use super::gate::AdmissionGate;
use super::hasher::ContentHasher;
use super::module::ModuleDescriptor;
use super::reader::ModuleReader;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use crossbeam::queue::SegQueue;
use dashmap::DashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often a waiting consumer re-checks its cancellation token
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default bound on concurrent reads: available parallelism minus one, at least 1
pub fn default_concurrency() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// Tuning for a discovery run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Maximum module reads in flight, also the batch size
    pub max_concurrency: usize,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            max_concurrency: default_concurrency(),
        }
    }
}

/// Lifecycle of a discovery run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    /// Not started; nothing happens until the first `next()`
    Idle,
    /// Batches are being read
    Draining,
    /// Every reachable module has been emitted
    Completed,
    /// A module could not be read; the error was the last item
    Faulted,
    /// The cancellation token was observed
    Cancelled,
}

impl TraversalState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TraversalState::Completed | TraversalState::Faulted | TraversalState::Cancelled
        )
    }
}

/// Messages from the coordinator thread to the consumer
#[derive(Debug)]
enum Event {
    Module(ModuleDescriptor),
    /// Terminal: first read failure
    Failed(ModuleReadError),
    /// Terminal: Completed or Cancelled
    Finished(TraversalState),
}

/// How a batch ended
enum BatchOutcome {
    Continue,
    Faulted(ModuleReadError),
    Cancelled,
    /// Consumer went away
    Abandoned,
}

/// Discovers every module reachable from a seed module
///
/// # Example
/// ```no_run
/// use covscope::discovery::{ElfModuleReader, ModuleDiscovery, Sha256Hasher};
///
/// let discovery = ModuleDiscovery::new(ElfModuleReader::new(), Sha256Hasher);
/// for module in discovery.discover("/usr/bin/ls") {
///     let module = module?;
///     println!("{} {}", module.name(), module.digest());
/// }
/// # Ok::<(), covscope::discovery::ModuleReadError>(())
/// ```
#[derive(Clone)]
pub struct ModuleDiscovery {
    reader: Arc<dyn ModuleReader>,
    hasher: Arc<dyn ContentHasher>,
    options: DiscoveryOptions,
}

impl ModuleDiscovery {
    pub fn new<R, H>(reader: R, hasher: H) -> Self
    where
        R: ModuleReader + 'static,
        H: ContentHasher + 'static,
    {
        Self {
            reader: Arc::new(reader),
            hasher: Arc::new(hasher),
            options: DiscoveryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DiscoveryOptions) -> Self {
        self.options = DiscoveryOptions {
            max_concurrency: options.max_concurrency.max(1),
        };
        self
    }

    pub fn options(&self) -> DiscoveryOptions {
        self.options
    }

    /// Start a lazy traversal from `seed`
    pub fn discover(&self, seed: impl Into<PathBuf>) -> DiscoveryRun {
        self.discover_with_cancel(seed, CancellationToken::new())
    }

    /// Start a lazy traversal that stops when `cancel` is triggered
    pub fn discover_with_cancel(
        &self,
        seed: impl Into<PathBuf>,
        cancel: CancellationToken,
    ) -> DiscoveryRun {
        let stop = cancel.child_token();
        DiscoveryRun {
            discovery: self.clone(),
            seed: seed.into(),
            state: TraversalState::Idle,
            events: None,
            coordinator: None,
            cancel,
            stop,
        }
    }

    /// Read one module: parse it, hash it and capture its modification time
    fn read_module(&self, path: &Path) -> Result<ModuleDescriptor> {
        let image = self.reader.read(path)?;
        let digest = self.hasher.hash(path)?;
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| ModuleReadError::from_io(path, e))?;

        tracing::trace!("Discovered module {} ({})", path.display(), digest);

        Ok(ModuleDescriptor::new(
            path.to_path_buf(),
            digest,
            modified,
            image,
        ))
    }

    /// Coordinator loop, runs on its own thread
    fn coordinate(
        &self,
        seed: PathBuf,
        events: Sender<Event>,
        cancel: CancellationToken,
        stop: CancellationToken,
    ) {
        let max = self.options.max_concurrency;
        let queue = SegQueue::new();
        let seen = DashSet::new();
        let gate = AdmissionGate::new(max);
        let mut emitted = 0usize;

        queue.push(seed);

        let final_state = loop {
            if cancel.is_cancelled() {
                break TraversalState::Cancelled;
            }
            if stop.is_cancelled() {
                return;
            }

            let batch: Vec<PathBuf> = std::iter::from_fn(|| queue.pop())
                .take(max)
                .filter(|path: &PathBuf| {
                    let first = seen.insert(path.clone());
                    if !first {
                        tracing::trace!("Skipping already seen module {}", path.display());
                    }
                    first
                })
                .collect();

            if batch.is_empty() {
                if queue.is_empty() {
                    break TraversalState::Completed;
                }
                continue;
            }

            tracing::debug!("Dispatching batch of {} module reads", batch.len());

            match self.run_batch(batch, &queue, &gate, &events, &cancel, &stop, &mut emitted) {
                BatchOutcome::Continue => {}
                BatchOutcome::Faulted(err) => {
                    tracing::warn!("Module discovery aborted: {}", err);
                    let _ = events.send(Event::Failed(err));
                    return;
                }
                BatchOutcome::Cancelled => break TraversalState::Cancelled,
                BatchOutcome::Abandoned => return,
            }
        };

        match final_state {
            TraversalState::Completed => {
                tracing::info!("Module discovery completed: {} modules", emitted)
            }
            _ => tracing::info!("Module discovery cancelled after {} modules", emitted),
        }
        let _ = events.send(Event::Finished(final_state));
    }

    /// Read one batch concurrently and forward results in completion order
    #[allow(clippy::too_many_arguments)]
    fn run_batch(
        &self,
        batch: Vec<PathBuf>,
        queue: &SegQueue<PathBuf>,
        gate: &AdmissionGate,
        events: &Sender<Event>,
        cancel: &CancellationToken,
        stop: &CancellationToken,
        emitted: &mut usize,
    ) -> BatchOutcome {
        let (done_tx, done_rx) = channel::unbounded::<Result<ModuleDescriptor>>();
        let mut references = Vec::new();
        let mut outcome = BatchOutcome::Continue;

        thread::scope(|scope| {
            for path in batch {
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    let Some(_permit) = gate.acquire(stop) else {
                        return;
                    };
                    if stop.is_cancelled() {
                        return;
                    }
                    let _ = done_tx.send(self.read_module(&path));
                });
            }
            drop(done_tx);

            for result in done_rx.iter() {
                if !matches!(outcome, BatchOutcome::Continue) {
                    continue;
                }
                if cancel.is_cancelled() {
                    stop.cancel();
                    outcome = BatchOutcome::Cancelled;
                    continue;
                }

                match result {
                    Ok(module) => {
                        references.extend(module.references().iter().cloned());
                        if events.send(Event::Module(module)).is_err() {
                            stop.cancel();
                            outcome = BatchOutcome::Abandoned;
                        } else {
                            *emitted += 1;
                        }
                    }
                    Err(err) => {
                        stop.cancel();
                        outcome = BatchOutcome::Faulted(err);
                    }
                }
            }
        });

        if matches!(outcome, BatchOutcome::Continue) {
            if cancel.is_cancelled() {
                return BatchOutcome::Cancelled;
            }
            if stop.is_cancelled() {
                return BatchOutcome::Abandoned;
            }
            for reference in references {
                queue.push(reference);
            }
        }

        outcome
    }
}

/// A single traversal: an iterator over discovered modules
///
/// Yields each unique module path at most once, in completion order. A read
/// failure is yielded as the final item. Dropping the run cancels it.
pub struct DiscoveryRun {
    discovery: ModuleDiscovery,
    seed: PathBuf,
    state: TraversalState,
    events: Option<Receiver<Event>>,
    coordinator: Option<JoinHandle<()>>,
    /// Caller's token
    cancel: CancellationToken,
    /// Child of `cancel`, also raised on fault or drop
    stop: CancellationToken,
}

impl DiscoveryRun {
    pub fn state(&self) -> TraversalState {
        self.state
    }

    pub fn seed(&self) -> &Path {
        &self.seed
    }

    fn start(&mut self) {
        let (tx, rx) = channel::bounded(self.discovery.options.max_concurrency);
        let discovery = self.discovery.clone();
        let seed = self.seed.clone();
        let cancel = self.cancel.clone();
        let stop = self.stop.clone();

        let spawned = thread::Builder::new()
            .name("covscope-discovery".to_string())
            .spawn(move || discovery.coordinate(seed, tx, cancel, stop));

        match spawned {
            Ok(handle) => {
                self.coordinator = Some(handle);
                self.events = Some(rx);
                self.state = TraversalState::Draining;
            }
            Err(e) => {
                // Surface the spawn failure as a failed read of the seed
                let (tx, rx) = channel::bounded(1);
                let _ = tx.send(Event::Failed(ModuleReadError::Io {
                    path: self.seed.clone(),
                    source: e,
                }));
                self.events = Some(rx);
                self.state = TraversalState::Draining;
            }
        }
    }

    fn finish(&mut self, state: TraversalState) {
        self.state = state;
        self.stop.cancel();
        self.events = None;
        if let Some(handle) = self.coordinator.take() {
            let _ = handle.join();
        }
    }
}

impl Iterator for DiscoveryRun {
    type Item = Result<ModuleDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == TraversalState::Idle {
            self.start();
        }
        if self.state != TraversalState::Draining {
            return None;
        }

        loop {
            if self.cancel.is_cancelled() {
                self.finish(TraversalState::Cancelled);
                return None;
            }

            let received = self.events.as_ref()?.recv_timeout(CANCEL_POLL_INTERVAL);
            match received {
                Ok(Event::Module(module)) => return Some(Ok(module)),
                Ok(Event::Failed(err)) => {
                    self.finish(TraversalState::Faulted);
                    return Some(Err(err));
                }
                Ok(Event::Finished(state)) => {
                    self.finish(state);
                    return None;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("Module discovery coordinator exited unexpectedly");
                    self.finish(TraversalState::Faulted);
                    return None;
                }
            }
        }
    }
}

impl Drop for DiscoveryRun {
    fn drop(&mut self) {
        self.stop.cancel();
        self.events = None;
        if let Some(handle) = self.coordinator.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for DiscoveryRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryRun")
            .field("seed", &self.seed)
            .field("state", &self.state)
            .finish()
    }
}
