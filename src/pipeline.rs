//! Update Pipeline
//!
//! A single background worker drains one FIFO of task blocks. Each block is
//! the ordered task list of one logical operation on one layer (e.g. "set
//! data" = replace, sort, rebuild, publish, invalidate, notify), so blocks for
//! the same layer never interleave. The worker is the only writer of a
//! layer's model and buffers; it hands results to the render side by
//! publishing an immutable [`HeatmapSnapshot`].

use crate::buffers::{BufferBuilder, HeatmapBuffers};
use crate::data_types::{
    BucketCoord, Divisions, HeatmapConfig, RawGrid, SortedBuckets, ValueFilter, VisibilityMask,
};
use crate::error::{HeatmapError, Result};
use crate::gradient::ColorGradient;
use crate::model::{HeatmapData, HeatmapModel};
use crate::normalizer::BoundaryProvider;
use crate::snapshot::{HeatmapSnapshot, SnapshotCell};
use eyre::WrapErr;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

/// Downstream notifications for one layer.
pub trait LayerObserver: Send + Sync {
    /// A new snapshot was published; the render surface should redraw.
    fn invalidate(&self, layer: LayerId, generation: u64);

    /// The value-axis display range may have changed after a data replacement.
    fn display_range_changed(&self, layer: LayerId, range: (f64, f64));
}

/// Edit run on the worker against the layer's model.
pub type ModelEdit = Arc<dyn Fn(&mut HeatmapModel) -> eyre::Result<()> + Send + Sync>;

#[derive(Clone)]
pub enum Task {
    ReplaceData(HeatmapData),
    Presort,
    ApplyMask(Option<VisibilityMask>),
    ApplyFilter(Option<ValueFilter>),
    ApplyFilterNormalized(f64, f64),
    Edit(ModelEdit),
    RebuildBuffers,
    /// Raw buffers bake the filter in; sorted buffers only move the draw range.
    RebuildIfUnsorted,
    Publish,
    Invalidate,
    NotifyDisplayRange,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReplaceData(d) => write!(f, "ReplaceData({:?})", d.divisions()),
            Self::Presort => write!(f, "Presort"),
            Self::ApplyMask(m) => write!(f, "ApplyMask(set: {})", m.is_some()),
            Self::ApplyFilter(r) => write!(f, "ApplyFilter({r:?})"),
            Self::ApplyFilterNormalized(lo, hi) => write!(f, "ApplyFilterNormalized({lo}, {hi})"),
            Self::Edit(_) => write!(f, "Edit"),
            Self::RebuildBuffers => write!(f, "RebuildBuffers"),
            Self::RebuildIfUnsorted => write!(f, "RebuildIfUnsorted"),
            Self::Publish => write!(f, "Publish"),
            Self::Invalidate => write!(f, "Invalidate"),
            Self::NotifyDisplayRange => write!(f, "NotifyDisplayRange"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    SetData,
    Mask,
    Filter,
    Edit,
    /// No tasks; completes once everything queued before it has run.
    Barrier,
}

/// Ordered tasks of one logical operation.
#[derive(Clone, Debug)]
pub struct TaskBlock {
    pub kind: BlockKind,
    pub tasks: Vec<Task>,
}

impl TaskBlock {
    pub fn set_data(data: HeatmapData, presort: bool) -> Self {
        let mut tasks = vec![Task::ReplaceData(data)];
        if presort {
            tasks.push(Task::Presort);
        }
        tasks.extend([
            Task::RebuildBuffers,
            Task::Publish,
            Task::Invalidate,
            Task::NotifyDisplayRange,
        ]);
        Self {
            kind: BlockKind::SetData,
            tasks,
        }
    }

    pub fn mask(mask: Option<VisibilityMask>) -> Self {
        Self {
            kind: BlockKind::Mask,
            tasks: vec![
                Task::ApplyMask(mask),
                Task::RebuildBuffers,
                Task::Publish,
                Task::Invalidate,
            ],
        }
    }

    pub fn filter(filter: Option<ValueFilter>) -> Self {
        Self::filter_task(Task::ApplyFilter(filter))
    }

    pub fn filter_normalized(lo_norm: f64, hi_norm: f64) -> Self {
        Self::filter_task(Task::ApplyFilterNormalized(lo_norm, hi_norm))
    }

    fn filter_task(apply: Task) -> Self {
        Self {
            kind: BlockKind::Filter,
            tasks: vec![
                apply,
                Task::RebuildIfUnsorted,
                Task::Publish,
                Task::Invalidate,
            ],
        }
    }

    pub fn edit(edit: ModelEdit) -> Self {
        Self {
            kind: BlockKind::Edit,
            tasks: vec![
                Task::Edit(edit),
                Task::RebuildBuffers,
                Task::Publish,
                Task::Invalidate,
                Task::NotifyDisplayRange,
            ],
        }
    }

    pub fn barrier() -> Self {
        Self {
            kind: BlockKind::Barrier,
            tasks: vec![],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    /// All tasks ran. Carries the last generation the block published, if any.
    Completed { generation: Option<u64> },
    /// Dropped before it started because a newer "set data" block replaced it.
    Superseded,
}

#[derive(Default)]
struct TicketState {
    result: Mutex<Option<Result<BlockOutcome>>>,
    done: Condvar,
}

impl TicketState {
    fn complete(&self, result: Result<BlockOutcome>) {
        *self.result.lock() = Some(result);
        self.done.notify_all();
    }
}

/// Completion handle for one submitted block.
#[derive(Clone)]
pub struct BlockTicket {
    state: Arc<TicketState>,
}

impl BlockTicket {
    fn new() -> Self {
        Self {
            state: Arc::new(TicketState::default()),
        }
    }

    /// Blocks until the block finished, was superseded, or failed.
    pub fn wait(&self) -> Result<BlockOutcome> {
        let mut guard = self.state.result.lock();
        loop {
            if let Some(result) = guard.as_ref() {
                return result.clone();
            }
            self.state.done.wait(&mut guard);
        }
    }

    /// `None` if the block has not finished within `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<BlockOutcome>> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.state.result.lock();
        while guard.is_none() {
            if self.state.done.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        guard.clone()
    }

    pub fn is_done(&self) -> bool {
        self.state.result.lock().is_some()
    }
}

impl fmt::Debug for BlockTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockTicket")
            .field("done", &self.is_done())
            .finish()
    }
}

/// Collaborators a layer's buffer builds and notifications depend on.
#[derive(Clone, Default)]
pub struct LayerCollaborators {
    pub gradient: Option<Arc<dyn ColorGradient>>,
    /// Falls back to the model's spatial bindings.
    pub boundaries: Option<Arc<dyn BoundaryProvider>>,
    pub observer: Option<Arc<dyn LayerObserver>>,
}

/// Worker-owned mutable state of a layer.
struct LayerWork {
    model: HeatmapModel,
    buffers: Option<Arc<HeatmapBuffers>>,
    last_generation: Option<u64>,
}

struct LayerSlot {
    id: LayerId,
    config: Arc<HeatmapConfig>,
    collaborators: LayerCollaborators,
    cell: SnapshotCell,
    work: Mutex<LayerWork>,
    failure: Mutex<Option<HeatmapError>>,
}

impl LayerSlot {
    fn run_block(&self, block: &TaskBlock) -> eyre::Result<Option<u64>> {
        let mut work = self.work.lock();
        let mut published = None;
        for task in &block.tasks {
            self.run_task(&mut work, task, &mut published)
                .wrap_err_with(|| format!("task {task:?} of {:?} block", block.kind))?;
        }
        Ok(published)
    }

    fn run_task(
        &self,
        work: &mut LayerWork,
        task: &Task,
        published: &mut Option<u64>,
    ) -> eyre::Result<()> {
        match task {
            Task::ReplaceData(data) => {
                work.model.set_data(data.clone());
                work.buffers = None;
            }
            Task::Presort => work.model.presort(),
            Task::ApplyMask(mask) => work.model.set_mask(mask.clone()),
            Task::ApplyFilter(filter) => work.model.set_value_filter(*filter),
            Task::ApplyFilterNormalized(lo, hi) => work.model.set_value_filter_normalized(*lo, *hi),
            Task::Edit(edit) => edit(&mut work.model)?,
            Task::RebuildBuffers => self.rebuild(work),
            Task::RebuildIfUnsorted => {
                if !work.model.is_sorted() {
                    self.rebuild(work);
                }
            }
            Task::Publish => {
                let generation = self.cell.publish(HeatmapSnapshot {
                    generation: 0,
                    model: work.model.clone(),
                    config: self.config.clone(),
                    buffers: work.buffers.clone(),
                });
                work.last_generation = Some(generation);
                *published = Some(generation);
            }
            Task::Invalidate => {
                if let (Some(observer), Some(generation)) =
                    (&self.collaborators.observer, work.last_generation)
                {
                    observer.invalidate(self.id, generation);
                }
            }
            Task::NotifyDisplayRange => {
                if let Some(observer) = &self.collaborators.observer {
                    observer.display_range_changed(self.id, work.model.display_range());
                }
            }
        }
        Ok(())
    }

    fn rebuild(&self, work: &mut LayerWork) {
        let boundaries: &dyn BoundaryProvider = match &self.collaborators.boundaries {
            Some(b) => b.as_ref(),
            None => work.model.spatial(),
        };
        let builder = BufferBuilder::new(
            &self.config,
            self.collaborators.gradient.as_deref(),
            boundaries,
        );
        work.buffers = builder.build(&work.model).map(Arc::new);
    }
}

struct Queued {
    slot: Arc<LayerSlot>,
    block: TaskBlock,
    ticket: BlockTicket,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Queued>,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<QueueState>,
    ready: Condvar,
    next_layer: AtomicU64,
}

impl Shared {
    fn submit(&self, slot: &Arc<LayerSlot>, block: TaskBlock) -> Result<BlockTicket> {
        if slot.failure.lock().is_some() {
            return Err(HeatmapError::PipelineFailed { layer: slot.id });
        }
        let ticket = BlockTicket::new();
        let mut queue = self.queue.lock();
        if queue.closed {
            return Err(HeatmapError::PipelineClosed);
        }

        if block.kind == BlockKind::SetData {
            // Last writer wins: a pending data replacement for this layer is moot.
            let mut kept = VecDeque::with_capacity(queue.pending.len());
            for queued in queue.pending.drain(..) {
                if queued.slot.id == slot.id && queued.block.kind == BlockKind::SetData {
                    warn!(layer = ?slot.id, "pending set-data block superseded");
                    queued.ticket.state.complete(Ok(BlockOutcome::Superseded));
                } else {
                    kept.push_back(queued);
                }
            }
            queue.pending = kept;
        }

        queue.pending.push_back(Queued {
            slot: slot.clone(),
            block,
            ticket: ticket.clone(),
        });
        drop(queue);
        self.ready.notify_one();
        Ok(ticket)
    }

    fn next_job(&self) -> Option<Queued> {
        let mut queue = self.queue.lock();
        loop {
            if let Some(job) = queue.pending.pop_front() {
                return Some(job);
            }
            if queue.closed {
                return None;
            }
            self.ready.wait(&mut queue);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

fn worker_loop(shared: Arc<Shared>) {
    info!("heatmap pipeline worker started");
    while let Some(job) = shared.next_job() {
        let Queued {
            slot,
            block,
            ticket,
        } = job;

        if slot.failure.lock().is_some() {
            ticket
                .state
                .complete(Err(HeatmapError::PipelineFailed { layer: slot.id }));
            continue;
        }

        let start = Instant::now();
        let result = match catch_unwind(AssertUnwindSafe(|| slot.run_block(&block))) {
            Ok(Ok(generation)) => Ok(BlockOutcome::Completed { generation }),
            Ok(Err(report)) => Err(format!("{report:#}")),
            Err(payload) => Err(panic_message(payload.as_ref())),
        };

        match result {
            Ok(outcome) => {
                debug!(
                    layer = ?slot.id,
                    kind = ?block.kind,
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "task block completed"
                );
                ticket.state.complete(Ok(outcome));
            }
            Err(message) => {
                warn!(layer = ?slot.id, kind = ?block.kind, %message, "task block failed");
                let err = HeatmapError::TaskFailed {
                    layer: slot.id,
                    message,
                };
                *slot.failure.lock() = Some(err.clone());
                ticket.state.complete(Err(err));
            }
        }
    }
    info!("heatmap pipeline worker stopped");
}

/// Owns the background worker. Dropping it drains the queue and joins the worker.
pub struct UpdatePipeline {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl UpdatePipeline {
    pub fn new() -> eyre::Result<Self> {
        let shared = Arc::new(Shared::default());
        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("heatmap-pipeline".into())
            .spawn(move || worker_loop(worker_shared))
            .wrap_err("failed to spawn heatmap pipeline worker")?;
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Registers a layer whose model follows `config`.
    pub fn create_layer(
        &self,
        config: HeatmapConfig,
        model: HeatmapModel,
        collaborators: LayerCollaborators,
    ) -> LayerHandle {
        let id = LayerId(self.shared.next_layer.fetch_add(1, Ordering::Relaxed));
        let config = Arc::new(config);
        let slot = Arc::new(LayerSlot {
            id,
            config: config.clone(),
            collaborators,
            cell: SnapshotCell::new(HeatmapSnapshot::empty(model.clone(), config)),
            work: Mutex::new(LayerWork {
                model,
                buffers: None,
                last_generation: None,
            }),
            failure: Mutex::new(None),
        });
        debug!(layer = ?id, "heatmap layer created");
        LayerHandle {
            slot,
            shared: self.shared.clone(),
        }
    }

    /// Stops accepting work, runs what is queued, and joins the worker.
    pub fn shutdown(&mut self) {
        self.shared.queue.lock().closed = true;
        self.shared.ready.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("heatmap pipeline worker panicked");
            }
        }
    }
}

impl Drop for UpdatePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Controlling-thread handle to one heatmap layer.
#[derive(Clone)]
pub struct LayerHandle {
    slot: Arc<LayerSlot>,
    shared: Arc<Shared>,
}

impl LayerHandle {
    pub fn id(&self) -> LayerId {
        self.slot.id
    }

    pub fn config(&self) -> &HeatmapConfig {
        &self.slot.config
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<HeatmapSnapshot> {
        self.slot.cell.load()
    }

    /// The error that stopped this layer's pipeline, if any.
    pub fn failure(&self) -> Option<HeatmapError> {
        self.slot.failure.lock().clone()
    }

    pub fn submit(&self, block: TaskBlock) -> Result<BlockTicket> {
        self.shared.submit(&self.slot, block)
    }

    /// Replaces the data. Raw data is presorted when the config asks for it.
    pub fn set_data(&self, data: impl Into<HeatmapData>) -> Result<BlockTicket> {
        let data = data.into();
        let presort = self.slot.config.presort && matches!(data, HeatmapData::Raw(_));
        self.submit(TaskBlock::set_data(data, presort))
    }

    pub fn set_raw_data(&self, grid: RawGrid) -> Result<BlockTicket> {
        self.set_data(grid)
    }

    /// Validates on the calling thread; invalid input is rejected before
    /// anything is queued and the displayed data is unchanged.
    pub fn set_sorted_data(
        &self,
        divisions: Divisions,
        coords: Vec<BucketCoord>,
        values: Vec<f64>,
    ) -> Result<BlockTicket> {
        let sorted = SortedBuckets::new(divisions, coords, values)?;
        self.set_data(sorted)
    }

    pub fn set_mask(&self, mask: Option<VisibilityMask>) -> Result<BlockTicket> {
        self.submit(TaskBlock::mask(mask))
    }

    pub fn set_value_filter(&self, filter: Option<ValueFilter>) -> Result<BlockTicket> {
        self.submit(TaskBlock::filter(filter))
    }

    pub fn set_value_filter_normalized(&self, lo_norm: f64, hi_norm: f64) -> Result<BlockTicket> {
        self.submit(TaskBlock::filter_normalized(lo_norm, hi_norm))
    }

    pub fn edit(
        &self,
        edit: impl Fn(&mut HeatmapModel) -> eyre::Result<()> + Send + Sync + 'static,
    ) -> Result<BlockTicket> {
        self.submit(TaskBlock::edit(Arc::new(edit)))
    }

    /// Waits until every block queued so far for any layer has run.
    pub fn flush(&self) -> Result<()> {
        self.submit(TaskBlock::barrier())?.wait().map(|_| ())
    }
}

impl fmt::Debug for LayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerHandle")
            .field("id", &self.slot.id)
            .finish()
    }
}
