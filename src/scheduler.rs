//! Update scheduler (flush controller)
//!
//! Components never mutate state in place. Every state change is queued as a
//! pending update, and every delayed or deferred external result arrives as a
//! continuation task on a virtual clock. [`Scheduler::run_exclusive`] runs a unit of work and
//! then settles: it applies queued updates in batches (one re-render per
//! instance per batch) and runs continuations in due order, repeating until
//! nothing reachable from the work is left.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::component::{InstanceId, State};
use crate::error::{HarnessError, Result};
use crate::renderer::TreeRenderer;

/// State transition: receives the state folded so far, returns a partial state
pub type Transition = Box<dyn FnOnce(&State) -> State>;

struct PendingUpdate {
    instance: InstanceId,
    transition: Transition,
}

struct Task {
    due: Duration,
    seq: u64,
    label: String,
    run: Box<dyn FnOnce()>,
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Task {}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed: BinaryHeap is a max-heap, the earliest (due, seq) must pop first.
impl Ord for Task {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct Queues {
    updates: Vec<PendingUpdate>,
    tasks: BinaryHeap<Task>,
    clock: Duration,
    next_seq: u64,
    depth: usize,
    batches: u64,
}

/// Shared handle to the pending-update queue and continuation timeline
#[derive(Clone, Default)]
pub struct Scheduler {
    queues: Rc<RefCell<Queues>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enqueue(&self, instance: InstanceId, transition: Transition) {
        let mut queues = self.queues.borrow_mut();
        queues.updates.push(PendingUpdate {
            instance,
            transition,
        });
        trace!(%instance, queued = queues.updates.len(), "update enqueued");
    }

    /// Run `run` once the virtual clock reaches `now + delay`
    pub(crate) fn schedule(
        &self,
        delay: Duration,
        label: impl Into<String>,
        run: impl FnOnce() + 'static,
    ) {
        let mut queues = self.queues.borrow_mut();
        let due = queues.clock + delay;
        let seq = queues.next_seq;
        queues.next_seq += 1;
        let label = label.into();
        trace!(?due, seq, %label, "continuation scheduled");
        queues.tasks.push(Task {
            due,
            seq,
            label,
            run: Box::new(run),
        });
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.queues.borrow().clock
    }

    pub fn pending_updates(&self) -> usize {
        self.queues.borrow().updates.len()
    }

    /// Continuations whose result is available but which have not run yet
    pub fn ready_tasks(&self) -> usize {
        self.queues.borrow().tasks.len()
    }

    pub fn is_settled(&self) -> bool {
        let queues = self.queues.borrow();
        queues.updates.is_empty() && queues.tasks.is_empty()
    }

    /// Whether a `run_exclusive` call is currently executing
    pub fn in_exclusive(&self) -> bool {
        self.queues.borrow().depth > 0
    }

    /// Number of update batches applied so far
    pub fn batches(&self) -> u64 {
        self.queues.borrow().batches
    }

    /// Fail with `UnsettledUpdate` unless both queues are empty
    pub fn ensure_settled(&self) -> Result<()> {
        let queues = self.queues.borrow();
        if queues.updates.is_empty() && queues.tasks.is_empty() {
            return Ok(());
        }
        Err(HarnessError::UnsettledUpdate {
            updates: queues.updates.len(),
            tasks: queues.tasks.len(),
        })
    }

    /// Drop everything in flight without applying it. Returns `(updates, tasks)`.
    pub(crate) fn discard(&self) -> (usize, usize) {
        let (updates, tasks) = {
            let mut queues = self.queues.borrow_mut();
            (
                std::mem::take(&mut queues.updates),
                std::mem::take(&mut queues.tasks),
            )
        };
        // Closures may own contexts that point back here; drop them unborrowed.
        (updates.len(), tasks.len())
    }

    /// Run `work`, then settle every update causally reachable from it.
    ///
    /// Nested calls are allowed; each one settles on exit, so the outermost
    /// return implies everything queued by inner calls has been applied.
    pub fn run_exclusive<R>(
        &self,
        renderer: &RefCell<TreeRenderer>,
        max_rounds: usize,
        work: impl FnOnce() -> R,
    ) -> Result<R> {
        let depth = {
            let mut queues = self.queues.borrow_mut();
            queues.depth += 1;
            queues.depth
        };
        let queues = Rc::clone(&self.queues);
        let _depth_guard = scopeguard::guard((), move |_| {
            if let Ok(mut queues) = queues.try_borrow_mut() {
                queues.depth = queues.depth.saturating_sub(1);
            }
        });

        debug!(depth, "run_exclusive: enter");
        let out = work();
        self.settle(renderer, max_rounds)?;
        debug!(depth, clock = ?self.now(), "run_exclusive: settled");
        Ok(out)
    }

    /// Apply queued updates only. Continuations stay queued and the clock
    /// does not move.
    pub(crate) fn flush_updates(
        &self,
        renderer: &RefCell<TreeRenderer>,
        max_rounds: usize,
    ) -> Result<()> {
        for _ in 0..max_rounds {
            let batch = self.take_batch();
            if batch.is_empty() {
                return Ok(());
            }
            self.flush(renderer, batch);
        }
        Err(HarnessError::SettleLimit(max_rounds))
    }

    fn settle(&self, renderer: &RefCell<TreeRenderer>, max_rounds: usize) -> Result<()> {
        for _ in 0..max_rounds {
            let batch = self.take_batch();
            if !batch.is_empty() {
                self.flush(renderer, batch);
                continue;
            }
            match self.pop_task() {
                Some(task) => {
                    trace!(label = %task.label, due = ?task.due, "continuation running");
                    (task.run)();
                }
                None => return Ok(()),
            }
        }
        Err(HarnessError::SettleLimit(max_rounds))
    }

    fn take_batch(&self) -> Vec<PendingUpdate> {
        std::mem::take(&mut self.queues.borrow_mut().updates)
    }

    fn pop_task(&self) -> Option<Task> {
        let mut queues = self.queues.borrow_mut();
        let task = queues.tasks.pop()?;
        if task.due > queues.clock {
            queues.clock = task.due;
        }
        Some(task)
    }

    /// Coalesce per instance (first-enqueue order), then re-render each once
    fn flush(&self, renderer: &RefCell<TreeRenderer>, batch: Vec<PendingUpdate>) {
        let total = batch.len();
        let mut grouped: Vec<(InstanceId, Vec<Transition>)> = Vec::new();
        for update in batch {
            match grouped.iter_mut().find(|(id, _)| *id == update.instance) {
                Some((_, transitions)) => transitions.push(update.transition),
                None => grouped.push((update.instance, vec![update.transition])),
            }
        }

        debug!(updates = total, instances = grouped.len(), "flushing batch");
        for (instance, transitions) in grouped {
            renderer.borrow_mut().apply(instance, transitions);
        }
        self.queues.borrow_mut().batches += 1;
    }
}
