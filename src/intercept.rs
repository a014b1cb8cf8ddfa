//! Network interception layer
//!
//! External I/O functions are addressed by name. The [`InterceptTable`]
//! holds the real binding for each name plus at most one active fake
//! ([`MockHandle`]) that shadows it. Every call to an intercepted name is
//! logged before the fake runs.
//!
//! Results come back as a [`Reply`]: ready, delayed on the virtual clock, or
//! deferred until a test resolves it by hand. A ready result is handed to
//! the caller's continuation before the call returns. Delayed and deferred
//! results are the only suspension points: their continuations run later,
//! as scheduler tasks. Either way, whatever state a continuation changes is a
//! pending update like any other.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::error::{HarnessError, Result};
use crate::scheduler::Scheduler;

/// Arguments and results of external functions
pub type Json = serde_json::Value;

/// Failure delivered to a continuation instead of a value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    #[error("no binding for external function `{0}`")]
    Unbound(String),

    #[error("{0}")]
    Failed(String),
}

pub type Outcome = std::result::Result<Json, CallError>;

/// An external function implementation, real or fake
pub type ExternalFn = Rc<dyn Fn(&[Json]) -> Reply>;

type Continuation = Box<dyn FnOnce(Outcome)>;

/// What an external function returns
pub enum Reply {
    /// Available immediately; the continuation runs inside the call
    Ready(Outcome),
    /// Available once the virtual clock has advanced by the given duration
    Delayed(Duration, Outcome),
    /// Available when the paired [`Resolver`] is used
    Deferred(Deferred),
}

impl Reply {
    pub fn ok(value: Json) -> Self {
        Reply::Ready(Ok(value))
    }

    /// Resolve after simulated latency
    pub fn after(delay: Duration, value: Json) -> Self {
        Reply::Delayed(delay, Ok(value))
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Reply::Ready(Err(CallError::Failed(message.into())))
    }

    /// A reply the test settles itself through the returned [`Resolver`]
    pub fn deferred() -> (Self, Resolver) {
        let slot = Rc::new(RefCell::new(Slot::default()));
        (Reply::Deferred(Deferred(Rc::clone(&slot))), Resolver(slot))
    }

    pub(crate) fn deliver(self, scheduler: &Scheduler, label: String, then: Continuation) {
        match self {
            Reply::Ready(outcome) => {
                trace!(%label, "ready reply delivered inline");
                then(outcome)
            }
            Reply::Delayed(delay, outcome) => {
                scheduler.schedule(delay, label, move || then(outcome))
            }
            Reply::Deferred(deferred) => deferred.attach(scheduler.clone(), label, then),
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ready(outcome) => f.debug_tuple("Ready").field(outcome).finish(),
            Reply::Delayed(delay, outcome) => {
                f.debug_tuple("Delayed").field(delay).field(outcome).finish()
            }
            Reply::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

#[derive(Default)]
struct Slot {
    outcome: Option<Outcome>,
    waiter: Option<(Scheduler, String, Continuation)>,
    settled: bool,
}

/// Receiving half of [`Reply::deferred`]
pub struct Deferred(Rc<RefCell<Slot>>);

impl Deferred {
    fn attach(self, scheduler: Scheduler, label: String, then: Continuation) {
        let ready = self.0.borrow_mut().outcome.take();
        match ready {
            Some(outcome) => scheduler.schedule(Duration::ZERO, label, move || then(outcome)),
            None => self.0.borrow_mut().waiter = Some((scheduler, label, then)),
        }
    }
}

/// Settling half of [`Reply::deferred`]
///
/// Resolving schedules the waiting continuation at the current virtual time;
/// it runs when the next `act` settles.
#[derive(Clone)]
pub struct Resolver(Rc<RefCell<Slot>>);

impl Resolver {
    pub fn resolve(&self, value: Json) {
        self.settle(Ok(value));
    }

    pub fn reject(&self, message: impl Into<String>) {
        self.settle(Err(CallError::Failed(message.into())));
    }

    pub fn is_settled(&self) -> bool {
        self.0.borrow().settled
    }

    fn settle(&self, outcome: Outcome) {
        let waiter = {
            let mut slot = self.0.borrow_mut();
            if slot.settled {
                warn!("deferred reply settled twice; second outcome ignored");
                return;
            }
            slot.settled = true;
            match slot.waiter.take() {
                Some(waiter) => Some((waiter, outcome)),
                None => {
                    slot.outcome = Some(outcome);
                    None
                }
            }
        };
        if let Some(((scheduler, label, then), outcome)) = waiter {
            scheduler.schedule(Duration::ZERO, label, move || then(outcome));
        }
    }
}

struct Registration {
    name: String,
    fake: RefCell<ExternalFn>,
    log: RefCell<Vec<Vec<Json>>>,
    restored: Cell<bool>,
}

#[derive(Default)]
struct Table {
    bindings: HashMap<String, ExternalFn>,
    active: BTreeMap<String, Rc<Registration>>,
}

/// Per-harness table of external function bindings and active fakes
#[derive(Clone, Default)]
pub struct InterceptTable {
    table: Rc<RefCell<Table>>,
}

impl InterceptTable {
    /// Install the real implementation of `name`
    pub fn bind(&self, name: impl Into<String>, real: impl Fn(&[Json]) -> Reply + 'static) {
        let name = name.into();
        debug!(%name, "external bound");
        let real: ExternalFn = Rc::new(real);
        self.table.borrow_mut().bindings.insert(name, real);
    }

    /// Redirect calls of `name` to `fake` until the handle is restored
    pub fn intercept(
        &self,
        name: impl Into<String>,
        fake: impl Fn(&[Json]) -> Reply + 'static,
    ) -> Result<MockHandle> {
        let name = name.into();
        let mut table = self.table.borrow_mut();
        if table.active.contains_key(&name) {
            return Err(HarnessError::AlreadyIntercepted(name));
        }
        let fake: ExternalFn = Rc::new(fake);
        let registration = Rc::new(Registration {
            name: name.clone(),
            fake: RefCell::new(fake),
            log: RefCell::new(Vec::new()),
            restored: Cell::new(false),
        });
        table.active.insert(name.clone(), Rc::clone(&registration));
        debug!(%name, "intercept installed");
        Ok(MockHandle {
            registration,
            table: self.clone(),
        })
    }

    pub fn is_intercepted(&self, name: &str) -> bool {
        self.table.borrow().active.contains_key(name)
    }

    pub fn active_count(&self) -> usize {
        self.table.borrow().active.len()
    }

    /// Route one call: log it, then hand control to the fake or real binding
    pub(crate) fn invoke(&self, name: &str, args: &[Json]) -> Reply {
        let target = {
            let table = self.table.borrow();
            match table.active.get(name) {
                Some(registration) => {
                    registration.log.borrow_mut().push(args.to_vec());
                    trace!(%name, ?args, "intercepted call");
                    Some(registration.fake.borrow().clone())
                }
                None => table.bindings.get(name).cloned(),
            }
        };
        match target {
            Some(external) => external(args),
            None => {
                warn!(%name, "call to unbound external");
                Reply::Ready(Err(CallError::Unbound(name.to_string())))
            }
        }
    }

    /// Restore every active fake. Returns how many were still active.
    pub(crate) fn restore_all(&self) -> usize {
        let active = std::mem::take(&mut self.table.borrow_mut().active);
        for registration in active.values() {
            registration.restored.set(true);
            registration.log.borrow_mut().clear();
            debug!(name = %registration.name, "intercept restored by teardown");
        }
        active.len()
    }

    fn release(&self, registration: &Rc<Registration>) {
        let mut table = self.table.borrow_mut();
        let is_current = table
            .active
            .get(&registration.name)
            .is_some_and(|current| Rc::ptr_eq(current, registration));
        if is_current {
            table.active.remove(&registration.name);
        }
    }
}

/// Handle to one active interception
///
/// Every method except [`MockHandle::name`], [`MockHandle::is_restored`] and
/// [`MockHandle::restore`] fails with `MockRestored` once restored.
#[derive(Clone)]
pub struct MockHandle {
    registration: Rc<Registration>,
    table: InterceptTable,
}

impl MockHandle {
    pub fn name(&self) -> &str {
        &self.registration.name
    }

    pub fn is_restored(&self) -> bool {
        self.registration.restored.get()
    }

    /// Arguments of every call so far, in call order
    pub fn call_log(&self) -> Result<Vec<Vec<Json>>> {
        self.ensure_active()?;
        Ok(self.registration.log.borrow().clone())
    }

    pub fn call_count(&self) -> Result<usize> {
        self.ensure_active()?;
        Ok(self.registration.log.borrow().len())
    }

    pub fn last_call(&self) -> Result<Option<Vec<Json>>> {
        self.ensure_active()?;
        Ok(self.registration.log.borrow().last().cloned())
    }

    /// Swap the fake without losing the call log
    pub fn set_implementation(&self, fake: impl Fn(&[Json]) -> Reply + 'static) -> Result<()> {
        self.ensure_active()?;
        *self.registration.fake.borrow_mut() = Rc::new(fake);
        Ok(())
    }

    /// Put the real binding back and discard the call log. Idempotent.
    pub fn restore(&self) {
        if self.registration.restored.replace(true) {
            return;
        }
        self.table.release(&self.registration);
        self.registration.log.borrow_mut().clear();
        debug!(name = %self.registration.name, "intercept restored");
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_restored() {
            return Err(HarnessError::MockRestored(self.registration.name.clone()));
        }
        Ok(())
    }
}

impl fmt::Debug for MockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockHandle")
            .field("name", &self.registration.name)
            .field("restored", &self.is_restored())
            .finish_non_exhaustive()
    }
}
