//! Component descriptors and the per-instance context
//!
//! The harness does not implement a UI framework. A [`Component`] is the
//! seam where one plugs in: it produces initial state, may run a mount hook,
//! and renders `(props, state)` into a [`Node`] tree. Everything it does to
//! the outside world goes through its [`Context`]: state changes become
//! pending updates, external calls go through the interception table.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::intercept::{CallError, InterceptTable, Json};
use crate::scheduler::Scheduler;
use crate::tree::{Event, Handler, Node, Props, Value};

/// Component state: a sorted field map merged by partial updates
pub type State = Props;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Identity of one mounted component instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn next() -> Self {
        Self(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

/// A renderable component
pub trait Component {
    /// Name used in logs and `Debug` output
    fn name(&self) -> &str;

    /// State before the first render
    fn initial_state(&self, _props: &Props) -> State {
        State::new()
    }

    /// Runs once, right after the first render (`componentDidMount`).
    ///
    /// Updates made here, including those from ready replies, are applied
    /// before mounting returns. Delayed and deferred replies wait for `act`.
    fn mounted(&self, _props: &Props, _cx: &Context) {}

    /// Render `props` and `state` into a tree. Must not have side effects.
    fn render(&self, props: &Props, state: &State, cx: &Context) -> Node;
}

/// Component built from a render closure (function/hook style)
pub struct FnComponent<F> {
    name: String,
    initial: State,
    render: F,
}

impl<F> FnComponent<F>
where
    F: Fn(&Props, &State, &Context) -> Node,
{
    pub fn new(name: impl Into<String>, render: F) -> Self {
        Self {
            name: name.into(),
            initial: State::new(),
            render,
        }
    }

    /// Seed state, like a `useState` default
    pub fn with_state(mut self, initial: State) -> Self {
        self.initial = initial;
        self
    }
}

impl<F> Component for FnComponent<F>
where
    F: Fn(&Props, &State, &Context) -> Node,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn initial_state(&self, _props: &Props) -> State {
        self.initial.clone()
    }

    fn render(&self, props: &Props, state: &State, cx: &Context) -> Node {
        (self.render)(props, state, cx)
    }
}

/// What to mount: a component plus its initial properties
#[derive(Clone)]
pub struct Descriptor {
    component: Rc<dyn Component>,
    props: Props,
}

impl Descriptor {
    pub fn new(component: impl Component + 'static) -> Self {
        Self {
            component: Rc::new(component),
            props: Props::new(),
        }
    }

    /// Shorthand for a [`FnComponent`] descriptor
    pub fn from_fn(
        name: impl Into<String>,
        render: impl Fn(&Props, &State, &Context) -> Node + 'static,
    ) -> Self {
        Self::new(FnComponent::new(name, render))
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key, value);
        self
    }

    pub fn component(&self) -> &dyn Component {
        self.component.as_ref()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("component", &self.component.name())
            .field("props", &self.props)
            .finish()
    }
}

/// Handle a mounted instance uses to request updates and reach the outside
#[derive(Clone)]
pub struct Context {
    instance: InstanceId,
    scheduler: Scheduler,
    intercepts: InterceptTable,
}

impl Context {
    pub(crate) fn new(instance: InstanceId, scheduler: Scheduler, intercepts: InterceptTable) -> Self {
        Self {
            instance,
            scheduler,
            intercepts,
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Queue a partial state update (`setState({...})`)
    pub fn set_state(&self, partial: State) {
        self.scheduler
            .enqueue(self.instance, Box::new(move |_prev: &State| partial));
    }

    /// Queue a functional update computed from the state folded so far
    pub fn update(&self, transition: impl FnOnce(&State) -> State + 'static) {
        self.scheduler.enqueue(self.instance, Box::new(transition));
    }

    /// Wrap `f` as an event handler bound to this instance
    pub fn callback(&self, f: impl Fn(&Context, &Event) + 'static) -> Handler {
        let cx = self.clone();
        Handler::new(move |event| f(&cx, event))
    }

    /// Call the external function `name`.
    ///
    /// `then` receives the result. A ready reply runs it before this call
    /// returns; delayed and deferred replies run it later as a scheduler task.
    pub fn call(
        &self,
        name: &str,
        args: Vec<Json>,
        then: impl FnOnce(&Context, Result<Json, CallError>) + 'static,
    ) {
        let reply = self.intercepts.invoke(name, &args);
        let cx = self.clone();
        reply.deliver(
            &self.scheduler,
            format!("{name} -> {}", self.instance),
            Box::new(move |outcome| then(&cx, outcome)),
        );
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}
