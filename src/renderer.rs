//! Tree renderer adapter
//!
//! Owns mounted instances keyed by mount target. Rendering itself is the
//! component's business; this adapter only drives it: first render on mount,
//! one re-render per applied batch, and an immutable [`RenderedTree`] per
//! render.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::component::{Context, Descriptor, InstanceId, State};
use crate::error::{HarnessError, Result};
use crate::scheduler::Transition;
use crate::tree::RenderedTree;

static NEXT_TARGET: AtomicU64 = AtomicU64::new(1);

/// Identity of a mount target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    #[cfg(test)]
    pub(crate) fn new_for_test(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// Isolated, test-scoped container a component is mounted into
///
/// Ids come from a process-wide counter, so tests running in parallel never
/// share a target.
#[derive(Debug)]
pub struct MountTarget {
    id: TargetId,
    detached: bool,
}

impl MountTarget {
    pub fn allocate() -> Self {
        let id = TargetId(NEXT_TARGET.fetch_add(1, Ordering::Relaxed));
        debug!(%id, "mount target allocated");
        Self {
            id,
            detached: false,
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub(crate) fn detach(&mut self) {
        if !self.detached {
            debug!(id = %self.id, "mount target detached");
        }
        self.detached = true;
    }
}

struct Instance {
    id: InstanceId,
    descriptor: Descriptor,
    context: Context,
    state: State,
    tree: RenderedTree,
    renders: u64,
}

/// Mounts components and keeps the latest settled tree for each target
#[derive(Default)]
pub struct TreeRenderer {
    instances: BTreeMap<TargetId, Instance>,
}

impl TreeRenderer {
    /// Mount `descriptor` into `target` and perform the first render.
    ///
    /// A component already mounted on `target` is replaced.
    pub fn mount(
        &mut self,
        descriptor: Descriptor,
        target: &MountTarget,
        context: Context,
    ) -> Result<RenderedTree> {
        if target.is_detached() {
            return Err(HarnessError::TargetDetached(target.id()));
        }
        if let Some(previous) = self.instances.remove(&target.id()) {
            debug!(target = %target.id(), instance = %previous.id, "replacing mounted component");
        }

        let component = descriptor.component();
        let state = component.initial_state(descriptor.props());
        let root = component.render(descriptor.props(), &state, &context);
        let tree = RenderedTree::new(root, target.id(), 1);
        debug!(
            target = %target.id(),
            instance = %context.instance(),
            component = component.name(),
            "mounted"
        );

        self.instances.insert(
            target.id(),
            Instance {
                id: context.instance(),
                descriptor,
                context,
                state,
                tree: tree.clone(),
                renders: 1,
            },
        );
        Ok(tree)
    }

    /// Remove whatever is mounted on `target`. Returns whether anything was.
    pub fn unmount(&mut self, target: TargetId) -> bool {
        match self.instances.remove(&target) {
            Some(instance) => {
                debug!(%target, instance = %instance.id, "unmounted");
                true
            }
            None => false,
        }
    }

    pub fn is_mounted(&self, target: TargetId) -> bool {
        self.instances.contains_key(&target)
    }

    /// Latest tree rendered into `target`
    pub fn current_tree(&self, target: TargetId) -> Result<RenderedTree> {
        self.instances
            .get(&target)
            .map(|instance| instance.tree.clone())
            .ok_or(HarnessError::NotMounted(target))
    }

    /// How many times the instance on `target` has rendered
    pub fn render_count(&self, target: TargetId) -> Result<u64> {
        self.instances
            .get(&target)
            .map(|instance| instance.renders)
            .ok_or(HarnessError::NotMounted(target))
    }

    /// Current state of the instance on `target`
    pub fn state(&self, target: TargetId) -> Result<State> {
        self.instances
            .get(&target)
            .map(|instance| instance.state.clone())
            .ok_or(HarnessError::NotMounted(target))
    }

    /// Fold `transitions` into the instance's state and re-render once.
    ///
    /// Returns `false` (and drops the transitions) if the instance is no
    /// longer mounted.
    pub(crate) fn apply(&mut self, instance: InstanceId, transitions: Vec<Transition>) -> bool {
        let Some(mounted) = self.instances.values_mut().find(|m| m.id == instance) else {
            warn!(
                %instance,
                dropped = transitions.len(),
                "update for an unmounted instance ignored"
            );
            return false;
        };

        let mut next = mounted.state.clone();
        for transition in transitions {
            let partial = transition(&next);
            next.merge(partial);
        }

        let component = mounted.descriptor.component();
        let root = component.render(mounted.descriptor.props(), &next, &mounted.context);
        mounted.renders += 1;
        mounted.state = next;
        mounted.tree = RenderedTree::new(root, mounted.tree.target(), mounted.renders);
        debug!(%instance, renders = mounted.renders, "re-rendered");
        true
    }
}
