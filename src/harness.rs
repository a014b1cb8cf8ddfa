//! Harness lifecycle and assertion primitives
//!
//! A [`Harness`] is one test's world: a fresh mount target, a scheduler, an
//! interception table and a renderer. Creating it is `beforeEach`; dropping
//! it (or calling [`Harness::after_each`]) is `afterEach`, which unmounts,
//! restores every interception still active, discards in-flight work and
//! detaches the target. Because teardown runs from `Drop`, it also runs when
//! a test body panics on a failed assertion.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use tracing::debug;

use crate::component::{Context, Descriptor, InstanceId, State};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::events::{self, Routing};
use crate::intercept::{InterceptTable, Json, MockHandle, Reply};
use crate::renderer::{MountTarget, TargetId, TreeRenderer};
use crate::scheduler::Scheduler;
use crate::snapshot::{MatchResult, SnapshotDiff, SnapshotStore};
use crate::tree::{Event, Node, NodeRef, RenderedTree};

/// Per-test harness
pub struct Harness {
    config: HarnessConfig,
    target: RefCell<MountTarget>,
    scheduler: Scheduler,
    intercepts: InterceptTable,
    renderer: RefCell<TreeRenderer>,
    torn_down: Cell<bool>,
}

impl Harness {
    /// Fresh harness configured from the environment (`beforeEach`)
    pub fn before_each() -> Self {
        Self::with_config(HarnessConfig::from_env())
    }

    pub fn with_config(config: HarnessConfig) -> Self {
        Self {
            config,
            target: RefCell::new(MountTarget::allocate()),
            scheduler: Scheduler::new(),
            intercepts: InterceptTable::default(),
            renderer: RefCell::new(TreeRenderer::default()),
            torn_down: Cell::new(false),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn target(&self) -> TargetId {
        self.target.borrow().id()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.get()
    }

    // ── External functions ────────────────────────────────────────────

    /// Install the real implementation of an external function
    pub fn bind(&self, name: impl Into<String>, real: impl Fn(&[Json]) -> Reply + 'static) {
        self.intercepts.bind(name, real);
    }

    /// Replace `name` with `fake` until the handle is restored or the test ends
    pub fn intercept(
        &self,
        name: impl Into<String>,
        fake: impl Fn(&[Json]) -> Reply + 'static,
    ) -> Result<MockHandle> {
        self.ensure_live()?;
        self.intercepts.intercept(name, fake)
    }

    // ── Rendering ─────────────────────────────────────────────────────

    /// Mount onto this harness's target, run the first render and the mount
    /// hook, then apply the updates that synchronous initialization queued.
    ///
    /// Delayed and deferred replies requested by the hook are still pending
    /// afterwards; mount inside `act` to settle them too.
    pub fn mount(&self, descriptor: Descriptor) -> Result<RenderedTree> {
        self.ensure_live()?;
        let context = Context::new(
            InstanceId::next(),
            self.scheduler.clone(),
            self.intercepts.clone(),
        );
        let tree = {
            let target = self.target.borrow();
            self.renderer
                .borrow_mut()
                .mount(descriptor.clone(), &target, context.clone())?
        };
        descriptor
            .component()
            .mounted(descriptor.props(), &context);
        if self.scheduler.pending_updates() == 0 {
            return Ok(tree);
        }
        self.scheduler
            .flush_updates(&self.renderer, self.config.max_settle_rounds)?;
        self.renderer.borrow().current_tree(tree.target())
    }

    /// Unmount the component on this target. Returns whether one was mounted.
    pub fn unmount(&self) -> bool {
        let target = self.target();
        self.renderer.borrow_mut().unmount(target)
    }

    /// Run `work` and settle every update it causes (`act`)
    pub fn act<R>(&self, work: impl FnOnce() -> R) -> Result<R> {
        self.ensure_live()?;
        self.scheduler
            .run_exclusive(&self.renderer, self.config.max_settle_rounds, work)
    }

    /// Latest settled tree.
    ///
    /// Fails with `UnsettledUpdate` if updates were queued outside `act`.
    pub fn current_tree(&self) -> Result<RenderedTree> {
        self.scheduler.ensure_settled()?;
        self.renderer.borrow().current_tree(self.target())
    }

    /// Renders performed by the mounted instance, including the first
    pub fn render_count(&self) -> Result<u64> {
        self.renderer.borrow().render_count(self.target())
    }

    /// Settled state of the mounted instance
    pub fn state(&self) -> Result<State> {
        self.scheduler.ensure_settled()?;
        self.renderer.borrow().state(self.target())
    }

    // ── Events ────────────────────────────────────────────────────────

    /// Invoke the handler bound on `node` itself, inside `act`
    pub fn fire(&self, node: &NodeRef, event: Event) -> Result<()> {
        let resolved = events::resolve(node, event, Routing::Direct)?;
        self.act(|| resolved.handler.call(&resolved.event))
    }

    /// Bubble `event` from `node` to the nearest handler, inside `act`
    pub fn dispatch(&self, node: &NodeRef, event: Event) -> Result<()> {
        let resolved = events::resolve(node, event, Routing::Bubble)?;
        self.act(|| resolved.handler.call(&resolved.event))
    }

    // ── Assertions ────────────────────────────────────────────────────

    /// Compare the settled tree with `expected`; callables compare equal
    pub fn expect_tree_matches(&self, expected: &Node) -> Result<()> {
        let actual = self.current_tree()?.to_canonical();
        let wanted = crate::tree::to_canonical(expected);
        if actual == wanted {
            return Ok(());
        }
        Err(HarnessError::TreeMismatch(SnapshotDiff::between(
            &wanted, &actual,
        )))
    }

    /// Compare the settled tree with the baseline stored for `test_id`
    pub fn expect_snapshot_matches(
        &self,
        store: &SnapshotStore,
        test_id: &str,
    ) -> Result<MatchResult> {
        let tree = self.current_tree()?;
        store.compare(test_id, &tree)
    }

    /// Panicking form of [`Harness::expect_snapshot_matches`] for test bodies.
    ///
    /// Prefer the [`assert_tree_snapshot!`](crate::assert_tree_snapshot) macro,
    /// which locates the store from the calling crate.
    #[track_caller]
    pub fn assert_snapshot(&self, store: &SnapshotStore, test_id: &str) {
        match self.expect_snapshot_matches(store, test_id) {
            Ok(MatchResult::Mismatch(diff)) => panic!(
                "snapshot `{test_id}` does not match {}:\n{diff}\n\
                 rerun with SETTLE_UPDATE=always (or BLESS=1) to accept, \
                 or review with `settle pending`",
                store.baseline_path(test_id).display(),
            ),
            Ok(_) => {}
            Err(e) => panic!("snapshot `{test_id}`: {e}"),
        }
    }

    // ── Teardown ──────────────────────────────────────────────────────

    /// Tear down (`afterEach`). Safe to call more than once.
    ///
    /// Does not wait for unresolved replies: queued updates and pending
    /// continuations are dropped without being applied.
    pub fn after_each(&self) {
        if self.torn_down.replace(true) {
            return;
        }
        let target = self.target();
        let (updates, tasks) = self.scheduler.discard();
        let unmounted = self.renderer.borrow_mut().unmount(target);
        let restored = self.intercepts.restore_all();
        self.target.borrow_mut().detach();
        debug!(
            %target,
            unmounted,
            restored,
            discarded_updates = updates,
            discarded_tasks = tasks,
            "harness torn down"
        );
    }

    fn ensure_live(&self) -> Result<()> {
        if self.torn_down.get() {
            return Err(HarnessError::TargetDetached(self.target()));
        }
        Ok(())
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::before_each()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.after_each();
    }
}

/// Run `body` against a fresh harness; teardown runs on every exit path
pub fn with_harness<R>(body: impl FnOnce(&Harness) -> R) -> R {
    let harness = scopeguard::guard(Harness::before_each(), |harness| {
        harness.after_each();
    });
    body(&harness)
}

/// Assert the harness's settled tree matches its stored baseline.
///
/// Baselines live under `tests/snapshots/` of the calling crate unless
/// `SETTLE_SNAPSHOT_DIR` says otherwise.
#[macro_export]
macro_rules! assert_tree_snapshot {
    ($harness:expr, $name:expr) => {
        $harness.assert_snapshot(
            &$crate::SnapshotStore::for_manifest_dir(env!("CARGO_MANIFEST_DIR")),
            $name,
        )
    };
    ($harness:expr, $name:expr, $store:expr) => {
        $harness.assert_snapshot($store, $name)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Handler;
    use serde_json::json;

    fn counter() -> Descriptor {
        Descriptor::from_fn("Counter", |_props, state, cx| {
            let count = state.get_int("count").unwrap_or(0);
            Node::element("button")
                .prop(
                    "onClick",
                    cx.callback(|cx, _event| {
                        cx.update(|prev| {
                            State::new().with("count", prev.get_int("count").unwrap_or(0) + 1)
                        })
                    }),
                )
                .with_text(count.to_string())
        })
    }

    #[test]
    fn test_after_each_is_idempotent() {
        let harness = Harness::with_config(HarnessConfig::default());
        harness.mount(counter()).unwrap();
        harness.after_each();
        harness.after_each();
        assert!(harness.is_torn_down());
        assert!(matches!(
            harness.current_tree(),
            Err(HarnessError::NotMounted(_))
        ));
        assert!(matches!(
            harness.mount(counter()),
            Err(HarnessError::TargetDetached(_))
        ));
    }

    #[test]
    fn test_direct_handler_call_outside_act_is_flagged() {
        let harness = Harness::with_config(HarnessConfig::default());
        let tree = harness.mount(counter()).unwrap();
        let button = tree.find_by_type("button").unwrap();
        let handler: Handler = button.prop("onClick").unwrap().as_handler().unwrap().clone();

        handler.call(&Event::click());

        assert!(matches!(
            harness.current_tree(),
            Err(HarnessError::UnsettledUpdate { updates: 1, tasks: 0 })
        ));
        harness.act(|| {}).unwrap();
        assert_eq!(harness.current_tree().unwrap().text_content(), "1");
    }

    #[test]
    fn test_teardown_discards_in_flight_work_and_restores_mocks() {
        let harness = Harness::with_config(HarnessConfig::default());
        let (reply, resolver) = Reply::deferred();
        let reply = RefCell::new(Some(reply));
        let mock = harness
            .intercept("fetch", move |_| {
                reply
                    .borrow_mut()
                    .take()
                    .unwrap_or_else(|| Reply::ok(json!(null)))
            })
            .unwrap();

        harness.mount(counter()).unwrap();
        // A call still in flight when the test ends.
        let cx = Context::new(
            InstanceId::next(),
            harness.scheduler.clone(),
            harness.intercepts.clone(),
        );
        cx.call("fetch", vec![], |cx, _| cx.set_state(State::new().with("done", true)));
        resolver.resolve(json!([]));
        assert_eq!(harness.scheduler().ready_tasks(), 1);

        harness.after_each();

        assert!(harness.scheduler().is_settled());
        assert!(mock.is_restored());
        assert!(matches!(mock.call_log(), Err(HarnessError::MockRestored(_))));
    }

    #[test]
    fn test_with_harness_tears_down_on_panic() {
        let escaped: RefCell<Option<MockHandle>> = RefCell::new(None);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_harness::<()>(|h| {
                let mock = h.intercept("fetch", |_| Reply::ok(json!(null))).unwrap();
                *escaped.borrow_mut() = Some(mock);
                panic!("assertion failed inside test body");
            })
        }));
        assert!(result.is_err());
        let mock = escaped.borrow_mut().take().unwrap();
        assert!(mock.is_restored());
    }

    #[test]
    fn test_expect_tree_matches_reports_diff() {
        let harness = Harness::with_config(HarnessConfig::default());
        harness.mount(counter()).unwrap();

        let expected = Node::element("button")
            .prop("onClick", Handler::new(|_| {}))
            .with_text("0");
        harness.expect_tree_matches(&expected).unwrap();

        let wrong = Node::element("button")
            .prop("onClick", Handler::new(|_| {}))
            .with_text("5");
        let Err(HarnessError::TreeMismatch(diff)) = harness.expect_tree_matches(&wrong) else {
            panic!("expected a tree mismatch");
        };
        let changes: Vec<_> = diff.changes().map(|l| l.text().trim().to_string()).collect();
        assert_eq!(changes, vec!["\"5\"", "\"0\""]);
    }
}
