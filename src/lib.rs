//! Settle - deterministic test harness for stateful UI components
//!
//! Mounts components into isolated targets, drives their asynchronous state
//! updates to completion on a virtual clock, and checks the rendered trees
//! against expectations or stored baselines.
//!
//! This library provides:
//! - [`tree`]: Rendered tree model, queries and canonical serialization
//! - [`component`]: Component trait, descriptors and the instance context
//! - [`renderer`]: Mount targets and the tree renderer adapter
//! - [`scheduler`]: Pending updates, continuations and `act` settling
//! - [`events`]: Direct and bubbling event dispatch
//! - [`intercept`]: External function interception and call logs
//! - [`snapshot`]: Baseline store, comparator and line diffs
//! - [`harness`]: Per-test lifecycle tying it all together
//! - [`config`]: Environment-driven settings
//!
//! ```no_run
//! use settle::{Descriptor, Event, Harness, Node, State};
//!
//! let harness = Harness::before_each();
//! harness
//!     .act(|| {
//!         harness.mount(Descriptor::from_fn("Counter", |_props, state, cx| {
//!             let count = state.get_int("count").unwrap_or(0);
//!             Node::element("button")
//!                 .prop(
//!                     "onClick",
//!                     cx.callback(|cx, _| cx.set_state(State::new().with("count", 1))),
//!                 )
//!                 .with_text(count.to_string())
//!         }))
//!     })
//!     .unwrap()
//!     .unwrap();
//!
//! let button = harness.current_tree().unwrap().find_by_type("button").unwrap();
//! harness.fire(&button, Event::click()).unwrap();
//! assert_eq!(harness.current_tree().unwrap().text_content(), "1");
//! ```

pub mod component;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod harness;
pub mod intercept;
pub mod renderer;
pub mod scheduler;
pub mod snapshot;
pub mod tree;

pub use component::{Component, Context, Descriptor, FnComponent, InstanceId, State};
pub use config::{HarnessConfig, UpdateMode};
pub use error::{HarnessError, Result};
pub use events::Routing;
pub use harness::{Harness, with_harness};
pub use intercept::{CallError, Json, MockHandle, Reply, Resolver};
pub use renderer::{MountTarget, TargetId};
pub use snapshot::{MatchResult, SnapshotDiff, SnapshotStore};
pub use tree::{Event, Handler, Node, NodePath, NodeRef, Props, RenderedTree, Value};
