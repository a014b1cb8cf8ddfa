//! Event dispatch
//!
//! Finds the handler an event should reach. Two addressing modes:
//!
//! - [`Routing::Direct`]: only the node the event is fired on is consulted,
//!   like calling `props.onClick()` on an instance found by query.
//! - [`Routing::Bubble`]: the node, then each ancestor up to the root; the
//!   first one with a handler for the event type wins (no capture phase).
//!
//! Invocation happens in [`crate::Harness::fire`] / [`crate::Harness::dispatch`],
//! which always wrap the call in `act`.

use tracing::debug;

use crate::error::{HarnessError, Result};
use crate::tree::{Event, Handler, NodeRef, handler_prop};

/// How an event travels from its target to a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    Direct,
    Bubble,
}

/// Handler chosen for an event, plus the event annotated with its route
#[derive(Debug, Clone)]
pub struct Resolved {
    pub handler: Handler,
    pub event: Event,
}

/// Locate the handler `event` reaches when fired on `node`
pub fn resolve(node: &NodeRef, event: Event, routing: Routing) -> Result<Resolved> {
    let prop = handler_prop(event.kind());
    let candidates = match routing {
        Routing::Direct => vec![node.clone()],
        Routing::Bubble => node.ancestors(),
    };

    for candidate in candidates {
        if let Some(handler) = candidate.prop(&prop).and_then(|v| v.as_handler()) {
            debug!(
                event = event.kind(),
                target = %node.path(),
                handled_by = %candidate.path(),
                ?routing,
                "handler resolved"
            );
            let handler = handler.clone();
            let event = event.routed(node.path().clone(), candidate.path().clone());
            return Ok(Resolved { handler, event });
        }
    }

    Err(HarnessError::NoHandler {
        event: event.kind().to_string(),
        tag: node.tag().to_string(),
    })
}
