//! Re-entrancy detection for resolutions driven by user factories.
//!
//! Graph-level cycles are rejected by the call-site validator before anything
//! runs. A factory, however, may call back into the provider at execution
//! time; those nested requests are tracked here per thread.

use std::cell::RefCell;

use crate::call_site::CacheKey;
use crate::error::{DiError, DiResult};
use crate::key::Key;

pub(crate) const MAX_DEPTH: usize = 1024;

thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// A resolution request entering a provider
    Request { lineage: u64, name: &'static str, many: bool },
    /// A cached instance being constructed in a scope
    Slot { scope: u64, name: &'static str, slot: usize },
}

impl Frame {
    fn name(&self) -> &'static str {
        match self {
            Frame::Request { name, .. } | Frame::Slot { name, .. } => *name,
        }
    }
}

/// Pops the frame pushed by [`enter_request`] or [`enter_slot`] when dropped.
pub(crate) struct StackGuard(());

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Registers a nested resolution of `key` within the provider `lineage`.
///
/// Re-entering the same request on the same thread means a factory resolves
/// itself, directly or through other factories.
pub(crate) fn enter_request(lineage: u64, key: &Key, many: bool) -> DiResult<StackGuard> {
    enter(Frame::Request { lineage, name: key.display_name(), many })
}

/// Registers construction of the cached instance `cache` in `scope`.
///
/// Re-entering the same slot would otherwise block on its own construction
/// lock.
pub(crate) fn enter_slot(scope: u64, cache: &CacheKey) -> DiResult<StackGuard> {
    enter(Frame::Slot { scope, name: cache.key.display_name(), slot: cache.slot })
}

fn enter(frame: Frame) -> DiResult<StackGuard> {
    RESOLUTION_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();

        if let Some(start) = stack.iter().position(|f| *f == frame) {
            let mut path: Vec<&'static str> = stack[start..].iter().map(Frame::name).collect();
            path.push(frame.name());
            path.dedup();
            if path.len() == 1 {
                // Self-dependency still reads as a closed loop
                path.push(frame.name());
            }
            return Err(DiError::Circular(path));
        }

        if stack.len() >= MAX_DEPTH {
            return Err(DiError::DepthExceeded(stack.len()));
        }

        stack.push(frame);
        Ok(StackGuard(()))
    })
}
