//! Shared callback capabilities invoked by the net engine.
//!
//! Places carry optional [`Action`] handles fired once per token entering or
//! leaving them; transitions carry [`Condition`] handles consulted during the
//! enablement test. Handles are reference counted so several places or
//! transitions can share one behavior object, and so a collaborator keeping a
//! clone can outlive the net.
//!
//! An action may call back into the engine (`increment_input_place`,
//! `number_of_tokens`); a request made from inside a running firing pass is
//! deferred and applied before the outermost trigger returns. To re-enter the
//! engine from a callback, capture the runtime weakly:
//!
//! ```rust
//! use std::sync::Arc;
//! use ptnet::{action, NetRuntime};
//!
//! let net = Arc::new(NetRuntime::new());
//! let weak = Arc::downgrade(&net);
//! let kick = action(move || {
//!     if let Some(net) = weak.upgrade() {
//!         let _ = net.increment_input_place("feedback");
//!     }
//! });
//! # drop(kick);
//! ```

use std::sync::Arc;

/// Callback with side effects, attached to a place as its on-enter or
/// on-exit hook. Invoked once per token moved, in arc order.
pub trait Action: Send + Sync {
    fn invoke(&self);
}

/// Guard predicate consulted while testing a transition for enablement.
///
/// Conditions may read external state but must not mutate the net they
/// guard; the effect of calling a mutating operation from a condition is
/// unspecified.
pub trait Condition: Send + Sync {
    fn invoke(&self) -> bool;
}

impl<F> Action for F
where
    F: Fn() + Send + Sync,
{
    fn invoke(&self) {
        self()
    }
}

impl<F> Condition for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn invoke(&self) -> bool {
        self()
    }
}

/// Shared, reference-counted action handle.
pub type ActionHandle = Arc<dyn Action>;

/// Shared, reference-counted condition handle.
pub type ConditionHandle = Arc<dyn Condition>;

/// Wrap a closure into a shareable [`ActionHandle`].
pub fn action<F>(f: F) -> ActionHandle
where
    F: Fn() + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure into a shareable [`ConditionHandle`].
pub fn condition<F>(f: F) -> ConditionHandle
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Handles are equal only when they point at the same behavior object;
/// names play no part in callback identity.
pub fn same_action(a: &ActionHandle, b: &ActionHandle) -> bool {
    Arc::ptr_eq(a, b)
}

/// Identity comparison for condition handles.
pub fn same_condition(a: &ConditionHandle, b: &ConditionHandle) -> bool {
    Arc::ptr_eq(a, b)
}
