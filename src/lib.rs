//! Embeddable Place/Transition net execution engine.
//!
//! State-machine-like controllers (an elevator, a packet dispatcher) are
//! expressed as a net of named places and guarded transitions instead of
//! hand-coded control flow: application behavior hangs off per-token
//! place callbacks, and external stimulus arrives as token injections into
//! input places. The engine runs every consequence of a stimulus to a
//! fixed point before returning, serializes concurrent triggers, and
//! defers reentrant ones, so callbacks may safely call back into the net.

pub mod callback;
pub mod net;

pub use callback::{
    Action, ActionHandle, Condition, ConditionHandle, action, condition, same_action,
    same_condition,
};
pub use net::{
    DiagnosticReport, Net, NetError, NetRuntime, PlaceId, TransitionId, Weight,
};
