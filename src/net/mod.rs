//! # Place/Transition net execution engine
//!
//! Let `P` be the set of places and `T` the set of transitions, each
//! transition carrying weighted activation arcs, weighted destination arcs,
//! a set of inhibitor places and a set of guard conditions. For a marking
//! `M ∈ ℕ^{|P|}`:
//!
//! * `t ∈ T` is **enabled** iff
//!   1. `M[p] ≥ w(p, t)` for every activation arc `(p, w)`;
//!   2. `M[p] = 0` for every inhibitor place of `t`;
//!   3. every condition handle of `t` evaluates true.
//! * **Firing** `t` removes `w` tokens along every activation arc and adds
//!   `w` tokens along every destination arc, invoking the place hooks once
//!   per token moved, in arc order.
//!
//! The firing loop scans `T` in creation order, fires the first enabled
//! transition, then restarts the scan from the top; the pass ends when a
//! full scan fires nothing and the deferred-increment queue is empty. The
//! first-enabled-in-creation-order policy makes competing transitions
//! resolve deterministically, which controllers rely on for exclusivity.
//!
//! ## Example
//!
//! ```rust
//! use ptnet::NetRuntime;
//!
//! let net = NetRuntime::new();
//! net.add_place("src", 1, None, None, true).unwrap();
//! net.add_place("dst", 0, None, None, false).unwrap();
//! net.create_transition(&["src"], &["dst"], Vec::new(), &[]).unwrap();
//!
//! net.increment_input_place("src").unwrap();
//! assert_eq!(net.number_of_tokens("dst").unwrap(), 2);
//! ```

pub mod core;
pub mod ids;
pub mod index_vec;
pub mod jobs;
pub mod runtime;
pub mod structure;

pub use self::core::{ArcEffect, DiagnosticReport, Net, NetError};
pub use self::ids::{PlaceId, TransitionId};
pub use self::index_vec::{Idx, IndexVec};
pub use self::jobs::JobQueue;
pub use self::runtime::NetRuntime;
pub use self::structure::{Place, Transition, Weight, WeightedArc};
