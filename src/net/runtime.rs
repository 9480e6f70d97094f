//! Concurrent execution engine: pass serialization, reentrancy and the
//! firing fixed point.
//!
//! [`NetRuntime`] wraps the single-threaded [`Net`] core behind two locks:
//! a state lock held only for short structure/marking accesses, and a pass
//! lock held for the whole of a firing pass including its deferred-queue
//! drain. Exactly one pass is in flight at any instant; callbacks run with
//! no lock held except the pass itself, so they may query token counts and
//! inject further stimulus without deadlocking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use log::{debug, trace};

use crate::callback::{ActionHandle, ConditionHandle};
use crate::net::core::{ArcEffect, DiagnosticReport, Net, NetError};
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::Idx;
use crate::net::jobs::JobQueue;
use crate::net::structure::{Place, Weight};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the recorded pass owner before the pass lock is released, also
/// when a callback unwinds.
struct PassGuard<'a> {
    runtime: &'a NetRuntime,
    _serial: MutexGuard<'a, ()>,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.runtime.owner) = None;
    }
}

/// Thread-safe Place/Transition net engine.
///
/// Collaborators build the graph through the construction API, then drive
/// it by injecting tokens into input places; every consequence of an
/// injection is applied before the call returns.
pub struct NetRuntime {
    state: Mutex<Net>,
    /// Serializes firing passes; a pass includes its queue drain.
    pass: Mutex<()>,
    /// Thread currently running a pass, for reentrancy detection.
    owner: Mutex<Option<ThreadId>>,
    pending: JobQueue,
    stop: AtomicBool,
}

impl NetRuntime {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Net::new()),
            pass: Mutex::new(()),
            owner: Mutex::new(None),
            pending: JobQueue::new(),
            stop: AtomicBool::new(false),
        }
    }

    /// Register a place. Initial tokens are set directly and do not invoke
    /// `on_enter`.
    pub fn add_place(
        &self,
        name: &str,
        initial_tokens: Weight,
        on_enter: Option<ActionHandle>,
        on_exit: Option<ActionHandle>,
        input: bool,
    ) -> Result<PlaceId, NetError> {
        lock(&self.state).add_place(Place::new(name, initial_tokens, on_enter, on_exit, input))
    }

    /// Register a transition with uniform weight 1 on every arc.
    pub fn create_transition(
        &self,
        activation: &[&str],
        destination: &[&str],
        conditions: Vec<ConditionHandle>,
        inhibitors: &[&str],
    ) -> Result<TransitionId, NetError> {
        let activation: Vec<(&str, Weight)> = activation.iter().map(|&name| (name, 1)).collect();
        let destination: Vec<(&str, Weight)> = destination.iter().map(|&name| (name, 1)).collect();
        self.create_weighted_transition(&activation, &destination, conditions, inhibitors)
    }

    /// Register a transition with explicit arc weights.
    pub fn create_weighted_transition(
        &self,
        activation: &[(&str, Weight)],
        destination: &[(&str, Weight)],
        conditions: Vec<ConditionHandle>,
        inhibitors: &[&str],
    ) -> Result<TransitionId, NetError> {
        lock(&self.state).add_transition(activation, destination, conditions, inhibitors)
    }

    /// Current token count of a place. Pure read; callable concurrently
    /// with everything, including a running pass.
    pub fn number_of_tokens(&self, place: &str) -> Result<Weight, NetError> {
        let net = lock(&self.state);
        let id = net.resolve(place)?;
        Ok(net.tokens(id))
    }

    /// Inject one token into an input place and run the firing loop to
    /// quiescence before returning.
    ///
    /// Called from inside an active pass on the same thread, the request is
    /// queued instead and applied once the pass reaches its fixed point,
    /// still before the outermost trigger returns. Called from another
    /// thread while a pass is running, it blocks until that pass completes.
    pub fn increment_input_place(&self, place: &str) -> Result<(), NetError> {
        let id = lock(&self.state).resolve_input(place)?;
        if self.reentrant() {
            trace!("deferring increment of {place:?}: pass already running");
            self.pending.push(id);
            return Ok(());
        }
        let _pass = self.begin_pass();
        self.apply_deposit(id);
        self.execute();
        Ok(())
    }

    /// Ask the firing loop to exit after the currently-firing transition
    /// completes. Deferred increments stay queued for the next trigger.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn clear_stop(&self) {
        self.stop.store(false, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Number of deferred increments not yet applied.
    pub fn pending_increments(&self) -> usize {
        self.pending.len()
    }

    /// Connectivity findings over the net built so far.
    pub fn diagnostics(&self) -> DiagnosticReport {
        lock(&self.state).diagnose()
    }

    fn begin_pass(&self) -> PassGuard<'_> {
        let serial = lock(&self.pass);
        *lock(&self.owner) = Some(thread::current().id());
        PassGuard {
            runtime: self,
            _serial: serial,
        }
    }

    fn reentrant(&self) -> bool {
        *lock(&self.owner) == Some(thread::current().id())
    }

    /// Fire until no transition is enabled, then drain deferred increments
    /// and fire again, until the net is quiescent or a stop is requested.
    fn execute(&self) {
        let mut fired = 0usize;
        loop {
            loop {
                if self.stop.load(Ordering::SeqCst) {
                    debug!(
                        "stop observed after {fired} firing(s); {} increment(s) left queued",
                        self.pending.len()
                    );
                    return;
                }
                if !self.fire_next() {
                    break;
                }
                fired += 1;
            }
            let drained = self.pending.take();
            if drained.is_empty() {
                break;
            }
            trace!("fixed point; applying {} deferred increment(s)", drained.len());
            for place in drained {
                self.apply_deposit(place);
            }
        }
        debug!("quiescent after {fired} firing(s)");
    }

    /// Scan transitions in creation order and fire the first enabled one.
    /// The scan restarts from the top after every firing, so competing
    /// transitions resolve deterministically.
    fn fire_next(&self) -> bool {
        let count = lock(&self.state).transitions_len();
        for idx in 0..count {
            let id = TransitionId::from_usize(idx);
            if self.enabled(id) {
                self.fire(id);
                return true;
            }
        }
        false
    }

    /// Full enablement test. The token and inhibitor half runs under the
    /// state lock; condition handles are invoked outside it, so a guard may
    /// read token counts without deadlocking.
    fn enabled(&self, transition: TransitionId) -> bool {
        let conditions = {
            let net = lock(&self.state);
            if !net.marking_enables(transition) {
                return false;
            }
            net.conditions(transition)
        };
        conditions.iter().all(|c| c.invoke())
    }

    /// Move the tokens of one firing and run the per-token callbacks:
    /// `on_exit` along every activation arc in arc order, then `on_enter`
    /// along every destination arc in arc order.
    fn fire(&self, transition: TransitionId) {
        let exits = {
            let mut net = lock(&self.state);
            trace!("firing {}", net.transition(transition).name);
            net.consume(transition)
        };
        Self::run_effects(&exits);

        let enters = lock(&self.state).produce(transition);
        Self::run_effects(&enters);
    }

    fn apply_deposit(&self, place: PlaceId) {
        let effect = lock(&self.state).deposit(place);
        Self::run_effects(std::slice::from_ref(&effect));
    }

    fn run_effects(effects: &[ArcEffect]) {
        for effect in effects {
            if let Some(action) = &effect.action {
                for _ in 0..effect.count {
                    action.invoke();
                }
            }
        }
    }
}

impl Default for NetRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::callback::{action, condition};

    #[test]
    fn increment_runs_to_fixed_point() {
        let net = NetRuntime::new();
        net.add_place("src", 1, None, None, true).unwrap();
        net.add_place("dst", 0, None, None, false).unwrap();
        net.create_transition(&["src"], &["dst"], Vec::new(), &[])
            .unwrap();

        net.increment_input_place("src").unwrap();

        assert_eq!(net.number_of_tokens("src").unwrap(), 0);
        assert_eq!(net.number_of_tokens("dst").unwrap(), 2);
    }

    #[test]
    fn weighted_arcs_invoke_hooks_per_token() {
        let entered = Arc::new(AtomicUsize::new(0));
        let left = Arc::new(AtomicUsize::new(0));

        let net = NetRuntime::new();
        let enter_count = Arc::clone(&entered);
        let exit_count = Arc::clone(&left);
        net.add_place(
            "src",
            5,
            None,
            Some(action(move || {
                exit_count.fetch_add(1, Ordering::SeqCst);
            })),
            true,
        )
        .unwrap();
        net.add_place(
            "dst",
            0,
            Some(action(move || {
                enter_count.fetch_add(1, Ordering::SeqCst);
            })),
            None,
            false,
        )
        .unwrap();
        net.create_weighted_transition(&[("src", 3)], &[("dst", 2)], Vec::new(), &[])
            .unwrap();

        net.increment_input_place("src").unwrap();

        // The injection raised src to 6 and two weight-3 firings drained
        // it: on_exit ran once per consumed token, on_enter once per
        // produced token.
        assert_eq!(net.number_of_tokens("src").unwrap(), 0);
        assert_eq!(net.number_of_tokens("dst").unwrap(), 4);
        assert_eq!(left.load(Ordering::SeqCst), 6);
        assert_eq!(entered.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn injection_invokes_on_enter_once() {
        let entered = Arc::new(AtomicUsize::new(0));
        let net = NetRuntime::new();
        let enter_count = Arc::clone(&entered);
        net.add_place(
            "input",
            0,
            Some(action(move || {
                enter_count.fetch_add(1, Ordering::SeqCst);
            })),
            None,
            true,
        )
        .unwrap();

        net.increment_input_place("input").unwrap();
        assert_eq!(entered.load(Ordering::SeqCst), 1);
        assert_eq!(net.number_of_tokens("input").unwrap(), 1);
    }

    #[test]
    fn condition_gates_enablement() {
        let open = Arc::new(AtomicBool::new(false));
        let gate = Arc::clone(&open);

        let net = NetRuntime::new();
        net.add_place("src", 0, None, None, true).unwrap();
        net.add_place("dst", 0, None, None, false).unwrap();
        net.create_transition(
            &["src"],
            &["dst"],
            vec![condition(move || gate.load(Ordering::SeqCst))],
            &[],
        )
        .unwrap();

        net.increment_input_place("src").unwrap();
        assert_eq!(net.number_of_tokens("src").unwrap(), 1);
        assert_eq!(net.number_of_tokens("dst").unwrap(), 0);

        open.store(true, Ordering::SeqCst);
        net.increment_input_place("src").unwrap();
        assert_eq!(net.number_of_tokens("src").unwrap(), 0);
        assert_eq!(net.number_of_tokens("dst").unwrap(), 2);
    }

    #[test]
    fn inhibitor_blocks_while_tokens_present() {
        let net = NetRuntime::new();
        net.add_place("src", 0, None, None, true).unwrap();
        net.add_place("dst", 0, None, None, false).unwrap();
        net.add_place("blocker", 1, None, None, false).unwrap();
        net.create_transition(&["src"], &["dst"], Vec::new(), &["blocker"])
            .unwrap();

        net.increment_input_place("src").unwrap();
        assert_eq!(net.number_of_tokens("dst").unwrap(), 0);

        // Drain the blocker through a second transition, then retrigger.
        net.create_transition(&["blocker"], &[], Vec::new(), &[])
            .unwrap();
        net.increment_input_place("src").unwrap();
        assert_eq!(net.number_of_tokens("blocker").unwrap(), 0);
        assert_eq!(net.number_of_tokens("dst").unwrap(), 2);
    }

    #[test]
    fn structural_errors_are_synchronous() {
        let net = NetRuntime::new();
        net.add_place("real", 0, None, None, false).unwrap();

        assert!(matches!(
            net.increment_input_place("ghost"),
            Err(NetError::UnknownPlace(_))
        ));
        assert!(matches!(
            net.increment_input_place("real"),
            Err(NetError::NotInputPlace(_))
        ));
        assert!(matches!(
            net.number_of_tokens("ghost"),
            Err(NetError::UnknownPlace(_))
        ));
        assert_eq!(net.number_of_tokens("real").unwrap(), 0);
    }

    #[test]
    fn reentrant_increment_is_deferred_not_nested() {
        let net = Arc::new(NetRuntime::new());
        let depth = Arc::new(AtomicUsize::new(0));
        let max_depth = Arc::new(AtomicUsize::new(0));
        let refills = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&net);
        let depth_in = Arc::clone(&depth);
        let max_in = Arc::clone(&max_depth);
        let refills_in = Arc::clone(&refills);
        let on_enter = action(move || {
            let d = depth_in.fetch_add(1, Ordering::SeqCst) + 1;
            max_in.fetch_max(d, Ordering::SeqCst);
            if refills_in.fetch_add(1, Ordering::SeqCst) < 3 {
                if let Some(net) = weak.upgrade() {
                    net.increment_input_place("src").unwrap();
                }
            }
            depth_in.fetch_sub(1, Ordering::SeqCst);
        });

        net.add_place("src", 0, None, None, true).unwrap();
        net.add_place("dst", 0, Some(on_enter), None, false).unwrap();
        net.create_transition(&["src"], &["dst"], Vec::new(), &[])
            .unwrap();

        net.increment_input_place("src").unwrap();

        // One external trigger plus three reentrant refills, all applied
        // before the outer call returned, with no nested callback frames.
        assert_eq!(net.number_of_tokens("dst").unwrap(), 4);
        assert_eq!(net.pending_increments(), 0);
        assert_eq!(max_depth.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_halts_loop_and_preserves_deferred_jobs() {
        let net = Arc::new(NetRuntime::new());
        let weak = Arc::downgrade(&net);
        let armed = Arc::new(AtomicBool::new(true));
        let trigger = Arc::clone(&armed);
        let on_enter = action(move || {
            if trigger.swap(false, Ordering::SeqCst) {
                if let Some(net) = weak.upgrade() {
                    net.request_stop();
                    net.increment_input_place("src").unwrap();
                }
            }
        });

        net.add_place("src", 0, None, None, true).unwrap();
        net.add_place("dst", 0, Some(on_enter), None, false).unwrap();
        net.create_transition(&["src"], &["dst"], Vec::new(), &[])
            .unwrap();

        net.increment_input_place("src").unwrap();

        // The first firing completed, then the loop stopped with the
        // reentrant increment still queued.
        assert_eq!(net.number_of_tokens("dst").unwrap(), 1);
        assert_eq!(net.pending_increments(), 1);

        net.clear_stop();
        net.increment_input_place("src").unwrap();
        assert_eq!(net.pending_increments(), 0);
        assert_eq!(net.number_of_tokens("dst").unwrap(), 3);
    }
}
