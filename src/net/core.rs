//! Net container: name registries, marking state and single-step semantics.
//!
//! [`Net`] is the single-threaded core. It owns every place and transition,
//! validates the structure at construction time and implements the token
//! side of the enablement test and of firing. The locking, condition
//! evaluation and fixed-point loop live in [`crate::net::runtime`].

use indexmap::IndexMap;
use itertools::Itertools;
use log::{info, warn};
use thiserror::Error;

use crate::callback::{ActionHandle, ConditionHandle};
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::IndexVec;
use crate::net::structure::{ArcList, InhibitorList, Place, Transition, Weight, WeightedArc};

/// Structural contract violations, reported synchronously at the call that
/// triggered them. The net is left unchanged by a failed call.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("place {0:?} is already registered")]
    DuplicateName(String),
    #[error("place {0:?} is not part of the net")]
    UnknownPlace(String),
    #[error("place {0:?} does not accept external tokens")]
    NotInputPlace(String),
    #[error("arc to place {0:?} has zero weight")]
    ZeroWeight(String),
    #[error("place {0:?} appears twice in the same arc list")]
    RepeatedPlace(String),
}

/// Token movement at one place, produced by a firing step or a deposit.
/// `action` is invoked `count` times by the caller, outside the state lock.
pub struct ArcEffect {
    pub place: PlaceId,
    pub count: Weight,
    pub action: Option<ActionHandle>,
}

/// Connectivity findings over the static net structure.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticReport {
    pub isolated_places: Vec<String>,
    pub isolated_transitions: Vec<String>,
    pub warnings: Vec<String>,
    pub total_places: usize,
    pub total_transitions: usize,
}

impl DiagnosticReport {
    pub fn has_issues(&self) -> bool {
        !self.isolated_places.is_empty()
            || !self.isolated_transitions.is_empty()
            || !self.warnings.is_empty()
    }

    /// Emit the report through the `log` facade.
    pub fn log(&self) {
        if !self.has_issues() {
            info!(
                "net connectivity ok: {} place(s), {} transition(s)",
                self.total_places, self.total_transitions
            );
            return;
        }
        if !self.isolated_places.is_empty() {
            warn!(
                "isolated place(s): {}",
                self.isolated_places.iter().join(", ")
            );
        }
        if !self.isolated_transitions.is_empty() {
            warn!(
                "isolated transition(s): {}",
                self.isolated_transitions.iter().join(", ")
            );
        }
        for warning in &self.warnings {
            warn!("{warning}");
        }
    }
}

/// The place/transition graph and its marking, keyed by name.
///
/// Places and transitions are added during a construction phase and never
/// removed; transition storage order is the firing loop's scan order.
#[derive(Default)]
pub struct Net {
    places: IndexVec<PlaceId, Place>,
    names: IndexMap<String, PlaceId>,
    transitions: IndexVec<TransitionId, Transition>,
}

impl Net {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a place under its unique name.
    pub fn add_place(&mut self, place: Place) -> Result<PlaceId, NetError> {
        if self.names.contains_key(&place.name) {
            return Err(NetError::DuplicateName(place.name.clone()));
        }
        let name = place.name.clone();
        let id = self.places.push(place);
        self.names.insert(name, id);
        Ok(id)
    }

    /// Validate and register a transition. All referenced names must resolve
    /// and all weights must be at least 1; any failure leaves the net
    /// unchanged.
    pub fn add_transition(
        &mut self,
        activation: &[(&str, Weight)],
        destination: &[(&str, Weight)],
        conditions: Vec<ConditionHandle>,
        inhibitors: &[&str],
    ) -> Result<TransitionId, NetError> {
        let activation = self.resolve_arcs(activation)?;
        let destination = self.resolve_arcs(destination)?;
        let inhibitors = self.resolve_inhibitors(inhibitors)?;
        let name = format!("t{}", self.transitions.len());
        Ok(self.transitions.push(Transition::new(
            name,
            activation,
            destination,
            conditions,
            inhibitors,
        )))
    }

    fn resolve_arcs(&self, arcs: &[(&str, Weight)]) -> Result<ArcList, NetError> {
        let mut resolved = ArcList::new();
        for &(name, weight) in arcs {
            let place = self.resolve(name)?;
            if weight == 0 {
                return Err(NetError::ZeroWeight(name.to_string()));
            }
            if resolved.iter().any(|arc| arc.place == place) {
                return Err(NetError::RepeatedPlace(name.to_string()));
            }
            resolved.push(WeightedArc { place, weight });
        }
        Ok(resolved)
    }

    fn resolve_inhibitors(&self, names: &[&str]) -> Result<InhibitorList, NetError> {
        let mut resolved = InhibitorList::new();
        for &name in names {
            let place = self.resolve(name)?;
            if resolved.contains(&place) {
                return Err(NetError::RepeatedPlace(name.to_string()));
            }
            resolved.push(place);
        }
        Ok(resolved)
    }

    pub fn resolve(&self, name: &str) -> Result<PlaceId, NetError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| NetError::UnknownPlace(name.to_string()))
    }

    /// Resolve a name and require the input flag.
    pub fn resolve_input(&self, name: &str) -> Result<PlaceId, NetError> {
        let id = self.resolve(name)?;
        if !self.places[id].input {
            return Err(NetError::NotInputPlace(name.to_string()));
        }
        Ok(id)
    }

    pub fn place(&self, id: PlaceId) -> &Place {
        &self.places[id]
    }

    pub fn transition(&self, id: TransitionId) -> &Transition {
        &self.transitions[id]
    }

    pub fn tokens(&self, place: PlaceId) -> Weight {
        self.places[place].tokens
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    /// Token and inhibitor half of the enablement test: every activation
    /// place holds at least its arc weight and every inhibitor place holds
    /// exactly zero. Conditions are the runtime's half, evaluated outside
    /// the state lock.
    pub fn marking_enables(&self, transition: TransitionId) -> bool {
        let t = &self.transitions[transition];
        t.activation
            .iter()
            .all(|arc| self.places[arc.place].tokens >= arc.weight)
            && t.inhibitors.iter().all(|&p| self.places[p].tokens == 0)
    }

    /// Cloned condition handles of a transition, in attachment order.
    pub fn conditions(&self, transition: TransitionId) -> Vec<ConditionHandle> {
        self.transitions[transition].conditions.clone()
    }

    /// Remove the activation tokens of a firing. Must only be called while
    /// `marking_enables` holds; returns the per-arc `on_exit` effects in
    /// arc order.
    pub fn consume(&mut self, transition: TransitionId) -> Vec<ArcEffect> {
        let arcs = self.transitions[transition].activation.clone();
        let mut effects = Vec::with_capacity(arcs.len());
        for arc in arcs {
            let place = &mut self.places[arc.place];
            debug_assert!(
                place.tokens >= arc.weight,
                "fired transition lacked tokens at {}",
                place.name
            );
            place.tokens -= arc.weight;
            effects.push(ArcEffect {
                place: arc.place,
                count: arc.weight,
                action: place.on_exit.clone(),
            });
        }
        effects
    }

    /// Add the destination tokens of a firing; returns the per-arc
    /// `on_enter` effects in arc order.
    pub fn produce(&mut self, transition: TransitionId) -> Vec<ArcEffect> {
        let arcs = self.transitions[transition].destination.clone();
        let mut effects = Vec::with_capacity(arcs.len());
        for arc in arcs {
            let place = &mut self.places[arc.place];
            place.tokens += arc.weight;
            effects.push(ArcEffect {
                place: arc.place,
                count: arc.weight,
                action: place.on_enter.clone(),
            });
        }
        effects
    }

    /// Apply one externally injected or deferred token.
    pub fn deposit(&mut self, place: PlaceId) -> ArcEffect {
        let p = &mut self.places[place];
        p.tokens += 1;
        ArcEffect {
            place,
            count: 1,
            action: p.on_enter.clone(),
        }
    }

    /// Scan the static structure for places and transitions that cannot
    /// participate in any firing.
    pub fn diagnose(&self) -> DiagnosticReport {
        let mut report = DiagnosticReport {
            total_places: self.places_len(),
            total_transitions: self.transitions_len(),
            ..DiagnosticReport::default()
        };

        for (id, place) in self.places.iter_enumerated() {
            let consumed = self
                .transitions
                .iter()
                .any(|t| t.activation.iter().any(|arc| arc.place == id));
            let produced = self
                .transitions
                .iter()
                .any(|t| t.destination.iter().any(|arc| arc.place == id));
            let inhibits = self
                .transitions
                .iter()
                .any(|t| t.inhibitors.contains(&id));

            if !consumed && !produced && !inhibits {
                report.isolated_places.push(place.name.clone());
            } else if !produced && !place.input && place.tokens == 0 {
                report.warnings.push(format!(
                    "place '{}' has no producing arc, no input flag and no initial tokens",
                    place.name
                ));
            }
        }

        for transition in self.transitions.iter() {
            if transition.activation.is_empty() && transition.destination.is_empty() {
                report.isolated_transitions.push(transition.name.clone());
            } else if transition.activation.is_empty() {
                report.warnings.push(format!(
                    "transition '{}' has no activation arcs and fires unboundedly while enabled",
                    transition.name
                ));
            }
        }

        report
    }
}
