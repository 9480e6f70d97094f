//! Static net structure: places, transitions and weighted arcs.

use std::fmt;

use smallvec::SmallVec;

use crate::callback::{ActionHandle, ConditionHandle};
use crate::net::ids::PlaceId;

/// Token multiplicity carried by a place or an arc.
pub type Weight = u64;

/// Named token holder.
///
/// `on_enter` and `on_exit` fire once per token entering or leaving the
/// place, never per emptiness edge: a firing that moves N tokens through a
/// weighted arc invokes the hook N times.
pub struct Place {
    pub name: String,
    pub tokens: Weight,
    /// Only input places accept tokens injected from outside the net.
    pub input: bool,
    pub on_enter: Option<ActionHandle>,
    pub on_exit: Option<ActionHandle>,
}

impl Place {
    pub fn new(
        name: impl Into<String>,
        tokens: Weight,
        on_enter: Option<ActionHandle>,
        on_exit: Option<ActionHandle>,
        input: bool,
    ) -> Self {
        Self {
            name: name.into(),
            tokens,
            input,
            on_enter,
            on_exit,
        }
    }
}

impl fmt::Debug for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Place")
            .field("name", &self.name)
            .field("tokens", &self.tokens)
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}

/// One weighted arc endpoint of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightedArc {
    pub place: PlaceId,
    pub weight: Weight,
}

pub type ArcList = SmallVec<[WeightedArc; 4]>;
pub type InhibitorList = SmallVec<[PlaceId; 2]>;

/// Guarded operation that moves weighted token counts from activation
/// places to destination places. Arc lists keep the order they were given
/// at creation; the firing loop relies on it for callback ordering.
pub struct Transition {
    pub name: String,
    pub activation: ArcList,
    pub destination: ArcList,
    pub conditions: Vec<ConditionHandle>,
    pub inhibitors: InhibitorList,
}

impl Transition {
    pub fn new(
        name: impl Into<String>,
        activation: ArcList,
        destination: ArcList,
        conditions: Vec<ConditionHandle>,
        inhibitors: InhibitorList,
    ) -> Self {
        Self {
            name: name.into(),
            activation,
            destination,
            conditions,
            inhibitors,
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition").field(&self.name).finish()
    }
}
