//! Ordered value transforms applied to an event sequence before aggregation
//!
//! Mutators are declared in view configuration as `{"op": "...", "value": n}`
//! and parsed once into [`Mutator`]. An unknown `op` is a configuration bug and
//! fails parsing; everything at runtime is lenient (divide by zero leaves the
//! value unchanged).

use crate::error::ConfigError;
use crate::event::Event;
use serde::{Deserialize, Serialize};

/// Raw mutator declaration as written in the view file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutatorSpec {
    pub op: String,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mutator {
    Add(f64),
    Subtract(f64),
    Multiply(f64),
    Divide(f64),
    Round,
    Floor,
    Ceil,
    Absolute,
    RemoveNegatives,
    /// `value[i] - value[i-1]`; the first element becomes 0
    ToDelta,
    /// `(value[i] - value[i-1]) / |value[i-1]| * 100`; the first element becomes 0
    ToPercentageChange,
}

impl TryFrom<&MutatorSpec> for Mutator {
    type Error = ConfigError;

    fn try_from(spec: &MutatorSpec) -> Result<Self, Self::Error> {
        let operand = || {
            spec.value
                .ok_or_else(|| ConfigError::MissingMutatorValue(spec.op.clone()))
        };

        Ok(match spec.op.as_str() {
            "add" => Mutator::Add(operand()?),
            "subtract" => Mutator::Subtract(operand()?),
            "multiply" => Mutator::Multiply(operand()?),
            "divide" => Mutator::Divide(operand()?),
            "round" => Mutator::Round,
            "floor" => Mutator::Floor,
            "ceil" => Mutator::Ceil,
            "absolute" => Mutator::Absolute,
            "remove_negatives" => Mutator::RemoveNegatives,
            "to_delta" => Mutator::ToDelta,
            "to_percentage_change" => Mutator::ToPercentageChange,
            other => return Err(ConfigError::UnsupportedMutator(other.to_string())),
        })
    }
}

/// Parse a declared mutator list, failing on the first unsupported op
pub fn parse_mutators(specs: &[MutatorSpec]) -> Result<Vec<Mutator>, ConfigError> {
    specs.iter().map(Mutator::try_from).collect()
}

impl Mutator {
    fn apply(&self, events: &mut [Event]) {
        match *self {
            Mutator::Add(n) => events.iter_mut().for_each(|e| e.value += n),
            Mutator::Subtract(n) => events.iter_mut().for_each(|e| e.value -= n),
            Mutator::Multiply(n) => events.iter_mut().for_each(|e| e.value *= n),
            Mutator::Divide(n) => {
                if n != 0.0 {
                    events.iter_mut().for_each(|e| e.value /= n);
                }
            }
            Mutator::Round => events.iter_mut().for_each(|e| e.value = e.value.round()),
            Mutator::Floor => events.iter_mut().for_each(|e| e.value = e.value.floor()),
            Mutator::Ceil => events.iter_mut().for_each(|e| e.value = e.value.ceil()),
            Mutator::Absolute => events.iter_mut().for_each(|e| e.value = e.value.abs()),
            Mutator::RemoveNegatives => events
                .iter_mut()
                .for_each(|e| e.value = e.value.max(0.0)),
            Mutator::ToDelta => pairwise(events, |prev, cur| cur - prev),
            Mutator::ToPercentageChange => pairwise(events, |prev, cur| {
                if prev == 0.0 {
                    0.0
                } else {
                    (cur - prev) / prev.abs() * 100.0
                }
            }),
        }
    }
}

/// Replace each value with `f(previous, current)` computed on the values as
/// they were before this step. The first element has no predecessor and is
/// set to 0 (kept, not dropped, so series length is preserved).
fn pairwise(events: &mut [Event], f: impl Fn(f64, f64) -> f64) {
    let mut prev: Option<f64> = None;
    for event in events.iter_mut() {
        let current = event.value;
        event.value = match prev {
            Some(p) => f(p, current),
            None => 0.0,
        };
        prev = Some(current);
    }
}

/// Apply `mutators` in order, returning a new sequence
///
/// The input slice is never touched; each event is copied before any
/// mutator runs.
pub fn mutate(events: &[Event], mutators: &[Mutator]) -> Vec<Event> {
    let mut out = events.to_vec();
    for mutator in mutators {
        mutator.apply(&mut out);
    }
    out
}
