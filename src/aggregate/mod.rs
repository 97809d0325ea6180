//! Pure event-sequence computation: predicates, mutators, scalar reductions,
//! time-interval bucketing and axis alignment
//!
//! Nothing in here performs I/O or holds state; the scheduler composes these
//! steps per widget dependency.

pub mod axis;
pub mod bucketing;
pub mod conditions;
pub mod interval;
pub mod mutators;
pub mod scalar;

pub use axis::{assign_to_axis, build_axis, TimeBucket};
pub use bucketing::time_interval_aggregate;
pub use conditions::evaluate;
pub use interval::{BucketFunction, TimeAggregation, TimeInterval};
pub use mutators::{mutate, parse_mutators, Mutator, MutatorSpec};
pub use scalar::{aggregate_value, aggregate_value_by_name, AggregateValue, ScalarAggregation};
