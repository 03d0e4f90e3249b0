//! Constraint solvers over a uniform Jacobian/impulse protocol.
//!
//! Solvers come in two families: single-body (anchored to world fixtures)
//! and pair (coupling two bodies, a "target" and a "source"). Every solver
//! implements the same capability set: `reset` recomputes Jacobians and
//! drift from current state, `apply_impulses` corrects velocities, and
//! `apply_nudges` corrects positions and orientations. Solvers operate on
//! [`Placeholder`] snapshots, never on body storage directly, so many
//! solvers can run against the same state within one step.
//!
//! The crate also hosts the acceleration fields applied during the force
//! phase and the contact constraints synthesized from collision detection.

#![warn(missing_docs)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::similar_names)]

pub mod accel;
pub mod contact;
pub mod context;
pub mod jacobian;
pub mod pair;
pub mod placeholder;
pub mod single;
pub mod solver;

pub use accel::{AccelProbe, AccelerationField, GravityDirection, GravityPosition};
pub use contact::{PairContact, SingleBodyContact};
pub use context::SolveContext;
pub use jacobian::{Impulse, Jacobian, Nudge, PairJacobian};
pub use pair::{
    ClampDirectionOffset, Coilover, CombinedPair, CopyDirection, CopyPosition, CopyRotation,
    Differential, HingedRod, LimitRelativeAngle, MatchDirectionOffset, MatchDirections,
};
pub use placeholder::Placeholder;
pub use single::{Chandelier, CombinedSingle, StaticPosition, StaticRotation};
pub use solver::{PairSolver, SingleBodySolver};
