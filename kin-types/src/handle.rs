//! Generational handles into scene pools.
//!
//! Every entity the scene owns (bodies, constraints, accelerators, constraint
//! sets) is addressed by a `(slot, generation)` pair. The slot indexes a dense
//! pool array; the generation disambiguates reuse. Deleting an entity bumps
//! the slot's generation, which turns every outstanding handle for that slot
//! into an inert "stale" handle: lookups fail softly instead of aliasing the
//! slot's next occupant.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The raw `(slot, generation)` pair shared by all handle types.
///
/// Generation 0 is reserved for vacant slots, so a live handle always carries
/// a generation of at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawHandle {
    slot: u32,
    generation: u32,
}

impl RawHandle {
    /// Create a raw handle from its parts.
    #[must_use]
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// The pool slot this handle points at.
    #[must_use]
    pub const fn slot(self) -> u32 {
        self.slot
    }

    /// The generation the slot had when this handle was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

macro_rules! declare_handle {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $name(RawHandle);

        impl $name {
            /// Create a handle from its parts.
            #[must_use]
            pub const fn new(slot: u32, generation: u32) -> Self {
                Self(RawHandle::new(slot, generation))
            }

            /// Create a handle from a raw pair.
            #[must_use]
            pub const fn from_raw(raw: RawHandle) -> Self {
                Self(raw)
            }

            /// The underlying raw pair.
            #[must_use]
            pub const fn raw(self) -> RawHandle {
                self.0
            }

            /// The pool slot this handle points at.
            #[must_use]
            pub const fn slot(self) -> u32 {
                self.0.slot()
            }

            /// The generation the slot had when this handle was issued.
            #[must_use]
            pub const fn generation(self) -> u32 {
                self.0.generation()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "({}:{})"), self.slot(), self.generation())
            }
        }
    };
}

declare_handle!(
    /// Handle to a rigid body.
    BodyHandle,
    "Body"
);
declare_handle!(
    /// Handle to a single-body constraint.
    SbConstraintHandle,
    "SbConstraint"
);
declare_handle!(
    /// Handle to a double-body constraint.
    DbConstraintHandle,
    "DbConstraint"
);
declare_handle!(
    /// Handle to a global accelerator.
    AcceleratorHandle,
    "Accelerator"
);
declare_handle!(
    /// Handle to a constraint set (batch group of constraints).
    ConstraintSetHandle,
    "ConstraintSet"
);
