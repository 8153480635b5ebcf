// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Per-space DOF ownership.
//!
//! [`SpaceDofs`] records which joints each control space owns. The safety
//! injector masks its stop commands with it and the actuator builder uses
//! it to apply HOLD to uncommanded joints. Overlapping ownership would make
//! HOLD ambiguous, so the partition is validated once at construction
//! instead of on every tick.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::space::ControlSpace;

/// Invalid space partition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpaceDofsError {
    /// A space lists the same DOF twice.
    #[error("space {space} lists DOF {dof} twice")]
    DuplicateDof {
        /// Offending space.
        space: ControlSpace,
        /// Repeated DOF index.
        dof: usize,
    },
    /// Two spaces claim the same DOF.
    #[error("DOF {dof} owned by both {first} and {second}")]
    OverlappingSpaces {
        /// Repeated DOF index.
        dof: usize,
        /// Space that claimed the DOF first (lexicographically).
        first: ControlSpace,
        /// Space that claimed it again.
        second: ControlSpace,
    },
}

/// A validated, disjoint assignment of DOF indices to control spaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpaceDofs {
    map: BTreeMap<ControlSpace, Vec<usize>>,
}

impl SpaceDofs {
    /// Validates and wraps a space → DOF assignment.
    ///
    /// Each space's list must be duplicate-free and no DOF may belong to
    /// two spaces.
    pub fn new(map: BTreeMap<ControlSpace, Vec<usize>>) -> Result<Self, SpaceDofsError> {
        let mut owner: BTreeMap<usize, ControlSpace> = BTreeMap::new();
        for (&space, dofs) in &map {
            let mut seen = FxHashSet::default();
            for &dof in dofs {
                if !seen.insert(dof) {
                    return Err(SpaceDofsError::DuplicateDof { space, dof });
                }
                if let Some(&first) = owner.get(&dof) {
                    return Err(SpaceDofsError::OverlappingSpaces {
                        dof,
                        first,
                        second: space,
                    });
                }
                owner.insert(dof, space);
            }
        }
        Ok(Self { map })
    }

    /// DOFs owned by `space`, if it participates in the partition.
    #[must_use]
    pub fn get(&self, space: ControlSpace) -> Option<&[usize]> {
        self.map.get(&space).map(Vec::as_slice)
    }

    /// Iterates `(space, dofs)` pairs in lexicographic space order.
    pub fn iter(&self) -> impl Iterator<Item = (ControlSpace, &[usize])> + '_ {
        self.map.iter().map(|(&s, d)| (s, d.as_slice()))
    }

    /// Spaces participating in the partition, in lexicographic order.
    pub fn spaces(&self) -> impl Iterator<Item = ControlSpace> + '_ {
        self.map.keys().copied()
    }
}
