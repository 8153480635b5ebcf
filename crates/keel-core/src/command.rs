// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Masked per-space commands.
//!
//! A [`MaskedCommand`] drives only the DOF indices listed in its mask, so
//! several spaces can command the same robot in one tick without
//! double-commanding a joint. Shape invariants are enforced at construction;
//! everything downstream may assume them.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::space::{CommandKind, ControlSpace};

/// Reserved `source` value for commands injected by the safety subsystem.
///
/// The arbiter gives proposals carrying this source absolute precedence
/// within their space.
pub const SAFETY_SOURCE: &str = "safety";

/// Shape violations detected when constructing a [`MaskedCommand`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandShapeError {
    /// `dof_mask` and `values` lengths differ.
    #[error("dof_mask length {mask} != values length {values}")]
    LengthMismatch {
        /// Number of masked DOF indices.
        mask: usize,
        /// Number of values supplied.
        values: usize,
    },
    /// The same DOF index appears twice in the mask.
    #[error("dof_mask contains duplicate index {0}")]
    DuplicateDof(usize),
}

/// An immutable command over a subset of the robot's joints.
///
/// # Invariants
/// - `dof_mask.len() == values.len()`
/// - `dof_mask` contains no duplicate indices.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaskedCommand {
    space: ControlSpace,
    kind: CommandKind,
    dof_mask: Vec<usize>,
    values: Vec<f64>,
    source: String,
}

impl MaskedCommand {
    /// Constructs a command, validating the mask/value shape.
    pub fn new(
        space: ControlSpace,
        kind: CommandKind,
        dof_mask: Vec<usize>,
        values: Vec<f64>,
        source: impl Into<String>,
    ) -> Result<Self, CommandShapeError> {
        if dof_mask.len() != values.len() {
            return Err(CommandShapeError::LengthMismatch {
                mask: dof_mask.len(),
                values: values.len(),
            });
        }
        let mut seen = FxHashSet::default();
        for &i in &dof_mask {
            if !seen.insert(i) {
                return Err(CommandShapeError::DuplicateDof(i));
            }
        }
        Ok(Self {
            space,
            kind,
            dof_mask,
            values,
            source: source.into(),
        })
    }

    /// Constructs a command whose shape the caller has already validated
    /// (e.g. masks taken from a checked [`crate::partition::SpaceDofs`]).
    pub(crate) fn from_validated_parts(
        space: ControlSpace,
        kind: CommandKind,
        dof_mask: Vec<usize>,
        values: Vec<f64>,
        source: impl Into<String>,
    ) -> Self {
        debug_assert_eq!(dof_mask.len(), values.len());
        Self {
            space,
            kind,
            dof_mask,
            values,
            source: source.into(),
        }
    }

    /// Control space this command belongs to.
    #[must_use]
    pub fn space(&self) -> ControlSpace {
        self.space
    }

    /// Interpretation of the values.
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Ordered, duplicate-free DOF indices this command drives.
    #[must_use]
    pub fn dof_mask(&self) -> &[usize] {
        &self.dof_mask
    }

    /// Per-masked-DOF values, parallel to [`MaskedCommand::dof_mask`].
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Name of the skill (or `"safety"`) that produced this command.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this command carries the reserved safety source.
    #[must_use]
    pub fn is_safety_sourced(&self) -> bool {
        self.source == SAFETY_SOURCE
    }

    /// Returns a copy of this command with the same mask, kind and source
    /// but replacement values. Used by the clamp stages.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.dof_mask.len());
        Self {
            space: self.space,
            kind: self.kind,
            dof_mask: self.dof_mask.clone(),
            values,
            source: self.source.clone(),
        }
    }
}
