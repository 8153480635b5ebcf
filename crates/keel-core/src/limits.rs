// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Absolute and dynamics clamps.
//!
//! Two pure per-command stages run after arbitration:
//!
//! - the absolute clamp bounds every masked value by the lease's full-DOF
//!   limit vectors;
//! - the dynamics clamp bounds the per-tick change of velocity commands by
//!   the envelope's acceleration limits against the previous tick's
//!   command for the same space.
//!
//! Both return a new command with the same mask, kind and source; inputs
//! are never mutated.

use thiserror::Error;

use crate::command::MaskedCommand;
use crate::envelope::Envelope;
use crate::lease::CapabilityLease;
use crate::reject::RejectCode;
use crate::space::CommandKind;

/// Smallest time delta a dynamics check will accept.
const MIN_DYNAMICS_DT_S: f64 = 1e-4;

/// Failure of a clamp stage.
#[derive(Debug, Error, PartialEq)]
pub enum LimitError {
    /// Lease bound vectors disagree about the DOF count.
    #[error("lease bound vectors are inconsistent")]
    LeaseShape,
    /// A masked DOF index is outside the lease's joint vector.
    #[error("DOF index {index} out of range for {dof_count} joints")]
    DofOutOfRange {
        /// Offending mask index.
        index: usize,
        /// Joint count declared by the lease.
        dof_count: usize,
    },
    /// Torque commanded under a lease without torque bounds.
    #[error("torque not permitted by lease")]
    TorqueNotAllowed,
    /// Time delta too small to derive a safe rate bound.
    #[error("invalid time delta {0}")]
    BadDt(f64),
}

impl LimitError {
    /// Stable rejection code for this failure.
    #[must_use]
    pub fn code(&self) -> RejectCode {
        match self {
            Self::LeaseShape => RejectCode::LeaseShape,
            Self::DofOutOfRange { .. } => RejectCode::DofOutOfBounds,
            Self::TorqueNotAllowed => RejectCode::TorqueNotAllowed,
            Self::BadDt(_) => RejectCode::BadDt,
        }
    }
}

/// Clamps every masked value to the lease's hard bounds.
///
/// Positions clamp into `[q_min, q_max]`, velocities symmetrically into
/// `±qd_abs_max`, torques symmetrically into `±tau_abs_max` (which must be
/// present, or the command is rejected outright).
pub fn clamp_to_lease(
    cmd: &MaskedCommand,
    lease: &CapabilityLease,
) -> Result<MaskedCommand, LimitError> {
    let n = lease.q_min.len();
    if lease.q_max.len() != n || lease.qd_abs_max.len() != n {
        return Err(LimitError::LeaseShape);
    }
    if let Some(&bad) = cmd.dof_mask().iter().find(|&&i| i >= n) {
        return Err(LimitError::DofOutOfRange {
            index: bad,
            dof_count: n,
        });
    }

    let masked = cmd.dof_mask().iter().zip(cmd.values().iter());
    let values: Vec<f64> = match cmd.kind() {
        CommandKind::JointPosition => masked
            .map(|(&i, &v)| v.max(lease.q_min[i]).min(lease.q_max[i]))
            .collect(),
        CommandKind::JointVelocity => masked
            .map(|(&i, &v)| {
                let lim = lease.qd_abs_max[i];
                v.max(-lim).min(lim)
            })
            .collect(),
        CommandKind::JointTorque => {
            let tau = lease
                .tau_abs_max
                .as_ref()
                .ok_or(LimitError::TorqueNotAllowed)?;
            if tau.len() != n {
                return Err(LimitError::LeaseShape);
            }
            masked
                .map(|(&i, &v)| {
                    let lim = tau[i];
                    v.max(-lim).min(lim)
                })
                .collect()
        }
    };

    Ok(cmd.with_values(values))
}

/// Bounds the rate of change of a velocity command against the previous
/// tick.
///
/// Pass-through cases, in order: the envelope carries no acceleration
/// limits; there is no previous command for the space (first tick); the
/// kinds differ (a mode switch resets the dynamics state); the command is
/// not a velocity command (position and torque rates are unbounded in this
/// revision). Masked DOFs with no prior value also pass through.
pub fn clamp_dynamics(
    cmd: &MaskedCommand,
    prev_cmd: Option<&MaskedCommand>,
    envelope: &Envelope,
    dt: f64,
) -> Result<MaskedCommand, LimitError> {
    let Some(acc_limits) = &envelope.q_acc_abs_max else {
        return Ok(cmd.clone());
    };
    if dt <= MIN_DYNAMICS_DT_S {
        return Err(LimitError::BadDt(dt));
    }
    let Some(prev) = prev_cmd else {
        return Ok(cmd.clone());
    };
    if prev.kind() != cmd.kind() || cmd.kind() != CommandKind::JointVelocity {
        return Ok(cmd.clone());
    }

    // Masks may differ between ticks; align by DOF index.
    let prev_by_dof: std::collections::BTreeMap<usize, f64> = prev
        .dof_mask()
        .iter()
        .copied()
        .zip(prev.values().iter().copied())
        .collect();

    let mut values = cmd.values().to_vec();
    for (k, &i) in cmd.dof_mask().iter().enumerate() {
        let Some(&prev_val) = prev_by_dof.get(&i) else {
            continue;
        };
        // DOFs beyond the acceleration vector pass through; the absolute
        // clamp has already bounded their magnitude.
        let Some(&acc) = acc_limits.get(i) else {
            continue;
        };
        let max_step = acc * dt;
        values[k] = values[k].max(prev_val - max_step).min(prev_val + max_step);
    }

    Ok(cmd.with_values(values))
}
