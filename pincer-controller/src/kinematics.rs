use crate::arm_config::{ArmGeometry, PlanarPosition};
use nalgebra as na;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum KinematicsError {
    #[error("distance {distance:.1}cm outside valid range {min:.1} - {max:.1}cm")]
    OutOfReach { distance: f32, min: f32, max: f32 },
    #[error("calculated angles exceed servo limits (shoulder {shoulder:.1}°, elbow {elbow:.1}°)")]
    ServoLimits { shoulder: f32, elbow: f32 },
}

/// Shoulder and elbow angles in logical degrees.
///
/// The elbow angle is reported as `180° - interior angle` so that a fully
/// stretched arm reads 0° and the home pose reads 90°.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPair {
    pub shoulder: f32,
    pub elbow: f32,
}

/// Solve the planar two link IK for a target in the sagittal plane.
///
/// Pure and stateless; identical inputs always produce identical outputs.
/// Fails hard when the target is outside the reachable annulus or when the
/// resulting angles leave the servo range. The servo limit check is a
/// boundary, not a clamp, so a move never silently truncates into an
/// unintended pose.
pub fn solve(
    geometry: &ArmGeometry,
    target: PlanarPosition,
) -> Result<JointPair, KinematicsError> {
    let l1 = geometry.upper_arm;
    let l2 = geometry.forearm;

    let z_adj = target.z - geometry.base_height;
    let distance = na::Vector2::new(target.y, z_adj).norm();

    let min = geometry.min_reach();
    let max = geometry.max_reach();
    if distance > max || distance < min {
        return Err(KinematicsError::OutOfReach { distance, min, max });
    }

    // Law of cosines for the interior elbow angle, cosine clamped to
    // absorb floating point drift at the annulus edges.
    let cos_elbow = ((l1 * l1 + l2 * l2 - distance * distance) / (2.0 * l1 * l2)).clamp(-1.0, 1.0);
    let elbow = 180.0 - cos_elbow.acos().to_degrees();

    // Shoulder is the angle to the target plus the angle between the
    // upper arm and the target vector.
    let cos_beta = ((l1 * l1 + distance * distance - l2 * l2) / (2.0 * l1 * distance)).clamp(-1.0, 1.0);
    let shoulder = (z_adj.atan2(target.y) + cos_beta.acos()).to_degrees();

    if !geometry.within_servo_limits(shoulder) || !geometry.within_servo_limits(elbow) {
        return Err(KinematicsError::ServoLimits { shoulder, elbow });
    }

    Ok(JointPair { shoulder, elbow })
}

/// Forward kinematics for the same planar model.
///
/// Used to keep the committed end effector position consistent with the
/// committed joint angles.
pub fn forward(geometry: &ArmGeometry, joints: &JointPair) -> PlanarPosition {
    let shoulder_rotation = na::Rotation2::new(joints.shoulder.to_radians());
    let forearm_rotation = na::Rotation2::new((joints.shoulder - joints.elbow).to_radians());
    let elbow = shoulder_rotation * na::Vector2::new(geometry.upper_arm, 0.0);
    let tip = elbow + forearm_rotation * na::Vector2::new(geometry.forearm, 0.0);
    PlanarPosition {
        y: tip.x,
        z: tip.y + geometry.base_height,
    }
}
