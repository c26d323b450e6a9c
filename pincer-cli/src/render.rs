use pincer_controller::arm_config::ArmConfig;
use pincer_controller::arm_state::Pose;
use pincer_controller::command::{Command, CommandError, DispatchOutcome, GripperCommand};

pub const BANNER: &str = "\
=== Pincer IK Controller ===
Compact commands (single letter):
  F<cm> B<cm> U<cm> D<cm> - Move
  G<y>,<z> - Position | R<deg> - Base
  W<deg> - Wrist | C<deg> - Gripper
  O/X/T - Open/Close/Tight | H/P - Home/Print

Field commands (colon format):
  move:forward|backward|up|down:<cm>
  position:<y>,<z> | base:<deg> | wrist:<deg>
  gripper:open|close|tight|<deg>
  home | status";

/// Human readable pose report, one status block per request.
pub fn pose_report(pose: &Pose, config: &ArmConfig) -> String {
    format!(
        "--- Current State ---\n\
         Position: Y={:.1}cm, Z={:.1}cm\n\
         IK Angles: Shoulder={:.1}° ({:+.0}°), Elbow={:.1}° ({:+.0}°)\n\
         Base={:.1}° ({:+.0}° offset), Wrist={:.1}°, Gripper={:.1}°\n\
         ---------------------",
        pose.position.y,
        pose.position.z,
        pose.shoulder,
        config.offsets.shoulder,
        pose.elbow,
        config.offsets.elbow,
        pose.base,
        config.offsets.base,
        pose.wrist,
        pose.gripper,
    )
}

/// Wire acknowledgment for a completed command, one line per command,
/// identical for both grammars.
pub fn ack_ok(outcome: &DispatchOutcome) -> String {
    match &outcome.command {
        Command::Move { direction, .. } => format!("OK:move:{}", direction),
        Command::SetGripper(GripperCommand::Open) => "OK:gripper:open".to_owned(),
        Command::SetGripper(GripperCommand::Close) => "OK:gripper:close".to_owned(),
        Command::SetGripper(GripperCommand::Tight) => "OK:gripper:tight".to_owned(),
        command => format!("OK:{}", command.family()),
    }
}

pub fn ack_error(error: &CommandError) -> String {
    let reason = match error {
        CommandError::OutOfReach(_) => "OUT_OF_REACH",
        CommandError::InvalidFormat(_) => "INVALID_FORMAT",
        CommandError::UnknownDirection(_) => "UNKNOWN_DIRECTION",
        CommandError::UnknownCommand(_) => "UNKNOWN_COMMAND",
        CommandError::Driver(_) => "DRIVER",
    };
    format!("ERROR:{}", reason)
}
