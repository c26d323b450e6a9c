use crate::arm_config::PlanarPosition;
use crate::arm_controller::{ArmController, MotionError};
use crate::arm_driver::DriverError;
use crate::arm_state::Pose;
use crate::kinematics::KinematicsError;
use std::fmt;
use thiserror::Error;

/// Move distance in cm when the field form omits the magnitude.
pub const DEFAULT_MOVE_CM: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Up,
    Down,
}

impl Direction {
    /// Planar delta for a signed distance along this direction.
    pub fn delta(self, distance: f32) -> (f32, f32) {
        match self {
            Direction::Forward => (distance, 0.0),
            Direction::Backward => (-distance, 0.0),
            Direction::Up => (0.0, distance),
            Direction::Down => (0.0, -distance),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Up => "up",
            Direction::Down => "down",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GripperCommand {
    Angle(f32),
    Open,
    Close,
    Tight,
}

/// One parsed command, independent of which grammar carried it.
///
/// Both surface syntaxes converge on this type so everything downstream
/// is written once. `F10` and `move:forward:10` are the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Move { direction: Direction, distance: f32 },
    Absolute(PlanarPosition),
    RotateBase(f32),
    SetWrist(f32),
    SetGripper(GripperCommand),
    Home,
    PrintStatus,
}

impl Command {
    /// Command family for acknowledgments and logging.
    pub fn family(&self) -> &'static str {
        match self {
            Command::Move { .. } => "move",
            Command::Absolute(_) => "position",
            Command::RotateBase(_) => "base",
            Command::SetWrist(_) => "wrist",
            Command::SetGripper(_) => "gripper",
            Command::Home => "home",
            Command::PrintStatus => "status",
        }
    }
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("position out of reach: {0}")]
    OutOfReach(#[from] KinematicsError),
    #[error("invalid command format: {0}")]
    InvalidFormat(String),
    #[error("unknown direction {0:?}")]
    UnknownDirection(String),
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("actuator write failed")]
    Driver(#[from] DriverError),
}

impl From<MotionError> for CommandError {
    fn from(error: MotionError) -> CommandError {
        match error {
            MotionError::Kinematics(inner) => CommandError::OutOfReach(inner),
            MotionError::Driver(inner) => CommandError::Driver(inner),
        }
    }
}

type Result<T> = std::result::Result<T, CommandError>;

/// Parse one trimmed input line, picking the grammar the way the firmware
/// did: anything with a colon, or a bare `home`/`status`, is field form,
/// everything else is the compact single letter form.
pub fn parse_line(line: &str) -> Result<Command> {
    let line = line.trim();
    if line.contains(':')
        || line.eq_ignore_ascii_case("home")
        || line.eq_ignore_ascii_case("status")
    {
        parse_field(line)
    } else {
        parse_compact(line)
    }
}

/// Compact grammar: `F10`, `G15,20`, `H`, `P`, `R90`, `W90`, `C40`,
/// `O`/`X`/`T`. Case insensitive.
pub fn parse_compact(input: &str) -> Result<Command> {
    let input = input.trim();
    let mut chars = input.chars();
    let letter = chars
        .next()
        .ok_or_else(|| CommandError::InvalidFormat("empty command".to_owned()))?;
    let operand = chars.as_str().trim();

    match letter.to_ascii_uppercase() {
        'F' => Ok(Command::Move {
            direction: Direction::Forward,
            distance: parse_number(operand)?,
        }),
        'B' => Ok(Command::Move {
            direction: Direction::Backward,
            distance: parse_number(operand)?,
        }),
        'U' => Ok(Command::Move {
            direction: Direction::Up,
            distance: parse_number(operand)?,
        }),
        'D' => Ok(Command::Move {
            direction: Direction::Down,
            distance: parse_number(operand)?,
        }),
        'G' => {
            let (y, z) = parse_pair(operand)?;
            Ok(Command::Absolute(PlanarPosition::new(y, z)))
        }
        'H' => Ok(Command::Home),
        'P' => Ok(Command::PrintStatus),
        'R' => Ok(Command::RotateBase(parse_number(operand)?)),
        'W' => Ok(Command::SetWrist(parse_number(operand)?)),
        'C' => Ok(Command::SetGripper(GripperCommand::Angle(parse_number(
            operand,
        )?))),
        'O' => Ok(Command::SetGripper(GripperCommand::Open)),
        'X' => Ok(Command::SetGripper(GripperCommand::Close)),
        'T' => Ok(Command::SetGripper(GripperCommand::Tight)),
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

/// Field grammar: `move:<direction>[:<cm>]`, `position:<y>,<z>`,
/// `base:<deg>`, `wrist:<deg>`, `gripper:<open|close|tight|deg>` and bare
/// `home`/`status`. Lowercased before matching.
pub fn parse_field(input: &str) -> Result<Command> {
    let input = input.trim().to_ascii_lowercase();
    if input == "home" {
        return Ok(Command::Home);
    }
    if input == "status" {
        return Ok(Command::PrintStatus);
    }

    let (command, remainder) = input
        .split_once(':')
        .ok_or_else(|| CommandError::InvalidFormat(format!("missing ':' in {:?}", input)))?;

    match command {
        "move" => {
            let (direction, distance) = match remainder.split_once(':') {
                Some((direction, magnitude)) => (direction, parse_number(magnitude)?),
                None => (remainder, DEFAULT_MOVE_CM),
            };
            let direction = match direction {
                "forward" => Direction::Forward,
                "backward" => Direction::Backward,
                "up" => Direction::Up,
                "down" => Direction::Down,
                other => return Err(CommandError::UnknownDirection(other.to_owned())),
            };
            Ok(Command::Move {
                direction,
                distance,
            })
        }
        "position" => {
            let (y, z) = parse_pair(remainder)?;
            Ok(Command::Absolute(PlanarPosition::new(y, z)))
        }
        "base" => Ok(Command::RotateBase(parse_number(remainder)?)),
        "wrist" => Ok(Command::SetWrist(parse_number(remainder)?)),
        "gripper" => match remainder {
            "open" => Ok(Command::SetGripper(GripperCommand::Open)),
            "close" => Ok(Command::SetGripper(GripperCommand::Close)),
            "tight" => Ok(Command::SetGripper(GripperCommand::Tight)),
            angle => Ok(Command::SetGripper(GripperCommand::Angle(parse_number(
                angle,
            )?))),
        },
        other => Err(CommandError::UnknownCommand(other.to_owned())),
    }
}

fn parse_number(text: &str) -> Result<f32> {
    text.trim()
        .parse()
        .map_err(|_| CommandError::InvalidFormat(format!("expected a number, got {:?}", text)))
}

fn parse_pair(text: &str) -> Result<(f32, f32)> {
    let (first, second) = text
        .split_once(',')
        .ok_or_else(|| CommandError::InvalidFormat(format!("expected <y>,<z>, got {:?}", text)))?;
    Ok((parse_number(first)?, parse_number(second)?))
}

/// Outcome of one successfully executed command.
///
/// `clamped` reports the informational angle clamp; the move still ran.
/// `pose` is the state after execution, used by the status renderer and
/// by tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchOutcome {
    pub command: Command,
    pub clamped: bool,
    pub pose: Pose,
}

/// Run one command against the controller. Stateless per invocation;
/// every error is local to this command and the pose is untouched on
/// failure.
pub async fn dispatch(
    controller: &mut ArmController,
    command: Command,
) -> Result<DispatchOutcome> {
    let mut clamped = false;
    match &command {
        Command::Move {
            direction,
            distance,
        } => {
            let (delta_y, delta_z) = direction.delta(*distance);
            controller.move_relative(delta_y, delta_z).await?;
        }
        Command::Absolute(target) => {
            controller.move_to_position(*target).await?;
        }
        Command::RotateBase(angle) => {
            let applied = controller.set_base(*angle).await?;
            clamped = angles_differ(applied, *angle);
        }
        Command::SetWrist(angle) => {
            let applied = controller.set_wrist(*angle).await?;
            clamped = angles_differ(applied, *angle);
        }
        Command::SetGripper(gripper) => match gripper {
            GripperCommand::Angle(angle) => {
                let applied = controller.set_gripper(*angle).await?;
                clamped = angles_differ(applied, *angle);
            }
            GripperCommand::Open => {
                controller.open_gripper().await?;
            }
            GripperCommand::Close => {
                controller.close_gripper(false).await?;
            }
            GripperCommand::Tight => {
                controller.close_gripper(true).await?;
            }
        },
        Command::Home => controller.go_home().await?,
        Command::PrintStatus => {}
    }
    Ok(DispatchOutcome {
        command,
        clamped,
        pose: controller.pose(),
    })
}

// identity comparison on purpose, the clamp either changed the value or it
// did not
#[allow(clippy::float_cmp)]
fn angles_differ(applied: f32, requested: f32) -> bool {
    applied != requested
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm_config::ArmConfig;
    use crate::arm_controller::ArmController;
    use crate::arm_driver::RecordingDriver;

    fn test_controller() -> ArmController {
        let mut config = ArmConfig::included();
        config.motion.step_delay_ms = 0;
        ArmController::new(Box::new(RecordingDriver::new()), config)
    }

    #[test]
    fn compact_moves_parse() {
        assert_eq!(
            parse_line("F10").unwrap(),
            Command::Move {
                direction: Direction::Forward,
                distance: 10.0
            }
        );
        assert_eq!(
            parse_line("b2.5").unwrap(),
            Command::Move {
                direction: Direction::Backward,
                distance: 2.5
            }
        );
        assert_eq!(
            parse_line("G15,20").unwrap(),
            Command::Absolute(PlanarPosition::new(15.0, 20.0))
        );
        assert_eq!(parse_line("H").unwrap(), Command::Home);
        assert_eq!(parse_line("P").unwrap(), Command::PrintStatus);
        assert_eq!(parse_line("R90").unwrap(), Command::RotateBase(90.0));
        assert_eq!(
            parse_line("O").unwrap(),
            Command::SetGripper(GripperCommand::Open)
        );
        assert_eq!(
            parse_line("X").unwrap(),
            Command::SetGripper(GripperCommand::Close)
        );
        assert_eq!(
            parse_line("T").unwrap(),
            Command::SetGripper(GripperCommand::Tight)
        );
    }

    #[test]
    fn field_commands_parse() {
        assert_eq!(
            parse_line("move:forward:10").unwrap(),
            Command::Move {
                direction: Direction::Forward,
                distance: 10.0
            }
        );
        assert_eq!(
            parse_line("position:15,20").unwrap(),
            Command::Absolute(PlanarPosition::new(15.0, 20.0))
        );
        assert_eq!(parse_line("base:90").unwrap(), Command::RotateBase(90.0));
        assert_eq!(parse_line("wrist:45").unwrap(), Command::SetWrist(45.0));
        assert_eq!(
            parse_line("gripper:open").unwrap(),
            Command::SetGripper(GripperCommand::Open)
        );
        assert_eq!(
            parse_line("gripper:62").unwrap(),
            Command::SetGripper(GripperCommand::Angle(62.0))
        );
        assert_eq!(parse_line("home").unwrap(), Command::Home);
        assert_eq!(parse_line("STATUS").unwrap(), Command::PrintStatus);
    }

    #[test]
    fn both_grammars_produce_the_same_command() {
        assert_eq!(parse_line("F10").unwrap(), parse_line("move:forward:10").unwrap());
        assert_eq!(parse_line("G15,20").unwrap(), parse_line("position:15,20").unwrap());
        assert_eq!(parse_line("H").unwrap(), parse_line("home").unwrap());
        assert_eq!(parse_line("R90").unwrap(), parse_line("base:90").unwrap());
        assert_eq!(parse_line("T").unwrap(), parse_line("gripper:tight").unwrap());
    }

    #[test]
    fn missing_magnitude_defaults_to_five_cm() {
        assert_eq!(
            parse_line("move:up").unwrap(),
            Command::Move {
                direction: Direction::Up,
                distance: DEFAULT_MOVE_CM
            }
        );
    }

    #[test]
    fn malformed_input_yields_typed_errors() {
        assert!(matches!(
            parse_line("G10"),
            Err(CommandError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_line("Fabc"),
            Err(CommandError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_line("F"),
            Err(CommandError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_line("Q5"),
            Err(CommandError::UnknownCommand(_))
        ));
        assert!(matches!(
            parse_line("spin:90"),
            Err(CommandError::UnknownCommand(_))
        ));
        assert!(matches!(
            parse_line("move:sideways:5"),
            Err(CommandError::UnknownDirection(_))
        ));
        assert!(matches!(
            parse_line("position:15"),
            Err(CommandError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_line("gripper:wide"),
            Err(CommandError::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn compact_and_field_moves_are_equivalent() {
        let mut compact = test_controller();
        let mut field = test_controller();
        let first = dispatch(&mut compact, parse_line("B5").unwrap())
            .await
            .unwrap();
        let second = dispatch(&mut field, parse_line("move:backward:5").unwrap())
            .await
            .unwrap();
        assert_eq!(first.pose, second.pose);
        assert_eq!(compact.pose(), field.pose());
    }

    #[tokio::test]
    async fn equivalent_grammars_also_fail_identically() {
        // Forward 10 from home leaves the reachable annulus; both
        // grammars must reject it the same way and leave both poses
        // untouched and equal.
        let mut compact = test_controller();
        let mut field = test_controller();
        let first = dispatch(&mut compact, parse_line("F10").unwrap()).await;
        let second = dispatch(&mut field, parse_line("move:forward:10").unwrap()).await;
        assert!(matches!(first, Err(CommandError::OutOfReach(_))));
        assert!(matches!(second, Err(CommandError::OutOfReach(_))));
        assert_eq!(compact.pose(), field.pose());
    }

    #[tokio::test]
    async fn absolute_move_scenario_reports_through_status() {
        let mut controller = test_controller();
        let outcome = dispatch(&mut controller, parse_line("G12,10").unwrap())
            .await
            .unwrap();
        assert_eq!(outcome.pose.position, PlanarPosition::new(12.0, 10.0));
        let status = dispatch(&mut controller, parse_line("P").unwrap())
            .await
            .unwrap();
        assert_eq!(status.command, Command::PrintStatus);
        assert_eq!(status.pose, outcome.pose);
    }

    #[tokio::test]
    async fn target_inside_minimum_reach_is_rejected_from_both_grammars() {
        // (10, 10) is inside the minimum reach margin of the calibrated
        // geometry, so the absolute move fails the same way on both
        // grammars and never touches the pose.
        let mut controller = test_controller();
        let before = controller.pose();
        let compact = dispatch(&mut controller, parse_line("G10,10").unwrap()).await;
        assert!(matches!(compact, Err(CommandError::OutOfReach(_))));
        let field = dispatch(&mut controller, parse_line("position:10,10").unwrap()).await;
        assert!(matches!(field, Err(CommandError::OutOfReach(_))));
        assert_eq!(controller.pose(), before);
    }

    #[tokio::test]
    async fn clamped_absolute_target_can_still_be_out_of_reach() {
        let mut controller = test_controller();
        let before = controller.pose();
        let result = dispatch(&mut controller, parse_line("G100,100").unwrap()).await;
        assert!(matches!(result, Err(CommandError::OutOfReach(_))));
        assert_eq!(controller.pose(), before);
    }

    #[tokio::test]
    async fn gripper_angles_clamp_to_the_open_range() {
        let mut controller = test_controller();
        let outcome = dispatch(&mut controller, parse_line("gripper:150").unwrap())
            .await
            .unwrap();
        assert!(outcome.clamped);
        assert_eq!(outcome.pose.gripper, 90.0);

        let outcome = dispatch(&mut controller, parse_line("C91").unwrap())
            .await
            .unwrap();
        assert!(outcome.clamped);
        assert_eq!(outcome.pose.gripper, 90.0);

        let outcome = dispatch(&mut controller, parse_line("gripper:-10").unwrap())
            .await
            .unwrap();
        assert!(outcome.clamped);
        assert_eq!(outcome.pose.gripper, 0.0);

        let outcome = dispatch(&mut controller, parse_line("C40").unwrap())
            .await
            .unwrap();
        assert!(!outcome.clamped);
        assert_eq!(outcome.pose.gripper, 40.0);
    }

    #[tokio::test]
    async fn home_twice_matches_home_once() {
        let mut controller = test_controller();
        dispatch(&mut controller, parse_line("G12,18").unwrap())
            .await
            .unwrap();
        let once = dispatch(&mut controller, parse_line("home").unwrap())
            .await
            .unwrap();
        let twice = dispatch(&mut controller, parse_line("H").unwrap())
            .await
            .unwrap();
        assert_eq!(once.pose, twice.pose);
    }

    #[tokio::test]
    async fn status_does_not_move_anything() {
        let mut controller = test_controller();
        let before = controller.pose();
        let outcome = dispatch(&mut controller, parse_line("status").unwrap())
            .await
            .unwrap();
        assert_eq!(outcome.pose, before);
    }
}
