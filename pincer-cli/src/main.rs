mod logging;
mod render;

use anyhow::Result;
use clap::Parser;
use pincer_controller::{
    arm_config::ArmConfig,
    arm_controller::ArmController,
    arm_driver::{ArmDriver, SerialArmDriver, SinkDriver},
    command,
};
use std::fmt;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::{
    tcp::{OwnedReadHalf, OwnedWriteHalf},
    TcpListener,
};

#[derive(Parser)]
#[command(author, version, about = "Two channel command console for a 5 joint hobby arm")]
struct Args {
    /// Serial device of the servo controller; dry run when omitted
    #[arg(short, long)]
    port: Option<String>,

    /// Listen address for the wireless text channel
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Arm configuration file, JSON or YAML; built in calibration when
    /// omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Sets the level of verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Which transport a line arrived on. Used for logging and for routing
/// the acknowledgment back, never for behavioral branching.
#[derive(Debug, Clone, Copy)]
enum Channel {
    Local,
    Wireless,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Local => write!(f, "local"),
            Channel::Wireless => write!(f, "wireless"),
        }
    }
}

struct WirelessClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::setup_tracing(args.verbose);

    let config = load_config(&args)?;
    let driver: Box<dyn ArmDriver> = match &args.port {
        Some(port) => {
            tracing::info!(%port, "connecting to servo controller");
            SerialArmDriver::new(port, config.clone()).await?
        }
        None => {
            tracing::info!("no serial port given, running against the sink driver");
            Box::new(SinkDriver)
        }
    };

    let mut controller = ArmController::new(driver, config);
    controller.go_home().await?;

    println!("{}", render::BANNER);
    println!();
    println!("{}", render::pose_report(&controller.pose(), controller.config()));

    let listener = match args.listen {
        Some(address) => {
            let listener = TcpListener::bind(address).await?;
            tracing::info!(%address, "wireless channel listening");
            Some(listener)
        }
        None => None,
    };

    let stdin = BufReader::new(tokio::io::stdin());
    let mut local_lines = stdin.lines();
    let mut client: Option<WirelessClient> = None;

    loop {
        tokio::select! {
            line = local_lines.next_line() => {
                match line? {
                    Some(line) => {
                        if let Some(ack) = handle_line(&mut controller, Channel::Local, &line).await {
                            println!("{}", ack);
                        }
                    }
                    None => break,
                }
            }
            accepted = accept_client(listener.as_ref()), if client.is_none() => {
                let (stream, peer) = accepted?;
                tracing::info!(%peer, "wireless client connected");
                let (read, write) = stream.into_split();
                client = Some(WirelessClient {
                    lines: BufReader::new(read).lines(),
                    writer: write,
                });
            }
            line = next_wireless_line(client.as_mut()) => {
                match line {
                    Ok(Some(line)) => {
                        tracing::debug!(%line, "wireless received");
                        if let Some(ack) = handle_line(&mut controller, Channel::Wireless, &line).await {
                            let mut ack_failed = false;
                            if let Some(wireless) = client.as_mut() {
                                if let Err(error) = wireless
                                    .writer
                                    .write_all(format!("{}\n", ack).as_bytes())
                                    .await
                                {
                                    tracing::warn!(%error, "failed to acknowledge wireless client");
                                    ack_failed = true;
                                }
                            }
                            if ack_failed {
                                client = None;
                            }
                        }
                    }
                    Ok(None) => {
                        tracing::info!("wireless client disconnected");
                        client = None;
                    }
                    Err(error) => {
                        tracing::warn!(%error, "wireless read failed");
                        client = None;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Detected Ctrl+c");
                break;
            }
        }
    }

    tracing::info!("Moving to home");
    controller.go_home().await?;
    Ok(())
}

fn load_config(args: &Args) -> Result<ArmConfig> {
    let config = match &args.config {
        Some(path) if path.ends_with(".yaml") || path.ends_with(".yml") => {
            ArmConfig::load_yaml(path)?
        }
        Some(path) => ArmConfig::load_json(path)?,
        None => ArmConfig::included(),
    };
    Ok(config)
}

async fn accept_client(
    listener: Option<&TcpListener>,
) -> std::io::Result<(tokio::net::TcpStream, SocketAddr)> {
    match listener {
        Some(listener) => listener.accept().await,
        None => std::future::pending().await,
    }
}

async fn next_wireless_line(
    client: Option<&mut WirelessClient>,
) -> std::io::Result<Option<String>> {
    match client {
        Some(client) => client.lines.next_line().await,
        None => std::future::pending().await,
    }
}

/// Parse and run one line to completion. Commands from either channel are
/// fully serialized: the select loop is not re-entered until this
/// returns, so a move can never interleave with another command.
async fn handle_line(
    controller: &mut ArmController,
    channel: Channel,
    line: &str,
) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    tracing::debug!(%channel, line, "processing command");

    let result = match command::parse_line(line) {
        Ok(parsed) => command::dispatch(controller, parsed).await,
        Err(error) => Err(error),
    };

    match result {
        Ok(outcome) => {
            if outcome.clamped {
                tracing::warn!(
                    %channel,
                    command = outcome.command.family(),
                    "requested angle outside joint range, clamped"
                );
            }
            if outcome.command == command::Command::PrintStatus {
                println!("{}", render::pose_report(&outcome.pose, controller.config()));
            }
            Some(render::ack_ok(&outcome))
        }
        Err(error) => {
            tracing::warn!(%channel, %error, "command rejected");
            Some(render::ack_error(&error))
        }
    }
}
