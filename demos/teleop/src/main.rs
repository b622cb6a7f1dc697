//! teleop-drive
//!
//! Connects to a robot controller, negotiates a session, drives the base
//! forward at a constant speed for a while and logs the odometry it reports.
//! Control is released on exit, including on Ctrl-C.
//!
//! Log level comes from `RUST_LOG` (default `info`).

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use teleop_link::client::{ActiveSession, ClientConfigBuilder, HandshakeOrchestrator};
use teleop_link::control::ControlPlaneClient;
use teleop_link::core::VersionPolicy;
use teleop_link::core::constants::DEFAULT_CONTROL_PORT;
use teleop_link::proto::{ApiDown, ProtoCodec};
use tokio::time::{Instant, timeout_at};
use tracing::{info, warn};

/// Drive a robot base over the teleoperation link
#[derive(Parser, Debug)]
#[command(name = "teleop-drive")]
#[command(version)]
struct Args {
    /// Controller host name or address
    host: String,

    /// Controller WebSocket port
    #[arg(short, long, default_value_t = DEFAULT_CONTROL_PORT)]
    port: u16,

    /// How long to drive, in seconds
    #[arg(short, long, default_value_t = 5.0)]
    duration: f64,

    /// Forward speed in m/s
    #[arg(short, long, default_value_t = 0.1)]
    speed: f32,

    /// Command period in milliseconds
    #[arg(long, default_value_t = 20)]
    period_ms: u64,

    /// Stay on the WebSocket control plane, no KCP data plane
    #[arg(long)]
    no_data_plane: bool,

    /// Abort on protocol version mismatch instead of warning
    #[arg(long)]
    strict: bool,
}

type Session = ActiveSession<ControlPlaneClient, ProtoCodec>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let policy = if args.strict {
        VersionPolicy::Strict
    } else {
        VersionPolicy::Warn
    };
    let config = ClientConfigBuilder::new(args.host.as_str())
        .control_port(args.port)
        .data_plane(!args.no_data_plane)
        .version(1, policy)
        .build();

    let mut active = HandshakeOrchestrator::connect(config, ProtoCodec)
        .await
        .context("handshake failed")?;
    let session = active.session();
    info!(
        session_id = session.session_id(),
        remote = ?session.remote_endpoint(),
        "session ready"
    );

    let drive_for = Duration::from_secs_f64(args.duration.max(0.0));
    let period = Duration::from_millis(args.period_ms.max(1));
    let outcome = tokio::select! {
        result = drive(&mut active, args.speed, period, drive_for) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }
    };

    if let Some(stats) = active.tunnel_stats() {
        info!(?stats, "data plane counters");
    }
    active.deinit().await.context("release failed")?;
    outcome
}

async fn drive(active: &mut Session, speed: f32, period: Duration, drive_for: Duration) -> Result<()> {
    let deadline = Instant::now() + drive_for;
    let mut next_command = Instant::now();
    let mut reports: u64 = 0;

    loop {
        match timeout_at(next_command, active.recv()).await {
            Ok(Some(status)) => {
                reports += 1;
                if let Some(odom) = status.odometry() {
                    if reports % 50 == 1 {
                        info!(
                            x = odom.pos_x,
                            y = odom.pos_y,
                            yaw = odom.pos_z,
                            vx = odom.speed_x,
                            "odometry"
                        );
                    }
                }
            }
            Ok(None) => {
                warn!("status stream ended");
                return Ok(());
            }
            Err(_) => {
                if Instant::now() >= deadline {
                    break;
                }
                active.send(&ApiDown::base_move(speed, 0.0, 0.0)).await?;
                active.maintain().await?;
                next_command += period;
            }
        }
    }

    // Stop the base before releasing control.
    active.send(&ApiDown::base_move(0.0, 0.0, 0.0)).await?;
    info!(reports, "drive finished");
    Ok(())
}
