//! hackerbot-mcp - MCP server exposing the Hackerbot arm camera over stdio.
//!
//! stdout carries the protocol, so all logging goes to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use hackerbot_vision::hardware::{
    open_frame_source, CameraConfig, SharedHardware, DEFAULT_TOOL_CAMERA,
};
use hackerbot_vision::mcp::{serve_stdio, HackerbotMcp};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "MCP tool server serving images from the Hackerbot arm camera")]
struct Args {
    /// Camera locator: /dev/videoN, N, file://path or stub://.
    #[arg(long, env = "HACKERBOT_CAMERA", default_value = DEFAULT_TOOL_CAMERA)]
    camera: String,

    #[arg(long, env = "HACKERBOT_CAPTURE_WIDTH", default_value_t = 640)]
    width: u32,

    #[arg(long, env = "HACKERBOT_CAPTURE_HEIGHT", default_value_t = 480)]
    height: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
    let args = Args::parse();

    let camera = open_frame_source(&CameraConfig {
        device: args.camera,
        width: args.width,
        height: args.height,
        ..CameraConfig::default()
    })
    .context("failed to open camera")?;
    let hardware = Arc::new(SharedHardware::new(camera, None));

    serve_stdio(
        HackerbotMcp::new(hardware),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await?;

    Ok(())
}
