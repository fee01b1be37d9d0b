//! hackerbot-chat - chat with the Hackerbot arm camera.
//!
//! Each line typed is answered about the current camera view. `/locate` asks for a bounding
//! box and saves an annotated frame, `/center` also pans and tilts the arm onto the object.

use anyhow::{Context, Result};
use clap::Parser;
use hackerbot_vision::assistant::{run_repl, Assistant, TerminalSurface};
use hackerbot_vision::config::AssistantConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Ask a vision model about the Hackerbot arm camera, \
             locate objects and center the arm on them"
)]
struct Args {
    /// Model provider: gemini or ollama.
    #[arg(long, env = "HACKERBOT_PROVIDER")]
    provider: Option<String>,

    /// Assistant variant: arm (chat, locate, center) or locate (chat, locate).
    #[arg(long, env = "HACKERBOT_VARIANT")]
    variant: Option<String>,

    /// Model identifier; defaults to the variant's model for the provider.
    #[arg(long, env = "HACKERBOT_MODEL")]
    model: Option<String>,

    /// Camera locator: /dev/videoN, N, file://path or stub://.
    #[arg(long, env = "HACKERBOT_CAMERA")]
    camera: Option<String>,

    /// Arm serial device, or dry-run to only log moves.
    #[arg(long, env = "HACKERBOT_ARM")]
    arm: Option<String>,

    /// Directory camera and annotated images are written to.
    #[arg(long, env = "HACKERBOT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut config = AssistantConfig::from_env().context("failed to read configuration")?;
    config.apply_overrides(
        args.provider.as_deref(),
        args.variant.as_deref(),
        args.model.as_deref(),
    )?;
    if let Some(camera) = args.camera {
        config.camera.device = camera;
    }
    if let Some(arm) = args.arm {
        config.arm.device = arm;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }

    let hardware = Arc::new(config.build_hardware().context("failed to open hardware")?);
    let assistant = Assistant::from_config(&config, hardware)
        .context("failed to connect to the model provider")?;
    info!(
        variant = %config.variant.name,
        model = %config.variant.model,
        camera = %config.camera.device,
        output_dir = %config.output_dir.display(),
        "Hackerbot assistant ready"
    );

    println!("Hackerbot vision assistant. Type /quit to exit.\n");
    let surface = TerminalSurface::stdout(&config.output_dir);
    run_repl(&assistant, &surface, BufReader::new(tokio::io::stdin())).await?;

    Ok(())
}
