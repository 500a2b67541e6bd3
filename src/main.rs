use std::path::PathBuf;

use clap::Parser;
use model_capture::{CaptureSessionBuilder, Uploader, sequence};

/// Renders a model and returns colour and depth snapshots to a server.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the model file (glTF, GLB, OBJ, ...)
    model: PathBuf,

    /// Base URL of the collection server
    #[arg(long, env = "CAPTURE_SERVER", default_value = "http://127.0.0.1:8000")]
    server: String,

    /// Viewport size as WIDTHxHEIGHT
    #[arg(long, default_value = "800x600", value_parser = parse_size)]
    size: (u32, u32),

    /// Also write each snapshot into this directory
    #[arg(long)]
    keep: Option<PathBuf>,
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got [{value}]"))?;
    let w = w.parse().map_err(|_| format!("bad width [{w}]"))?;
    let h = h.parse().map_err(|_| format!("bad height [{h}]"))?;
    Ok((w, h))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let session = CaptureSessionBuilder::new(args.model)
        .with_size(args.size)
        .build()?;
    let uploader = Uploader::new(&args.server)?;

    let report = tokio::task::spawn_blocking({
        let uploader = uploader.clone();
        let keep = args.keep.clone();
        move || sequence::run(session, &uploader, keep.as_deref())
    })
    .await?;

    // Upload outcomes are logged by the tasks; waiting here just keeps the
    // process alive until both requests have finished.
    let (image, depth) = report.wait().await;
    log::debug!("image outcome: {image:?}, depth outcome: {depth:?}");
    Ok(())
}
