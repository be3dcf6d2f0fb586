//! RGBD Player command line
//!
//! - `inspect`: fetch a video and print its fingerprint and calibration
//! - `reconstruct`: reconstruct one decoded frame into an ASCII PLY point cloud

use clap::{Parser, Subcommand};
use rgbd_cloud::RgbdFrame;
use rgbd_player::{
    AssetController, JsonFileSettings, MemorySettings, PlayerConfig, SettingsStore, StillBackend,
    VideoSize,
};
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info};

/// Point-cloud player for hue-encoded RGBD videos
#[derive(Parser, Debug)]
#[command(name = "rgbd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Skip the on-disk video cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print fingerprint, intrinsics and trailer fields of a video
    Inspect {
        /// URL or path of the video
        url: String,
    },
    /// Reconstruct a decoded frame of a video into a PLY point cloud
    Reconstruct {
        /// URL or path of the video
        url: String,
        /// Decoded frame as an image, depth half on the left
        #[arg(short, long)]
        frame: PathBuf,
        /// Output PLY file
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long)]
        near: Option<f32>,
        #[arg(long)]
        far: Option<f32>,
        #[arg(long)]
        flatness: Option<f32>,
        #[arg(long)]
        scale: Option<f32>,
        /// Color points by their encoded depth instead of the color half
        #[arg(long)]
        show_depth_map: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut config = PlayerConfig::load_or_default(args.config.as_deref())?;
    if args.no_cache {
        config.cache_enabled = false;
    }

    match args.command {
        Command::Inspect { url } => inspect(&config, &url).await,
        Command::Reconstruct {
            url,
            frame,
            out,
            near,
            far,
            flatness,
            scale,
            show_depth_map,
        } => {
            let image = image::open(&frame)?.to_rgb8();
            let frame = RgbdFrame::new(image)?;
            let (width, height) = frame.stored_size();
            let backend = StillBackend::new(Some(VideoSize::new(width, height)));
            let mut controller = controller(&config, backend);

            controller.load_and_wait(&url).await?;
            controller.pump();

            if let Some(far) = far {
                controller.set_range_far(far);
            }
            if let Some(near) = near {
                controller.set_range_near(near);
            }
            if let Some(flatness) = flatness {
                controller.set_flatness(flatness);
            }
            if let Some(scale) = scale {
                controller.set_scale(scale);
            }
            if show_depth_map {
                controller.set_show_depth_map(true);
            }

            let (cloud, stats) = controller.reconstruct_cloud(&frame);
            cloud.write_ply(BufWriter::new(File::create(&out)?))?;
            info!(
                "Wrote {} points to {} ({} rejected)",
                cloud.len(),
                out.display(),
                stats.rejected()
            );
            Ok(())
        }
    }
}

async fn inspect(config: &PlayerConfig, url: &str) -> Result<(), Box<dyn Error>> {
    let mut controller = controller(config, StillBackend::new(None));
    controller.load_and_wait(url).await?;
    let Some(asset) = controller.asset() else {
        return Err("load finished without an asset".into());
    };

    let k = asset.intrinsics();
    let inverse = asset.inverse();
    println!("url:          {}", asset.url());
    println!("bytes:        {}", asset.bytes().len());
    println!("fingerprint:  {}", asset.fingerprint());
    println!(
        "intrinsics:   fx {} fy {} cx {} cy {}",
        k.fx(),
        k.fy(),
        k.cx(),
        k.cy()
    );
    println!(
        "inverse:      ifx {} ify {} itx {} ity {}",
        inverse.ifx, inverse.ify, inverse.itx, inverse.ity
    );
    let params = controller.params();
    println!("parameters:   {}", serde_json::to_string(params)?);
    for (key, value) in asset.extra() {
        println!("{key}: {value}");
    }
    Ok(())
}

fn controller(config: &PlayerConfig, backend: StillBackend) -> AssetController {
    let settings: Arc<dyn SettingsStore> = match config.settings_path() {
        Some(path) => Arc::new(JsonFileSettings::new(path)),
        None => Arc::new(MemorySettings::new()),
    };
    let mut controller = AssetController::new(Handle::current(), Arc::new(backend))
        .with_settings(settings)
        .with_defaults(config.defaults)
        .with_progress_observer(|p| {
            if p.is_complete() {
                info!("Downloaded {} bytes", p.loaded);
            } else {
                debug!("Downloaded {} bytes ({:.0}%)", p.loaded, p.progress * 100.0);
            }
        });
    if let Some(cache) = config.disk_cache() {
        info!("Caching videos in {}", cache.root().display());
        controller = controller.with_cache(Arc::new(cache));
    }
    controller
}
