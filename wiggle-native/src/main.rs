mod app;
mod input;
mod loader;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use wiggle_core::RendererConfig;

/// Wiggle viewer: a photo displaced by its depth map, swayed side to side.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args
{
  /// Photo to display (any format the `image` crate decodes).
  #[arg(long)]
  pub image: PathBuf,

  /// Depth or disparity map; 8/16-bit greyscale or 32-bit float.
  #[arg(long)]
  pub depth: Option<PathBuf>,

  /// Camera intrinsics JSON: focal_length, principal_point, reference_dimensions.
  #[arg(long)]
  pub intrinsics: Option<PathBuf>,

  /// Renderer configuration JSON; missing fields keep their defaults.
  #[arg(long)]
  pub config: Option<PathBuf>,

  /// EXIF orientation tag of the photo (1..=8).
  #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=8))]
  pub orientation: u32,

  #[arg(long)]
  pub rows: Option<u32>,

  #[arg(long)]
  pub columns: Option<u32>,

  /// Peak pan of the wiggle, in degrees.
  #[arg(long, default_value_t = 3.0)]
  pub wiggle_degrees: f32,

  /// Full left-right-left cycles per second.
  #[arg(long, default_value_t = 0.75)]
  pub wiggle_hz: f32,
}

impl Args
{
  fn renderer_config(&self) -> anyhow::Result<RendererConfig>
  {
    let mut config = match &self.config
    {
      Some(path) => RendererConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
      None => RendererConfig::default(),
    };

    if let Some(rows) = self.rows
    {
      config.rows = rows;
    }
    if let Some(columns) = self.columns
    {
      config.columns = columns;
    }

    config.validate().context("invalid renderer configuration")?;
    Ok(config)
  }
}

fn main() -> anyhow::Result<()>
{
  // RUST_LOG overrides; wgpu_hal is noisy at info.
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info,wgpu_hal=off,naga=warn")).init();

  let args = Args::parse();
  let config = args.renderer_config()?;

  app::run(args, config)
}
