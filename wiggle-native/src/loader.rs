use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::Context;
use glam::Vec2;
use image::DynamicImage;
use log::info;
use wiggle_core::{CameraIntrinsics, DepthBuffer, DepthMapHandle, DepthUpdate};

//
// ──────────────────────────────────────────────────────────────
//   Background loading
//
//   Decoding runs on a worker thread. The photo is sent back to
//   the event loop (GPU uploads stay there); the depth map is
//   applied straight through the DepthMapHandle.
// ──────────────────────────────────────────────────────────────
//

pub enum Loaded
{
  Photo(DynamicImage),
  Depth(DepthUpdate),
  /// The photo stays flat.
  DepthRejected(anyhow::Error),
  Failed(anyhow::Error),
}

pub struct LoadRequest
{
  pub image: PathBuf,
  pub depth: Option<PathBuf>,
  pub intrinsics: Option<PathBuf>,
}

pub fn spawn(request: LoadRequest, depth_handle: DepthMapHandle) -> anyhow::Result<Receiver<Loaded>>
{
  let (tx, rx) = mpsc::channel();

  thread::Builder::new()
    .name("wiggle-loader".into())
    .spawn(move || load(request, depth_handle, &tx))
    .context("starting loader thread")?;

  Ok(rx)
}

fn load(request: LoadRequest, depth_handle: DepthMapHandle, tx: &Sender<Loaded>)
{
  let photo = match image::open(&request.image).with_context(|| format!("opening {}", request.image.display()))
  {
    Ok(photo) => photo,
    Err(err) =>
    {
      let _ = tx.send(Loaded::Failed(err));
      return;
    }
  };

  let photo_size = Vec2::new(photo.width() as f32, photo.height() as f32);
  info!("Decoded {} ({}x{})", request.image.display(), photo.width(), photo.height());

  if tx.send(Loaded::Photo(photo)).is_err()
  {
    return;
  }

  let Some(depth_path) = &request.depth
  else
  {
    return;
  };

  let message = match apply_depth(depth_path, request.intrinsics.as_deref(), photo_size, &depth_handle)
  {
    Ok(update) => Loaded::Depth(update),
    Err(err) => Loaded::DepthRejected(err),
  };

  let _ = tx.send(message);
}

fn apply_depth(
  path: &Path,
  intrinsics_path: Option<&Path>,
  photo_size: Vec2,
  depth_handle: &DepthMapHandle,
) -> anyhow::Result<DepthUpdate>
{
  let image = image::open(path).with_context(|| format!("opening depth map {}", path.display()))?;
  let depth = depth_from_image(image)?;

  let intrinsics = match intrinsics_path
  {
    Some(path) => load_intrinsics(path)?,
    None => default_intrinsics(photo_size),
  };

  let update = depth_handle.set_depth_map(&depth, intrinsics.matrix(), intrinsics.reference_dimensions)?;
  Ok(update)
}

/// Greyscale 16-bit maps keep their fixed-point samples, float maps use
/// the first channel, anything else goes through normalized luma.
pub fn depth_from_image(image: DynamicImage) -> anyhow::Result<DepthBuffer>
{
  let (width, height) = (image.width() as usize, image.height() as usize);

  let depth = match image
  {
    DynamicImage::ImageLuma16(gray) => DepthBuffer::from_u16(width, height, gray.into_raw())?,
    DynamicImage::ImageRgb32F(rgb) => DepthBuffer::from_f32(width, height, rgb.pixels().map(|p| p[0]).collect())?,
    DynamicImage::ImageRgba32F(rgba) => DepthBuffer::from_f32(width, height, rgba.pixels().map(|p| p[0]).collect())?,
    other => DepthBuffer::from_f32(width, height, other.to_luma32f().into_raw())?,
  };

  Ok(depth)
}

fn load_intrinsics(path: &Path) -> anyhow::Result<CameraIntrinsics>
{
  let text = std::fs::read_to_string(path).with_context(|| format!("reading intrinsics {}", path.display()))?;
  let intrinsics = serde_json::from_str(&text).with_context(|| format!("parsing intrinsics {}", path.display()))?;
  Ok(intrinsics)
}

/// Roughly a 53 degree lens centred on the photo.
fn default_intrinsics(photo_size: Vec2) -> CameraIntrinsics
{
  CameraIntrinsics::centred(photo_size.max_element(), photo_size)
}

#[cfg(test)]
mod tests
{
  use super::*;
  use image::{GrayImage, ImageBuffer, Luma};
  use wiggle_core::{DisplacementMapping, MeshGrid};

  fn handle() -> DepthMapHandle
  {
    DepthMapHandle::detached(MeshGrid::new(4, 4).unwrap(), DisplacementMapping::default())
  }

  #[test]
  fn missing_photo_is_reported()
  {
    let request = LoadRequest { image: "does/not/exist.png".into(), depth: None, intrinsics: None };
    let rx = spawn(request, handle()).unwrap();

    assert!(matches!(rx.recv().unwrap(), Loaded::Failed(_)));
    assert!(rx.recv().is_err());
  }

  #[test]
  fn photo_and_depth_are_delivered()
  {
    let dir = std::env::temp_dir().join(format!("wiggle-loader-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let photo = dir.join("photo.png");
    let depth = dir.join("depth.png");
    GrayImage::from_pixel(8, 6, Luma([128])).save(&photo).unwrap();
    GrayImage::from_fn(8, 6, |_, y| Luma([(y * 40 + 10) as u8])).save(&depth).unwrap();

    let request = LoadRequest { image: photo, depth: Some(depth), intrinsics: None };
    let rx = spawn(request, handle()).unwrap();

    assert!(matches!(rx.recv().unwrap(), Loaded::Photo(p) if p.width() == 8));
    match rx.recv().unwrap()
    {
      Loaded::Depth(update) => assert_eq!(update.version, 1),
      _ => panic!("expected a depth update"),
    }

    let _ = std::fs::remove_dir_all(&dir);
  }

  #[test]
  fn eight_bit_maps_are_normalized()
  {
    let image = DynamicImage::ImageLuma8(GrayImage::from_fn(4, 2, |x, _| Luma([(x * 85) as u8])));
    let depth = depth_from_image(image).unwrap();

    assert_eq!((depth.width(), depth.height()), (4, 2));
    assert_eq!(depth.sample(0, 0), None);
    assert!((depth.sample(3, 1).unwrap() - 1.0).abs() < 1e-6);
  }

  #[test]
  fn sixteen_bit_maps_keep_fixed_point_samples()
  {
    let image: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_pixel(2, 2, Luma([1500]));
    let depth = depth_from_image(DynamicImage::ImageLuma16(image)).unwrap();
    assert!((depth.sample(1, 1).unwrap() - 1.5).abs() < 1e-6);
  }

  #[test]
  fn default_intrinsics_are_centred()
  {
    let intrinsics = default_intrinsics(Vec2::new(400.0, 300.0));
    assert_eq!(intrinsics.principal_point, Vec2::new(200.0, 150.0));
    assert_eq!(intrinsics.focal_length, Vec2::splat(400.0));
  }
}
