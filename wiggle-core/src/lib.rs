//! Depth-displaced photo rendering: a photo is draped over a lattice mesh
//! whose vertices are pushed along +Z by a depth map, then viewed through a
//! movable camera to give the "wiggle" parallax effect.

pub mod camera;
pub mod config;
pub mod depth;
pub mod error;
pub mod matrix;
pub mod mesh;
pub mod orientation;
pub mod renderer;

pub use camera::Camera;
pub use config::{CameraPose, DisplacementMapping, RendererConfig};
pub use depth::{min_max, CameraIntrinsics, DepthBuffer, DepthRange};
pub use error::{ConfigError, DepthMapError, MeshError, RenderError, RendererError, TextureError};
pub use mesh::{DepthMapHandle, DepthUpdate, MeshGrid, MeshModel};
pub use orientation::ImageOrientation;
pub use renderer::{FrameDelegate, FrameStats, RenderOutcome, Renderer, RendererState};
