use thiserror::Error;

/// Failure to bring up a renderer. Fatal for the session, never retried.
#[derive(Debug, Error)]
pub enum RendererError
{
  #[error("failed to create surface: {0}")]
  CreateSurface(#[from] wgpu::CreateSurfaceError),

  #[error("no compatible GPU adapter: {0}")]
  NoAdapter(#[from] wgpu::RequestAdapterError),

  #[error("failed to create device: {0}")]
  RequestDevice(#[from] wgpu::RequestDeviceError),

  #[error("surface reports no supported formats for this adapter")]
  UnsupportedSurface,

  #[error(transparent)]
  Mesh(#[from] MeshError),

  #[error(transparent)]
  Config(#[from] ConfigError),
}

/// Failure while producing a single frame.
#[derive(Debug, Error)]
pub enum RenderError
{
  #[error("surface error: {0}")]
  Surface(#[from] wgpu::SurfaceError),

  #[error("renderer has been torn down")]
  TornDown,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError
{
  #[error("mesh grid needs at least 2x2 vertices, got {rows}x{columns}")]
  InvalidGrid
  {
    rows: u32,
    columns: u32,
  },
}

/// Reasons a depth map update was not (or only partially) taken into account.
/// The mesh geometry is left untouched whenever one of these is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DepthMapError
{
  #[error("depth buffer is empty")]
  EmptyBuffer,

  #[error("depth buffer holds {actual} samples, {expected} required for its dimensions")]
  BufferTooSmall
  {
    expected: usize,
    actual: usize,
  },

  #[error("depth buffer of {width}x{height} with stride {stride} exceeds addressable memory")]
  DimensionsOverflow
  {
    width: usize,
    height: usize,
    stride: usize,
  },

  #[error("depth row stride {stride} is smaller than width {width}")]
  InvalidStride
  {
    stride: usize,
    width: usize,
  },

  #[error("intrinsic reference dimensions {width}x{height} cannot be reconciled with the buffer")]
  InvalidReferenceDimensions
  {
    width: f32,
    height: f32,
  },

  #[error("depth update {ticket} superseded by update {latest}")]
  Superseded
  {
    ticket: u64,
    latest: u64,
  },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextureError
{
  #[error("texture dimensions {width}x{height} are invalid")]
  InvalidDimensions
  {
    width: u32,
    height: u32,
  },

  #[error("texture {width}x{height} exceeds the device limit of {limit}")]
  TooLarge
  {
    width: u32,
    height: u32,
    limit: u32,
  },
}

#[derive(Debug, Error)]
pub enum ConfigError
{
  #[error("failed to read config: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to parse config: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("invalid config: {0}")]
  Invalid(String),
}
