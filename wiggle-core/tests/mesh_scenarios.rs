use glam::Vec2;
use wiggle_core::{CameraIntrinsics, DepthBuffer, DepthMapError, DisplacementMapping, MeshGrid};

const EPS: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool
{
  (a - b).abs() < EPS
}

/// 8x8 buffer whose rows brighten (get nearer) from top to bottom.
fn vertical_gradient() -> DepthBuffer
{
  let data = (0..8).flat_map(|y| std::iter::repeat((y + 1) as f32 / 8.0).take(8)).collect();
  DepthBuffer::from_f32(8, 8, data).unwrap()
}

fn row_z(grid: &MeshGrid, row: u32) -> Vec<f32>
{
  let columns = grid.columns() as usize;
  let start = row as usize * columns;
  grid.vertices()[start..start + columns].iter().map(|v| v.position[2]).collect()
}

#[test]
fn gradient_displaces_rows_top_to_bottom()
{
  let mut grid = MeshGrid::new(4, 4).unwrap();
  let intrinsics = CameraIntrinsics::centred(500.0, Vec2::new(8.0, 8.0));
  let mapping = DisplacementMapping::default();

  let update = grid.set_depth_map(&vertical_gradient(), &intrinsics, &mapping).unwrap();
  assert_eq!(update.version, 1);
  assert_eq!(update.neutral, 0);
  assert_eq!(update.skipped, 0);

  let rows: Vec<Vec<f32>> = (0..4).map(|r| row_z(&grid, r)).collect();

  // Every row is flat; rows step forward towards the viewer.
  for row in &rows
  {
    assert!(row.iter().all(|z| approx(*z, row[0])), "{row:?}");
  }
  for pair in rows.windows(2)
  {
    assert!(pair[1][0] > pair[0][0], "{rows:?}");
  }

  assert!(approx(rows[0][0], mapping.min_displacement));
  assert!(approx(rows[3][0], mapping.max_displacement));
}

#[test]
fn gradient_survives_a_rescaled_calibration()
{
  // Calibrated on a 4032x4032 sensor, applied to an 8x8 map.
  let mut grid = MeshGrid::new(4, 4).unwrap();
  let intrinsics = CameraIntrinsics::centred(2800.0, Vec2::new(4032.0, 4032.0));
  let update = grid.set_depth_map(&vertical_gradient(), &intrinsics, &DisplacementMapping::default()).unwrap();

  assert!(approx(update.intrinsics.principal_point.x, 4.0));
  assert!(approx(update.intrinsics.focal_length.y, 2800.0 * 8.0 / 4032.0));
  assert!(row_z(&grid, 3)[0] > row_z(&grid, 0)[0]);
}

#[test]
fn quarter_turn_depth_orientation_moves_gradient_across_columns()
{
  let mut grid = MeshGrid::new(4, 4).unwrap();
  grid.set_depth_map_orientation(std::f32::consts::FRAC_PI_2);

  let intrinsics = CameraIntrinsics::centred(500.0, Vec2::new(8.0, 8.0));
  grid.set_depth_map(&vertical_gradient(), &intrinsics, &DisplacementMapping::default()).unwrap();

  let top = row_z(&grid, 0);
  assert!(!top.iter().all(|z| approx(*z, top[0])), "{top:?}");
}

#[test]
fn invalid_samples_fall_back_to_neutral()
{
  let mut data = vec![1.0_f32; 16];
  data[0] = f32::NAN;
  data[15] = 4.0;
  let depth = DepthBuffer::from_f32(4, 4, data).unwrap();

  let mut grid = MeshGrid::new(4, 4).unwrap();
  let intrinsics = CameraIntrinsics::centred(100.0, Vec2::new(4.0, 4.0));
  let update = grid.set_depth_map(&depth, &intrinsics, &DisplacementMapping::default()).unwrap();

  assert_eq!(update.neutral, 1);
  assert!(approx(grid.vertices()[0].position[2], DisplacementMapping::default().neutral_displacement()));
  assert!(approx(update.range.min, 1.0));
  assert!(approx(update.range.max, 4.0));
}

/// 4x4 buffer with rows 0, 1/3, 2/3, 1; the top row is all "no data".
fn zero_based_gradient() -> DepthBuffer
{
  let data = (0..4).flat_map(|y| std::iter::repeat(y as f32 / 3.0).take(4)).collect();
  DepthBuffer::from_f32(4, 4, data).unwrap()
}

#[test]
fn zero_based_gradient_never_puts_holes_in_front()
{
  let mappings = [
    DisplacementMapping::default(),
    DisplacementMapping { min_displacement: -0.2, max_displacement: 0.3 },
  ];

  for mapping in mappings
  {
    let mut grid = MeshGrid::new(4, 4).unwrap();
    let intrinsics = CameraIntrinsics::centred(100.0, Vec2::new(4.0, 4.0));
    let update = grid.set_depth_map(&zero_based_gradient(), &intrinsics, &mapping).unwrap();
    assert_eq!(update.neutral, 4);

    let z: Vec<f32> = (0..4).map(|r| row_z(&grid, r)[0]).collect();
    assert!(z[0] <= z[1] && z[1] < z[2] && z[2] < z[3], "{mapping:?}: {z:?}");

    assert!(approx(z[0], mapping.min_displacement));
    assert!(approx(z[1], mapping.min_displacement));
    assert!(approx(z[3], mapping.max_displacement));
  }
}

#[test]
fn malformed_calibration_leaves_mesh_untouched()
{
  let mut grid = MeshGrid::new(3, 3).unwrap();
  let before = grid.vertices().to_vec();
  let intrinsics = CameraIntrinsics::centred(100.0, Vec2::new(f32::NAN, 4.0));

  let err = grid.set_depth_map(&vertical_gradient(), &intrinsics, &DisplacementMapping::default()).unwrap_err();

  assert!(matches!(err, DepthMapError::InvalidReferenceDimensions { .. }));
  assert_eq!(grid.vertices(), &before[..]);
  assert_eq!(grid.version(), 0);
}
