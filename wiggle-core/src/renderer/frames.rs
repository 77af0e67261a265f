use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::camera::{PerInstanceUniforms, SharedUniforms};

const POLL_INTERVAL: Duration = Duration::from_micros(250);

//
// ──────────────────────────────────────────────────────────────
//   FrameSlots
//
//   A ring of N uniform slots. A slot is reused only once fewer
//   than N submissions are still executing on the GPU, so the CPU
//   never overwrites uniforms a queued frame is still reading.
// ──────────────────────────────────────────────────────────────
//

pub struct FrameSlots
{
  count: usize,
  next: usize,
  in_flight: Arc<AtomicUsize>,
  timeout: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotAcquire
{
  pub index: usize,
  /// The wait gave up and the slot was taken while still busy.
  pub timed_out: bool,
}

/// Releases one in-flight submission when the GPU reports it finished.
pub struct FrameCompletion
{
  in_flight: Arc<AtomicUsize>,
}

impl FrameCompletion
{
  pub fn complete(self)
  {
    let _ = self.in_flight.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
  }
}

impl FrameSlots
{
  /// At least two slots are always kept.
  pub fn new(count: usize, timeout: Duration) -> Self
  {
    Self { count: count.max(2), next: 0, in_flight: Arc::new(AtomicUsize::new(0)), timeout }
  }

  pub fn count(&self) -> usize
  {
    self.count
  }

  pub fn in_flight(&self) -> usize
  {
    self.in_flight.load(Ordering::Acquire)
  }

  /// Wait for a free slot, calling `poll` between checks so completion
  /// callbacks get a chance to run. Gives up after the configured timeout.
  pub fn acquire(&mut self, mut poll: impl FnMut()) -> SlotAcquire
  {
    let start = Instant::now();

    loop
    {
      if self.in_flight() < self.count
      {
        return SlotAcquire { index: self.next, timed_out: false };
      }

      if start.elapsed() >= self.timeout
      {
        return SlotAcquire { index: self.next, timed_out: true };
      }

      poll();
      std::thread::sleep(POLL_INTERVAL);
    }
  }

  /// Record a submission for the current slot and advance the ring.
  pub fn submit(&mut self) -> FrameCompletion
  {
    self.in_flight.fetch_add(1, Ordering::AcqRel);
    self.next = (self.next + 1) % self.count;
    FrameCompletion { in_flight: self.in_flight.clone() }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Per-slot uniform buffers
// ──────────────────────────────────────────────────────────────
//

pub struct UniformSlot
{
  pub shared: wgpu::Buffer,
  pub instance: wgpu::Buffer,
  pub bind_group: wgpu::BindGroup,
}

pub fn create_uniform_slots(
  device: &wgpu::Device,
  layout: &wgpu::BindGroupLayout,
  count: usize,
) -> Vec<UniformSlot>
{
  (0..count)
    .map(|i| {
      let shared = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("Shared Uniforms #{i}")),
        size: std::mem::size_of::<SharedUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
      });

      let instance = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("Instance Uniforms #{i}")),
        size: std::mem::size_of::<PerInstanceUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
      });

      let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("Uniform BG #{i}")),
        layout,
        entries: &[
          wgpu::BindGroupEntry { binding: 0, resource: shared.as_entire_binding() },
          wgpu::BindGroupEntry { binding: 1, resource: instance.as_entire_binding() },
        ],
      });

      UniformSlot { shared, instance, bind_group }
    })
    .collect()
}
