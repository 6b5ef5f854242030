//! Typed uniform blocks.

use bytemuck::Pod;
use wgpu::util::DeviceExt;

use super::binding::{BindingState, UniformGuard};
use super::readback;
use crate::error::DeferredError;

/// A CPU-side value of `T` mirrored into a uniform buffer of exactly
/// `size_of::<T>()` bytes.
///
/// The buffer size is derived from the type, so uploading a block through
/// a layout of a different size cannot be expressed.
#[derive(Debug)]
pub struct UniformBlock<T: Pod> {
    buffer: wgpu::Buffer,
    value: T,
}

impl<T: Pod> UniformBlock<T> {
    /// Allocate the buffer and upload `value`.
    pub fn new(device: &wgpu::Device, label: &str, value: T) -> Self {
        debug_assert!(
            size_of::<T>() % 16 == 0,
            "uniform blocks must be a multiple of 16 bytes"
        );
        let buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&value),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            });
        Self {
            buffer,
            value,
        }
    }

    /// Block size in bytes.
    pub const fn size() -> u64 {
        size_of::<T>() as u64
    }

    /// The CPU-side value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Mutable CPU-side value; call [`upload`](Self::upload) afterwards.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Replace the CPU-side value without uploading.
    pub fn set(&mut self, value: T) {
        self.value = value;
    }

    /// Write the CPU-side value to the GPU buffer.
    pub fn upload(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&self.value));
    }

    /// Replace and upload in one step.
    pub fn write(&mut self, queue: &wgpu::Queue, value: T) {
        self.value = value;
        self.upload(queue);
    }

    /// The underlying buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Bind this block to uniform `slot` until the guard drops.
    pub fn bind<'a>(
        &self,
        bindings: &'a BindingState,
        slot: u32,
    ) -> UniformGuard<'a> {
        bindings.uniforms.bind(slot, self.buffer.clone())
    }

    /// Copy the GPU buffer back and decode it.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::Readback`] if mapping fails.
    pub fn read_back(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<T, DeferredError> {
        let bytes = readback::copy_buffer(device, queue, &self.buffer, Self::size())?;
        Ok(bytemuck::pod_read_unaligned(&bytes[..Self::size() as usize]))
    }
}
