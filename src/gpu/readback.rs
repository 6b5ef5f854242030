//! Blocking GPU → CPU copies, used by tests and screenshot capture.

use crate::error::DeferredError;

/// `bytes_per_row` must be a multiple of this for texture → buffer copies.
pub const ROW_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// Round `unpadded` up to the next multiple of [`ROW_ALIGNMENT`].
pub fn padded_row_bytes(unpadded: u32) -> u32 {
    unpadded.div_ceil(ROW_ALIGNMENT) * ROW_ALIGNMENT
}

fn staging_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn map_and_read(
    device: &wgpu::Device,
    staging: &wgpu::Buffer,
) -> Result<Vec<u8>, DeferredError> {
    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = device
        .poll(wgpu::PollType::Wait)
        .map_err(|e| DeferredError::Readback(e.to_string()))?;
    rx.recv()
        .map_err(|e| DeferredError::Readback(e.to_string()))?
        .map_err(|e| DeferredError::Readback(e.to_string()))?;
    let bytes = slice.get_mapped_range().to_vec();
    staging.unmap();
    Ok(bytes)
}

/// Copy `size` bytes of `source` (which needs `COPY_SRC`) to the CPU.
///
/// # Errors
///
/// Returns [`DeferredError::Readback`] if the map request fails.
pub fn copy_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    size: u64,
) -> Result<Vec<u8>, DeferredError> {
    let staging = staging_buffer(device, size);
    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Buffer Readback"),
        });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
    let _ = queue.submit(std::iter::once(encoder.finish()));
    map_and_read(device, &staging)
}

/// Copy a 4-byte-per-texel 2D texture to tightly packed rows.
///
/// # Errors
///
/// Returns [`DeferredError::Readback`] if the map request fails.
pub fn copy_texture_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> Result<Vec<u8>, DeferredError> {
    let width = texture.width();
    let height = texture.height();
    let unpadded = width * 4;
    let padded = padded_row_bytes(unpadded);
    let staging = staging_buffer(device, u64::from(padded) * u64::from(height));

    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Texture Readback"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    let _ = queue.submit(std::iter::once(encoder.finish()));

    let raw = map_and_read(device, &staging)?;
    let mut packed = Vec::with_capacity((unpadded * height) as usize);
    for row in raw.chunks(padded as usize).take(height as usize) {
        packed.extend_from_slice(&row[..unpadded as usize]);
    }
    Ok(packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_row_bytes(4), 256);
        assert_eq!(padded_row_bytes(256), 256);
        assert_eq!(padded_row_bytes(257), 512);
        assert_eq!(padded_row_bytes(64 * 4), 256);
    }
}
