//! GPU textures used by the compositor
//!
//! `GpuTexture` wraps a wgpu texture plus its default view. It is used for
//! both uploaded source images and offscreen render targets, and can read
//! its pixels back to tightly packed RGBA8.

use crate::effects::{CompositorError, TARGET_FORMAT};
use crate::gpu_context::GpuContext;

/// A 2D RGBA8 texture and its view
pub struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl GpuTexture {
    /// Create an offscreen render target
    pub fn render_target(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        Self::create(
            device,
            width,
            height,
            label,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
        )
    }

    /// Upload tightly packed RGBA8 pixels as a sampling source
    pub fn from_rgba(
        gpu: &GpuContext,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Self, CompositorError> {
        if !gpu.supports_size(width, height) {
            return Err(CompositorError::ResourceAllocation(format!(
                "source size {}x{} outside 1..={}",
                width, height, gpu.max_texture_dimension
            )));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(CompositorError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        let texture = Self::create(
            &gpu.device,
            width,
            height,
            "Source Texture",
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
        );

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            texture.extent(),
        );

        Ok(texture)
    }

    fn create(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        label: &str,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            // Linear format so 8-bit values pass through shaders unchanged
            format: TARGET_FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    /// Release the GPU memory now instead of when the handle drops
    pub fn destroy(&self) {
        self.texture.destroy();
    }

    /// Read the texture back as tightly packed RGBA8 rows
    ///
    /// Blocks until the GPU has finished all submitted work.
    pub fn read_pixels(&self, gpu: &GpuContext) -> Result<Vec<u8>, CompositorError> {
        let unpadded_bytes_per_row = self.width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging Buffer"),
            size: padded_bytes_per_row as u64 * self.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            self.extent(),
        );
        gpu.submit_one(encoder);

        let buffer_slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        gpu.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(CompositorError::Readback(e.to_string())),
            Err(e) => return Err(CompositorError::Readback(e.to_string())),
        }

        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * self.height) as usize);
        {
            let data = buffer_slice.get_mapped_range();
            for row in data.chunks(padded_bytes_per_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
            }
        }
        staging.unmap();
        staging.destroy();

        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_padded_row_calculation() {
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        // 2 px wide: 8 bytes padded to one alignment unit
        let unpadded: u32 = 2 * 4;
        assert_eq!(unpadded.div_ceil(align) * align, 256);

        // 200 px wide: 800 bytes padded to 1024
        let unpadded: u32 = 200 * 4;
        assert_eq!(unpadded.div_ceil(align) * align, 1024);

        // 64 px wide: already aligned
        let unpadded: u32 = 64 * 4;
        assert_eq!(unpadded.div_ceil(align) * align, 256);
    }
}
