//! Vertex buffers that are re-uploaded every frame.
//!
//! An upload with the same byte length as the previous one writes into
//! the existing allocation. Anything else gets a fresh buffer.

use wgpu::util::DeviceExt;

use super::GpuContext;

/// How an upload reaches the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upload {
    /// Create a new buffer sized to the data.
    Reallocate,
    /// Overwrite the current buffer from offset zero.
    SubUpdate,
}

impl Upload {
    pub fn plan(previous_len: Option<u64>, new_len: u64) -> Self {
        match previous_len {
            Some(len) if len == new_len => Upload::SubUpdate,
            _ => Upload::Reallocate,
        }
    }
}

/// A `VERTEX | COPY_DST` buffer with size-aware reuse.
pub struct DynamicBuffer {
    label: &'static str,
    buffer: Option<wgpu::Buffer>,
    len: Option<u64>,
    allocations: u64,
}

impl DynamicBuffer {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            buffer: None,
            len: None,
            allocations: 0,
        }
    }

    /// Upload `bytes`, reusing the current allocation when the length
    /// is unchanged.
    pub fn update(&mut self, ctx: &GpuContext, bytes: &[u8]) -> Upload {
        let new_len = bytes.len() as u64;
        let plan = Upload::plan(self.len, new_len);
        match (plan, &self.buffer) {
            (Upload::SubUpdate, Some(buffer)) => {
                if !bytes.is_empty() {
                    ctx.queue.write_buffer(buffer, 0, bytes);
                }
            }
            _ => {
                self.buffer = Some(self.allocate(ctx, bytes));
                self.allocations += 1;
            }
        }
        self.len = Some(new_len);
        plan
    }

    fn allocate(&self, ctx: &GpuContext, bytes: &[u8]) -> wgpu::Buffer {
        let usage = wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST;
        if bytes.is_empty() {
            return ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: wgpu::COPY_BUFFER_ALIGNMENT,
                usage,
                mapped_at_creation: false,
            });
        }
        ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(self.label),
            contents: bytes,
            usage,
        })
    }

    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    /// Length in bytes of the last upload.
    pub fn len(&self) -> u64 {
        self.len.unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buffers created so far.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan() {
        assert_eq!(Upload::plan(None, 0), Upload::Reallocate);
        assert_eq!(Upload::plan(None, 64), Upload::Reallocate);
        assert_eq!(Upload::plan(Some(64), 64), Upload::SubUpdate);
        assert_eq!(Upload::plan(Some(64), 32), Upload::Reallocate);
        assert_eq!(Upload::plan(Some(32), 64), Upload::Reallocate);
    }

    #[test]
    fn test_allocation_count() {
        let Ok(ctx) = GpuContext::headless() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let mut buffer = DynamicBuffer::new("test");
        let a = [0.0f32; 8];
        let b = [1.0f32; 8];
        let c = [1.0f32; 4];

        assert_eq!(buffer.update(&ctx, bytemuck::cast_slice(&a)), Upload::Reallocate);
        assert_eq!(buffer.allocations(), 1);
        assert_eq!(buffer.update(&ctx, bytemuck::cast_slice(&b)), Upload::SubUpdate);
        assert_eq!(buffer.allocations(), 1);
        assert_eq!(buffer.update(&ctx, bytemuck::cast_slice(&c)), Upload::Reallocate);
        assert_eq!(buffer.allocations(), 2);
        assert_eq!(buffer.len(), 16);
    }
}
