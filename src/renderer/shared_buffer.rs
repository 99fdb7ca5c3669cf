//! Region-allocated device buffer
//!
//! Several logically distinct argument blocks (the per-pass indirect draw
//! args) share one physical buffer. Each named region keeps its own reset
//! template so the whole buffer can be restored to a known baseline with a
//! single upload at the top of every frame.

use bytemuck::Pod;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{GrassError, GrassResult};

/// Pure region bookkeeping: offsets, capacities and reset templates.
///
/// Split out from the device buffer so the allocation math is testable
/// without a GPU.
pub struct RegionTable<K, T> {
    regions: Vec<(K, Region<T>)>,
    len: usize,
}

struct Region<T> {
    offset: usize,
    capacity: usize,
    default: Vec<T>,
}

impl<K, T> RegionTable<K, T>
where
    K: Copy + Eq + Hash + Debug,
    T: Pod,
{
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            len: 0,
        }
    }

    /// Reserve `element_count` elements at the current end of the buffer and
    /// return the element offset of the new region.
    pub fn add_region(&mut self, id: K, element_count: usize) -> usize {
        debug_assert!(
            !self.regions.iter().any(|(k, _)| *k == id),
            "duplicate region {:?}",
            id
        );
        let offset = self.len;
        self.len += element_count;
        self.regions.push((
            id,
            Region {
                offset,
                capacity: element_count,
                default: Vec::new(),
            },
        ));
        offset
    }

    /// Total element count across all regions
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn element_offset(&self, id: K) -> GrassResult<usize> {
        self.region(id).map(|r| r.offset)
    }

    pub fn byte_offset(&self, id: K) -> GrassResult<u64> {
        Ok((self.element_offset(id)? * std::mem::size_of::<T>()) as u64)
    }

    pub fn capacity(&self, id: K) -> GrassResult<usize> {
        self.region(id).map(|r| r.capacity)
    }

    /// Remember `data` as the region's reset template. Refused (leaving the
    /// previous template intact) when the payload exceeds the reservation.
    pub fn set_default(&mut self, id: K, data: &[T]) -> GrassResult<usize> {
        let region = self
            .regions
            .iter_mut()
            .find(|(k, _)| *k == id)
            .map(|(_, r)| r)
            .ok_or_else(|| GrassError::UnknownRegion(format!("{:?}", id)))?;
        if data.len() > region.capacity {
            return Err(GrassError::RegionOverflow {
                region: format!("{:?}", id),
                requested: data.len(),
                capacity: region.capacity,
            });
        }
        region.default = data.to_vec();
        Ok(region.offset)
    }

    /// The whole-buffer reset image: every region's template, zero-filled up
    /// to its capacity. Calling this twice yields identical contents.
    pub fn flattened_defaults(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len);
        for (_, region) in &self.regions {
            out.extend_from_slice(&region.default);
            out.resize(region.offset + region.capacity, T::zeroed());
        }
        out
    }

    fn region(&self, id: K) -> GrassResult<&Region<T>> {
        self.regions
            .iter()
            .find(|(k, _)| *k == id)
            .map(|(_, r)| r)
            .ok_or_else(|| GrassError::UnknownRegion(format!("{:?}", id)))
    }
}

impl<K, T> Default for RegionTable<K, T>
where
    K: Copy + Eq + Hash + Debug,
    T: Pod,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A region table backed by a physical device buffer
pub struct SharedBuffer<K, T> {
    table: RegionTable<K, T>,
    buffer: Option<wgpu::Buffer>,
    label: &'static str,
}

impl<K, T> SharedBuffer<K, T>
where
    K: Copy + Eq + Hash + Debug,
    T: Pod,
{
    pub fn new(label: &'static str) -> Self {
        Self {
            table: RegionTable::new(),
            buffer: None,
            label,
        }
    }

    /// Reserve a region. Must happen before [`allocate`](Self::allocate).
    pub fn add_region(&mut self, id: K, element_count: usize) -> usize {
        debug_assert!(self.buffer.is_none(), "add_region after allocate");
        self.table.add_region(id, element_count)
    }

    /// Create the physical buffer sized to the sum of all reservations,
    /// replacing any prior allocation.
    pub fn allocate(&mut self, device: &wgpu::Device, usage: wgpu::BufferUsages) {
        let size = (self.table.len() * std::mem::size_of::<T>()) as u64;
        self.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
    }

    /// Upload `data` at the region's offset and remember it as the region's
    /// reset template. An oversized payload is refused and logged; prior
    /// contents remain.
    pub fn set_region_data(&mut self, queue: &wgpu::Queue, id: K, data: &[T]) -> GrassResult<()> {
        let offset = match self.table.set_default(id, data) {
            Ok(offset) => offset,
            Err(e) => {
                log::error!("[SharedBuffer] {}: {}", self.label, e);
                return Err(e);
            }
        };
        let buffer = self.buffer_checked()?;
        queue.write_buffer(
            buffer,
            (offset * std::mem::size_of::<T>()) as u64,
            bytemuck::cast_slice(data),
        );
        Ok(())
    }

    /// Re-upload every region's reset template in one write
    pub fn reset_to_default(&self, queue: &wgpu::Queue) -> GrassResult<()> {
        let buffer = self.buffer_checked()?;
        let image = self.table.flattened_defaults();
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(&image));
        Ok(())
    }

    /// Byte offset of a region, for indirect draw/dispatch calls that take a
    /// buffer plus an offset into it
    pub fn region_byte_offset(&self, id: K) -> GrassResult<u64> {
        self.table.byte_offset(id)
    }

    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    pub fn table(&self) -> &RegionTable<K, T> {
        &self.table
    }

    /// Drop the physical allocation. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        self.buffer = None;
    }

    fn buffer_checked(&self) -> GrassResult<&wgpu::Buffer> {
        self.buffer
            .as_ref()
            .ok_or_else(|| GrassError::Internal(format!("{}: used before allocate", self.label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::{Pod, Zeroable};

    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    enum Args {
        Draw,
        ShadowDraw,
    }

    #[repr(C)]
    #[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
    struct FiveU32([u32; 5]);

    #[test]
    fn test_region_offsets() {
        let mut table: RegionTable<Args, FiveU32> = RegionTable::new();
        assert_eq!(table.add_region(Args::Draw, 1), 0);
        assert_eq!(table.add_region(Args::ShadowDraw, 1), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.byte_offset(Args::Draw).expect("offset"), 0);
        assert_eq!(table.byte_offset(Args::ShadowDraw).expect("offset"), 20);
    }

    #[test]
    fn test_overflow_is_refused_and_keeps_prior_template() {
        let mut table: RegionTable<Args, FiveU32> = RegionTable::new();
        table.add_region(Args::Draw, 1);
        table
            .set_default(Args::Draw, &[FiveU32([6, 0, 0, 0, 0])])
            .expect("set_default");

        let err = table.set_default(Args::Draw, &[FiveU32([1; 5]), FiveU32([2; 5])]);
        assert!(matches!(err, Err(GrassError::RegionOverflow { .. })));
        assert_eq!(table.flattened_defaults(), vec![FiveU32([6, 0, 0, 0, 0])]);
    }

    #[test]
    fn test_unknown_region() {
        let mut table: RegionTable<Args, FiveU32> = RegionTable::new();
        table.add_region(Args::Draw, 1);
        assert!(matches!(
            table.byte_offset(Args::ShadowDraw),
            Err(GrassError::UnknownRegion(_))
        ));
    }

    #[test]
    fn test_reset_image_is_idempotent() {
        let mut table: RegionTable<Args, FiveU32> = RegionTable::new();
        table.add_region(Args::Draw, 2);
        table.add_region(Args::ShadowDraw, 1);
        table
            .set_default(Args::Draw, &[FiveU32([6, 0, 3, 1, 0])])
            .expect("set_default");
        table
            .set_default(Args::ShadowDraw, &[FiveU32([6, 0, 3, 1, 0])])
            .expect("set_default");

        let once = table.flattened_defaults();
        let twice = table.flattened_defaults();
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
        // Unset remainder of the Draw region is zero-filled
        assert_eq!(once[1], FiveU32([0; 5]));
    }
}
