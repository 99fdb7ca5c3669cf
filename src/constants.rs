//! Buffer layout and dispatch constants
//!
//! Central location for sizes shared between CPU structs and WGSL so the two
//! sides cannot drift apart. Every size here is asserted against
//! `std::mem::size_of` in tests.

// ===== Buffer Element Sizes =====

/// Size of a source grass vertex (position + normal + density)
pub const GRASS_VERTEX_SIZE: u64 = 28;

/// Size of a source triangle (three vertex indices)
pub const GRASS_TRIANGLE_SIZE: u64 = 12;

/// Size of one per-vertex visibility flag (written as 1.0 / 0.0)
pub const VERTEX_CULL_RESULT_SIZE: u64 = 4;

/// Size of one blade-source work item (triangle index + blade slot)
pub const BLADE_SOURCE_SIZE: u64 = 8;

/// Size of one final blade instance (world position + batch index + world normal)
pub const BLADE_INSTANCE_SIZE: u64 = 28;

/// Size of an indexed indirect draw argument block (wgpu DrawIndexedIndirect)
pub const DRAW_INDIRECT_ARGS_SIZE: u64 = 20;

/// Size of an indirect dispatch argument block (thread groups X/Y/Z)
pub const COMPUTE_INDIRECT_ARGS_SIZE: u64 = 12;

/// Number of auxiliary atomic counters (visible triangles, blade sources, instances)
pub const COUNTER_SLOTS: u64 = 3;

// ===== Dispatch Constants =====

/// Threads per workgroup for every compute stage of the pipeline.
/// Must match the `@workgroup_size` of the WGSL kernels.
pub const CULLING_THREADS_PER_GROUP: u32 = 128;

/// Hard device limit on thread groups per dispatch dimension
pub const MAX_COMPUTE_THREAD_GROUPS: u32 = 65_535;

// ===== Defaults =====

/// Default capacity of the blade-source and instance append buffers
pub const DEFAULT_MAX_BLADES: u32 = 1_000_000;

/// Default number of blades a triangle at full density (1.0) produces
pub const DEFAULT_BLADES_PER_DENSITY: u32 = 15;

// ===== Helper Functions =====

/// Thread-group count for `count` items at `group_size` threads per group
pub fn workgroup_count(count: u32, group_size: u32) -> u32 {
    count.div_ceil(group_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroup_count() {
        assert_eq!(workgroup_count(0, 128), 0);
        assert_eq!(workgroup_count(1, 128), 1);
        assert_eq!(workgroup_count(128, 128), 1);
        assert_eq!(workgroup_count(129, 128), 2);
        assert_eq!(workgroup_count(256, 128), 2);
        assert_eq!(workgroup_count(257, 128), 3);
    }

    #[test]
    fn test_workgroup_count_near_u32_max() {
        // Must not overflow the intermediate sum for counts near the limit
        assert_eq!(workgroup_count(u32::MAX, 128), 33_554_432);
        assert_eq!(workgroup_count(u32::MAX - 127, 128), 33_554_431);
    }

    #[test]
    fn test_gpu_side_group_accounting_matches_ceil_div() {
        // The collect/generate kernels bump thread-group X whenever the slot
        // they claimed is a multiple of the group size. Appending N items must
        // therefore produce exactly ceil(N / group) groups.
        for n in [0u32, 1, 2, 127, 128, 129, 255, 256, 1000, 100_000] {
            let mut groups = 0;
            for slot in 0..n {
                if slot % CULLING_THREADS_PER_GROUP == 0 {
                    groups += 1;
                }
            }
            assert_eq!(groups, workgroup_count(n, CULLING_THREADS_PER_GROUP), "n = {}", n);
        }
    }
}
