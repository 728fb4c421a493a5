//! Mip-pyramid extents and compute dispatch math.

/// Workgroup edge length used by the filter and accumulation shaders.
pub const WORKGROUP_SIZE: u32 = 32;

/// Hard cap on pyramid depth, matching the filter bind-group array size.
pub const MAX_MIP_LEVELS: u32 = 16;

/// Number of mip levels for a `width x height` base image.
///
/// `ceil(log2(max(width, height)))`, so a 1024x768 image gets 10 levels.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let max_dim = width.max(height).max(1);
    let levels = 32 - (max_dim - 1).leading_zeros();
    levels.clamp(1, MAX_MIP_LEVELS)
}

/// Extent of mip `level`, halving per level with a floor of 1.
pub fn mip_extent(width: u32, height: u32, level: u32) -> (u32, u32) {
    ((width >> level).max(1), (height >> level).max(1))
}

/// Dispatch grid covering `width x height` with `WORKGROUP_SIZE` square groups.
pub fn workgroup_count(width: u32, height: u32) -> (u32, u32) {
    (
        width.div_ceil(WORKGROUP_SIZE),
        height.div_ceil(WORKGROUP_SIZE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1024, 768), 10);
        assert_eq!(mip_level_count(768, 1024), 10);
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 1);
        assert_eq!(mip_level_count(3, 3), 2);
        assert_eq!(mip_level_count(2048, 2048), 11);
    }

    #[test]
    fn test_mip_level_count_caps() {
        assert_eq!(mip_level_count(u32::MAX, u32::MAX), MAX_MIP_LEVELS);
    }

    #[test]
    fn test_mip_extent_floors_at_one() {
        assert_eq!(mip_extent(1024, 768, 0), (1024, 768));
        assert_eq!(mip_extent(1024, 768, 1), (512, 384));
        assert_eq!(mip_extent(1024, 768, 10), (1, 1));
        assert_eq!(mip_extent(1024, 768, 12), (1, 1));
        // Non-power-of-two halving truncates.
        assert_eq!(mip_extent(5, 3, 1), (2, 1));
    }

    #[test]
    fn test_workgroup_count_rounds_up() {
        assert_eq!(workgroup_count(1024, 768), (32, 24));
        assert_eq!(workgroup_count(1025, 769), (33, 25));
        assert_eq!(workgroup_count(1, 1), (1, 1));
        assert_eq!(workgroup_count(32, 32), (1, 1));
        assert_eq!(workgroup_count(33, 32), (2, 1));
    }
}
