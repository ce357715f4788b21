//! Hardware storage-order permutations
//!
//! Tile data is not stored row-major in video memory. Backgrounds larger
//! than one 32×32-tile screen block are split across blocks, and image
//! pixels are stored tile by tile rather than scanline by scanline. The
//! functions here produce the permutations between row-major editing order
//! and hardware storage order, as used by the serializers.

use crate::models::TILE_SIZE;

/// Tiles per screen block (32×32).
const BLOCK_TILES: usize = 1024;
/// Tile rows/columns per screen block.
const BLOCK_SPAN: usize = 32;

/// Storage order of a background's tile entries.
///
/// Returns one row-major index (`y * width + x`) per storage slot, in the
/// order the hardware scans them. The result is a bijection on
/// `[0, width*height)`.
///
/// Regular backgrounds are partitioned into 32×32-tile screen blocks,
/// row-major within each block. Blocks are consumed left to right along a
/// block row and then downward; how many blocks make up a row depends on
/// the background's block count. Affine backgrounds are a single block in
/// plain row-major order.
///
/// For a non-affine 32×32 background the permutation is the identity.
pub fn screen_entry_order(width: usize, height: usize, affine: bool) -> Vec<usize> {
    if affine {
        return (0..width * height).collect();
    }

    let num_blocks = (width * height) / BLOCK_TILES;
    let mut order = Vec::with_capacity(width * height);

    let mut block = 0;
    let mut above = 0;
    let mut left = 0;
    let mut row = 0;
    let mut col = 0;

    while block != num_blocks {
        let tile_row = row + BLOCK_SPAN * above;
        let tile_col = col + BLOCK_SPAN * left;

        col += 1;
        if col == BLOCK_SPAN {
            row += 1;
            col = 0;
        }

        if row == BLOCK_SPAN {
            // was this the last block in a row of blocks?
            let last = match num_blocks {
                1 => true,
                2 => width == BLOCK_SPAN,
                4 => block == 1 || block == 3,
                _ => (block + 1) % 4 == 0,
            };
            if last {
                left = 0;
                above += 1;
            } else {
                left += 1;
            }
            block += 1;
            row = 0;
        }

        order.push(tile_row * width + tile_col);
    }

    order
}

/// Invert a permutation produced by the order functions.
pub fn inverse_order(order: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; order.len()];
    for (slot, &index) in order.iter().enumerate() {
        inverse[index] = slot;
    }
    inverse
}

/// Storage order of an image's pixels.
///
/// Frames of `tile_width`×`tile_height` pixels are taken row-major across
/// the image; within a frame, 8×8 hardware tiles row-major; within a tile,
/// pixels row-major. For 8×8 frames this is the plain tile-by-tile order
/// the background hardware expects; sprite sheets use larger frames so a
/// whole sprite's tiles land consecutively.
pub fn tile_pixel_order(
    width: usize,
    height: usize,
    tile_width: usize,
    tile_height: usize,
) -> Vec<usize> {
    let mut order = Vec::with_capacity(width * height);
    if width == 0 || height == 0 || tile_width == 0 || tile_height == 0 {
        return order;
    }

    for frame_y in (0..height).step_by(tile_height) {
        for frame_x in (0..width).step_by(tile_width) {
            for tile_y in (0..tile_height).step_by(TILE_SIZE) {
                for tile_x in (0..tile_width).step_by(TILE_SIZE) {
                    for py in 0..TILE_SIZE {
                        for px in 0..TILE_SIZE {
                            let x = frame_x + tile_x + px;
                            let y = frame_y + tile_y + py;
                            order.push(y * width + x);
                        }
                    }
                }
            }
        }
    }
    order
}

/// Reorder a row-major pixel buffer into hardware storage order.
///
/// Out-of-range indices (from dimensions that disagree with the buffer
/// length) are skipped rather than reported; the output keeps the input's
/// length.
pub fn to_vram_order(
    pixels: &[u8],
    width: usize,
    height: usize,
    tile_width: usize,
    tile_height: usize,
) -> Vec<u8> {
    let mut out = vec![0u8; pixels.len()];
    let mut out_index = 0;
    for index in tile_pixel_order(width, height, tile_width, tile_height) {
        if index >= pixels.len() || out_index >= out.len() {
            continue;
        }
        out[out_index] = pixels[index];
        out_index += 1;
    }
    out
}

/// Reorder a hardware-ordered pixel buffer back into row-major order.
pub fn from_vram_order(
    data: &[u8],
    width: usize,
    height: usize,
    tile_width: usize,
    tile_height: usize,
) -> Vec<u8> {
    let mut out = vec![0u8; data.len()];
    let mut in_index = 0;
    for index in tile_pixel_order(width, height, tile_width, tile_height) {
        if in_index >= data.len() || index >= out.len() {
            continue;
        }
        out[index] = data[in_index];
        in_index += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_bijection(order: &[usize], len: usize) {
        assert_eq!(order.len(), len);
        let mut seen = vec![false; len];
        for &index in order {
            assert!(index < len, "index {index} out of range");
            assert!(!seen[index], "index {index} repeated");
            seen[index] = true;
        }
    }

    #[test]
    fn test_single_block_is_identity() {
        let order = screen_entry_order(32, 32, false);
        let expected: Vec<usize> = (0..1024).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_four_blocks_partition() {
        let order = screen_entry_order(64, 64, false);
        assert_bijection(&order, 4096);

        // four contiguous 1024-entry scan regions: top-left, top-right,
        // bottom-left, bottom-right blocks
        assert_eq!(order[0], 0);
        assert_eq!(order[1023], 31 * 64 + 31);
        assert_eq!(order[1024], 32);
        assert_eq!(order[2047], 31 * 64 + 63);
        assert_eq!(order[2048], 32 * 64);
        assert_eq!(order[3072], 32 * 64 + 32);
    }

    #[test]
    fn test_tall_map_blocks_stack_vertically() {
        // 32×64: two blocks, each block-row holds one block
        let order = screen_entry_order(32, 64, false);
        assert_bijection(&order, 2048);
        assert_eq!(order[0], 0);
        assert_eq!(order[1023], 31 * 32 + 31);
        assert_eq!(order[1024], 32 * 32);
        assert_eq!(order[2047], 63 * 32 + 31);
    }

    #[test]
    fn test_wide_map_blocks_run_horizontally() {
        // 64×32: two blocks side by side
        let order = screen_entry_order(64, 32, false);
        assert_bijection(&order, 2048);
        assert_eq!(order[0], 0);
        assert_eq!(order[1023], 31 * 64 + 31);
        assert_eq!(order[1024], 32);
        assert_eq!(order[2047], 31 * 64 + 63);
    }

    #[test]
    fn test_largest_map_is_bijective() {
        let order = screen_entry_order(128, 128, false);
        assert_bijection(&order, 16384);
        // second block row of blocks starts below the first
        assert_eq!(order[4 * 1024], 32 * 128);
    }

    #[test]
    fn test_affine_is_row_major() {
        let order = screen_entry_order(16, 16, true);
        let expected: Vec<usize> = (0..256).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_inverse_order() {
        let order = screen_entry_order(64, 64, false);
        let inverse = inverse_order(&order);
        for slot in 0..order.len() {
            assert_eq!(inverse[order[slot]], slot);
        }
    }

    #[test]
    fn test_pixel_order_single_tile() {
        let order = tile_pixel_order(8, 8, 8, 8);
        let expected: Vec<usize> = (0..64).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_pixel_order_two_tiles_wide() {
        let order = tile_pixel_order(16, 8, 8, 8);
        assert_bijection(&order, 128);
        // first tile: rows of the left 8×8
        assert_eq!(order[0], 0);
        assert_eq!(order[8], 16);
        // second tile starts at x=8
        assert_eq!(order[64], 8);
    }

    #[test]
    fn test_pixel_order_large_frames() {
        // a 16×16 sprite frame keeps all four of its 8×8 tiles together
        let order = tile_pixel_order(32, 16, 16, 16);
        assert_bijection(&order, 512);
        assert_eq!(order[0], 0);
        assert_eq!(order[64], 8); // second tile of first frame
        assert_eq!(order[128], 8 * 32); // third tile: below, not next frame
        assert_eq!(order[256], 16); // second frame starts at x=16
    }

    #[test]
    fn test_vram_roundtrip() {
        let pixels: Vec<u8> = (0..128u8).collect();
        let vram = to_vram_order(&pixels, 16, 8, 8, 8);
        assert_ne!(vram, pixels);
        let back = from_vram_order(&vram, 16, 8, 8, 8);
        assert_eq!(back, pixels);
    }
}
