//! Shared palette merging
//!
//! Builds one color table out of many images' local palettes and remaps
//! every image's pixels against it, so a set of tilesets (or sprite
//! sheets) can share a single hardware palette upload.

use crate::models::{Palette, TiledImage, PALETTE_MAX};

/// Merge the images' palettes into `shared` and remap their pixels.
///
/// Images are processed in order; each local palette is walked in index
/// order and every color is found-or-appended in the shared table under
/// exact equality, so first-seen colors keep the lowest indices. The
/// shared table stops at [`PALETTE_MAX`] entries; colors that no longer
/// fit remap to the last shared index. Afterwards every image carries the
/// shared colors, points its shared-palette reference at `shared`, and
/// has its pixel buffer rewritten through its own old-to-new index map.
///
/// Running the merge again over its own output changes nothing.
pub fn merge_palettes(images: &mut [&mut TiledImage], shared: &mut Palette) {
    shared.colors.clear();

    // Build the per-image index maps while growing the shared table.
    let mut index_maps: Vec<Vec<u8>> = Vec::with_capacity(images.len());
    for image in images.iter() {
        let mut index_map = Vec::with_capacity(image.palette.len());
        for &color in &image.palette {
            let new_index = match shared.colors.iter().position(|&c| c == color) {
                Some(index) => index,
                None if shared.colors.len() < PALETTE_MAX => {
                    shared.colors.push(color);
                    shared.colors.len() - 1
                }
                None => shared.colors.len() - 1,
            };
            index_map.push(new_index as u8);
        }
        index_maps.push(index_map);
    }

    for (image, index_map) in images.iter_mut().zip(&index_maps) {
        image.palette = shared.colors.clone();
        image.shared_palette = Some(shared.name.clone());
        for pixel in &mut image.pixels {
            *pixel = index_map.get(*pixel as usize).copied().unwrap_or(0);
        }
    }
}
