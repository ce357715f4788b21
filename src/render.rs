//! Asset rendering to RGBA image buffers
//!
//! Turns indexed-color assets into displayable pixel grids: whole images,
//! single tiles, sprite frames and composited maps. Index 0 and colorkey
//! entries come out fully transparent so layered rendering shows what the
//! hardware would.

use std::io;
use std::path::Path;

use image::imageops::FilterType;
use image::RgbaImage;
use thiserror::Error;

use crate::models::{Map, SpriteSheet, TiledImage, Tileset, PRIORITY_COUNT, TILE_SIZE};
use crate::registry::AssetSet;

/// Error type for image output operations.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Render a whole tiled image through its palette.
pub fn render_image(image: &TiledImage) -> RgbaImage {
    let mut out = RgbaImage::new(image.width.max(1) as u32, image.height.max(1) as u32);
    for y in 0..image.height {
        for x in 0..image.width {
            let color = image.color(image.color_index(x, y));
            out.put_pixel(x as u32, y as u32, color);
        }
    }
    out
}

/// Blit one tile of a tileset into `out` at the given offset. Transparent
/// texels are skipped so lower layers stay visible.
pub fn render_tile(
    out: &mut RgbaImage,
    tileset: &Tileset,
    tile_index: u16,
    hflip: bool,
    vflip: bool,
    offset_x: usize,
    offset_y: usize,
) {
    let (tile_x, tile_y) = tileset.tile_origin(tile_index);
    for i in 0..TILE_SIZE {
        for j in 0..TILE_SIZE {
            let u = if hflip { TILE_SIZE - 1 - i } else { i };
            let v = if vflip { TILE_SIZE - 1 - j } else { j };

            let color_index = tileset.image.color_index(tile_x + i, tile_y + j);
            let color = tileset.image.color(color_index);
            if color.0[3] == 0 {
                continue;
            }
            let x = (offset_x + u) as u32;
            let y = (offset_y + v) as u32;
            if x < out.width() && y < out.height() {
                out.put_pixel(x, y, color);
            }
        }
    }
}

/// Render one sprite frame of a sheet.
pub fn render_frame(sheet: &SpriteSheet, frame_index: usize, hflip: bool, vflip: bool) -> RgbaImage {
    let (sprite_width, sprite_height) = sheet.sprite_size().dims();
    let mut out = RgbaImage::new(sprite_width as u32, sprite_height as u32);
    let (frame_x, frame_y) = sheet.frame_origin(frame_index);

    for i in 0..sprite_width {
        for j in 0..sprite_height {
            let u = if hflip { sprite_width - 1 - i } else { i };
            let v = if vflip { sprite_height - 1 - j } else { j };
            let color = sheet.image.color(sheet.image.color_index(frame_x + i, frame_y + j));
            out.put_pixel(u as u32, v as u32, color);
        }
    }
    out
}

/// Composite a map's backgrounds into one image.
///
/// Layers are painted in reverse priority order, priority 0 last, so it
/// ends up on top the way the hardware draws it. Backgrounds whose
/// tileset does not resolve are skipped.
pub fn render_map(map: &Map, assets: &AssetSet) -> RgbaImage {
    let mut out = RgbaImage::new(map.pixel_width().max(1) as u32, map.pixel_height().max(1) as u32);

    for priority in (0..PRIORITY_COUNT).rev() {
        for bg in &map.backgrounds {
            if bg.priority != priority {
                continue;
            }
            let Some(tileset) = bg.tileset.as_deref().and_then(|n| assets.find_tileset(n)) else {
                continue;
            };
            for y in 0..bg.height() {
                for x in 0..bg.width() {
                    let index = y * bg.width() + x;
                    let tile = bg.tiles.get(index).copied().unwrap_or(0);
                    let hflip = bg.hflips.get(index).copied().unwrap_or(false);
                    let vflip = bg.vflips.get(index).copied().unwrap_or(false);
                    render_tile(&mut out, tileset, tile, hflip, vflip, x * TILE_SIZE, y * TILE_SIZE);
                }
            }
        }
    }
    out
}

/// Scale an image by an integer factor with nearest-neighbor sampling.
pub fn scale_image(image: &RgbaImage, factor: u8) -> RgbaImage {
    if factor <= 1 {
        return image.clone();
    }
    image::imageops::resize(
        image,
        image.width() * factor as u32,
        image.height() * factor as u32,
        FilterType::Nearest,
    )
}

/// Save an RGBA image as a PNG, creating parent directories as needed.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    image.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpriteSize;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

    fn two_tile_tileset() -> Tileset {
        // 16x8: tile 0 all red, tile 1 green except its top-left texel
        let mut tileset = Tileset::default();
        tileset.image.width = 16;
        tileset.image.height = 8;
        tileset.image.palette = vec![crate::color::COLORKEY, RED, GREEN];
        tileset.image.pixels = vec![0; 128];
        for y in 0..8 {
            for x in 0..8 {
                tileset.image.pixels[y * 16 + x] = 1;
                tileset.image.pixels[y * 16 + 8 + x] = 2;
            }
        }
        tileset.image.pixels[8] = 0; // tile 1 top-left transparent
        tileset
    }

    #[test]
    fn test_render_image_uses_palette() {
        let tileset = two_tile_tileset();
        let out = render_image(&tileset.image);
        assert_eq!(out.get_pixel(0, 0), &RED);
        assert_eq!(out.get_pixel(9, 0), &GREEN);
        // index 0 renders transparent
        assert_eq!(out.get_pixel(8, 0).0[3], 0);
    }

    #[test]
    fn test_render_tile_flips() {
        let tileset = two_tile_tileset();
        let mut out = RgbaImage::new(8, 8);
        // tile 1's transparent texel is top-left; hflip moves it top-right
        render_tile(&mut out, &tileset, 1, true, false, 0, 0);
        assert_eq!(out.get_pixel(0, 0), &GREEN);
        assert_eq!(out.get_pixel(7, 0).0[3], 0);
    }

    #[test]
    fn test_render_map_priority_order() {
        let mut assets = AssetSet::default();
        let mut tileset = two_tile_tileset();
        tileset.image.name = "T".to_string();
        assets.add_tileset(tileset);

        let mut map = Map::default();
        // bg1 (red tile) under bg0 (green tile with a transparent texel)
        map.backgrounds[0].tileset = Some("T".to_string());
        map.backgrounds[0].priority = 0;
        map.backgrounds[0].set_tile(0, 1, false, false);
        map.backgrounds[1].tileset = Some("T".to_string());
        map.backgrounds[1].priority = 3;
        map.backgrounds[1].set_tile(0, 0, false, false);
        assets.add_map(map.clone());

        let out = render_map(&map, &assets);
        // green wins where opaque, red shows through the transparent texel
        assert_eq!(out.get_pixel(1, 0), &GREEN);
        assert_eq!(out.get_pixel(0, 0), &RED);
    }

    #[test]
    fn test_render_frame_dimensions() {
        let mut sheet = SpriteSheet::default();
        sheet.set_sprite_size(SpriteSize::S16x8);
        sheet.image.palette = vec![crate::color::COLORKEY, RED];
        sheet.image.pixels = vec![1; sheet.image.width * sheet.image.height];
        let out = render_frame(&sheet, 0, false, false);
        assert_eq!((out.width(), out.height()), (16, 8));
        assert_eq!(out.get_pixel(0, 0), &RED);
    }

    #[test]
    fn test_scale_image() {
        let tileset = two_tile_tileset();
        let out = render_image(&tileset.image);
        let scaled = scale_image(&out, 4);
        assert_eq!((scaled.width(), scaled.height()), (64, 32));
        assert_eq!(scaled.get_pixel(0, 0), &RED);
    }
}
