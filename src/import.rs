//! Image import
//!
//! Builds indexed-color assets from RGBA images by collecting each
//! distinct color into the image's local palette. Fully transparent
//! pixels all collapse onto the colorkey entry.

use image::RgbaImage;

use crate::color::COLORKEY;
use crate::models::{SpriteSheet, TiledImage, Tileset};

/// Convert an RGBA image into an indexed [`TiledImage`].
///
/// Colors are indexed in first-seen scan order. The palette cap of
/// [`TiledImage::add_or_find_color`] applies: once it is full, leftover
/// colors land on the last palette entry.
pub fn import_image(rgba: &RgbaImage, name: impl Into<String>) -> TiledImage {
    let mut image = TiledImage {
        name: name.into(),
        width: rgba.width() as usize,
        height: rgba.height() as usize,
        ..TiledImage::default()
    };
    image.pixels = vec![0; image.width * image.height];
    // reserve index 0 for the blank color
    image.add_or_find_color(COLORKEY);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let color = if pixel.0[3] == 0 { COLORKEY } else { *pixel };
        let index = image.add_or_find_color(color);
        image.pixels[y as usize * image.width + x as usize] = index;
    }
    image
}

/// Import an RGBA image as a tileset.
pub fn import_tileset(rgba: &RgbaImage, name: impl Into<String>) -> Tileset {
    Tileset {
        image: import_image(rgba, name),
    }
}

/// Import an RGBA image as a sprite sheet (8×8 sprites until resized).
pub fn import_spritesheet(rgba: &RgbaImage, name: impl Into<String>) -> SpriteSheet {
    let mut sheet = SpriteSheet::default();
    sheet.image = import_image(rgba, name);
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_import_collects_palette() {
        let mut rgba = RgbaImage::new(2, 2);
        rgba.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        rgba.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        rgba.put_pixel(0, 1, Rgba([255, 0, 0, 255]));
        rgba.put_pixel(1, 1, Rgba([0, 0, 0, 0]));

        let image = import_image(&rgba, "test");
        assert_eq!(image.palette.len(), 3); // colorkey, red, green
        assert_eq!(image.palette[0], COLORKEY);
        assert_eq!(image.pixels, vec![1, 2, 1, 0]);
    }

    #[test]
    fn test_transparent_pixels_collapse_to_colorkey() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([9, 9, 9, 0]));
        rgba.put_pixel(1, 0, Rgba([200, 200, 200, 0]));

        let image = import_image(&rgba, "test");
        assert_eq!(image.pixels, vec![0, 0]);
        assert_eq!(image.palette.len(), 1);
    }

    #[test]
    fn test_import_roundtrips_through_render() {
        let mut rgba = RgbaImage::new(8, 8);
        for (x, y, pixel) in rgba.enumerate_pixels_mut() {
            *pixel = if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            };
        }
        let image = import_image(&rgba, "checker");
        let rendered = crate::render::render_image(&image);
        assert_eq!(rendered, rgba);
    }
}
