//! Asset deserialization from C source
//!
//! Mirrors [`crate::writer`]: each reader consumes the metadata comment,
//! the include line, the extern declarations, the struct literal and the
//! data arrays of one generated file. Failures are reported as
//! [`CodecError`]; the project layer's policy is to drop the one
//! malformed asset and keep loading the rest.

use std::collections::BTreeMap;

use crate::cgen::{self, ArrayReader, CodecError, CType, SourceReader};
use crate::color::decode_palette;
use crate::models::{
    Asset, AssetKind, BgSize, Map, MapMode, Palette, SpriteSheet, SpriteSize, TiledImage, Tileset,
    BG_COUNT, HFLIP_BIT, VFLIP_BIT,
};
use crate::scan::{from_vram_order, screen_entry_order};
use crate::writer;

fn meta_usize(metadata: &BTreeMap<String, String>, key: &str) -> usize {
    metadata
        .get(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Pop the front of a struct literal's field data, as the original field
/// order expects; missing fields read as empty.
struct FieldData {
    values: std::vec::IntoIter<String>,
}

impl FieldData {
    fn new(values: Vec<String>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }

    fn next_str(&mut self) -> String {
        self.values.next().unwrap_or_default()
    }

    fn next_int<T: std::str::FromStr + Default>(&mut self) -> T {
        self.next_str().parse().unwrap_or_default()
    }

    fn skip(&mut self) {
        self.values.next();
    }
}

fn read_include(r: &mut SourceReader) -> Result<(), CodecError> {
    let line = r.line();
    match r.read_line() {
        Some(text) if text.starts_with('#') => Ok(()),
        _ => Err(CodecError {
            message: "expected include line".to_string(),
            line,
        }),
    }
}

fn apply_image_metadata(image: &mut TiledImage, metadata: &BTreeMap<String, String>) {
    if let Some(name) = metadata.get("name") {
        image.name = name.clone();
    }
    image.width = meta_usize(metadata, "width");
    image.height = meta_usize(metadata, "height");
    image.tile_width = meta_usize(metadata, "tile_width");
    image.tile_height = meta_usize(metadata, "tile_height");
    image.shared_palette = metadata.get("shared_palette").cloned();
}

fn read_image_decls(r: &mut SourceReader, image: &TiledImage) -> Result<(), CodecError> {
    cgen::read_array_decl(r)?;
    if !image.uses_shared_palette() {
        cgen::read_array_decl(r)?;
    }
    Ok(())
}

fn apply_image_struct_data(image: &mut TiledImage, data: &mut FieldData) {
    image.width = data.next_int();
    image.height = data.next_int();
    data.skip(); // pixels id; the data array is read separately
    if !image.uses_shared_palette() {
        data.skip(); // palette id
    }
}

fn read_image_data(r: &mut SourceReader, image: &mut TiledImage) -> Result<(), CodecError> {
    let (id, pixel_data) = cgen::read_array(r, CType::ConstUnsignedChar)?;
    let data: Vec<u8> = pixel_data.iter().map(|&v| v as u8).collect();
    image.pixels = from_vram_order(
        &data,
        image.width,
        image.height,
        image.tile_width,
        image.tile_height,
    );
    if image.pixels.len() != image.width * image.height {
        log::warn!("{id}: pixel data does not match image dimensions");
    }

    if !image.uses_shared_palette() {
        let (_, palette_data) = cgen::read_array(r, CType::ConstUnsignedShort)?;
        let values: Vec<u16> = palette_data.iter().map(|&v| v as u16).collect();
        image.palette = decode_palette(&values);
    }
    Ok(())
}

fn parse_palette(r: &mut SourceReader) -> Result<Palette, CodecError> {
    let mut palette = Palette::default();

    let metadata = cgen::read_metadata(r)?;
    if let Some(name) = metadata.get("name") {
        palette.name = name.clone();
    }
    read_include(r)?;
    cgen::read_array_decl(r)?;

    if let Ok((id, _)) = cgen::read_struct(r, AssetKind::Palette.type_name()) {
        palette.name = id;
    }

    let (_, values) = cgen::read_array(r, CType::ConstUnsignedShort)?;
    let values: Vec<u16> = values.iter().map(|&v| v as u16).collect();
    palette.colors = decode_palette(&values);
    Ok(palette)
}

fn parse_tileset(r: &mut SourceReader) -> Result<Tileset, CodecError> {
    let mut tileset = Tileset::default();
    let image = &mut tileset.image;

    let metadata = cgen::read_metadata(r)?;
    apply_image_metadata(image, &metadata);
    read_include(r)?;
    read_image_decls(r, image)?;

    if let Ok((id, data)) = cgen::read_struct(r, AssetKind::Tileset.type_name()) {
        image.name = id;
        apply_image_struct_data(image, &mut FieldData::new(data));
    }

    read_image_data(r, image)?;
    Ok(tileset)
}

fn parse_spritesheet(r: &mut SourceReader) -> Result<SpriteSheet, CodecError> {
    let mut sheet = SpriteSheet::default();

    let metadata = cgen::read_metadata(r)?;
    apply_image_metadata(&mut sheet.image, &metadata);
    if let Some(size) = SpriteSize::from_flag(meta_usize(&metadata, "sprite_size") as u8) {
        sheet.set_sprite_size(size);
    }
    read_include(r)?;
    read_image_decls(r, &sheet.image)?;

    if let Ok((id, data)) = cgen::read_struct(r, AssetKind::SpriteSheet.type_name()) {
        sheet.image.name = id;
        let mut data = FieldData::new(data);
        apply_image_struct_data(&mut sheet.image, &mut data);
        if let Some(size) = SpriteSize::from_flag(data.next_int::<u8>()) {
            sheet.set_sprite_size(size);
        }
    }

    read_image_data(r, &mut sheet.image)?;
    Ok(sheet)
}

fn apply_background_struct_data(map: &mut Map, slot: usize, data: &mut FieldData) {
    let bg = &mut map.backgrounds[slot];
    bg.priority = data.next_int();
    let mut flag: i16 = data.next_int();
    bg.scroll_x = data.next_int();
    bg.scroll_y = data.next_int();
    data.skip(); // tiles id; the data array is read separately

    let tileset_ref = data.next_str().replace('&', "");
    bg.tileset = match tileset_ref.as_str() {
        "" | "0" => None,
        name => Some(name.to_string()),
    };

    // affine size flags are serialized relative to the affine base
    if map.mode.bg_affine(slot) {
        flag += BgSize::AFFINE_BASE as i16;
    }
    if let Some(size) = u8::try_from(flag).ok().and_then(BgSize::from_flag) {
        map.backgrounds[slot].resize(size);
    }
}

fn read_background_data(r: &mut SourceReader, map: &mut Map, slot: usize) -> Result<(), CodecError> {
    let bg = &mut map.backgrounds[slot];
    let affine = bg.size.affine();

    let mut reader = ArrayReader::new(r);
    reader.begin(CType::ConstUnsignedChar)?;
    for index in screen_entry_order(bg.width(), bg.height(), affine) {
        if affine {
            let Some(value) = reader.read_value() else {
                break;
            };
            if let Some(tile) = bg.tiles.get_mut(index) {
                *tile = value as u16;
            }
            continue;
        }

        let Some(lo) = reader.read_value() else {
            break;
        };
        let Some(hi) = reader.read_value() else {
            break;
        };
        let mut entry = (lo as u16) | ((hi as u16) << 8);
        if index >= bg.tiles.len() {
            continue;
        }
        if entry & (1 << VFLIP_BIT) != 0 {
            entry &= !(1 << VFLIP_BIT);
            bg.vflips[index] = true;
        }
        if entry & (1 << HFLIP_BIT) != 0 {
            entry &= !(1 << HFLIP_BIT);
            bg.hflips[index] = true;
        }
        bg.tiles[index] = entry;
    }
    reader.end()
}

fn parse_map(r: &mut SourceReader) -> Result<Map, CodecError> {
    let mut map = Map::default();

    let metadata = cgen::read_metadata(r)?;
    if let Some(name) = metadata.get("name") {
        map.name = name.clone();
    }
    if let Some(mode) = MapMode::from_index(meta_usize(&metadata, "mode") as u8) {
        map.mode = mode;
    }
    read_include(r)?;
    for _ in 0..BG_COUNT {
        cgen::read_array_decl(r)?;
    }

    if let Ok((id, data)) = cgen::read_struct(r, AssetKind::Map.type_name()) {
        map.name = id;
        let mut data = FieldData::new(data);
        if let Some(mode) = MapMode::from_index(data.next_int::<u8>()) {
            map.mode = mode;
        }
        for slot in 0..BG_COUNT {
            apply_background_struct_data(&mut map, slot, &mut data);
        }
    }

    for slot in 0..BG_COUNT {
        read_background_data(r, &mut map, slot)?;
    }
    Ok(map)
}

/// Deserialize one asset of the given kind from a reader positioned at its
/// metadata comment.
pub fn parse_asset(r: &mut SourceReader, kind: AssetKind) -> Result<Asset, CodecError> {
    match kind {
        AssetKind::Palette => parse_palette(r).map(Asset::Palette),
        AssetKind::Tileset => parse_tileset(r).map(Asset::Tileset),
        AssetKind::SpriteSheet => parse_spritesheet(r).map(Asset::SpriteSheet),
        AssetKind::Map => parse_map(r).map(Asset::Map),
    }
}

/// Deserialize a complete generated file, tag line included.
pub fn parse_source_file(text: &str, kind: AssetKind) -> Result<Asset, CodecError> {
    let mut r = SourceReader::new(text);
    let line = r.line();
    match r.read_line() {
        Some(tag) if tag == writer::GENERATED_TAG => {}
        _ => {
            return Err(CodecError {
                message: "missing generated-file tag".to_string(),
                line,
            })
        }
    }
    parse_asset(&mut r, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Background;
    use image::Rgba;

    fn roundtrip(asset: &Asset) -> Asset {
        let text = writer::write_source_file(asset);
        parse_source_file(&text, asset.kind()).expect("roundtrip parse failed")
    }

    #[test]
    fn test_palette_roundtrip() {
        let palette = Palette {
            name: "Night".to_string(),
            colors: vec![
                crate::color::COLORKEY,
                Rgba([255, 0, 0, 255]),
                Rgba([0, 0, 255, 255]),
            ],
        };
        let asset = Asset::Palette(palette.clone());
        let Asset::Palette(read) = roundtrip(&asset) else {
            panic!("wrong kind");
        };
        assert_eq!(read.name, "Night");
        // colors survive modulo 15-bit quantization; these are exact
        assert_eq!(read.colors[0], crate::color::COLORKEY);
        assert_eq!(read.colors[1], Rgba([255, 0, 0, 255]));
    }

    fn sample_tileset() -> Tileset {
        let mut tileset = Tileset::default();
        tileset.image.name = "Forest".to_string();
        tileset.image.width = 16;
        tileset.image.height = 16;
        tileset.image.pixels = (0..256u32).map(|i| (i % 3) as u8).collect();
        tileset.image.palette = vec![
            crate::color::COLORKEY,
            Rgba([255, 0, 0, 255]),
            Rgba([0, 255, 0, 255]),
        ];
        tileset
    }

    #[test]
    fn test_tileset_roundtrip_local_palette() {
        let tileset = sample_tileset();
        let Asset::Tileset(read) = roundtrip(&Asset::Tileset(tileset.clone())) else {
            panic!("wrong kind");
        };
        assert_eq!(read.image.name, "Forest");
        assert_eq!(read.image.width, 16);
        assert_eq!(read.image.pixels, tileset.image.pixels);
        assert_eq!(read.image.palette.len(), 3);
        assert!(!read.image.uses_shared_palette());
    }

    #[test]
    fn test_tileset_roundtrip_shared_palette() {
        let mut tileset = sample_tileset();
        tileset.image.shared_palette = Some("Palette_Tileset".to_string());
        let Asset::Tileset(read) = roundtrip(&Asset::Tileset(tileset.clone())) else {
            panic!("wrong kind");
        };
        assert_eq!(read.image.shared_palette.as_deref(), Some("Palette_Tileset"));
        assert_eq!(read.image.pixels, tileset.image.pixels);
        // shared-palette images carry no palette array of their own
        assert!(read.image.palette.is_empty());
    }

    #[test]
    fn test_spritesheet_roundtrip_keeps_sprite_size() {
        let mut sheet = SpriteSheet::default();
        sheet.image.name = "Hero".to_string();
        sheet.image.width = 32;
        sheet.image.height = 32;
        sheet.set_sprite_size(SpriteSize::S16x16);
        sheet.image.pixels = vec![1; 32 * 32];
        sheet.image.palette = vec![crate::color::COLORKEY, Rgba([0, 0, 0, 255])];

        let Asset::SpriteSheet(read) = roundtrip(&Asset::SpriteSheet(sheet.clone())) else {
            panic!("wrong kind");
        };
        assert_eq!(read.sprite_size(), SpriteSize::S16x16);
        assert_eq!(read.image.tile_width, 16);
        assert_eq!(read.image.pixels, sheet.image.pixels);
    }

    fn sample_map() -> Map {
        let mut map = Map::default();
        map.name = "Overworld".to_string();
        map.backgrounds[0].tileset = Some("Forest".to_string());
        map.backgrounds[0].priority = 2;
        map.backgrounds[0].scroll_x = -4;
        map.backgrounds[0].scroll_y = 12;
        map.backgrounds[0].set_tile(0, 5, false, false);
        map.backgrounds[0].set_tile(33, 7, true, true);
        map
    }

    #[test]
    fn test_map_roundtrip() {
        let map = sample_map();
        let Asset::Map(read) = roundtrip(&Asset::Map(map.clone())) else {
            panic!("wrong kind");
        };
        assert_eq!(read.name, "Overworld");
        assert_eq!(read.backgrounds[0].tileset.as_deref(), Some("Forest"));
        assert_eq!(read.backgrounds[0].priority, 2);
        assert_eq!(read.backgrounds[0].scroll_x, -4);
        assert_eq!(read.backgrounds[0].scroll_y, 12);
        assert_eq!(read.backgrounds[0].tiles[0], 5);
        assert_eq!(read.backgrounds[0].tiles[33], 7);
        assert!(read.backgrounds[0].hflips[33]);
        assert!(read.backgrounds[0].vflips[33]);
        assert!(read.backgrounds[1].tileset.is_none());
    }

    #[test]
    fn test_affine_map_roundtrip() {
        let mut map = Map::default();
        map.name = "Rotating".to_string();
        map.mode = MapMode::Mode1;
        map.backgrounds[2].resize(BgSize::Aff32x32);
        map.backgrounds[2].tileset = Some("Cave".to_string());
        map.backgrounds[2].set_tile(10, 0xab, false, false);

        let Asset::Map(read) = roundtrip(&Asset::Map(map.clone())) else {
            panic!("wrong kind");
        };
        assert_eq!(read.mode, MapMode::Mode1);
        assert_eq!(read.backgrounds[2].size, BgSize::Aff32x32);
        assert_eq!(read.backgrounds[2].tiles[10], 0xab);
    }

    #[test]
    fn test_reserialization_is_byte_identical() {
        let assets = [
            Asset::Tileset(sample_tileset()),
            Asset::Map(sample_map()),
        ];
        for asset in &assets {
            let first = writer::write_source_file(asset);
            let read = parse_source_file(&first, asset.kind()).unwrap();
            let second = writer::write_source_file(&read);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_missing_tag_is_rejected() {
        let asset = Asset::Map(Map::default());
        let mut text = writer::write_source_file(&asset);
        text = text.replacen(writer::GENERATED_TAG, "/* edited by hand */", 1);
        assert!(parse_source_file(&text, AssetKind::Map).is_err());
    }

    #[test]
    fn test_truncated_source_fails() {
        let asset = Asset::Tileset(sample_tileset());
        let text = writer::write_source_file(&asset);
        let cut = &text[..text.len() / 2];
        assert!(parse_source_file(cut, AssetKind::Tileset).is_err());
    }

    #[test]
    fn test_disabled_background_roundtrips_empty() {
        let map = Map::default();
        let Asset::Map(read) = roundtrip(&Asset::Map(map)) else {
            panic!("wrong kind");
        };
        for bg in &read.backgrounds {
            assert!(bg.tileset.is_none());
            assert_eq!(bg.tiles, Background::default().tiles);
        }
    }
}
