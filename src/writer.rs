//! Asset serialization to C source
//!
//! Each asset serializes to one compilable C file: a metadata comment, an
//! include of the generated header, extern declarations for its data
//! arrays, a struct literal with its scalar fields, and the data arrays in
//! hardware storage order. The matching readers live in [`crate::parser`];
//! the text produced here round-trips through them byte-exactly.

use std::collections::BTreeMap;

use crate::cgen::{self, ArrayWriter, CType};
use crate::color::encode_palette;
use crate::models::{
    bg_prefix, Asset, AssetKind, Background, Map, TiledImage, BG_COUNT, HFLIP_BIT, VFLIP_BIT,
};
use crate::registry::AssetSet;
use crate::scan::{screen_entry_order, to_vram_order};

/// Name of the generated API header.
pub const ASSETS_HEADER: &str = "assets.h";

/// First line of every generated file.
pub const GENERATED_TAG: &str = "/*** Generated by gbatile ***/";
const MESSAGE_TAG: &str = "/*** ! Do not modify !  ***/";

fn meta(pairs: &[(&str, String)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn image_metadata(image: &TiledImage) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("name", image.name.clone()),
        ("width", image.width.to_string()),
        ("height", image.height.to_string()),
        ("tile_width", image.tile_width.to_string()),
        ("tile_height", image.tile_height.to_string()),
    ];
    if let Some(shared) = &image.shared_palette {
        pairs.push(("shared_palette", shared.clone()));
    }
    pairs
}

/// The metadata comment pairs of an asset.
pub fn metadata(asset: &Asset) -> BTreeMap<String, String> {
    match asset {
        Asset::Palette(palette) => meta(&[("name", palette.name.clone())]),
        Asset::Tileset(tileset) => meta(&image_metadata(&tileset.image)),
        Asset::SpriteSheet(sheet) => {
            let mut pairs = image_metadata(&sheet.image);
            pairs.push(("sprite_size", sheet.sprite_size().flag().to_string()));
            meta(&pairs)
        }
        Asset::Map(map) => meta(&[
            ("name", map.name.clone()),
            ("mode", map.mode.index().to_string()),
        ]),
    }
}

fn image_struct_fields(image: &TiledImage, fields: &mut Vec<(CType, String)>) {
    fields.push((CType::UnsignedShort, "width".to_string()));
    fields.push((CType::UnsignedShort, "height".to_string()));
    fields.push((CType::ConstPtrUnsignedChar, "pixels".to_string()));
    if !image.uses_shared_palette() {
        fields.push((CType::ConstPtrUnsignedShort, "palette".to_string()));
    }
}

fn background_struct_fields(slot: usize, fields: &mut Vec<(CType, String)>) {
    let prefix = bg_prefix(slot);
    let tileset_type = AssetKind::Tileset.type_name();
    fields.push((CType::ConstChar, format!("{prefix}_priority : 2")));
    fields.push((CType::ConstChar, format!("{prefix}_size_flag : 2")));
    fields.push((CType::ConstShort, format!("{prefix}_scroll_x")));
    fields.push((CType::ConstShort, format!("{prefix}_scroll_y")));
    fields.push((CType::ConstPtrUnsignedChar, format!("{prefix}_tiles")));
    fields.push((CType::ConstStruct, format!("{tileset_type}* {prefix}_tileset")));
}

/// The C struct fields of an asset, in serialization order.
pub fn struct_fields(asset: &Asset) -> Vec<(CType, String)> {
    let mut fields = Vec::new();
    match asset {
        Asset::Palette(_) => {
            fields.push((CType::UnsignedShort, "size".to_string()));
            fields.push((CType::ConstPtrUnsignedShort, "colors".to_string()));
        }
        Asset::Tileset(tileset) => image_struct_fields(&tileset.image, &mut fields),
        Asset::SpriteSheet(sheet) => {
            image_struct_fields(&sheet.image, &mut fields);
            fields.push((CType::UnsignedShort, "sprite_size".to_string()));
        }
        Asset::Map(_) => {
            fields.push((CType::ConstChar, "mode : 2".to_string()));
            for slot in 0..BG_COUNT {
                background_struct_fields(slot, &mut fields);
            }
        }
    }
    fields
}

fn image_struct_data(image: &TiledImage, data: &mut Vec<String>) {
    data.push(image.width.to_string());
    data.push(image.height.to_string());
    data.push(image.pixels_id());
    if !image.uses_shared_palette() {
        data.push(image.palette_id());
    }
}

fn background_struct_data(map: &Map, slot: usize, data: &mut Vec<String>) {
    let bg = &map.backgrounds[slot];
    // affine size flags serialize relative to the affine base; a regular
    // flag on a mode-affine slot goes out negative rather than clamped
    let mut flag = bg.size.flag() as i16;
    if map.mode.bg_affine(slot) {
        flag -= crate::models::BgSize::AFFINE_BASE as i16;
    }
    data.push(bg.priority.to_string());
    data.push(flag.to_string());
    data.push(bg.scroll_x.to_string());
    data.push(bg.scroll_y.to_string());
    data.push(map.tiles_id(slot));
    data.push(match &bg.tileset {
        Some(name) => format!("&{name}"),
        None => "0".to_string(),
    });
}

/// The struct literal values of an asset, matching [`struct_fields`] order.
pub fn struct_data(asset: &Asset) -> Vec<String> {
    let mut data = Vec::new();
    match asset {
        Asset::Palette(palette) => {
            data.push(palette.colors.len().to_string());
            data.push(palette.colors_id());
        }
        Asset::Tileset(tileset) => image_struct_data(&tileset.image, &mut data),
        Asset::SpriteSheet(sheet) => {
            image_struct_data(&sheet.image, &mut data);
            data.push(sheet.sprite_size().flag().to_string());
        }
        Asset::Map(map) => {
            data.push(map.mode.index().to_string());
            for slot in 0..BG_COUNT {
                background_struct_data(map, slot, &mut data);
            }
        }
    }
    data
}

fn write_image_decls(out: &mut String, image: &TiledImage) {
    cgen::write_array_decl(out, CType::ConstUnsignedChar, &image.pixels_id());
    if !image.uses_shared_palette() {
        cgen::write_array_decl(out, CType::ConstUnsignedShort, &image.palette_id());
    }
}

fn write_decls(out: &mut String, asset: &Asset) {
    match asset {
        Asset::Palette(palette) => {
            cgen::write_array_decl(out, CType::ConstUnsignedShort, &palette.colors_id());
        }
        Asset::Tileset(tileset) => write_image_decls(out, &tileset.image),
        Asset::SpriteSheet(sheet) => write_image_decls(out, &sheet.image),
        Asset::Map(map) => {
            for slot in 0..BG_COUNT {
                cgen::write_array_decl(out, CType::ConstUnsignedChar, &map.tiles_id(slot));
            }
        }
    }
}

fn write_image_data(out: &mut String, image: &TiledImage) {
    let pixel_data = to_vram_order(
        &image.pixels,
        image.width,
        image.height,
        image.tile_width,
        image.tile_height,
    );
    cgen::write_array(
        out,
        CType::ConstUnsignedChar,
        &image.pixels_id(),
        pixel_data.iter().map(|&p| p as u32),
    );

    if !image.uses_shared_palette() {
        cgen::write_array(
            out,
            CType::ConstUnsignedShort,
            &image.palette_id(),
            encode_palette(&image.palette).iter().map(|&v| v as u32),
        );
    }
}

fn write_background_data(out: &mut String, map: &Map, slot: usize) {
    let bg = &map.backgrounds[slot];
    let affine = bg.size.affine();

    let mut writer = ArrayWriter::new(out);
    writer.begin(CType::ConstUnsignedChar, &map.tiles_id(slot));
    for index in screen_entry_order(bg.width(), bg.height(), affine) {
        let Some(&tile) = bg.tiles.get(index) else {
            continue;
        };
        if affine {
            writer.write_value((tile & 0x00ff) as u32);
        } else {
            let mut entry = tile;
            if bg.hflips.get(index).copied().unwrap_or(false) {
                entry |= 1 << HFLIP_BIT;
            }
            if bg.vflips.get(index).copied().unwrap_or(false) {
                entry |= 1 << VFLIP_BIT;
            }
            writer.write_value((entry & 0x00ff) as u32);
            writer.write_value((entry >> 8) as u32);
        }
    }
    writer.end();
}

fn write_data(out: &mut String, asset: &Asset) {
    match asset {
        Asset::Palette(palette) => {
            cgen::write_array(
                out,
                CType::ConstUnsignedShort,
                &palette.colors_id(),
                encode_palette(&palette.colors).iter().map(|&v| v as u32),
            );
        }
        Asset::Tileset(tileset) => write_image_data(out, &tileset.image),
        Asset::SpriteSheet(sheet) => write_image_data(out, &sheet.image),
        Asset::Map(map) => {
            for slot in 0..BG_COUNT {
                write_background_data(out, map, slot);
            }
        }
    }
}

/// Serialize one asset to its C source text (without the generated-file
/// tag line, which the project layer owns).
pub fn write_asset(out: &mut String, asset: &Asset) {
    cgen::write_metadata(out, &metadata(asset));
    out.push_str("#include <");
    out.push_str(ASSETS_HEADER);
    out.push_str(">\n");

    write_decls(out, asset);

    let fields = struct_fields(asset);
    if !fields.is_empty() {
        cgen::write_struct(out, asset.kind().type_name(), asset.name(), &struct_data(asset));
    }

    write_data(out, asset);
}

/// Serialize one asset to a complete generated file, tag line included.
pub fn write_source_file(asset: &Asset) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_TAG);
    out.push('\n');
    write_asset(&mut out, asset);
    out
}

/// Generate the `assets.h` API header: one struct typedef per asset kind
/// present (the first asset of a kind supplies the field list) and one
/// extern declaration per asset.
pub fn write_assets_header(assets: &AssetSet) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_TAG);
    out.push('\n');
    out.push_str(MESSAGE_TAG);
    out.push('\n');
    out.push_str("#ifndef __ASSETS_H__\n#define __ASSETS_H__\n\n");

    for kind in AssetKind::ALL {
        let group: Vec<Asset> = assets.assets_of_kind(kind);
        if group.is_empty() {
            continue;
        }
        cgen::write_struct_def(&mut out, kind.type_name(), &struct_fields(&group[0]));
        out.push('\n');
        for asset in &group {
            cgen::write_struct_decl(&mut out, kind.type_name(), asset.name());
        }
        out.push('\n');
    }

    out.push_str("#endif //__ASSETS_H__\n");
    out
}

/// The tile entry bytes of one background, in storage order. This is what
/// the runtime copies into the background's screen blocks; exposed so
/// callers can cross-check a declared array against its expected size.
pub fn background_tile_bytes(bg: &Background) -> usize {
    let per_entry = if bg.size.affine() { 1 } else { 2 };
    bg.width() * bg.height() * per_entry
}
