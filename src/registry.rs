//! Asset registry
//!
//! Owns every asset of a game and resolves the name references between
//! them: images name their shared palette, map backgrounds name their
//! tileset. Names are unique per kind; adding a duplicate gets a numeric
//! suffix, the same way the editor the files come from resolves clashes.

use crate::merge::merge_palettes;
use crate::models::{
    Asset, AssetKind, Map, Palette, SpriteSheet, TiledImage, Tileset, SHARED_SPRITE_PALETTE,
    SHARED_TILESET_PALETTE,
};
use crate::vram::{assign_regions, RegionAssignment};

/// All assets of a game, grouped by kind.
#[derive(Debug, Clone, Default)]
pub struct AssetSet {
    pub palettes: Vec<Palette>,
    pub tilesets: Vec<Tileset>,
    pub spritesheets: Vec<SpriteSheet>,
    pub maps: Vec<Map>,
}

/// Append a numeric suffix until `base` is free among `taken`.
fn unique_name<'a>(base: &str, taken: impl Iterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = taken.collect();
    if !taken.contains(&base) {
        return base.to_string();
    }
    let mut counter = 0;
    loop {
        counter += 1;
        let candidate = format!("{base}{counter}");
        if !taken.iter().any(|&name| name == candidate) {
            return candidate;
        }
    }
}

impl AssetSet {
    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
            && self.tilesets.is_empty()
            && self.spritesheets.is_empty()
            && self.maps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.palettes.len() + self.tilesets.len() + self.spritesheets.len() + self.maps.len()
    }

    pub fn add_palette(&mut self, mut palette: Palette) -> &mut Palette {
        palette.name = unique_name(&palette.name, self.palettes.iter().map(|p| p.name.as_str()));
        self.palettes.push(palette);
        self.palettes.last_mut().unwrap()
    }

    pub fn add_tileset(&mut self, mut tileset: Tileset) -> &mut Tileset {
        tileset.image.name = unique_name(
            &tileset.image.name,
            self.tilesets.iter().map(|t| t.image.name.as_str()),
        );
        self.tilesets.push(tileset);
        self.tilesets.last_mut().unwrap()
    }

    pub fn add_spritesheet(&mut self, mut sheet: SpriteSheet) -> &mut SpriteSheet {
        sheet.image.name = unique_name(
            &sheet.image.name,
            self.spritesheets.iter().map(|s| s.image.name.as_str()),
        );
        self.spritesheets.push(sheet);
        self.spritesheets.last_mut().unwrap()
    }

    pub fn add_map(&mut self, mut map: Map) -> &mut Map {
        map.name = unique_name(&map.name, self.maps.iter().map(|m| m.name.as_str()));
        self.maps.push(map);
        self.maps.last_mut().unwrap()
    }

    /// Add an asset of any kind.
    pub fn add(&mut self, asset: Asset) {
        match asset {
            Asset::Palette(palette) => {
                self.add_palette(palette);
            }
            Asset::Tileset(tileset) => {
                self.add_tileset(tileset);
            }
            Asset::SpriteSheet(sheet) => {
                self.add_spritesheet(sheet);
            }
            Asset::Map(map) => {
                self.add_map(map);
            }
        }
    }

    pub fn find_palette(&self, name: &str) -> Option<&Palette> {
        self.palettes.iter().find(|p| p.name == name)
    }

    pub fn find_tileset(&self, name: &str) -> Option<&Tileset> {
        self.tilesets.iter().find(|t| t.image.name == name)
    }

    pub fn find_spritesheet(&self, name: &str) -> Option<&SpriteSheet> {
        self.spritesheets.iter().find(|s| s.image.name == name)
    }

    pub fn find_map(&self, name: &str) -> Option<&Map> {
        self.maps.iter().find(|m| m.name == name)
    }

    pub fn remove_palette(&mut self, name: &str) {
        self.palettes.retain(|p| p.name != name);
    }

    pub fn remove_tileset(&mut self, name: &str) {
        self.tilesets.retain(|t| t.image.name != name);
    }

    pub fn remove_spritesheet(&mut self, name: &str) {
        self.spritesheets.retain(|s| s.image.name != name);
    }

    pub fn remove_map(&mut self, name: &str) {
        self.maps.retain(|m| m.name != name);
    }

    /// The assets of one kind, wrapped in the [`Asset`] variant. Sorted
    /// by name so generated output does not depend on insertion order,
    /// which a load would otherwise reshuffle.
    pub fn assets_of_kind(&self, kind: AssetKind) -> Vec<Asset> {
        let mut assets: Vec<Asset> = match kind {
            AssetKind::Palette => self.palettes.iter().cloned().map(Asset::Palette).collect(),
            AssetKind::Tileset => self.tilesets.iter().cloned().map(Asset::Tileset).collect(),
            AssetKind::SpriteSheet => self
                .spritesheets
                .iter()
                .cloned()
                .map(Asset::SpriteSheet)
                .collect(),
            AssetKind::Map => self.maps.iter().cloned().map(Asset::Map).collect(),
        };
        assets.sort_by(|a, b| a.name().cmp(b.name()));
        assets
    }

    /// Index of the named palette, creating an empty one if missing.
    fn ensure_palette(&mut self, name: &str) -> usize {
        if let Some(index) = self.palettes.iter().position(|p| p.name == name) {
            return index;
        }
        self.palettes.push(Palette {
            name: name.to_string(),
            colors: Vec::new(),
        });
        self.palettes.len() - 1
    }

    /// The shared palette all tilesets draw from, created on first use.
    pub fn tileset_palette(&mut self) -> &mut Palette {
        let index = self.ensure_palette(SHARED_TILESET_PALETTE);
        &mut self.palettes[index]
    }

    /// The shared palette all sprite sheets draw from, created on first
    /// use.
    pub fn sprite_palette(&mut self) -> &mut Palette {
        let index = self.ensure_palette(SHARED_SPRITE_PALETTE);
        &mut self.palettes[index]
    }

    /// Re-run the palette merger over all tilesets and all sprite sheets,
    /// refreshing the two shared palettes. Done before every save so the
    /// generated palettes match the generated pixel indices.
    pub fn rebuild_palettes(&mut self) {
        let index = self.ensure_palette(SHARED_TILESET_PALETTE);
        let mut images: Vec<&mut TiledImage> =
            self.tilesets.iter_mut().map(|t| &mut t.image).collect();
        merge_palettes(&mut images, &mut self.palettes[index]);

        let index = self.ensure_palette(SHARED_SPRITE_PALETTE);
        let mut images: Vec<&mut TiledImage> =
            self.spritesheets.iter_mut().map(|s| &mut s.image).collect();
        merge_palettes(&mut images, &mut self.palettes[index]);
    }

    /// Re-establish name references after a load: images pick up the
    /// colors of the shared palette they name, backgrounds keep their
    /// tileset reference only when it resolves.
    pub fn relink(&mut self) {
        for tileset in &mut self.tilesets {
            relink_image(&mut tileset.image, &self.palettes);
        }
        for sheet in &mut self.spritesheets {
            relink_image(&mut sheet.image, &self.palettes);
        }

        let tileset_names: Vec<String> =
            self.tilesets.iter().map(|t| t.image.name.clone()).collect();
        for map in &mut self.maps {
            for bg in &mut map.backgrounds {
                if let Some(name) = &bg.tileset {
                    if !tileset_names.iter().any(|t| t == name) {
                        bg.tileset = None;
                    }
                }
            }
        }
    }

    /// Compute the VRAM region assignment for one of this set's maps.
    pub fn map_regions(&self, map: &Map) -> [Option<RegionAssignment>; crate::models::BG_COUNT] {
        assign_regions(map, |name| {
            self.find_tileset(name)
                .map(|t| (t.image.width, t.image.height))
        })
    }
}

fn relink_image(image: &mut TiledImage, palettes: &[Palette]) {
    if let Some(shared) = &image.shared_palette {
        if let Some(palette) = palettes.iter().find(|p| &p.name == shared) {
            image.palette = palette.colors.clone();
        }
    }
}
