//! Asset data model
//!
//! Plain data records for the four asset kinds - palettes, tilesets,
//! sprite sheets and maps - plus the fixed hardware tables they are
//! constrained by: background size flags, display-mode layer tables and
//! sprite dimensions. Records reference each other by name only; the
//! [`crate::registry::AssetSet`] resolves names to instances.

use image::Rgba;

/// Hardware tile edge in pixels.
pub const TILE_SIZE: usize = 8;
/// Maximum colors in any palette.
pub const PALETTE_MAX: usize = 256;
/// Background layers per map.
pub const BG_COUNT: usize = 4;
/// Priority levels; 0 is drawn on top.
pub const PRIORITY_COUNT: u8 = 4;

/// Default tileset dimensions in pixels.
pub const TILESET_WIDTH: usize = 128;
pub const TILESET_HEIGHT: usize = 256;

/// Default sprite sheet dimensions in pixels.
pub const SPRITESHEET_WIDTH: usize = 128;
pub const SPRITESHEET_HEIGHT: usize = 128;

/// Flip bits in a regular background's 16-bit tile entry.
pub const HFLIP_BIT: u16 = 10;
pub const VFLIP_BIT: u16 = 11;

/// Names of the merged shared palettes.
pub const SHARED_TILESET_PALETTE: &str = "Palette_Tileset";
pub const SHARED_SPRITE_PALETTE: &str = "Palette_Sprite";

/// Suffixes for generated data array identifiers.
pub const COLORS_SUFFIX: &str = "_colors";
pub const PALETTE_SUFFIX: &str = "_palette";
pub const PIXELS_SUFFIX: &str = "_pixels";
pub const TILES_SUFFIX: &str = "_tiles";

/// Background tile-grid dimensions. Flags 0-3 are the regular sizes,
/// 4-7 the affine ones; the serialized flag for an affine layer is
/// shifted down by [`BgSize::AFFINE_BASE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BgSize {
    Reg32x32,
    Reg32x64,
    Reg64x32,
    Reg64x64,
    Aff16x16,
    Aff32x32,
    Aff64x64,
    Aff128x128,
}

impl BgSize {
    pub const COUNT: usize = 8;
    /// First affine flag value.
    pub const AFFINE_BASE: u8 = 4;

    pub const ALL: [BgSize; Self::COUNT] = [
        BgSize::Reg32x32,
        BgSize::Reg32x64,
        BgSize::Reg64x32,
        BgSize::Reg64x64,
        BgSize::Aff16x16,
        BgSize::Aff32x32,
        BgSize::Aff64x64,
        BgSize::Aff128x128,
    ];

    pub fn flag(self) -> u8 {
        self as u8
    }

    pub fn from_flag(flag: u8) -> Option<BgSize> {
        Self::ALL.get(flag as usize).copied()
    }

    /// Width in tiles.
    pub fn width(self) -> usize {
        match self {
            BgSize::Reg32x32 | BgSize::Reg32x64 | BgSize::Aff32x32 => 32,
            BgSize::Reg64x32 | BgSize::Reg64x64 | BgSize::Aff64x64 => 64,
            BgSize::Aff16x16 => 16,
            BgSize::Aff128x128 => 128,
        }
    }

    /// Height in tiles.
    pub fn height(self) -> usize {
        match self {
            BgSize::Reg32x32 | BgSize::Reg64x32 | BgSize::Aff32x32 => 32,
            BgSize::Reg32x64 | BgSize::Reg64x64 | BgSize::Aff64x64 => 64,
            BgSize::Aff16x16 => 16,
            BgSize::Aff128x128 => 128,
        }
    }

    pub fn affine(self) -> bool {
        self.flag() >= Self::AFFINE_BASE
    }

    pub fn label(self) -> &'static str {
        match self {
            BgSize::Reg32x32 => "32x32",
            BgSize::Reg32x64 => "32x64",
            BgSize::Reg64x32 => "64x32",
            BgSize::Reg64x64 => "64x64",
            BgSize::Aff16x16 => "16x16_AFFINE",
            BgSize::Aff32x32 => "32x32_AFFINE",
            BgSize::Aff64x64 => "64x64_AFFINE",
            BgSize::Aff128x128 => "128x128_AFFINE",
        }
    }

    pub fn from_dims(width: usize, height: usize, affine: bool) -> Option<BgSize> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.width() == width && s.height() == height && s.affine() == affine)
    }
}

/// Tiled display mode. Each mode fixes which background slots exist and
/// which of them are affine:
///
/// ```text
/// Mode:   BG0   BG1   BG2   BG3
/// -----------------------------
/// 0       reg   reg   reg   reg
/// 1       reg   reg   aff   -
/// 2       -     -     aff   aff
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapMode {
    #[default]
    Mode0,
    Mode1,
    Mode2,
}

const MODE_BG_ENABLED: [[bool; BG_COUNT]; 3] = [
    [true, true, true, true],
    [true, true, true, false],
    [false, false, true, true],
];

const MODE_BG_AFFINE: [[bool; BG_COUNT]; 3] = [
    [false, false, false, false],
    [false, false, true, false],
    [false, false, true, true],
];

impl MapMode {
    pub fn from_index(index: u8) -> Option<MapMode> {
        match index {
            0 => Some(MapMode::Mode0),
            1 => Some(MapMode::Mode1),
            2 => Some(MapMode::Mode2),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Whether the mode supports the given background slot at all.
    pub fn bg_enabled(self, slot: usize) -> bool {
        MODE_BG_ENABLED[self.index() as usize][slot]
    }

    /// Whether the mode drives the given background slot as affine.
    pub fn bg_affine(self, slot: usize) -> bool {
        MODE_BG_AFFINE[self.index() as usize][slot]
    }

    /// The size flags a background in this mode/slot may take.
    pub fn bg_sizes(self, slot: usize) -> Vec<BgSize> {
        if !self.bg_enabled(slot) {
            return Vec::new();
        }
        let affine = self.bg_affine(slot);
        BgSize::ALL.iter().copied().filter(|s| s.affine() == affine).collect()
    }
}

/// Hardware sprite dimensions, keyed by the OAM shape/size flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpriteSize {
    #[default]
    S8x8,
    S16x16,
    S32x32,
    S64x64,
    S16x8,
    S32x8,
    S32x16,
    S64x32,
    S8x16,
    S8x32,
    S16x32,
    S32x64,
}

impl SpriteSize {
    pub const COUNT: usize = 12;

    pub const ALL: [SpriteSize; Self::COUNT] = [
        SpriteSize::S8x8,
        SpriteSize::S16x16,
        SpriteSize::S32x32,
        SpriteSize::S64x64,
        SpriteSize::S16x8,
        SpriteSize::S32x8,
        SpriteSize::S32x16,
        SpriteSize::S64x32,
        SpriteSize::S8x16,
        SpriteSize::S8x32,
        SpriteSize::S16x32,
        SpriteSize::S32x64,
    ];

    /// The OAM shape/size flag value.
    pub fn flag(self) -> u8 {
        match self {
            SpriteSize::S8x8 => 0x00,
            SpriteSize::S16x16 => 0x10,
            SpriteSize::S32x32 => 0x20,
            SpriteSize::S64x64 => 0x30,
            SpriteSize::S16x8 => 0x01,
            SpriteSize::S32x8 => 0x11,
            SpriteSize::S32x16 => 0x21,
            SpriteSize::S64x32 => 0x31,
            SpriteSize::S8x16 => 0x02,
            SpriteSize::S8x32 => 0x12,
            SpriteSize::S16x32 => 0x22,
            SpriteSize::S32x64 => 0x32,
        }
    }

    pub fn from_flag(flag: u8) -> Option<SpriteSize> {
        Self::ALL.iter().copied().find(|s| s.flag() == flag)
    }

    pub fn dims(self) -> (usize, usize) {
        match self {
            SpriteSize::S8x8 => (8, 8),
            SpriteSize::S16x16 => (16, 16),
            SpriteSize::S32x32 => (32, 32),
            SpriteSize::S64x64 => (64, 64),
            SpriteSize::S16x8 => (16, 8),
            SpriteSize::S32x8 => (32, 8),
            SpriteSize::S32x16 => (32, 16),
            SpriteSize::S64x32 => (64, 32),
            SpriteSize::S8x16 => (8, 16),
            SpriteSize::S8x32 => (8, 32),
            SpriteSize::S16x32 => (16, 32),
            SpriteSize::S32x64 => (32, 64),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpriteSize::S8x8 => "8x8",
            SpriteSize::S16x16 => "16x16",
            SpriteSize::S32x32 => "32x32",
            SpriteSize::S64x64 => "64x64",
            SpriteSize::S16x8 => "16x8",
            SpriteSize::S32x8 => "32x8",
            SpriteSize::S32x16 => "32x16",
            SpriteSize::S64x32 => "64x32",
            SpriteSize::S8x16 => "8x16",
            SpriteSize::S8x32 => "8x32",
            SpriteSize::S16x32 => "16x32",
            SpriteSize::S32x64 => "32x64",
        }
    }
}

/// A named color table. Either free-standing (one of the shared palettes
/// the merger maintains) or the source a tiled image copies from.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub name: String,
    pub colors: Vec<Rgba<u8>>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            name: "Palette".to_string(),
            colors: Vec::new(),
        }
    }
}

impl Palette {
    /// Identifier of the generated color data array.
    pub fn colors_id(&self) -> String {
        format!("{}{}", self.name, COLORS_SUFFIX)
    }
}

/// An indexed-color image cut into tiles. The base of both tilesets and
/// sprite sheets.
#[derive(Debug, Clone, PartialEq)]
pub struct TiledImage {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub tile_width: usize,
    pub tile_height: usize,
    /// Name of the shared palette this image's colors live in, if any.
    /// Images without one serialize their own palette array.
    pub shared_palette: Option<String>,
    pub palette: Vec<Rgba<u8>>,
    pub pixels: Vec<u8>,
}

impl Default for TiledImage {
    fn default() -> Self {
        Self {
            name: "Image".to_string(),
            width: 0,
            height: 0,
            tile_width: TILE_SIZE,
            tile_height: TILE_SIZE,
            shared_palette: None,
            palette: Vec::new(),
            pixels: Vec::new(),
        }
    }
}

impl TiledImage {
    pub fn uses_shared_palette(&self) -> bool {
        self.shared_palette.is_some()
    }

    /// Color index at a pixel; out-of-range coordinates read as 0.
    pub fn color_index(&self, x: usize, y: usize) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.pixels.get(y * self.width + x).copied().unwrap_or(0)
    }

    /// Color at a palette index; index 0 and out-of-range indices read as
    /// the transparent default.
    pub fn color(&self, color_index: u8) -> Rgba<u8> {
        if color_index == 0 {
            return crate::color::COLORKEY;
        }
        self.palette
            .get(color_index as usize)
            .copied()
            .unwrap_or(crate::color::COLORKEY)
    }

    /// Find a color's palette index, appending it if unseen. The palette
    /// stops growing one short of [`PALETTE_MAX`]; once full, unmatched
    /// colors resolve to the last index.
    pub fn add_or_find_color(&mut self, color: Rgba<u8>) -> u8 {
        if let Some(index) = self.palette.iter().position(|&c| c == color) {
            return index as u8;
        }
        if self.palette.len() + 1 < PALETTE_MAX {
            self.palette.push(color);
        }
        (self.palette.len() - 1) as u8
    }

    /// Set a pixel to the given color, extending the palette as needed.
    pub fn set_color(&mut self, x: usize, y: usize, color: Rgba<u8>) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = self.add_or_find_color(color);
        self.pixels[y * self.width + x] = index;
    }

    pub fn pixels_id(&self) -> String {
        format!("{}{}", self.name, PIXELS_SUFFIX)
    }

    pub fn palette_id(&self) -> String {
        format!("{}{}", self.name, PALETTE_SUFFIX)
    }
}

/// A tileset: the pixel source background layers index into.
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    pub image: TiledImage,
}

impl Default for Tileset {
    fn default() -> Self {
        let mut image = TiledImage {
            name: "Tileset".to_string(),
            width: TILESET_WIDTH,
            height: TILESET_HEIGHT,
            ..TiledImage::default()
        };
        image.pixels = vec![0; image.width * image.height];
        Self { image }
    }
}

impl Tileset {
    /// Pixel origin of a tile within the image. Tiles run in 8-pixel
    /// strips left to right, top to bottom.
    pub fn tile_origin(&self, tile_index: u16) -> (usize, usize) {
        if self.image.width == 0 {
            return (0, 0);
        }
        let x = (tile_index as usize * TILE_SIZE) % self.image.width;
        let y = ((tile_index as usize * TILE_SIZE) / self.image.width) * TILE_SIZE;
        (x, y)
    }

    /// Number of tiles the image holds.
    pub fn tile_count(&self) -> usize {
        (self.image.width * self.image.height) / (TILE_SIZE * TILE_SIZE)
    }
}

/// A sprite sheet: a tiled image whose tile grid is one hardware sprite
/// per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSheet {
    pub image: TiledImage,
    sprite_size: SpriteSize,
}

impl Default for SpriteSheet {
    fn default() -> Self {
        let mut image = TiledImage {
            name: "SpriteSheet".to_string(),
            width: SPRITESHEET_WIDTH,
            height: SPRITESHEET_HEIGHT,
            ..TiledImage::default()
        };
        image.pixels = vec![0; image.width * image.height];
        Self {
            image,
            sprite_size: SpriteSize::S8x8,
        }
    }
}

impl SpriteSheet {
    pub fn sprite_size(&self) -> SpriteSize {
        self.sprite_size
    }

    /// Set the sprite size; the image's tile grid follows it.
    pub fn set_sprite_size(&mut self, size: SpriteSize) {
        self.sprite_size = size;
        let (w, h) = size.dims();
        self.image.tile_width = w;
        self.image.tile_height = h;
    }

    /// Pixel origin of a sprite frame within the sheet.
    pub fn frame_origin(&self, frame_index: usize) -> (usize, usize) {
        let (sprite_width, sprite_height) = self.sprite_size.dims();
        if self.image.width == 0 {
            return (0, 0);
        }
        let x = (frame_index * sprite_width) % self.image.width;
        let y = ((frame_index * sprite_width) / self.image.width) * sprite_height;
        (x, y)
    }
}

/// One background layer of a map.
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    pub size: BgSize,
    pub priority: u8,
    pub scroll_x: i16,
    pub scroll_y: i16,
    /// Tileset reference by name; `None` disables the layer.
    pub tileset: Option<String>,
    pub tiles: Vec<u16>,
    pub hflips: Vec<bool>,
    pub vflips: Vec<bool>,
}

impl Default for Background {
    fn default() -> Self {
        let size = BgSize::Reg32x32;
        let len = size.width() * size.height();
        Self {
            size,
            priority: 0,
            scroll_x: 0,
            scroll_y: 0,
            tileset: None,
            tiles: vec![0; len],
            hflips: vec![false; len],
            vflips: vec![false; len],
        }
    }
}

impl Background {
    pub fn width(&self) -> usize {
        self.size.width()
    }

    pub fn height(&self) -> usize {
        self.size.height()
    }

    /// A layer takes part in serialization and allocation only when it has
    /// a tileset and tile data.
    pub fn is_enabled(&self) -> bool {
        self.tileset.is_some() && !self.tiles.is_empty()
    }

    /// Change the size flag, preserving the overlapping top-left region of
    /// the old tile grid.
    pub fn resize(&mut self, new_size: BgSize) {
        let prev_width = self.width();
        let prev_height = self.height();
        let prev_tiles = std::mem::take(&mut self.tiles);
        let prev_hflips = std::mem::take(&mut self.hflips);
        let prev_vflips = std::mem::take(&mut self.vflips);

        self.size = new_size;
        let width = self.width();
        let height = self.height();
        self.tiles = vec![0; width * height];
        self.hflips = vec![false; width * height];
        self.vflips = vec![false; width * height];

        if !prev_tiles.is_empty() {
            for y in 0..height.min(prev_height) {
                for x in 0..width.min(prev_width) {
                    self.tiles[y * width + x] = prev_tiles[y * prev_width + x];
                    self.hflips[y * width + x] = prev_hflips[y * prev_width + x];
                    self.vflips[y * width + x] = prev_vflips[y * prev_width + x];
                }
            }
        }
    }

    /// Write a tile entry. Regular layers keep 10 bits of index plus the
    /// flips; affine layers keep 8 bits and no flips.
    pub fn set_tile(&mut self, index: usize, tile: u16, hflip: bool, vflip: bool) {
        if index >= self.tiles.len() {
            return;
        }
        if self.size.affine() {
            self.tiles[index] = tile & 0xff;
        } else {
            self.tiles[index] = tile & 0x3ff;
            self.hflips[index] = hflip;
            self.vflips[index] = vflip;
        }
    }
}

/// A map: four background layers under one display mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    pub name: String,
    pub mode: MapMode,
    pub backgrounds: [Background; BG_COUNT],
}

impl Default for Map {
    fn default() -> Self {
        Self {
            name: "Map".to_string(),
            mode: MapMode::Mode0,
            backgrounds: std::array::from_fn(|_| Background::default()),
        }
    }
}

/// The generated-identifier prefix for a background slot.
pub fn bg_prefix(slot: usize) -> &'static str {
    match slot {
        0 => "bg0",
        1 => "bg1",
        2 => "bg2",
        3 => "bg3",
        _ => "",
    }
}

impl Map {
    /// Identifier of a background's generated tile data array.
    pub fn tiles_id(&self, slot: usize) -> String {
        format!("{}_{}{}", self.name, bg_prefix(slot), TILES_SUFFIX)
    }

    /// Map width in pixels: the widest layer plus its scroll offset.
    pub fn pixel_width(&self) -> usize {
        self.backgrounds
            .iter()
            .map(|bg| bg.width() * TILE_SIZE + bg.scroll_x.max(0) as usize)
            .max()
            .unwrap_or(0)
    }

    /// Map height in pixels: the tallest layer plus its scroll offset.
    pub fn pixel_height(&self) -> usize {
        self.backgrounds
            .iter()
            .map(|bg| bg.height() * TILE_SIZE + bg.scroll_y.max(0) as usize)
            .max()
            .unwrap_or(0)
    }
}

/// The closed set of asset kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Palette,
    Tileset,
    SpriteSheet,
    Map,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Palette,
        AssetKind::Tileset,
        AssetKind::SpriteSheet,
        AssetKind::Map,
    ];

    /// The generated C struct type name.
    pub fn type_name(self) -> &'static str {
        match self {
            AssetKind::Palette => "Palette",
            AssetKind::Tileset => "Tileset",
            AssetKind::SpriteSheet => "SpriteSheet",
            AssetKind::Map => "Map",
        }
    }

    /// Subdirectory the kind's generated sources live in.
    pub fn dir(self) -> &'static str {
        match self {
            AssetKind::Palette => "palettes",
            AssetKind::Tileset => "tilesets",
            AssetKind::SpriteSheet => "spritesheets",
            AssetKind::Map => "maps",
        }
    }
}

/// An asset record of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    Palette(Palette),
    Tileset(Tileset),
    SpriteSheet(SpriteSheet),
    Map(Map),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Palette(_) => AssetKind::Palette,
            Asset::Tileset(_) => AssetKind::Tileset,
            Asset::SpriteSheet(_) => AssetKind::SpriteSheet,
            Asset::Map(_) => AssetKind::Map,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Asset::Palette(p) => &p.name,
            Asset::Tileset(t) => &t.image.name,
            Asset::SpriteSheet(s) => &s.image.name,
            Asset::Map(m) => &m.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            Asset::Palette(p) => p.name = name,
            Asset::Tileset(t) => t.image.name = name,
            Asset::SpriteSheet(s) => s.image.name = name,
            Asset::Map(m) => m.name = name,
        }
    }
}
