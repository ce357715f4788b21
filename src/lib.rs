//! gbatile - GBA tile asset toolkit
//!
//! This library provides functionality to:
//! - Model palettes, tilesets, sprite sheets and tiled maps for the GBA
//! - Serialize assets to compilable C source that round-trips losslessly
//! - Translate buffers between row-major and hardware tile storage order
//! - Assign char/screen block video memory regions to map layers
//! - Merge image palettes into shared hardware palettes
//! - Render assets to RGBA images and import them back from PNG

pub mod cgen;
pub mod cli;
pub mod color;
pub mod import;
pub mod merge;
pub mod models;
pub mod parser;
pub mod project;
pub mod registry;
pub mod render;
pub mod scan;
pub mod vram;
pub mod writer;
