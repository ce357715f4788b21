//! Project persistence
//!
//! A project is a directory with a `gbatile.toml` manifest and a
//! `generated/` tree of C sources, one file per asset plus the `assets.h`
//! API header. Loading tolerates damage: a file that fails to parse is
//! logged and dropped from the set, and the rest of the project loads
//! normally.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::AssetKind;
use crate::parser::parse_source_file;
use crate::registry::AssetSet;
use crate::writer::{write_assets_header, write_source_file, ASSETS_HEADER};

/// Manifest file name at the project root.
pub const MANIFEST_NAME: &str = "gbatile.toml";
/// Directory the generated sources live in.
pub const GENERATED_DIR: &str = "generated";

/// Project loading/saving error.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse {MANIFEST_NAME}: {0}")]
    Manifest(#[from] toml::de::Error),
    #[error("failed to write {MANIFEST_NAME}: {0}")]
    ManifestWrite(#[from] toml::ser::Error),
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Contents of `gbatile.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
}

/// A project directory and the asset set loaded from it.
#[derive(Debug)]
pub struct Project {
    pub dir: PathBuf,
    pub manifest: Manifest,
    pub assets: AssetSet,
}

impl Project {
    /// Create a fresh project rooted at `dir`. Nothing is written until
    /// [`Project::save`].
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            manifest: Manifest { name: name.into() },
            assets: AssetSet::default(),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_NAME)
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.dir.join(GENERATED_DIR)
    }

    /// Write the manifest and regenerate the whole `generated/` tree.
    pub fn save(&self) -> Result<(), ProjectError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.manifest_path(), toml::to_string(&self.manifest)?)?;

        let generated = self.generated_dir();
        if generated.exists() {
            fs::remove_dir_all(&generated)?;
        }

        for kind in AssetKind::ALL {
            let kind_dir = generated.join(kind.dir());
            fs::create_dir_all(&kind_dir)?;
            for asset in self.assets.assets_of_kind(kind) {
                let path = kind_dir.join(format!("{}.c", asset.name()));
                info!("Saving {}", path.display());
                fs::write(&path, write_source_file(&asset))?;
            }
        }

        let header_path = generated.join(ASSETS_HEADER);
        info!("Saving {}", header_path.display());
        fs::write(&header_path, write_assets_header(&self.assets))?;
        Ok(())
    }

    /// Load a project directory. Asset files that fail to parse are
    /// dropped from the set with a warning; only manifest and io problems
    /// fail the load.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self, ProjectError> {
        let dir = dir.into();
        let manifest_text = fs::read_to_string(dir.join(MANIFEST_NAME))?;
        let manifest: Manifest = toml::from_str(&manifest_text)?;

        let mut assets = AssetSet::default();
        for kind in AssetKind::ALL {
            let pattern = dir
                .join(GENERATED_DIR)
                .join(kind.dir())
                .join("*.c")
                .display()
                .to_string();
            let mut paths: Vec<PathBuf> = glob::glob(&pattern)?.filter_map(Result::ok).collect();
            paths.sort();
            for path in paths {
                load_asset_file(&path, kind, &mut assets);
            }
        }

        assets.relink();
        Ok(Self { dir, manifest, assets })
    }
}

fn load_asset_file(path: &Path, kind: AssetKind, assets: &mut AssetSet) {
    info!("Loading {}", path.display());
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            return;
        }
    };
    match parse_source_file(&text, kind) {
        Ok(asset) => assets.add(asset),
        Err(e) => warn!("Dropping {}: {}", path.display(), e),
    }
}
