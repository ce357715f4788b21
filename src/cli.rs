//! Command-line interface implementation

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use crate::import::{import_spritesheet, import_tileset};
use crate::project::Project;
use crate::render::{render_image, render_map, save_png, scale_image};

const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// gbatile - edit and package GBA tile assets as compilable C source
#[derive(Parser)]
#[command(name = "gbt")]
#[command(about = "gbatile - package GBA tile assets as compilable C source")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ImportKind {
    Tileset,
    Spritesheet,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty project directory
    New {
        /// Project directory to create
        dir: PathBuf,

        /// Project name (defaults to the directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Rebuild shared palettes and regenerate all C sources
    Build {
        /// Project directory
        dir: PathBuf,
    },

    /// Render an asset to PNG
    Render {
        /// Project directory
        dir: PathBuf,

        /// Asset name (tileset, sprite sheet or map)
        #[arg(short, long)]
        asset: String,

        /// Output file. Defaults to {asset}.png
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Scale output by integer factor (1-16, default: 1)
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=16))]
        scale: u8,
    },

    /// Import a PNG into the project as a new asset
    Import {
        /// Project directory
        dir: PathBuf,

        /// PNG image to import
        image: PathBuf,

        /// Asset kind to create
        #[arg(long = "as", value_enum, default_value = "tileset")]
        kind: ImportKind,

        /// Asset name (defaults to the image file stem)
        #[arg(short, long)]
        name: Option<String>,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::New { dir, name } => run_new(&dir, name.as_deref()),
        Commands::Build { dir } => run_build(&dir),
        Commands::Render {
            dir,
            asset,
            output,
            scale,
        } => run_render(&dir, &asset, output.as_deref(), scale),
        Commands::Import {
            dir,
            image,
            kind,
            name,
        } => run_import(&dir, &image, kind, name.as_deref()),
    }
}

fn open_project(dir: &Path) -> Result<Project, ExitCode> {
    Project::load(dir).map_err(|e| {
        eprintln!("Error: Cannot open project '{}': {}", dir.display(), e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })
}

fn run_new(dir: &Path, name: Option<&str>) -> ExitCode {
    if dir.join(crate::project::MANIFEST_NAME).exists() {
        eprintln!("Error: '{}' already holds a project", dir.display());
        return ExitCode::from(EXIT_INVALID_ARGS);
    }
    let name = name
        .map(str::to_string)
        .or_else(|| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "Game".to_string());

    let project = Project::new(dir, name);
    if let Err(e) = project.save() {
        eprintln!("Error: {e}");
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Created project '{}' in {}", project.manifest.name, dir.display());
    ExitCode::from(EXIT_SUCCESS)
}

fn run_build(dir: &Path) -> ExitCode {
    let mut project = match open_project(dir) {
        Ok(project) => project,
        Err(code) => return code,
    };

    project.assets.rebuild_palettes();
    if let Err(e) = project.save() {
        eprintln!("Error: {e}");
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Built {} assets", project.assets.len());
    ExitCode::from(EXIT_SUCCESS)
}

fn render_named_asset(project: &Project, name: &str) -> Option<image::RgbaImage> {
    if let Some(map) = project.assets.find_map(name) {
        return Some(render_map(map, &project.assets));
    }
    if let Some(tileset) = project.assets.find_tileset(name) {
        return Some(render_image(&tileset.image));
    }
    if let Some(sheet) = project.assets.find_spritesheet(name) {
        return Some(render_image(&sheet.image));
    }
    None
}

fn run_render(dir: &Path, asset: &str, output: Option<&Path>, scale: u8) -> ExitCode {
    let project = match open_project(dir) {
        Ok(project) => project,
        Err(code) => return code,
    };

    let Some(image) = render_named_asset(&project, asset) else {
        eprintln!("Error: No asset named '{asset}' found in project");
        return ExitCode::from(EXIT_ERROR);
    };

    let image = scale_image(&image, scale);
    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{asset}.png")));
    if let Err(e) = save_png(&image, &output_path) {
        eprintln!("Error: Failed to save '{}': {}", output_path.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Rendered '{}' to {}", asset, output_path.display());
    ExitCode::from(EXIT_SUCCESS)
}

fn run_import(dir: &Path, image_path: &Path, kind: ImportKind, name: Option<&str>) -> ExitCode {
    let mut project = match open_project(dir) {
        Ok(project) => project,
        Err(code) => return code,
    };

    let rgba = match image::open(image_path) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            eprintln!("Error: Cannot open image '{}': {}", image_path.display(), e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let name = name
        .map(str::to_string)
        .or_else(|| {
            image_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "Image".to_string());

    let added = match kind {
        ImportKind::Tileset => {
            let tileset = import_tileset(&rgba, name);
            project.assets.add_tileset(tileset).image.name.clone()
        }
        ImportKind::Spritesheet => {
            let sheet = import_spritesheet(&rgba, name);
            project.assets.add_spritesheet(sheet).image.name.clone()
        }
    };

    project.assets.rebuild_palettes();
    if let Err(e) = project.save() {
        eprintln!("Error: {e}");
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Imported '{added}'");
    ExitCode::from(EXIT_SUCCESS)
}
