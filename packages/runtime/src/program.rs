//! Program sources and the catalog they are loaded from.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;

/// File extension of program and library sources.
pub const SOURCE_EXTENSION: &str = "lua";

/// Subdirectory of a catalog holding shared library scripts.
pub const LIBRARY_DIR: &str = "lib";

/// Named script source.
///
/// Used both for programs (which define `ARInit` / `ARRenderScene`) and for
/// shared libraries that run ahead of every program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub name: String,
    pub source: String,
}

impl Program {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Programs and libraries discovered on disk.
///
/// ```text
/// programs/
///     tictactoe.lua   # program "tictactoe"
///     calculator.lua  # program "calculator"
///     lib/
///         vectors.lua # library, loaded into every instance
///         pprint.lua
/// ```
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    pub programs: Vec<Arc<Program>>,
    pub libraries: Vec<Arc<Program>>,
}

impl Catalog {
    /// Load every `*.lua` file in `dir` as a program and every `*.lua` file
    /// in `dir/lib` as a library. Both lists are sorted by name.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let programs = read_sources(dir)?;
        let lib_dir = dir.join(LIBRARY_DIR);
        let libraries = if lib_dir.is_dir() {
            read_sources(&lib_dir)?
        } else {
            Vec::new()
        };
        Ok(Self {
            programs,
            libraries,
        })
    }

    pub fn program(&self, name: &str) -> Option<&Arc<Program>> {
        self.programs.iter().find(|p| p.name == name)
    }
}

fn read_sources(dir: &Path) -> Result<Vec<Arc<Program>>> {
    let mut sources = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_source = path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION);
        if !path.is_file() || !is_source {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        debug!("Reading {}...", path.display());
        let source = std::fs::read_to_string(&path)?;
        sources.push(Arc::new(Program::new(name, source)));
    }
    sources.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(sources)
}
