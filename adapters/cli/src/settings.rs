use std::{fs, path::Path};

use anyhow::{Context, Result};
use island_defence_core::{TileCatalog, WorldConfig};
use serde::Deserialize;

const DEFAULT_SPAWNER_COUNT: usize = 4;

/// Everything needed to generate and populate a world from the command line.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    /// Number of spawners requested after generation.
    pub(crate) spawners: usize,
    /// Terrain and classification parameters.
    pub(crate) world: WorldConfig,
    /// Tile kinds handed to the classifier.
    pub(crate) catalog: TileCatalog,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            spawners: DEFAULT_SPAWNER_COUNT,
            world: WorldConfig::default(),
            catalog: TileCatalog::default(),
        }
    }
}

impl Settings {
    /// Reads settings from a TOML file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse settings in {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse settings toml contents")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = Settings::parse("").expect("empty toml parses");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn nested_tables_override_selected_fields() {
        let settings = Settings::parse(
            r#"
            spawners = 2

            [world]
            seed = "abc"
            fill_ratio = 0.6

            [catalog]
            spawner = 40
            "#,
        )
        .expect("valid toml");

        assert_eq!(settings.spawners, 2);
        assert_eq!(settings.world.seed, "abc");
        assert_eq!(settings.world.fill_ratio, 0.6);
        assert_eq!(settings.world.base_width, 20);
        assert_eq!(settings.catalog.spawner.get(), 40);
        assert_eq!(settings.catalog.walkable, TileCatalog::default().walkable);
    }

    #[test]
    fn malformed_document_is_rejected() {
        assert!(Settings::parse("spawners = \"many\"").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let error = Settings::load(Path::new("does/not/exist.toml")).expect_err("missing file");
        assert!(format!("{error:#}").contains("does/not/exist.toml"));
    }
}
