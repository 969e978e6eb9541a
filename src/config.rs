//! # World Configuration
//!
//! Streaming radii, seed and terrain shape for a [`WorldStreamer`](crate::WorldStreamer).
//!
//! The configuration is plain data. Reading it from disk is a convenience for
//! hosts that keep their settings in a JSON document of the shape:
//!
//! ```json
//! { "world": { "render_distance": 4, "view_distance": 8, "unload_distance": 10 } }
//! ```
//!
//! Missing keys fall back to their defaults.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    engine_state::{meshing::CullingMode, voxels::terrain::TerrainShape},
    error::ConfigError,
};

/// Seed used when the configuration does not name one.
pub const DEFAULT_SEED: u32 = 2_510_586_073;

/// Distances are measured in chunks with the Chebyshev (max-axis) metric.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Radius of the cube of chunks generated around the observer.
    pub render_distance: i32,
    /// Chunks further away than this are kept but not drawn.
    pub view_distance: i32,
    /// Chunks further away than this are destroyed.
    pub unload_distance: i32,
    pub seed: u32,
    pub terrain: TerrainShape,
    pub culling: CullingMode,
    /// Number of mesh worker threads. `0` builds meshes on the streaming thread.
    pub mesh_workers: usize,
    /// Pause between two background sweeps.
    pub sweep_interval_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            render_distance: 4,
            view_distance: 8,
            unload_distance: 10,
            seed: DEFAULT_SEED,
            terrain: TerrainShape::Perlin,
            culling: CullingMode::Exact,
            mesh_workers: 2,
            sweep_interval_ms: 5,
        }
    }
}

#[derive(Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    world: WorldConfig,
}

impl WorldConfig {
    /// Parses the `world` section of a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let document: ConfigDocument = serde_json::from_str(json)?;
        document.world.validate()?;
        Ok(document.world)
    }

    /// Reads and parses a JSON config file, see [`WorldConfig::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Checks the invariants the streaming manager relies on.
    ///
    /// A chunk must leave visibility before it leaves existence, so
    /// `unload_distance` may never be smaller than `view_distance`.
    /// `render_distance` is independent of both.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("render_distance", self.render_distance),
            ("view_distance", self.view_distance),
            ("unload_distance", self.unload_distance),
        ] {
            if value < 0 {
                return Err(ConfigError::NegativeDistance { name, value });
            }
        }

        if self.unload_distance < self.view_distance {
            return Err(ConfigError::UnloadBelowView {
                view: self.view_distance,
                unload: self.unload_distance,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(WorldConfig::default().validate().is_ok());
    }

    #[test]
    fn unload_below_view_is_rejected() {
        let config = WorldConfig {
            view_distance: 5,
            unload_distance: 4,
            ..WorldConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnloadBelowView { view: 5, unload: 4 })
        ));
    }

    #[test]
    fn render_distance_is_independent_of_unload() {
        let config = WorldConfig {
            render_distance: 3,
            view_distance: 1,
            unload_distance: 2,
            ..WorldConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_distance_is_rejected() {
        let config = WorldConfig {
            render_distance: -1,
            ..WorldConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeDistance {
                name: "render_distance",
                value: -1
            })
        ));
    }

    #[test]
    fn json_world_section_overrides_defaults() {
        let config = WorldConfig::from_json_str(
            r#"{ "world": { "render_distance": 2, "view_distance": 3, "unload_distance": 3, "terrain": "solid", "culling": "enclosed_skip" } }"#,
        )
        .unwrap();

        assert_eq!(config.render_distance, 2);
        assert_eq!(config.view_distance, 3);
        assert_eq!(config.unload_distance, 3);
        assert_eq!(config.terrain, TerrainShape::Solid);
        assert_eq!(config.culling, CullingMode::EnclosedSkip);
        assert_eq!(config.seed, DEFAULT_SEED);
    }

    #[test]
    fn missing_world_section_uses_defaults() {
        let config = WorldConfig::from_json_str("{}").unwrap();
        assert_eq!(config, WorldConfig::default());
    }

    #[test]
    fn invalid_json_document_is_rejected() {
        let result = WorldConfig::from_json_str(
            r#"{ "world": { "view_distance": 6, "unload_distance": 2 } }"#,
        );
        assert!(matches!(result, Err(ConfigError::UnloadBelowView { .. })));
    }
}
