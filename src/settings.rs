//! Grass renderer configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{DEFAULT_BLADES_PER_DENSITY, DEFAULT_MAX_BLADES};
use crate::error::{GrassError, GrassResult};

/// Where in the host renderer's frame a grass pass is scheduled.
///
/// The pipeline itself only requires that culling runs before the draws; the
/// keys let the host order the passes against its own work.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrassPassEvent {
    BeforePrePasses,
    AfterPrePasses,
    AfterOpaques,
    AfterTransparents,
}

/// Tunables for the grass pipeline.
///
/// Device objects (blade mesh, compute programs) are deliberately not part of
/// this struct so it stays plain data and serializes cleanly.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GrassSettings {
    /// Capacity of the blade-source and instance buffers. Appends beyond this
    /// are silently dropped on-device.
    pub max_blades: u32,

    /// Blades a triangle at full density (1.0) produces
    pub blades_per_density: u32,

    /// Offset applied along the vertex normal before the frustum test, so
    /// blades growing out of a barely-offscreen vertex still get culled in
    pub vertex_simulated_height: i32,

    /// Object-to-world scale applied to every blade
    pub scale: [f32; 3],

    /// Wind sway parameters (amplitude x/z, frequency, phase spread)
    pub sway: [f32; 4],

    pub enable_culling: bool,
    pub enable_shadows: bool,
    pub enable_depth_prepass: bool,

    pub culling_pass_event: GrassPassEvent,
    pub depth_prepass_event: GrassPassEvent,
    pub render_pass_event: GrassPassEvent,
}

impl Default for GrassSettings {
    fn default() -> Self {
        Self {
            max_blades: DEFAULT_MAX_BLADES,
            blades_per_density: DEFAULT_BLADES_PER_DENSITY,
            vertex_simulated_height: 1,
            scale: [1.0, 1.0, 1.0],
            sway: [1.0, 1.0, 1.0, 1.0],
            enable_culling: true,
            enable_shadows: true,
            enable_depth_prepass: false,
            culling_pass_event: GrassPassEvent::BeforePrePasses,
            depth_prepass_event: GrassPassEvent::AfterPrePasses,
            render_pass_event: GrassPassEvent::AfterOpaques,
        }
    }
}

impl GrassSettings {
    /// Clamp nonsensical values instead of failing validation
    pub fn sanitize(&mut self) {
        if self.max_blades == 0 {
            log::warn!("[GrassSettings] max_blades must be > 0, clamping to 1");
            self.max_blades = 1;
        }
        if self.blades_per_density == 0 {
            log::warn!("[GrassSettings] blades_per_density must be > 0, clamping to 1");
            self.blades_per_density = 1;
        }
    }

    pub fn load_toml(path: &Path) -> GrassResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GrassError::Config(format!("reading {}: {}", path.display(), e)))?;
        let mut settings: GrassSettings = toml::from_str(&text)
            .map_err(|e| GrassError::Config(format!("parsing {}: {}", path.display(), e)))?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn save_toml(&self, path: &Path) -> GrassResult<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| GrassError::Config(format!("serializing settings: {}", e)))?;
        std::fs::write(path, text)
            .map_err(|e| GrassError::Config(format!("writing {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clamps_zero_values() {
        let mut settings = GrassSettings {
            max_blades: 0,
            blades_per_density: 0,
            ..Default::default()
        };
        settings.sanitize();
        assert_eq!(settings.max_blades, 1);
        assert_eq!(settings.blades_per_density, 1);
    }

    #[test]
    fn test_defaults() {
        let settings = GrassSettings::default();
        assert_eq!(settings.max_blades, 1_000_000);
        assert_eq!(settings.blades_per_density, 15);
        assert!(settings.enable_culling);
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("grass.toml");

        let mut settings = GrassSettings::default();
        settings.max_blades = 4096;
        settings.enable_shadows = false;
        settings.save_toml(&path).expect("save failed");

        let loaded = GrassSettings::load_toml(&path).expect("load failed");
        assert_eq!(loaded.max_blades, 4096);
        assert!(!loaded.enable_shadows);
        assert_eq!(loaded.blades_per_density, settings.blades_per_density);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "max_blades = 77\n").expect("write");

        let loaded = GrassSettings::load_toml(&path).expect("load failed");
        assert_eq!(loaded.max_blades, 77);
        assert_eq!(loaded.blades_per_density, 15);
    }
}
