//! Surface parameter registry.
//!
//! Every static mesh part carries a surface id; the registry maps ids to
//! friction, restitution, and tire response values plus a contents mask
//! that gates which objects the part collides with at all.

use std::path::Path;

use camber_core::COLLISION_MASK_ALL;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SurfaceError;

fn default_friction() -> f32 {
    0.5
}

fn default_restitution() -> f32 {
    0.25
}

fn default_tire_friction() -> f32 {
    0.2
}

fn default_tire_traction() -> f32 {
    1.0
}

fn default_contents_mask() -> u32 {
    COLLISION_MASK_ALL
}

fn default_classification() -> char {
    'C'
}

/// Material response of one surface type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceParam {
    /// Surface name, for lookups from content tools.
    pub name: String,
    /// Sliding friction multiplier.
    #[serde(default = "default_friction")]
    pub friction: f32,
    /// Bounce multiplier.
    #[serde(default = "default_restitution")]
    pub restitution: f32,
    /// Lateral tire grip.
    #[serde(default = "default_tire_friction")]
    pub tire_friction: f32,
    /// Longitudinal tire grip.
    #[serde(default = "default_tire_traction")]
    pub tire_traction: f32,
    /// Contents this surface collides with. Parts whose mask does not cover
    /// an object's contents are skipped entirely during detection.
    #[serde(default = "default_contents_mask")]
    pub contents_mask: u32,
    /// Single-character material class, used by gameplay effects (impact
    /// sounds, tire marks) to bucket surfaces.
    #[serde(default = "default_classification")]
    pub classification: char,
}

impl Default for SurfaceParam {
    fn default() -> Self {
        Self {
            name: "default".into(),
            friction: default_friction(),
            restitution: default_restitution(),
            tire_friction: default_tire_friction(),
            tire_traction: default_tire_traction(),
            contents_mask: default_contents_mask(),
            classification: default_classification(),
        }
    }
}

/// Registry of surface parameters, addressed by id.
///
/// Id 0 is always the built-in default surface.
#[derive(Debug, Clone)]
pub struct SurfaceRegistry {
    params: Vec<SurfaceParam>,
}

impl Default for SurfaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceRegistry {
    /// Creates a registry holding only the default surface.
    pub fn new() -> Self {
        Self {
            params: vec![SurfaceParam::default()],
        }
    }

    /// Registers a surface and returns its id.
    ///
    /// A duplicate name keeps the first registration and returns its id.
    pub fn register(&mut self, param: SurfaceParam) -> i32 {
        if let Some(existing) = self.find_by_name(&param.name) {
            warn!(name = %param.name, "surface already registered, keeping first");
            return existing;
        }
        self.params.push(param);
        (self.params.len() - 1) as i32
    }

    /// Looks up a surface by id. Out-of-range and negative ids miss.
    pub fn get(&self, id: i32) -> Option<&SurfaceParam> {
        usize::try_from(id).ok().and_then(|i| self.params.get(i))
    }

    /// Looks up a surface id by name.
    pub fn find_by_name(&self, name: &str) -> Option<i32> {
        self.params
            .iter()
            .position(|p| p.name == name)
            .map(|i| i as i32)
    }

    /// Loads a registry from a JSON array of surface params.
    ///
    /// The built-in default surface keeps id 0; loaded entries follow it.
    pub fn load_json(text: &str) -> Result<Self, SurfaceError> {
        let loaded: Vec<SurfaceParam> = serde_json::from_str(text)?;
        let mut registry = Self::new();
        registry.params.extend(loaded);
        Ok(registry)
    }

    /// Loads a registry from a JSON file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, SurfaceError> {
        let text = std::fs::read_to_string(path)?;
        Self::load_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_surface_at_id_zero() {
        let reg = SurfaceRegistry::new();
        let def = reg.get(0).unwrap();
        assert_eq!(def.friction, 0.5);
        assert_eq!(def.restitution, 0.25);
        assert!(reg.get(-1).is_none());
        assert!(reg.get(1).is_none());
    }

    #[test]
    fn test_register_and_find() {
        let mut reg = SurfaceRegistry::new();
        let id = reg.register(SurfaceParam {
            name: "gravel".into(),
            friction: 0.9,
            ..SurfaceParam::default()
        });
        assert_eq!(id, 1);
        assert_eq!(reg.find_by_name("gravel"), Some(1));
        assert_eq!(reg.get(id).unwrap().friction, 0.9);
        // A second "gravel" keeps the first registration.
        let dup = reg.register(SurfaceParam {
            name: "gravel".into(),
            friction: 0.2,
            ..SurfaceParam::default()
        });
        assert_eq!(dup, 1);
        assert_eq!(reg.get(1).unwrap().friction, 0.9);
    }

    #[test]
    fn test_load_json_fills_missing_fields() {
        let reg = SurfaceRegistry::load_json(r#"[{"name": "ice", "friction": 0.05}]"#).unwrap();
        let ice = reg.get(1).unwrap();
        assert_eq!(ice.friction, 0.05);
        assert_eq!(ice.restitution, 0.25);
        assert_eq!(ice.tire_traction, 1.0);
        assert_eq!(ice.contents_mask, COLLISION_MASK_ALL);
        assert_eq!(ice.classification, 'C');
    }

    #[test]
    fn test_load_json_keeps_explicit_classification() {
        let reg = SurfaceRegistry::load_json(
            r#"[{"name": "grass", "classification": "G"}]"#,
        )
        .unwrap();
        assert_eq!(reg.get(1).unwrap().classification, 'G');
    }

    #[test]
    fn test_load_json_rejects_garbage() {
        assert!(SurfaceRegistry::load_json("not json").is_err());
    }
}
