//! # Nightwatch Common
//!
//! Common types, utilities, and shared abstractions for Nightwatch.
//!
//! This crate provides foundational types used across all Nightwatch subsystems:
//! - ID types (EntityId)
//! - Light colors for guard signalling
//! - Common error types
//! - Prelude for convenient imports
//!
//! World positions are `glam::Vec3` with Z as the up axis.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod color;
pub mod error;
pub mod ids;

pub use glam::Vec3;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::color::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use glam::Vec3;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
        assert!(id1.is_valid());
        assert!(!EntityId::NULL.is_valid());
    }

    #[test]
    fn test_entity_id_serializes_as_number() {
        let id = EntityId::new();
        let json = serde_json::to_string(&id).expect("id should serialize");
        assert_eq!(format!("#{json}"), id.to_string());

        let back: EntityId = serde_json::from_str(&json).expect("id should deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_light_color_packing() {
        assert_eq!(LightColor::RED.to_u32(), 0xFF00_00FF);
        assert_eq!(LightColor::WHITE.to_u32(), 0xFFFF_FFFF);
        assert_eq!(LightColor::YELLOW.to_u32(), 0xFFFF_00FF);
    }

    #[test]
    fn test_light_color_is_pod() {
        let colors = [LightColor::RED, LightColor::YELLOW];
        let bytes: &[u8] = bytemuck::cast_slice(&colors);
        assert_eq!(bytes, &[255, 0, 0, 255, 255, 255, 0, 255]);
    }

    #[test]
    fn test_error_display() {
        let err = NightwatchError::Config("bad radius".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad radius");
    }
}
