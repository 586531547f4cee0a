//! Player settings and preferences
//!
//! Persisted as JSON under one key, separately from highscores.

use serde::{Deserialize, Serialize};

use crate::persistence::KvBackend;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Particle cap for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium => 500,
            QualityPreset::High => 2000,
        }
    }
}

/// Particle cap when reduced motion is on
const REDUCED_MOTION_PARTICLES: usize = 100;

/// Settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub quality: QualityPreset,
    /// Particle effects (bursts, sparks)
    pub particles: bool,
    /// Show FPS counter
    pub show_fps: bool,
    /// Sound effects on
    pub sound: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Reduced motion (fewer particles)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            particles: true,
            show_fps: false,
            sound: true,
            master_volume: 0.8,
            reduced_motion: false,
        }
    }
}

impl Settings {
    pub const STORAGE_KEY: &'static str = "neon_arcade_settings";

    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective particle cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else if self.reduced_motion {
            self.quality.max_particles().min(REDUCED_MOTION_PARTICLES)
        } else {
            self.quality.max_particles()
        }
    }

    /// Load from `backend`, falling back to defaults on any problem
    pub fn load(backend: &dyn KvBackend) -> Self {
        match backend.get(Self::STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings");
                    settings
                }
                Err(e) => {
                    log::warn!("Ignoring malformed settings: {e}");
                    Self::default()
                }
            },
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Settings unavailable: {e}");
                Self::default()
            }
        }
    }

    /// Flip sound on or off and persist the choice. Returns the new state.
    pub fn toggle_sound(&mut self, backend: &dyn KvBackend) -> bool {
        self.sound = !self.sound;
        self.save(backend);
        self.sound
    }

    /// Best-effort save; failures are logged
    pub fn save(&self, backend: &dyn KvBackend) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Could not encode settings: {e}");
                return;
            }
        };
        match backend.set(Self::STORAGE_KEY, &json) {
            Ok(()) => log::info!("Settings saved"),
            Err(e) => log::warn!("Could not save settings: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryBackend, ReadOnlyBackend};

    #[test]
    fn test_particle_caps() {
        assert_eq!(Settings::from_preset(QualityPreset::Low).max_particles(), 100);
        assert_eq!(Settings::default().max_particles(), 500);
        assert_eq!(Settings::from_preset(QualityPreset::High).max_particles(), 2000);

        let mut s = Settings::from_preset(QualityPreset::High);
        s.reduced_motion = true;
        assert_eq!(s.max_particles(), 100);
        s.particles = false;
        assert_eq!(s.max_particles(), 0);
    }

    #[test]
    fn test_parse_preset() {
        assert_eq!(QualityPreset::parse("HIGH"), Some(QualityPreset::High));
        assert_eq!(QualityPreset::parse("med"), Some(QualityPreset::Medium));
        assert_eq!(QualityPreset::parse("ultra"), None);
    }

    #[test]
    fn test_save_and_load() {
        let kv = MemoryBackend::new();
        let mut s = Settings::from_preset(QualityPreset::Low);
        s.sound = false;
        s.show_fps = true;
        s.save(&kv);
        assert_eq!(Settings::load(&kv), s);
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let kv = MemoryBackend::new();
        assert_eq!(Settings::load(&kv), Settings::default());
        kv.set(Settings::STORAGE_KEY, "{not json").unwrap();
        assert_eq!(Settings::load(&kv), Settings::default());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let kv = MemoryBackend::new();
        kv.set(Settings::STORAGE_KEY, r#"{"quality":"High"}"#).unwrap();
        let s = Settings::load(&kv);
        assert_eq!(s.quality, QualityPreset::High);
        assert!(s.particles);
    }

    #[test]
    fn test_toggle_sound_persists() {
        let kv = MemoryBackend::new();
        let mut s = Settings::default();
        assert!(!s.toggle_sound(&kv));
        assert!(!Settings::load(&kv).sound);
        assert!(s.toggle_sound(&kv));
        assert_eq!(Settings::load(&kv), Settings::default());

        // Unsaved, but the in-memory choice still flips
        let ro = ReadOnlyBackend::new();
        assert!(!s.toggle_sound(&ro));
        assert!(Settings::load(&ro).sound);
    }

    #[test]
    fn test_save_failure_is_tolerated() {
        let kv = ReadOnlyBackend::new();
        Settings::default().save(&kv);
        assert_eq!(Settings::load(&kv), Settings::default());
    }
}
