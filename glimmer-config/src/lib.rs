use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

// --- Error Type ---
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

// --- Enums for Choices ---

/// How an attractor's pull weakens toward the edge of its radius
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Falloff {
    #[default]
    Linear,
    Smooth,
    Sphere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(ConfigFormat::Json),
            Some("toml") => Ok(ConfigFormat::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

// --- Configuration Sections ---

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CanvasSettings {
    #[serde(default = "default_scale")]
    pub scale_factor: f32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            scale_factor: default_scale(),
            enabled: true,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ParticleConfig {
    pub name: String,
    /// Omitted for particles that belong to no group
    #[serde(default)]
    pub group: Option<i32>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub mesh_sharing: bool,
    #[serde(default = "default_renderers")]
    pub renderers: usize,
    #[serde(default = "default_emission_rate")]
    pub emission_rate: f32,
    #[serde(default = "default_lifetime")]
    pub lifetime: f32,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_max_particles")]
    pub max_particles: usize,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_size")]
    pub size: f32,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AttractorConfig {
    pub name: String,
    #[serde(default)]
    pub position: [f32; 2],
    #[serde(default = "default_strength")]
    pub strength: f32,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default)]
    pub falloff: Falloff,
    /// Names of the particles this attractor pulls
    #[serde(default)]
    pub targets: Vec<String>,
}

// Default values
fn default_true() -> bool { true }
fn default_scale() -> f32 { 1.0 }
fn default_renderers() -> usize { 1 }
fn default_emission_rate() -> f32 { 20.0 }
fn default_lifetime() -> f32 { 2.0 }
fn default_speed() -> f32 { 40.0 }
fn default_max_particles() -> usize { 256 }
fn default_size() -> f32 { 4.0 }
fn default_strength() -> f32 { 60.0 }
fn default_radius() -> f32 { 100.0 }
fn default_triggers() -> u32 { 2 }

// --- Top-Level Config Struct ---

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub framerate: u32,
    /// Frames to run; runs until interrupted when absent
    #[serde(default)]
    pub frames: Option<u64>,
    /// How many times the host fires the frame trigger per frame
    #[serde(default = "default_triggers")]
    pub triggers_per_frame: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub canvas: CanvasSettings,
    #[serde(default)]
    pub particles: Vec<ParticleConfig>,
    #[serde(default)]
    pub attractors: Vec<AttractorConfig>,
}

impl Config {
    pub fn particle(&self, name: &str) -> Option<&ParticleConfig> {
        self.particles.iter().find(|particle| particle.name == name)
    }
}

// --- Loading Functions ---

/// Load a config file, picking JSON or TOML from the extension
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    parse_config(&content, format)
}

pub fn parse_config(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let config: Config = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.framerate == 0 {
        return Err(ConfigError::Validation("Framerate cannot be zero.".to_string()));
    }
    if config.triggers_per_frame == 0 {
        return Err(ConfigError::Validation(
            "triggers_per_frame must be at least 1.".to_string(),
        ));
    }
    if !(config.canvas.scale_factor > 0.0) || !config.canvas.scale_factor.is_finite() {
        return Err(ConfigError::Validation(
            "Canvas scale_factor must be positive and finite.".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for particle in &config.particles {
        if !names.insert(particle.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate particle name '{}'.",
                particle.name
            )));
        }
        if particle.renderers == 0 {
            return Err(ConfigError::Validation(format!(
                "Particle '{}' needs at least one renderer.",
                particle.name
            )));
        }
        if !(particle.lifetime > 0.0) {
            return Err(ConfigError::Validation(format!(
                "Particle '{}' lifetime must be positive.",
                particle.name
            )));
        }
        if particle.emission_rate < 0.0 {
            return Err(ConfigError::Validation(format!(
                "Particle '{}' emission_rate cannot be negative.",
                particle.name
            )));
        }
        let fields = [
            ("emission_rate", particle.emission_rate),
            ("lifetime", particle.lifetime),
            ("speed", particle.speed),
            ("scale", particle.scale),
            ("size", particle.size),
        ];
        require_finite("Particle", &particle.name, &fields)?;
    }

    for attractor in &config.attractors {
        if !(attractor.radius > 0.0) {
            return Err(ConfigError::Validation(format!(
                "Attractor '{}' radius must be positive.",
                attractor.name
            )));
        }
        let fields = [
            ("position.x", attractor.position[0]),
            ("position.y", attractor.position[1]),
            ("strength", attractor.strength),
            ("radius", attractor.radius),
        ];
        require_finite("Attractor", &attractor.name, &fields)?;
        if let Some(unknown) = attractor.targets.iter().find(|t| !names.contains(t.as_str())) {
            return Err(ConfigError::Validation(format!(
                "Attractor '{}' targets unknown particle '{}'.",
                attractor.name, unknown
            )));
        }
    }

    Ok(())
}

fn require_finite(kind: &str, name: &str, fields: &[(&str, f32)]) -> Result<(), ConfigError> {
    match fields.iter().find(|(_, value)| !value.is_finite()) {
        Some((field, _)) => Err(ConfigError::Validation(format!(
            "{} '{}' {} must be finite.",
            kind, name, field
        ))),
        None => Ok(()),
    }
}
