//! Configuration system
//!
//! Any serde type can opt into file persistence by implementing [`Config`];
//! the format is chosen from the file extension. [`SceneConfig`] holds the
//! per-manager settings read by [`crate::scene::SceneManager::with_config`].

pub use serde::{Deserialize, Serialize};

use crate::video::{Color, Colorf};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        let config = if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }?;

        log::info!("Loaded configuration from {path}");
        Ok(config)
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Scene manager settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Global ambient light bound during the light pass
    pub ambient_light: Colorf,

    /// Colour used to fill stencil shadows
    pub shadow_color: Color,

    /// Colour the back buffer is cleared to by `begin_frame`
    pub clear_color: Color,

    /// Whether nodes' automatic culling settings are honoured
    pub culling_enabled: bool,

    /// Whether animators run on nodes inside hidden subtrees
    pub animate_hidden_nodes: bool,

    /// Entries reserved per render pass when the queue is created
    pub queue_capacity: usize,

    /// Upper bound on hardware lights, below the driver's own limit
    pub max_lights: Option<usize>,

    /// Debug name of the root node
    pub root_name: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            ambient_light: Colorf::new(0.0, 0.0, 0.0, 0.0),
            shadow_color: Color::new(150, 0, 0, 0),
            clear_color: Color::new(255, 0, 0, 0),
            culling_enabled: true,
            animate_hidden_nodes: false,
            queue_capacity: 64,
            max_lights: None,
            root_name: "root".to_string(),
        }
    }
}

impl Config for SceneConfig {}
