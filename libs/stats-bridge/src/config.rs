use serde::Deserialize;

use crate::error::BridgeError;

/// Bridge configuration, parsed from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BridgeConfig {
    /// Local frame opened around one whole delivery.
    #[serde(default = "default_frame_capacity")]
    pub delivery_frame_capacity: usize,

    /// Local frame opened around each record.
    #[serde(default = "default_frame_capacity")]
    pub record_frame_capacity: usize,

    /// Local frame opened around each defined member.
    #[serde(default = "default_frame_capacity")]
    pub member_frame_capacity: usize,

    /// In-memory heap settings.
    #[serde(default)]
    pub heap: HeapConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeapConfig {
    /// Upper bound on live local references across all frames.
    #[serde(default = "default_local_ref_capacity")]
    pub local_ref_capacity: usize,
}

fn default_frame_capacity() -> usize {
    16
}

fn default_local_ref_capacity() -> usize {
    512
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            local_ref_capacity: default_local_ref_capacity(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            delivery_frame_capacity: default_frame_capacity(),
            record_frame_capacity: default_frame_capacity(),
            member_frame_capacity: default_frame_capacity(),
            heap: HeapConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, BridgeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, BridgeError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        let frames = [
            ("delivery_frame_capacity", self.delivery_frame_capacity),
            ("record_frame_capacity", self.record_frame_capacity),
            ("member_frame_capacity", self.member_frame_capacity),
            ("heap.local_ref_capacity", self.heap.local_ref_capacity),
        ];
        for (name, value) in frames {
            if value == 0 {
                return Err(BridgeError::Config(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}
