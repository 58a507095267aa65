//! Config module.
//! JSON file with the three service endpoints, the capture crop bounds and
//! the auto-capture period. Defaults cover the stock deployment; CLI flags
//! override whatever the file says.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_RECOGNIZER_URL: &str =
    "https://europe-southwest1-rey-y-dama-mechanical-turk.cloudfunctions.net/predict_chessboard";
const DEFAULT_ENGINE_URL: &str = "https://stockfish-service-38939463765.europe-west1.run.app";
const DEFAULT_ROBOT_URL: &str = "http://localhost:5000/mover";

/// Board rectangle within the captured frame (x, y, width, height).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureBounds {
    fn default() -> Self {
        CaptureBounds { x: 200, y: 300, width: 480, height: 480 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recognizer_url: String,
    pub engine_url: String,
    pub robot_url: String,
    /// Auto-capture period in seconds. Fixed for the session once started.
    pub capture_interval_secs: u64,
    pub capture_bounds: CaptureBounds,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            recognizer_url: DEFAULT_RECOGNIZER_URL.to_string(),
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            robot_url: DEFAULT_ROBOT_URL.to_string(),
            capture_interval_secs: 10,
            capture_bounds: CaptureBounds::default(),
        }
    }
}

impl Config {
    /// Loads the config file when a path is given, defaults otherwise.
    /// An explicitly named file that is missing or malformed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.capture_interval_secs, 10);
        assert_eq!(cfg.robot_url, DEFAULT_ROBOT_URL);
        assert_eq!(cfg.capture_bounds.width, 480);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{ "robot_url": "http://localhost:9999/mover" }"#).unwrap();
        assert_eq!(cfg.robot_url, "http://localhost:9999/mover");
        assert_eq!(cfg.recognizer_url, DEFAULT_RECOGNIZER_URL);
        assert_eq!(cfg.capture_interval_secs, 10);
    }

    #[test]
    fn test_round_trip() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.engine_url, cfg.engine_url);
        assert_eq!(back.capture_bounds, cfg.capture_bounds);
    }

    #[test]
    fn test_missing_named_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/turkboard.json"))).is_err());
    }
}
