use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EdgeError, Result};

/// Binary names for each collaborator. Override these to point at a
/// wrapper or a non-PATH install.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub nslookup: String,
    pub nmap: String,
    pub sublist3r: String,
    pub msfconsole: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            nslookup: "nslookup".to_string(),
            nmap: "nmap".to_string(),
            sublist3r: "sublist3r".to_string(),
            msfconsole: "msfconsole".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolPaths,
    pub nmap_flags: Vec<String>,
    /// Per-invocation timeout in seconds. `None` waits indefinitely.
    pub tool_timeout_secs: Option<u64>,
    pub preflight_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools: ToolPaths::default(),
            nmap_flags: vec!["-sS".to_string(), "-A".to_string()],
            tool_timeout_secs: None,
            preflight_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Loads `explicit` if given (it must exist), otherwise the per-user
    /// config file if one is present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("edgefinder").join("config.json"))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| EdgeError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| EdgeError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }

    pub fn preflight_timeout(&self) -> Duration {
        Duration::from_secs(self.preflight_timeout_secs)
    }
}
