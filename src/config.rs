use crate::error::{ServerError, ServerResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub addr: String,
    pub static_dir: Option<PathBuf>,
    pub server_header: String,
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            static_dir: None,
            server_header: "stagehand (testonly)".to_string(),
            max_connections: 256,
        }
    }
}

impl ServerConfig {
    /// Reads a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
            .map_err(|err| ServerError::ConfigError(format!("{}: {}", path.display(), err)))
    }

    pub fn from_json(raw: &str) -> ServerResult<Self> {
        serde_json::from_str(raw).map_err(|err| ServerError::ConfigError(err.to_string()))
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.max_connections == 0 {
            return Err(ServerError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if let Some(dir) = &self.static_dir {
            if !dir.is_dir() {
                return Err(ServerError::ConfigError(format!(
                    "static_dir {} is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ServerConfig::from_json(r#"{ "addr": "127.0.0.1:9000" }"#).unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.max_connections, 256);
        assert_eq!(config.static_dir, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ServerConfig::from_json(r#"{ "port": 80 }"#).unwrap_err();
        assert!(matches!(err, ServerError::ConfigError(_)));
    }

    #[test]
    fn load_reports_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ServerConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("server.json"));
    }

    #[test]
    fn validate_checks_static_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig {
            static_dir: Some(dir.path().to_path_buf()),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_ok());

        config.static_dir = Some(dir.path().join("missing"));
        assert!(config.validate().is_err());

        config.static_dir = None;
        config.max_connections = 0;
        assert!(config.validate().is_err());
    }
}
