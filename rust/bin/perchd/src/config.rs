//! Server-side configuration file.
//!
//! A config *name* resolves to `/etc/perch/<name>.toml`; anything
//! containing `/` or `.` is treated as a literal path.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address. Overridable with `--listen`.
    #[serde(default = "default_listen")]
    pub listen: String,

    pub storage: StorageConfig,

    pub jwt: JwtConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the SQLite database and blob files.
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Signing secret. The server refuses to start when empty.
    pub secret: String,

    /// Access token lifetime in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,
}

fn default_listen() -> String {
    "0.0.0.0:3065".to_string()
}

fn default_token_ttl() -> i64 {
    86400
}

impl ServerConfig {
    /// Resolve a context name or path to a config file path.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/perch/{}.toml", name_or_path))
        }
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;

        if config.jwt.secret.is_empty() {
            anyhow::bail!(
                "jwt.secret is empty in {} — refusing to start with unsigned tokens",
                path.display(),
            );
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn name_resolves_to_etc() {
        assert_eq!(
            ServerConfig::resolve_path("prod"),
            PathBuf::from("/etc/perch/prod.toml"),
        );
        assert_eq!(
            ServerConfig::resolve_path("./local.toml"),
            PathBuf::from("./local.toml"),
        );
    }

    #[test]
    fn loads_minimal_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            "[storage]\ndata_dir = \"/tmp/perch\"\n[jwt]\nsecret = \"s3cret\"\n",
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.listen, "0.0.0.0:3065");
        assert_eq!(config.storage.data_dir, "/tmp/perch");
        assert_eq!(config.jwt.token_ttl_secs, 86400);
    }

    #[test]
    fn empty_secret_is_refused() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            "[storage]\ndata_dir = \"/tmp/perch\"\n[jwt]\nsecret = \"\"\n",
        )
        .unwrap();

        assert!(ServerConfig::load(file.path()).is_err());
    }
}
