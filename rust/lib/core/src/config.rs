use std::path::PathBuf;

/// Storage/listen configuration shared by service binaries.
///
/// The binary parses its config file and CLI flags, then passes one of
/// these to storage layer initialization.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding all persistent data.
    pub data_dir: Option<PathBuf>,

    /// Path to the SQLite database file.
    /// Defaults to `{data_dir}/data.sqlite` if not specified.
    pub sqlite_path: Option<PathBuf>,

    /// Directory for blob storage (uploaded images).
    /// Defaults to `{data_dir}/blobs/` if not specified.
    pub blob_dir: Option<PathBuf>,

    /// Listen address for the HTTP server.
    pub listen: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            sqlite_path: None,
            blob_dir: None,
            listen: "0.0.0.0:3065".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Resolve the SQLite path, falling back to `{data_dir}/data.sqlite`.
    pub fn resolve_sqlite_path(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| self.resolve_data_subpath("data.sqlite"))
    }

    /// Resolve the blob dir, falling back to `{data_dir}/blobs`.
    pub fn resolve_blob_dir(&self) -> PathBuf {
        self.blob_dir
            .clone()
            .unwrap_or_else(|| self.resolve_data_subpath("blobs"))
    }

    fn resolve_data_subpath(&self, name: &str) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_under_data_dir() {
        let config = ServiceConfig {
            data_dir: Some(PathBuf::from("/var/lib/perch")),
            ..Default::default()
        };
        assert_eq!(config.resolve_sqlite_path(), PathBuf::from("/var/lib/perch/data.sqlite"));
        assert_eq!(config.resolve_blob_dir(), PathBuf::from("/var/lib/perch/blobs"));
    }

    #[test]
    fn explicit_paths_win() {
        let config = ServiceConfig {
            data_dir: Some(PathBuf::from("/var/lib/perch")),
            sqlite_path: Some(PathBuf::from("/tmp/test.sqlite")),
            ..Default::default()
        };
        assert_eq!(config.resolve_sqlite_path(), PathBuf::from("/tmp/test.sqlite"));
    }

    #[test]
    fn relative_fallback_without_data_dir() {
        let config = ServiceConfig::default();
        assert_eq!(config.resolve_sqlite_path(), PathBuf::from("data.sqlite"));
    }
}
