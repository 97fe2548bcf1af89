use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default root of everything the static responder serves.
pub const DEFAULT_PUBLIC_ROOT: &str = "public";

/// Default directory for in-flight uploads.
pub const DEFAULT_STAGING_DIR: &str = "temp/uploads";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    pub public_root: PathBuf,
    pub staging_dir: PathBuf,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            public_root: env::var("ARCADE_PUBLIC_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_PUBLIC_ROOT)),
            staging_dir: env::var("ARCADE_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STAGING_DIR)),
        }
    }

    /// Both areas under one directory, used by tests and local tooling
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            public_root: root.join("public"),
            staging_dir: root.join("staging"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_root: PathBuf::from(DEFAULT_PUBLIC_ROOT),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_rooted_at() {
        let config = StorageConfig::rooted_at("/srv/arcade");
        assert_eq!(config.public_root, PathBuf::from("/srv/arcade/public"));
        assert_eq!(config.staging_dir, PathBuf::from("/srv/arcade/staging"));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("ARCADE_PUBLIC_ROOT", "/data/public");
        std::env::remove_var("ARCADE_STAGING_DIR");

        let config = StorageConfig::from_env();
        assert_eq!(config.public_root, PathBuf::from("/data/public"));
        assert_eq!(config.staging_dir, PathBuf::from(DEFAULT_STAGING_DIR));

        std::env::remove_var("ARCADE_PUBLIC_ROOT");
    }
}
