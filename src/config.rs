//! Configuration loading.
//!
//! Everything is optional; a missing config file means defaults.
//!
//! ```toml
//! [toolchains]
//! go = "1.23.6"
//! rust = "1.82.0"
//!
//! [manifest]
//! parse = "strict"
//! missing = "fail"
//!
//! [wasi]
//! base_image = "ubuntu:24.04"
//! docker_config_secret = "docker-config"
//!
//! [caddy]
//! image = "caddy:2.8.4"
//! mode = "port"
//! ```

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

use crate::caddy::{self, ProxyMode};
use crate::error::{Error, Result};
use crate::toolchain::{DefaultVersions, MissingManifest, ParsePolicy, Resolver, ToolchainKind};

/// Config file looked up when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "devstack.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub toolchains: DefaultVersions,
    pub manifest: ManifestConfig,
    pub crud: CrudConfig,
    pub wasi: WasiConfig,
    pub caddy: CaddyConfig,
}

/// How `.toolchains` manifests are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestConfig {
    pub parse: ParsePolicy,
    pub missing: MissingManifest,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrudConfig {
    /// Name of the backend binary and its database.
    pub app_name: String,
    pub node_version: String,
    pub old_node_version: String,
    pub pnpm_version: String,
    pub db_password: String,
}

impl Default for CrudConfig {
    fn default() -> Self {
        Self {
            app_name: "crud".to_string(),
            node_version: "20.17.0".to_string(),
            old_node_version: "16.13.1".to_string(),
            pnpm_version: "9.6.0".to_string(),
            db_password: "semi-secure-password".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WasiConfig {
    pub base_image: String,
    /// Port `spin up` listens on.
    pub port: u16,
    /// Secret holding a Docker `config.json` for registry pushes.
    pub docker_config_secret: Option<String>,
}

impl Default for WasiConfig {
    fn default() -> Self {
        Self {
            base_image: "ubuntu:24.04".to_string(),
            port: 3000,
            docker_config_secret: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaddyConfig {
    pub image: String,
    pub mode: ProxyMode,
}

impl Default for CaddyConfig {
    fn default() -> Self {
        Self {
            image: caddy::DEFAULT_IMAGE.to_string(),
            mode: ProxyMode::Port,
        }
    }
}

impl Config {
    /// Checks values serde cannot. Reports every problem, not just the first.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        for kind in ToolchainKind::ALL {
            if self.toolchains.get(kind).is_empty() {
                problems.push(format!("toolchains.{} must not be empty", kind));
            }
        }
        let required = [
            ("crud.app_name", &self.crud.app_name),
            ("crud.node_version", &self.crud.node_version),
            ("crud.old_node_version", &self.crud.old_node_version),
            ("crud.pnpm_version", &self.crud.pnpm_version),
            ("wasi.base_image", &self.wasi.base_image),
            ("caddy.image", &self.caddy.image),
        ];
        for (key, value) in required {
            if value.is_empty() {
                problems.push(format!("{} must not be empty", key));
            }
        }
        if self.wasi.port == 0 {
            problems.push("wasi.port must not be 0".to_string());
        }
        if matches!(&self.wasi.docker_config_secret, Some(s) if s.is_empty()) {
            problems.push("wasi.docker_config_secret must not be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Invalid(problems.join(", ")))
        }
    }

    /// A resolver using the configured defaults and manifest policies.
    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.toolchains.clone())
            .parse_policy(self.manifest.parse)
            .missing_manifest(self.manifest.missing)
    }
}

/// Parses and validates a config document.
pub fn parse_config(content: &str, path: &Path) -> Result<Config> {
    let config: Config = toml::from_str(content).map_err(|source| Error::Config {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads and validates configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content, path)?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    match load_config(path) {
        Err(Error::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(Config::default())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let config = parse_config(
            r#"
[toolchains]
go = "1.22.0"

[manifest]
parse = "strict"
missing = "fail"

[caddy]
mode = "domain"
"#,
            Path::new("devstack.toml"),
        )
        .unwrap();

        assert_eq!(config.toolchains.go, "1.22.0");
        assert_eq!(config.toolchains.rust, "1.82.0");
        assert_eq!(config.manifest.parse, ParsePolicy::Strict);
        assert_eq!(config.manifest.missing, MissingManifest::Fail);
        assert_eq!(config.caddy.mode, ProxyMode::Domain);
        assert_eq!(config.caddy.image, caddy::DEFAULT_IMAGE);
        assert_eq!(config.wasi, WasiConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse_config("[wasi]\nbase = \"debian\"\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let err = parse_config(
            "[toolchains]\nspin = \"\"\n\n[wasi]\nport = 0\n",
            Path::new("x.toml"),
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("toolchains.spin must not be empty"), "{message}");
        assert!(message.contains("wasi.port must not be 0"), "{message}");
    }

    #[test]
    fn test_resolver_uses_configured_defaults() {
        let config = parse_config("[toolchains]\nrust = \"1.79.0\"\n", Path::new("x.toml")).unwrap();
        let set = config.resolver().resolve_str("rust\n").unwrap();
        assert_eq!(set.get("rust"), Some("1.79.0"));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(&dir.path().join("devstack.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devstack.toml");
        std::fs::write(&path, "[wasi]\nbase_image = \"debian:bookworm\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.wasi.base_image, "debian:bookworm");
    }

    #[test]
    fn test_load_config_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
