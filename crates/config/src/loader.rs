use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::SwitchboardConfig};

/// Standard config file name, checked in the working directory.
const CONFIG_FILENAME: &str = "switchboard.toml";

/// Load config from the given path, with `${VAR}` substitution.
pub fn load_config(path: &Path) -> anyhow::Result<SwitchboardConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))
}

/// Discover and load config.
///
/// Search order: explicit path (when given), then `./switchboard.toml`.
/// Returns defaults when no file is found; a file that fails to parse is
/// reported and also falls back to defaults.
pub fn discover_and_load(explicit: Option<&Path>) -> SwitchboardConfig {
    let candidate = explicit
        .map(Path::to_path_buf)
        .or_else(|| {
            let local = PathBuf::from(CONFIG_FILENAME);
            local.exists().then_some(local)
        });

    if let Some(path) = candidate {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(config) => return config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    SwitchboardConfig::default()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_partial_config_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchboard.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9090

[meta]
app_id = "meta_app_1"
verify_token = "static-verify"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.meta.app_id, "meta_app_1");
        assert_eq!(config.meta.graph_base_url, "https://graph.facebook.com/v18.0");
        assert!(!config.evolution.is_configured());
    }

    #[test]
    fn malformed_file_reports_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchboard.toml");
        std::fs::write(&path, "server = not valid toml [").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = discover_and_load(Some(Path::new("/nonexistent/switchboard.toml")));
        assert_eq!(config.server.port, 8080);
    }
}
