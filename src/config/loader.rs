//! Configuration Loader
//!
//! Layers built-in defaults, an optional TOML file, and environment variables
//! (`CONTENT__LOCK__WAIT_TIME_MS=500` sets `lock.wait_time_ms`), then validates.

use super::CoordinatorSettings;
use crate::error::ConfigResult;
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "CONTENT";

/// Separator between prefix and nested keys in environment overrides
const ENV_SEPARATOR: &str = "__";

impl CoordinatorSettings {
    /// Load and validate configuration from `path` (if given) and the process environment
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with_environment(path, None)
    }

    /// Load configuration with an explicit environment map instead of the process
    /// environment. Useful for tests that must not touch global state.
    pub fn load_with_environment(
        path: Option<&Path>,
        environment: Option<HashMap<String, String>>,
    ) -> ConfigResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(environment),
        );

        let settings: CoordinatorSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;

        debug!(
            config = %settings.sanitized(),
            "Configuration loaded successfully"
        );

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LockBackend, StoreBackend};
    use crate::error::ConfigurationError;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_no_sources_yields_defaults() {
        let settings = CoordinatorSettings::load_with_environment(None, Some(HashMap::new())).unwrap();
        assert_eq!(settings, CoordinatorSettings::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_toml(
            r#"
            [lock]
            namespace = "lock:test"
            wait_time_ms = 250
            lease_time_ms = 10000

            [poll]
            max_rounds = 3
            multiplier = 2.0

            [store]
            backend = "postgres"
            database_url = "postgresql://localhost/content"
            "#,
        );

        let settings =
            CoordinatorSettings::load_with_environment(Some(file.path()), Some(HashMap::new()))
                .unwrap();

        assert_eq!(settings.lock.namespace, "lock:test");
        assert_eq!(settings.lock.wait_time_ms, 250);
        assert_eq!(settings.lock.retry_interval_ms, 100);
        assert_eq!(settings.poll.max_rounds, 3);
        assert_eq!(settings.poll.multiplier, 2.0);
        assert_eq!(settings.store.backend, StoreBackend::Postgres);
        assert_eq!(settings.lock.backend, LockBackend::Memory);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_toml(
            r#"
            [lock]
            wait_time_ms = 250
            "#,
        );
        let env = HashMap::from([
            ("CONTENT__LOCK__WAIT_TIME_MS".to_string(), "750".to_string()),
            ("CONTENT__POLL__MAX_ROUNDS".to_string(), "8".to_string()),
        ]);

        let settings =
            CoordinatorSettings::load_with_environment(Some(file.path()), Some(env)).unwrap();

        assert_eq!(settings.lock.wait_time_ms, 750);
        assert_eq!(settings.poll.max_rounds, 8);
    }

    #[test]
    fn test_invalid_file_values_fail_validation() {
        let file = write_toml(
            r#"
            [lock]
            wait_time_ms = 5000
            lease_time_ms = 1000
            "#,
        );

        let err = CoordinatorSettings::load_with_environment(Some(file.path()), Some(HashMap::new()))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = CoordinatorSettings::load_with_environment(
            Some(Path::new("/nonexistent/content.toml")),
            Some(HashMap::new()),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::Load(_)));
    }
}
