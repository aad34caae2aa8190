//! Registry configuration

use tessera_core::{IsolationMode, TesseraResult};

/// Environment variable naming the initial isolation mode
pub const ISOLATION_ENV: &str = "TESSERA_ISOLATION";

/// Isolation registry configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Mode the registry starts in
    pub initial_mode: IsolationMode,
}

impl RegistryConfig {
    pub fn with_initial_mode(mut self, mode: IsolationMode) -> Self {
        self.initial_mode = mode;
        self
    }

    /// Configuration from the environment.
    ///
    /// `TESSERA_ISOLATION` may be `thread`, `task` or `fiber`. When it is
    /// unset the defaults apply; any other value is an `InvalidArgument`.
    pub fn from_env() -> TesseraResult<Self> {
        match std::env::var(ISOLATION_ENV) {
            Ok(name) => Ok(RegistryConfig {
                initial_mode: name.parse()?,
            }),
            Err(_) => Ok(RegistryConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tessera_core::TesseraError;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.initial_mode, IsolationMode::ThreadScoped);
        assert_eq!(
            config.with_initial_mode(IsolationMode::TaskScoped).initial_mode,
            IsolationMode::TaskScoped
        );
    }

    #[test]
    #[serial]
    fn test_from_env_unset() {
        std::env::remove_var(ISOLATION_ENV);
        assert_eq!(RegistryConfig::from_env(), Ok(RegistryConfig::default()));
    }

    #[test]
    #[serial]
    fn test_from_env_task() {
        std::env::set_var(ISOLATION_ENV, "task");
        let config = RegistryConfig::from_env();
        std::env::remove_var(ISOLATION_ENV);

        assert_eq!(config.unwrap().initial_mode, IsolationMode::TaskScoped);
    }

    #[test]
    #[serial]
    fn test_from_env_invalid() {
        std::env::set_var(ISOLATION_ENV, "process");
        let config = RegistryConfig::from_env();
        std::env::remove_var(ISOLATION_ENV);

        assert!(matches!(config, Err(TesseraError::InvalidArgument(_))));
    }
}
