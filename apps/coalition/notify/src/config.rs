use core_config::{env_list, ConfigError, Environment, FromEnv};
use domain_notifications::NotifierConfig;

/// Everything the CLI reads from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub notifier: NotifierConfig,
    /// Only needed when no fixture is given.
    pub database_url: Option<String>,
    /// Addresses the dry-run provider rejects.
    pub dry_run_failing: Vec<String>,
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            environment: Environment::from_env(),
            notifier: NotifierConfig::from_env()?,
            database_url: std::env::var("DATABASE_URL").ok(),
            dry_run_failing: env_list("NOTIFY_DRY_RUN_FAILING"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("NOTIFY_FROM_EMAIL", Some("noreply@portal.org")),
                ("DATABASE_URL", None),
                ("NOTIFY_DRY_RUN_FAILING", Some("a@x.org, ,b@x.org")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.notifier.from_email, "noreply@portal.org");
                assert!(config.database_url.is_none());
                assert_eq!(config.dry_run_failing, vec!["a@x.org", "b@x.org"]);
            },
        );
    }
}
