use crate::config::RunConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Environment variable prefix; nested keys are separated by `__`,
    /// e.g. `OPTCYCLE_UNDERLYING__TICKER=SPY`.
    pub const ENV_PREFIX: &'static str = "OPTCYCLE_";

    /// Loads run configuration by merging a TOML file with environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// merged configuration fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<RunConfig> {
        Self::extract(Figment::new().merge(Toml::file(path.as_ref())))
    }

    /// Loads run configuration from an in-memory TOML document plus environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed or fails validation.
    pub fn load_str(toml: &str) -> Result<RunConfig> {
        Self::extract(Figment::new().merge(Toml::string(toml)))
    }

    fn extract(figment: Figment) -> Result<RunConfig> {
        let config: RunConfig = figment
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;

        tracing::debug!(
            ticker = config.underlying.ticker,
            legs = config.legs.len(),
            "Run configuration loaded"
        );
        Ok(config)
    }
}
