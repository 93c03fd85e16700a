use crate::error::CoreError;
use config::{Config as Cfg, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Environment variable prefix shared by every binary in the workspace.
pub const ENV_PREFIX: &str = "APP";

/// Load layered settings into `T`.
///
/// Sources, lowest precedence first:
/// 1. `.env` (loaded into the process environment, missing file is fine)
/// 2. `config_file` if given and present (any format the `config` crate understands)
/// 3. `APP_*` environment variables, with `__` separating nested keys
///    (e.g. `APP_API__BASE_URL`)
///
/// Every field of `T` is expected to carry a serde default, so an empty
/// environment still yields a usable value.
pub fn load_settings<T: DeserializeOwned>(config_file: Option<&Path>) -> Result<T, CoreError> {
    dotenvy::dotenv().ok();

    let mut builder = Cfg::builder();
    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(false));
    }

    let settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}
