//! `nebulax.toml` settings: catalog source, training, model and archive sections.

use crate::app_dirs;

mod defaults;
mod load;
mod types;


/// Settings file name inside the app root.
pub const CONFIG_FILE_NAME: &str = "nebulax.toml";
/// Default classifier artifact name inside `models/`.
pub const MODEL_FILE_NAME: &str = "classifier_model.json";

pub use load::{config_path, load_or_default, load_settings_from, save_settings_to_path};
pub use types::{
    ArchiveSettings, CatalogSettings, ConfigError, ModelSettings, Settings, SourceSelection,
    TrainingSettings,
};

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}
