mod error;
mod loader;
mod raw;
mod settings;

pub use error::ConfigError;
pub use loader::{load, load_from_env};
pub use raw::RawSettings;
pub use settings::Settings;
