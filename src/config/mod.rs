pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, resolve, ConfigError, CONFIG_FILE_NAME};
pub use schema::{
    ColorChoice, FrontendConfig, OutputConfig, RulesConfig, ToolConfig, ValidationError,
    ValidationIssue,
};
