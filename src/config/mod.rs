pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, load_json_str, ConfigError};
pub use schema::{
    Check, DeclaredSeverity, Metadata, RuleDefinition, RuleSetConfig, ValidationError,
    ValidationIssue,
};
