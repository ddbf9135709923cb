use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown scrim action code: {0}")]
    UnknownActionCode(i32),

    #[error("Duplicate {category} rule for key {key} in ruleset {ruleset_id}")]
    DuplicateRule {
        category: &'static str,
        key: i32,
        ruleset_id: i32,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}
