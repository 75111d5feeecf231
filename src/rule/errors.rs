use crate::ts::TreeSitterError;
use thiserror::Error;

/// Failure of a single rule during a scan pass.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("query failed in rule '{rule_id}': {source}")]
    Query {
        rule_id: String,
        #[source]
        source: TreeSitterError,
    },

    #[error("rule '{rule_id}' failed: {message}")]
    Logic { rule_id: String, message: String },

    #[error("rule '{rule_id}' panicked: {message}")]
    Panicked { rule_id: String, message: String },
}

impl RuleError {
    pub fn query(rule_id: impl Into<String>, source: TreeSitterError) -> Self {
        RuleError::Query {
            rule_id: rule_id.into(),
            source,
        }
    }

    pub fn logic(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        RuleError::Logic {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }

    /// Id of the rule that failed.
    pub fn rule_id(&self) -> &str {
        match self {
            RuleError::Query { rule_id, .. }
            | RuleError::Logic { rule_id, .. }
            | RuleError::Panicked { rule_id, .. } => rule_id,
        }
    }
}
