use crate::ts::lang::Language;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeSitterError {
    #[error("failed to set {language} grammar for parser")]
    LanguageSet { language: Language },

    #[error("failed to parse {language} source")]
    ParseFailed { language: Language },

    #[error("invalid tree-sitter query: {message}")]
    InvalidQuery { message: String },
}
