//! Grammar selection via ast-grep-language.
//!
//! We use the built-in grammars bundled with `ast_grep_language::SupportLang`
//! instead of depending on individual `tree-sitter-*` crates. This keeps the
//! grammar versions in lockstep with the tree-sitter runtime.

use ast_grep_language::{LanguageExt, SupportLang};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Languages a rule set can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    Java,
    C,
    Cpp,
    CSharp,
    Go,
    JavaScript,
    Kotlin,
    Python,
    Rust,
    TypeScript,
}

impl Language {
    pub const ALL: [Language; 10] = [
        Language::Java,
        Language::C,
        Language::Cpp,
        Language::CSharp,
        Language::Go,
        Language::JavaScript,
        Language::Kotlin,
        Language::Python,
        Language::Rust,
        Language::TypeScript,
    ];

    /// Canonical lowercase name, used in config files and cache keys.
    pub fn name(self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Go => "go",
            Language::JavaScript => "javascript",
            Language::Kotlin => "kotlin",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::TypeScript => "typescript",
        }
    }

    /// File extensions recognized for this language.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Language::Java => &["java"],
            Language::C => &["c", "h"],
            Language::Cpp => &["cc", "cpp", "cxx", "hpp", "hh"],
            Language::CSharp => &["cs"],
            Language::Go => &["go"],
            Language::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Language::Kotlin => &["kt", "kts"],
            Language::Python => &["py", "pyi"],
            Language::Rust => &["rs"],
            Language::TypeScript => &["ts", "mts", "cts"],
        }
    }

    /// Detect the language from a file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }

    pub fn support_lang(self) -> SupportLang {
        match self {
            Language::Java => SupportLang::Java,
            Language::C => SupportLang::C,
            Language::Cpp => SupportLang::Cpp,
            Language::CSharp => SupportLang::CSharp,
            Language::Go => SupportLang::Go,
            Language::JavaScript => SupportLang::JavaScript,
            Language::Kotlin => SupportLang::Kotlin,
            Language::Python => SupportLang::Python,
            Language::Rust => SupportLang::Rust,
            Language::TypeScript => SupportLang::TypeScript,
        }
    }

    /// The tree-sitter grammar for this language.
    pub fn ts_language(self) -> tree_sitter::Language {
        self.support_lang().get_ts_language()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "java" => Ok(Language::Java),
            "c" => Ok(Language::C),
            "cpp" | "c++" => Ok(Language::Cpp),
            "csharp" | "c#" | "cs" => Ok(Language::CSharp),
            "go" | "golang" => Ok(Language::Go),
            "javascript" | "js" => Ok(Language::JavaScript),
            "kotlin" | "kt" => Ok(Language::Kotlin),
            "python" | "py" => Ok(Language::Python),
            "rust" | "rs" => Ok(Language::Rust),
            "typescript" | "ts" => Ok(Language::TypeScript),
            _ => Err(format!("Unknown language: {}", s)),
        }
    }
}
