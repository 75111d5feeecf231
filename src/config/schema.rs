use crate::rule::{NameLengthRule, NodeFilter, QueryRule, Rule, RuleContext, RuleMeta, Severity};
use crate::scan::EngineSettings;
use crate::ts::Language;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RuleSetConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RuleSetConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        if let Some(language) = &self.meta.language {
            if language.parse::<Language>().is_err() {
                issues.push(ValidationIssue::Invalid {
                    rule_id: None,
                    message: format!("unknown language '{language}'"),
                });
            }
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
            } else if !seen.insert(rule.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    rule_id: rule.id.clone(),
                });
            }

            if rule.query.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: Some(rule.id.clone()),
                    field: "query",
                });
            }
            if rule.message.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: Some(rule.id.clone()),
                    field: "message",
                });
            }
            if let Some(capture) = &rule.capture {
                if capture.trim().is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        rule_id: Some(rule.id.clone()),
                        field: "capture",
                    });
                }
            }

            if let Err(message) = rule.severity.level() {
                issues.push(ValidationIssue::Invalid {
                    rule_id: Some(rule.id.clone()),
                    message,
                });
            }

            if let Some(filter) = &rule.filter {
                if let Err(e) = filter.parse::<NodeFilter>() {
                    issues.push(ValidationIssue::Invalid {
                        rule_id: Some(rule.id.clone()),
                        message: e.to_string(),
                    });
                }
            }

            match &rule.check {
                Check::Query => {}
                Check::NameLength { minimum } => {
                    if *minimum == 0 {
                        issues.push(ValidationIssue::Invalid {
                            rule_id: Some(rule.id.clone()),
                            message: "name-length minimum must be at least 1".to_string(),
                        });
                    }
                    if rule.filter.is_some() {
                        issues.push(ValidationIssue::Invalid {
                            rule_id: Some(rule.id.clone()),
                            message: "filter is only supported for query checks".to_string(),
                        });
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Language declared in `[meta]`, if any.
    pub fn language(&self) -> Option<Language> {
        self.meta.language.as_deref()?.parse().ok()
    }

    /// Instantiate every configured rule.
    pub fn build_rules(&self) -> Result<Vec<Arc<dyn Rule>>, ValidationError> {
        self.validate()?;
        self.rules.iter().map(RuleDefinition::build).collect()
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub context: RuleContext,
    #[serde(default)]
    pub severity: DeclaredSeverity,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub capture: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub check: Check,
}

impl RuleDefinition {
    fn build(&self) -> Result<Arc<dyn Rule>, ValidationError> {
        let invalid = |message: String| ValidationError {
            issues: vec![ValidationIssue::Invalid {
                rule_id: Some(self.id.clone()),
                message,
            }],
        };

        let mut builder = RuleMeta::builder(&self.id)
            .name(&self.name)
            .category(&self.category)
            .message(&self.message)
            .suggestion(&self.suggestion)
            .query(&self.query)
            .context(self.context)
            .severity(self.severity.level().map_err(invalid)?);
        if let Some(capture) = &self.capture {
            builder = builder.capture(capture);
        }
        let meta = builder.build();

        let rule: Arc<dyn Rule> = match &self.check {
            Check::Query => {
                let mut rule = QueryRule::new(meta);
                if let Some(filter) = &self.filter {
                    let filter = filter
                        .parse::<NodeFilter>()
                        .map_err(|e| invalid(e.to_string()))?;
                    rule = rule.with_filter(filter);
                }
                Arc::new(rule)
            }
            Check::NameLength { minimum } => Arc::new(NameLengthRule::new(meta, *minimum)),
        };
        Ok(rule)
    }
}

/// Severity as written in config: a level number or a name.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum DeclaredSeverity {
    Level(i64),
    Name(String),
}

impl Default for DeclaredSeverity {
    fn default() -> Self {
        DeclaredSeverity::Level(i64::from(Severity::default().level()))
    }
}

impl DeclaredSeverity {
    /// Declared level. Numbers outside `0..=255` saturate; clamping onto the
    /// severity scale happens at scan time.
    pub fn level(&self) -> Result<u8, String> {
        match self {
            DeclaredSeverity::Level(level) => {
                Ok(u8::try_from((*level).max(0)).unwrap_or(u8::MAX))
            }
            DeclaredSeverity::Name(name) => name.parse::<Severity>().map(Severity::level),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Check {
    #[default]
    Query,
    NameLength {
        minimum: usize,
    },
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rule config validation failed:")?;
        for issue in &self.issues {
            writeln!(f, "  - {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        rule_id: String,
    },
    Invalid {
        rule_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rules list is empty"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing field '{field}'"),
                None => write!(f, "missing field '{field}'"),
            },
            ValidationIssue::DuplicateId { rule_id } => {
                write!(f, "rule id '{rule_id}' is defined more than once")
            }
            ValidationIssue::Invalid { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}': {message}"),
                None => write!(f, "{message}"),
            },
        }
    }
}
