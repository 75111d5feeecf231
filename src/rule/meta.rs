use crate::rule::context::RuleContext;
use crate::rule::severity::Severity;

/// Immutable descriptor shared by every rule implementation.
///
/// Built once with [`RuleMeta::builder`]; there are no setters, so a rule
/// shared between scan sessions always reports the same metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMeta {
    id: String,
    name: String,
    category: String,
    message: String,
    suggestion: String,
    query: String,
    capture: Option<String>,
    context: RuleContext,
    severity: u8,
}

impl RuleMeta {
    pub fn builder(id: impl Into<String>) -> RuleMetaBuilder {
        RuleMetaBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable name, falling back to the id.
    pub fn name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Message template; may contain `%key%` placeholders.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn suggestion(&self) -> &str {
        &self.suggestion
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Capture name that produces results, if restricted.
    pub fn capture(&self) -> Option<&str> {
        self.capture.as_deref()
    }

    pub fn context(&self) -> RuleContext {
        self.context
    }

    /// Severity exactly as the rule author declared it.
    pub fn declared_severity(&self) -> u8 {
        self.severity
    }

    /// Severity used for results, clamped onto the supported scale.
    pub fn effective_severity(&self) -> Severity {
        Severity::from_level(self.severity)
    }
}

/// Builder for [`RuleMeta`].
#[derive(Debug, Clone)]
pub struct RuleMetaBuilder {
    meta: RuleMeta,
}

impl RuleMetaBuilder {
    fn new(id: impl Into<String>) -> Self {
        Self {
            meta: RuleMeta {
                id: id.into(),
                name: String::new(),
                category: String::new(),
                message: String::new(),
                suggestion: String::new(),
                query: String::new(),
                capture: None,
                context: RuleContext::default(),
                severity: Severity::default().level(),
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.meta.name = name.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.meta.category = category.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.meta.message = message.into();
        self
    }

    pub fn suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.meta.suggestion = suggestion.into();
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.meta.query = query.into();
        self
    }

    pub fn capture(mut self, capture: impl Into<String>) -> Self {
        self.meta.capture = Some(capture.into());
        self
    }

    pub fn context(mut self, context: RuleContext) -> Self {
        self.meta.context = context;
        self
    }

    /// Declared severity level. Values off the scale are accepted here and
    /// clamped when results are produced.
    pub fn severity(mut self, level: u8) -> Self {
        self.meta.severity = level;
        self
    }

    pub fn build(self) -> RuleMeta {
        self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_populates_all_fields() {
        let meta = RuleMeta::builder("short-name")
            .name("Short name")
            .category("codestyle")
            .message("Name %name% is short")
            .suggestion("Rename it")
            .query("(identifier) @name")
            .capture("name")
            .context(RuleContext::Both)
            .severity(2)
            .build();

        assert_eq!(meta.id(), "short-name");
        assert_eq!(meta.name(), "Short name");
        assert_eq!(meta.category(), "codestyle");
        assert_eq!(meta.message(), "Name %name% is short");
        assert_eq!(meta.suggestion(), "Rename it");
        assert_eq!(meta.query(), "(identifier) @name");
        assert_eq!(meta.capture(), Some("name"));
        assert_eq!(meta.context(), RuleContext::Both);
        assert_eq!(meta.effective_severity(), Severity::Warning);
    }

    #[test]
    fn defaults() {
        let meta = RuleMeta::builder("bare").build();
        assert_eq!(meta.name(), "bare");
        assert_eq!(meta.context(), RuleContext::Scan);
        assert_eq!(meta.effective_severity(), Severity::Violation);
        assert_eq!(meta.capture(), None);
    }

    #[test]
    fn effective_severity_clamps_without_touching_declared() {
        let meta = RuleMeta::builder("loud").severity(42).build();
        assert_eq!(meta.effective_severity(), Severity::MAX);
        assert_eq!(meta.effective_severity(), Severity::MAX);
        assert_eq!(meta.declared_severity(), 42);
    }
}
