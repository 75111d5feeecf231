//! Integration tests for file-level scanning
//!
//! Exercises Scanner sessions end to end: rule isolation, severity clamping,
//! context selection and repeatability across shared rules

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use treescan::scan::metrics;
use treescan::ts::queries;
use treescan::{
    EngineSettings, Language, NameLengthRule, ParsedSource, QueryRule, Rule, RuleContext,
    RuleError, RuleMatch, RuleMeta, ScanError, ScanMode, Scanner, ScannerOptions, Severity,
};

const ACCOUNT: &str = r#"package bank;

public class Account {
    private String id;
    private long balance;

    public Account(String id) {
        this.id = id;
    }

    public void deposit(long amount) {
        long b = balance + amount;
        balance = b;
    }

    public long getBalance() {
        return balance;
    }
}
"#;

fn write_source(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn query_rule(id: &str, query: &str) -> RuleMeta {
    RuleMeta::builder(id)
        .name(id)
        .category("test")
        .message(format!("{id} matched"))
        .query(query)
        .build()
}

fn short_names(minimum: usize) -> Arc<dyn Rule> {
    Arc::new(NameLengthRule::new(
        RuleMeta::builder("short-variable")
            .message("Variable '%name%' has %length% character(s), expected %minimum%")
            .query(queries::JAVA_VARIABLE_NAMES)
            .severity(2)
            .build(),
        minimum,
    ))
}

/// Emits a result for each method, then errors out on the getter.
struct FailsOnGetter(RuleMeta);

impl Rule for FailsOnGetter {
    fn meta(&self) -> &RuleMeta {
        &self.0
    }

    fn validate_node<'tree>(
        &self,
        capture: &treescan::ts::Capture<'tree>,
        source: &'tree ParsedSource,
    ) -> Result<Vec<RuleMatch<'tree>>, RuleError> {
        if source.node_text(capture.node).starts_with("get") {
            return Err(RuleError::logic(self.0.id(), "getter not supported"));
        }
        Ok(vec![RuleMatch::new(capture.node)])
    }
}

fn scanner(path: &Path, rules: Vec<Arc<dyn Rule>>) -> Scanner {
    Scanner::create(ScannerOptions::new(path, rules)).unwrap()
}

#[test]
fn test_scan_reports_short_variable_with_metadata() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "Account.java", ACCOUNT);

    let scanner = scanner(&path, vec![short_names(3)]);
    let results = scanner.run();

    // `id` appears as field and constructor parameter, only declarators count
    let texts: Vec<&str> = results.iter().map(|r| r.text()).collect();
    assert_eq!(texts, vec!["id", "b"]);
    assert_eq!(
        results[1].message(),
        "Variable 'b' has 1 character(s), expected 3"
    );
    assert_eq!(results[1].severity(), Severity::Warning);
    assert_eq!(results[1].line(), 12);
    assert_eq!(results[1].file_path(), Some(path.as_path()));
}

#[test]
fn test_failing_rule_does_not_hide_other_rules() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "Account.java", ACCOUNT);

    let failing: Arc<dyn Rule> = Arc::new(FailsOnGetter(query_rule(
        "methods",
        queries::JAVA_METHOD_NAMES,
    )));
    let fields: Arc<dyn Rule> = Arc::new(QueryRule::new(query_rule(
        "fields",
        "(field_declaration) @field",
    )));

    for rules in [
        vec![failing.clone(), fields.clone()],
        vec![fields.clone(), failing.clone()],
    ] {
        let scanner = scanner(&path, rules);
        let outcome = scanner.execute(ScanMode::Scan);

        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results.iter().all(|r| r.rule_id() == "fields"));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].rule_id, "methods");
        assert!(!outcome.is_clean());
    }
}

#[test]
fn test_malformed_query_is_isolated() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "Account.java", ACCOUNT);

    let broken: Arc<dyn Rule> = Arc::new(QueryRule::new(query_rule(
        "broken",
        "(no_such_node) @x",
    )));
    let scanner = scanner(&path, vec![broken, short_names(3)]);
    let outcome = scanner.execute(ScanMode::Scan);

    assert_eq!(outcome.results.len(), 2);
    assert!(matches!(
        outcome.failures[0].error,
        RuleError::Query { .. }
    ));
}

#[test]
fn test_severity_is_clamped_without_mutating_rule() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "Account.java", ACCOUNT);

    let loud: Arc<dyn Rule> = Arc::new(QueryRule::new(
        RuleMeta::builder("classes")
            .query("(class_declaration) @class")
            .severity(200)
            .build(),
    ));
    let quiet: Arc<dyn Rule> = Arc::new(QueryRule::new(
        RuleMeta::builder("packages")
            .query("(package_declaration) @pkg")
            .severity(0)
            .build(),
    ));
    let scanner = scanner(&path, vec![loud.clone(), quiet.clone()]);
    let results = scanner.run();

    assert_eq!(results[0].severity(), Severity::MAX);
    assert_eq!(results[1].severity(), Severity::MIN);
    assert_eq!(loud.meta().declared_severity(), 200);
    assert_eq!(quiet.meta().declared_severity(), 0);
}

#[test]
fn test_context_selects_rules_per_pass() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "Account.java", ACCOUNT);

    let rule = |id: &str, context: RuleContext| -> Arc<dyn Rule> {
        Arc::new(QueryRule::new(
            RuleMeta::builder(id)
                .query("(method_declaration) @m")
                .context(context)
                .build(),
        ))
    };
    let rules = vec![
        rule("scan-only", RuleContext::Scan),
        rule("measure-only", RuleContext::Measure),
        rule("both", RuleContext::Both),
    ];
    let scanner = scanner(&path, rules.clone());

    let results = scanner.run();
    let scanned: Vec<&str> = results.iter().map(|r| r.rule_id()).collect();
    assert_eq!(scanned, vec!["scan-only", "scan-only", "both", "both"]);

    let measured = scanner.measure();
    let counts = metrics(&rules, ScanMode::Measure, &measured);
    let summary: Vec<(&str, usize)> = counts
        .iter()
        .map(|m| (m.rule_id.as_str(), m.count))
        .collect();
    assert_eq!(summary, vec![("measure-only", 2), ("both", 2)]);
}

#[test]
fn test_shared_rules_across_sessions_are_repeatable() {
    let dir = TempDir::new().unwrap();
    let first = write_source(&dir, "Account.java", ACCOUNT);
    let second = write_source(&dir, "Tiny.java", "class Tiny { int x; int yy; }");

    let rules = vec![short_names(3)];
    let a1: Vec<String> = scanner(&first, rules.clone())
        .run()
        .iter()
        .map(|r| r.text().to_string())
        .collect();
    let b: Vec<String> = scanner(&second, rules.clone())
        .run()
        .iter()
        .map(|r| r.text().to_string())
        .collect();
    let a2: Vec<String> = scanner(&first, rules)
        .run()
        .iter()
        .map(|r| r.text().to_string())
        .collect();

    assert_eq!(a1, a2);
    assert_eq!(b, vec!["x", "yy"]);
}

#[test]
fn test_parallel_and_sequential_agree() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "Account.java", ACCOUNT);

    let rules: Vec<Arc<dyn Rule>> = (0..12)
        .map(|i| -> Arc<dyn Rule> {
            let query = match i % 3 {
                0 => queries::JAVA_METHOD_NAMES,
                1 => queries::JAVA_PARAMETER_NAMES,
                _ => "(field_declaration) @field",
            };
            Arc::new(QueryRule::new(query_rule(&format!("rule-{i}"), query)))
        })
        .collect();

    let collect = |settings: EngineSettings| -> Vec<(String, String)> {
        let scanner = Scanner::create(
            ScannerOptions::new(&path, rules.clone()).with_settings(settings),
        )
        .unwrap();
        scanner
            .run()
            .iter()
            .map(|r| (r.rule_id().to_string(), r.text().to_string()))
            .collect()
    };

    let sequential = collect(EngineSettings {
        parallel: false,
        jobs: 0,
    });
    let global_pool = collect(EngineSettings::default());
    let dedicated_pool = collect(EngineSettings {
        parallel: true,
        jobs: 3,
    });

    assert_eq!(sequential.len(), 4 * 2 + 4 * 2 + 4 * 2);
    assert_eq!(sequential, global_pool);
    assert_eq!(sequential, dedicated_pool);
}

#[test]
fn test_syntax_errors_still_scan_and_dump() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "Broken.java", "class Broken { int a; ) }");

    let scanner = scanner(&path, vec![short_names(3)]);
    assert!(scanner.manager().parsed().has_errors());
    assert_eq!(scanner.run().len(), 1);

    let dump: Vec<String> =
        serde_json::from_str(&scanner.dump(queries::DEFAULT_DUMP_QUERY).unwrap()).unwrap();
    assert!(!dump.is_empty());
    assert!(dump.iter().all(|entry| entry.starts_with("@error=")));
}

#[test]
fn test_dump_rejects_malformed_query() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "Account.java", ACCOUNT);

    let scanner = scanner(&path, Vec::new());
    assert!(scanner.dump("(method_declaration").is_err());

    let names: Vec<String> =
        serde_json::from_str(&scanner.dump(queries::JAVA_METHOD_NAMES).unwrap()).unwrap();
    assert_eq!(names, vec!["@name=deposit", "@name=getBalance"]);
}

#[test]
fn test_explicit_language_overrides_extension() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "account.txt", ACCOUNT);

    let err = Scanner::create(ScannerOptions::new(&path, vec![short_names(3)]))
        .err()
        .unwrap();
    assert!(matches!(err, ScanError::UnsupportedLanguage { .. }));

    let scanner = Scanner::create(
        ScannerOptions::new(&path, vec![short_names(3)]).with_language(Language::Java),
    )
    .unwrap();
    assert_eq!(scanner.run().len(), 2);
}

#[test]
fn test_blank_source_yields_nothing() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "Blank.java", "  \n\n");

    let scanner = scanner(&path, vec![short_names(3)]);
    let outcome = scanner.execute(ScanMode::Scan);
    assert!(outcome.results.is_empty());
    assert!(outcome.is_clean());
}
