//! Kiba Test Harness Library Module
//!
//! Discovers YAML compile suites, runs each case through the full
//! [`CompilePipeline`], and reports the results with colored output and diffs.
//!
//! # Test Format
//!
//! ```yaml
//! - name: "mutable declaration"
//!   input: "var int = 1"
//!   expected: "let int = 1"          # exact generated JavaScript
//! - name: "undefined call"
//!   input: "identity(a)"
//!   expect_diagnostics: 2            # number of semantic diagnostics
//! - name: "unknown identifier message"
//!   input: "x"
//!   expect_error: "x is not defined" # substring of the rendered error
//!   skip: false                      # optional
//!   only: false                      # optional
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use kiba::test_harness::{run_all_tests, TestConfig};
//!
//! let config = TestConfig::default();
//! let (_passed, failed, _skipped) = run_all_tests(None, &config);
//! if failed > 0 {
//!     std::process::exit(1);
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use termcolor::ColorChoice;
use tracing::debug;
use walkdir::WalkDir;

use crate::cli::output::print_diff;
use crate::config::KibaConfig;
use crate::engine::CompilePipeline;

// =============================================================================
// CORE TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TestResult {
    Pass {
        file: String,
        name: String,
    },
    Fail {
        file: String,
        name: String,
        error: String,
        /// Expected and actual output, when the failure is an output mismatch.
        mismatch: Option<(String, String)>,
    },
    Skipped {
        file: String,
        name: String,
        reason: String,
    },
}

/// A single YAML test case.
#[derive(Debug, Deserialize, Clone)]
pub struct TestCase {
    pub name: String,
    pub input: String,
    pub expected: Option<String>,
    pub expect_error: Option<String>,
    pub expect_diagnostics: Option<usize>,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub only: bool,
}

impl TestCase {
    fn expects_failure(&self) -> bool {
        self.expect_error.is_some() || self.expect_diagnostics.is_some_and(|n| n > 0)
    }
}

pub struct TestConfig {
    pub test_root: PathBuf,
    pub use_colors: bool,
    pub compiler: KibaConfig,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            test_root: PathBuf::from("tests/suites"),
            use_colors: atty::is(atty::Stream::Stderr),
            compiler: KibaConfig::default(),
        }
    }
}

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

impl TestConfig {
    pub fn colorize(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn color_choice(&self) -> ColorChoice {
        if self.use_colors {
            ColorChoice::Always
        } else {
            ColorChoice::Never
        }
    }
}

// =============================================================================
// DISCOVERY
// =============================================================================

/// All `.yaml`/`.yml` files under `root`, sorted by path.
pub fn discover_yaml_files<P: AsRef<Path>>(root: P) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    serde_yaml::from_str(&content).map_err(|e| format!("invalid YAML in {}: {e}", path.display()))
}

pub fn skip_reason(case: &TestCase, has_only: bool, filter: Option<&str>) -> Option<String> {
    if has_only && !case.only {
        return Some("not marked 'only' in 'only' mode".to_string());
    }
    if case.skip {
        return Some("marked 'skip'".to_string());
    }
    if let Some(f) = filter {
        if !case.name.to_lowercase().contains(&f.to_lowercase()) {
            return Some(format!("filtered out by substring: {f}"));
        }
    }
    None
}

// =============================================================================
// EXECUTION
// =============================================================================

/// Compiles one case and compares the outcome with its expectation.
pub fn run_test_case(file: &str, case: &TestCase, pipeline: &CompilePipeline) -> TestResult {
    let pass = || TestResult::Pass {
        file: file.to_string(),
        name: case.name.clone(),
    };
    let fail = |error: String, mismatch: Option<(String, String)>| TestResult::Fail {
        file: file.to_string(),
        name: case.name.clone(),
        error,
        mismatch,
    };

    match pipeline.compile(&case.name, &case.input) {
        Ok(code) => {
            if case.expects_failure() {
                return fail(format!("expected an error, but compiled to:\n{code}"), None);
            }
            match case.expected.as_deref() {
                Some(expected) if expected.trim() != code.trim() => fail(
                    "output did not match expected".to_string(),
                    Some((expected.trim().to_string(), code.trim().to_string())),
                ),
                _ => pass(),
            }
        }
        Err(error) => {
            let rendered = error.to_string();
            if let Some(count) = case.expect_diagnostics {
                if count == 0 {
                    return fail(rendered, None);
                }
                let found = error.diagnostics().len();
                if found != count {
                    return fail(
                        format!("expected {count} diagnostic(s), found {found}: {rendered}"),
                        None,
                    );
                }
            }
            match case.expect_error.as_deref() {
                Some(expected) if !rendered.contains(expected) => fail(
                    format!("expected error containing '{expected}', got: {rendered}"),
                    None,
                ),
                None if case.expect_diagnostics.is_none() => fail(rendered, None),
                _ => pass(),
            }
        }
    }
}

/// Run all suites under `config.test_root`; returns (passed, failed, skipped).
pub fn run_all_tests(filter: Option<&str>, config: &TestConfig) -> (usize, usize, usize) {
    let pipeline = CompilePipeline::new(config.compiler.clone());
    let mut results = Vec::new();
    let mut all_cases = Vec::new();

    for path in discover_yaml_files(&config.test_root) {
        let file = path.display().to_string();
        match load_test_cases(&path) {
            Ok(cases) => all_cases.extend(cases.into_iter().map(|case| (file.clone(), case))),
            Err(error) => results.push(TestResult::Fail {
                file: file.clone(),
                name: "<suite>".to_string(),
                error,
                mismatch: None,
            }),
        }
    }
    debug!(cases = all_cases.len(), root = %config.test_root.display(), "discovered test cases");

    let has_only = all_cases.iter().any(|(_, case)| case.only);
    for (file, case) in &all_cases {
        let result = match skip_reason(case, has_only, filter) {
            Some(reason) => TestResult::Skipped {
                file: file.clone(),
                name: case.name.clone(),
                reason,
            },
            None => run_test_case(file, case, &pipeline),
        };
        results.push(result);
    }

    report_results(&results, config);
    partition_results(&results)
}

// =============================================================================
// REPORTING
// =============================================================================

pub fn partition_results(results: &[TestResult]) -> (usize, usize, usize) {
    let count = |f: fn(&TestResult) -> bool| results.iter().filter(|r| f(r)).count();
    (
        count(|r| matches!(r, TestResult::Pass { .. })),
        count(|r| matches!(r, TestResult::Fail { .. })),
        count(|r| matches!(r, TestResult::Skipped { .. })),
    )
}

pub fn report_results(results: &[TestResult], config: &TestConfig) {
    for result in results {
        match result {
            TestResult::Pass { file, name } => {
                println!("{}: {name} [{file}]", config.colorize("PASS", GREEN))
            }
            TestResult::Fail { .. } => print_failure(result, config),
            TestResult::Skipped { file, name, reason } => {
                println!("{}: {name} [{file}] ({reason})", config.colorize("SKIP", YELLOW))
            }
        }
    }

    let (passed, failed, skipped) = partition_results(results);
    println!(
        "\nTest summary: total {}, {} {passed}, {} {failed}, {} {skipped}",
        results.len(),
        config.colorize("passed", GREEN),
        config.colorize("failed", RED),
        config.colorize("skipped", YELLOW),
    );
}

pub fn print_failure(result: &TestResult, config: &TestConfig) {
    if let TestResult::Fail {
        file,
        name,
        error,
        mismatch,
    } = result
    {
        eprintln!("{}: {name} [{file}]", config.colorize("FAIL", RED));
        eprintln!("  Error: {error}");
        if let Some((expected, actual)) = mismatch {
            eprintln!("  Diff:");
            print_diff(expected, actual, config.color_choice());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(yaml: &str) -> TestCase {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn run(yaml: &str) -> TestResult {
        run_test_case("inline.yaml", &case(yaml), &CompilePipeline::default())
    }

    #[test]
    fn matching_output_passes() {
        let result = run("name: decl\ninput: var int = 1\nexpected: let int = 1");
        assert!(matches!(result, TestResult::Pass { .. }));
    }

    #[test]
    fn mismatch_carries_both_sides() {
        let result = run("name: decl\ninput: var int = 1\nexpected: const int = 1");
        let TestResult::Fail { mismatch, .. } = result else {
            panic!("expected failure");
        };
        assert_eq!(
            mismatch,
            Some(("const int = 1".to_string(), "let int = 1".to_string()))
        );
    }

    #[test]
    fn diagnostic_count_is_checked() {
        assert!(matches!(
            run("name: undefined\ninput: identity(a)\nexpect_diagnostics: 2"),
            TestResult::Pass { .. }
        ));
        assert!(matches!(
            run("name: undefined\ninput: identity(a)\nexpect_diagnostics: 1"),
            TestResult::Fail { .. }
        ));
    }

    #[test]
    fn expected_error_that_compiles_fails() {
        let result = run("name: ok\ninput: var a = 1\nexpect_error: not defined");
        assert!(matches!(result, TestResult::Fail { .. }));
    }

    #[test]
    fn only_and_skip() {
        let plain = case("name: a\ninput: x");
        let only = case("name: b\ninput: x\nonly: true");
        let skipped = case("name: c\ninput: x\nskip: true");
        assert!(skip_reason(&plain, true, None).is_some());
        assert!(skip_reason(&only, true, None).is_none());
        assert!(skip_reason(&skipped, false, None).is_some());
        assert!(skip_reason(&plain, false, Some("A")).is_none());
        assert!(skip_reason(&plain, false, Some("zzz")).is_some());
    }
}
