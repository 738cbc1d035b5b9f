use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use interpreter::script::{self, ScriptReport};

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Expected output: every line the run produces, joined with newlines
    /// (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Expected fault: the fault message must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,
}

/// Split a `.test.py` file into its TOML frontmatter and script body.
fn parse_test_file(content: &str) -> Result<(TestConfig, String), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    let mut lines = content.lines();
    match lines.next() {
        Some(first) if first.trim_end() == "---" => {}
        _ => return Err("missing opening --- frontmatter delimiter".into()),
    }

    let mut frontmatter = String::new();
    let mut body = String::new();
    let mut in_body = false;
    for line in lines {
        if !in_body && line.trim_end() == "---" {
            in_body = true;
        } else if in_body {
            body.push_str(line);
            body.push('\n');
        } else {
            frontmatter.push_str(line);
            frontmatter.push('\n');
        }
    }
    if !in_body {
        return Err("missing closing --- frontmatter delimiter".into());
    }

    let config: TestConfig =
        toml::from_str(&frontmatter).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, body))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, body) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };
    let description = config.description.clone();

    let report = script::run_report(&body);

    match check_expectations(&config, &report) {
        Some(reason) => fail(description, reason),
        None => TestResult {
            path: path.to_path_buf(),
            description,
            outcome: TestOutcome::Pass,
        },
    }
}

/// Compare a run against the test's expectations. Returns `Some(reason)`
/// on the first mismatch.
fn check_expectations(config: &TestConfig, report: &ScriptReport) -> Option<String> {
    if let Some(expected) = &config.expect_error {
        return match &report.fault {
            Some(fault) if fault.message.contains(expected.as_str()) => None,
            Some(fault) => Some(format!(
                "expected fault containing \"{}\", got: {}",
                expected, fault.message
            )),
            None => Some(format!(
                "expected fault containing \"{}\", but the script ran clean",
                expected
            )),
        };
    }

    if let Some(fault) = &report.fault {
        return Some(format!(
            "unexpected fault on line {}: {}",
            fault.line, fault.message
        ));
    }

    if let Some(expected) = &config.expect_output {
        let actual = report.output.join("\n");
        let actual = actual.trim();
        let expected = expected.trim();
        if actual != expected {
            return Some(format!(
                "output mismatch\n  expected: {}\n  actual:   {}",
                expected.replace('\n', "\\n"),
                actual.replace('\n', "\\n")
            ));
        }
    }

    None
}

/// Discover `.test.py` files grouped by category (subfolder relative to
/// the root). Files directly in the root get category "" (uncategorized).
/// A single-file path is its own uncategorized suite.
fn discover_categorized(path: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    if path.is_file() {
        categories.entry(String::new()).or_default().push(path.to_path_buf());
    } else {
        collect_tests(path, path, &mut categories);
        for files in categories.values_mut() {
            files.sort();
        }
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(".test.py") {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.py files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &categories {
        let label = if category.is_empty() { "(root)" } else { category.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

/// Run all `.test.py` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let all_categories = discover_categorized(path);

    if all_categories.is_empty() {
        eprintln!("no .test.py files found in {}", path.display());
        return 1;
    }

    // Category filters only make sense for directory suites
    let selected: BTreeMap<&str, &Vec<PathBuf>> = if categories.is_empty() || path.is_file() {
        all_categories.iter().map(|(k, v)| (k.as_str(), v)).collect()
    } else {
        let mut filtered = BTreeMap::new();
        for requested in categories {
            let req = requested.trim_matches('/');
            let mut found = false;
            for (category, files) in &all_categories {
                if category == req || category.starts_with(&format!("{}/", req)) {
                    filtered.insert(category.as_str(), files);
                    found = true;
                }
            }
            if !found {
                eprintln!(
                    "warning: category '{}' not found (available: {})",
                    req,
                    all_categories
                        .keys()
                        .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
        filtered
    };

    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &selected {
        if !path.is_file() {
            let header = if category.is_empty() {
                "(root)".to_string()
            } else {
                category.to_string()
            };
            eprintln!();
            eprintln!("{}", bold(&header, no_color));
        }

        for file in *files {
            let result = run_single_test(file);
            let label = result.description.as_deref().unwrap_or_else(|| {
                file.file_stem().and_then(|s| s.to_str()).unwrap_or("?")
            });

            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), label);
                }
                TestOutcome::Fail(_) => {
                    failed += 1;
                    eprintln!("  {}  {}", fail_label(no_color), label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failed == 0 {
        eprintln!(
            "test result: {}. {} passed, 0 failed",
            if no_color { "ok" } else { "\x1b[32mok\x1b[0m" },
            passed
        );
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            if no_color { "FAILED" } else { "\x1b[31mFAILED\x1b[0m" },
            passed,
            failed,
            passed + failed
        );
        1
    }
}
