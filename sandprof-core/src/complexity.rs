//! Textual code complexity analysis
//!
//! Metrics are computed from lexical patterns rather than a parse tree so
//! the same analysis applies to every template language (JavaScript,
//! TypeScript, Python). The numbers are approximations and are sensitive to
//! formatting: cognitive complexity in particular depends on how a file
//! places its braces and keywords at line starts. That is a known
//! limitation of the heuristic and changing it would shift every score
//! previously reported.

use crate::types::CodeComplexity;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern:?}: {e}"))
}

/// Decision points, each occurrence adds one path.
///
/// `else if (` is matched as a single occurrence together with its `if (`.
static DECISION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:else\s*)?if\s*\(",
        r"while\s*\(",
        r"for\s*\(",
        r"case\s+.*:",
        r"catch\s*\(",
        r"&&|\|\|",
    ]
    .iter()
    .map(|p| compile(p))
    .collect()
});

static FUNCTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| compile(r"function\s+\w+|def\s+\w+|const\s+\w+\s*="));
static CLASS_PATTERN: Lazy<Regex> = Lazy::new(|| compile(r"class\s+\w+"));
static IMPORT_PATTERN: Lazy<Regex> = Lazy::new(|| compile(r"import\s+.*from|from\s+.*import"));

static JS_IMPORT_FROM: Lazy<Regex> =
    Lazy::new(|| compile(r#"import\s+.*from\s+['"]([^'"]+)['"]"#));
static PY_FROM_IMPORT: Lazy<Regex> = Lazy::new(|| compile(r"^\s*from\s+(\w+)"));
static PY_IMPORT: Lazy<Regex> = Lazy::new(|| compile(r"^\s*import\s+(\w+)"));

/// Line prefixes that open a nested block
const NESTING_KEYWORDS: &[&str] = &["if", "while", "for", "try", "def", "class", "function"];
/// Line prefixes that continue a block without nesting further
const CONTINUATION_KEYWORDS: &[&str] = &["else", "elif", "except", "finally"];

/// Analyze `code`. Never fails: code without content yields the minimal
/// result (a single path, everything else zero).
pub fn analyze(code: &str) -> CodeComplexity {
    if code.trim().is_empty() {
        return CodeComplexity {
            cyclomatic: 1,
            ..Default::default()
        };
    }

    CodeComplexity {
        cyclomatic: cyclomatic_complexity(code),
        cognitive: cognitive_complexity(code),
        lines_of_code: saturate(code.split('\n').count()),
        functions_count: count_matches(&FUNCTION_PATTERN, code),
        classes_count: count_matches(&CLASS_PATTERN, code),
        imports: count_matches(&IMPORT_PATTERN, code),
        dependencies: extract_dependencies(code),
    }
}

/// One base path plus one per decision point, regardless of nesting
pub fn cyclomatic_complexity(code: &str) -> u32 {
    DECISION_PATTERNS
        .iter()
        .fold(1u32, |acc, pattern| acc.saturating_add(count_matches(pattern, code)))
}

/// Nesting-weighted line scan
pub fn cognitive_complexity(code: &str) -> u32 {
    let mut complexity = 0u32;
    let mut nesting = 0u32;

    for line in code.split('\n') {
        let trimmed = line.trim();

        if starts_with_any(trimmed, NESTING_KEYWORDS) {
            complexity = complexity.saturating_add(1 + nesting);
            nesting += 1;
        } else if starts_with_any(trimmed, CONTINUATION_KEYWORDS) {
            complexity = complexity.saturating_add(1);
        } else if trimmed.contains('}') || trimmed.contains("end") {
            nesting = nesting.saturating_sub(1);
        }
    }

    complexity
}

/// Module names referenced by import statements, de-duplicated
///
/// JavaScript `import ... from 'x'` lines contribute `x`; Python
/// `from x import ...` and `import x` lines contribute `x`.
pub fn extract_dependencies(code: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut dependencies = Vec::new();

    for line in code.lines() {
        let module = if let Some(caps) = JS_IMPORT_FROM.captures(line) {
            caps.get(1)
        } else if let Some(caps) = PY_FROM_IMPORT.captures(line) {
            caps.get(1)
        } else {
            PY_IMPORT.captures(line).and_then(|caps| caps.get(1))
        };

        if let Some(module) = module {
            let name = module.as_str().to_string();
            if seen.insert(name.clone()) {
                dependencies.push(name);
            }
        }
    }

    dependencies
}

fn starts_with_any(line: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| line.starts_with(p))
}

fn count_matches(pattern: &Regex, code: &str) -> u32 {
    saturate(pattern.find_iter(code).count())
}

fn saturate(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
