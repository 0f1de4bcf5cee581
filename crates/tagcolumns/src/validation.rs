//! Validation of column specs before they are saved.
//!
//! Validation is advisory: [`ColumnSpec::build_column`] accepts any spec,
//! while this module reports what a user most likely got wrong. Issues are
//! errors (the spec should not be saved) or warnings.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::registry::ViewId;
use crate::script::ScriptEvaluator;
use crate::spec::{parse_add_to, ColumnKind, ColumnSpec};

/// Scripts longer than this produce a performance warning.
pub const MAX_EXPRESSION_LENGTH: usize = 500;
/// Widths above this produce a layout warning.
pub const MAX_WIDTH: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

/// One problem found in a spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Spec field the issue is about.
    pub field: &'static str,
    pub severity: Severity,
    pub message: String,
    /// Stable machine-readable code, e.g. `KEY_DUPLICATE`.
    pub code: &'static str,
}

impl ValidationIssue {
    fn error(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        ValidationIssue {
            field,
            severity: Severity::Error,
            message: message.into(),
            code,
        }
    }

    fn warning(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        ValidationIssue {
            field,
            severity: Severity::Warning,
            message: message.into(),
            code,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All issues found in one spec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// `true` when there are no errors. Warnings do not count.
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(ValidationIssue::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.issues.iter().filter(|issue| issue.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.issues.iter().filter(|issue| issue.is_warning())
    }

    /// Returns `true` if an issue with `code` was reported.
    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }

    /// One-line summary such as `"1 error, 2 warnings"`, or `"Valid"`.
    pub fn summary(&self) -> String {
        let errors = self.errors().count();
        let warnings = self.warnings().count();
        let mut parts = Vec::new();
        if errors > 0 {
            parts.push(plural(errors, "error"));
        }
        if warnings > 0 {
            parts.push(plural(warnings, "warning"));
        }
        if parts.is_empty() {
            "Valid".to_string()
        } else {
            parts.join(", ")
        }
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// What a rule may know besides the spec itself.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    /// Keys already taken by other columns.
    pub existing_keys: HashSet<String>,
}

impl ValidationContext {
    pub fn with_existing_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValidationContext {
            existing_keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

/// A single check over a spec.
pub trait ValidationRule {
    fn validate(&self, spec: &ColumnSpec, context: &ValidationContext) -> Vec<ValidationIssue>;
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Title and key must be present; a blank expression displays nothing.
#[derive(Debug, Default)]
pub struct RequiredFieldRule;

impl ValidationRule for RequiredFieldRule {
    fn validate(&self, spec: &ColumnSpec, _context: &ValidationContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if is_blank(&spec.title) {
            issues.push(ValidationIssue::error(
                "title",
                "TITLE_REQUIRED",
                "Title is required and cannot be empty",
            ));
        }
        if is_blank(&spec.key) {
            issues.push(ValidationIssue::error(
                "key",
                "KEY_REQUIRED",
                "Key is required and cannot be empty",
            ));
        }
        if is_blank(&spec.expression) {
            issues.push(ValidationIssue::warning(
                "expression",
                "EXPRESSION_EMPTY",
                "Expression is blank; the column will display nothing",
            ));
        }
        issues
    }
}

/// Keys must be unique.
#[derive(Debug, Default)]
pub struct UniqueKeyRule;

impl ValidationRule for UniqueKeyRule {
    fn validate(&self, spec: &ColumnSpec, context: &ValidationContext) -> Vec<ValidationIssue> {
        if !is_blank(&spec.key) && context.existing_keys.contains(&spec.key) {
            vec![ValidationIssue::error(
                "key",
                "KEY_DUPLICATE",
                format!("Key '{}' already exists", spec.key),
            )]
        } else {
            Vec::new()
        }
    }
}

/// Kind specific checks of the expression.
pub struct ExpressionRule {
    evaluator: Rc<dyn ScriptEvaluator>,
}

impl ExpressionRule {
    pub fn new(evaluator: Rc<dyn ScriptEvaluator>) -> Self {
        ExpressionRule { evaluator }
    }

    fn field(spec: &ColumnSpec) -> Vec<ValidationIssue> {
        if spec.expression.starts_with('$') {
            vec![ValidationIssue::warning(
                "expression",
                "FIELD_SCRIPT_SYNTAX",
                "Field expressions should not start with '$'; use a script column for scripting",
            )]
        } else {
            Vec::new()
        }
    }

    fn script(&self, spec: &ColumnSpec) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if let Err(err) = self.evaluator.validate(&spec.expression) {
            issues.push(ValidationIssue::error(
                "expression",
                "SCRIPT_SYNTAX_ERROR",
                format!("Invalid script syntax: {err}"),
            ));
        }
        if spec.expression.chars().count() > MAX_EXPRESSION_LENGTH {
            issues.push(ValidationIssue::warning(
                "expression",
                "SCRIPT_PERFORMANCE_WARNING",
                "Very long scripts may impact performance",
            ));
        }
        issues
    }

    fn transform(spec: &ColumnSpec) -> Vec<ValidationIssue> {
        if spec.transform.is_none() {
            vec![ValidationIssue::error(
                "transform",
                "TRANSFORM_TYPE_REQUIRED",
                "Transform type is required for transform columns",
            )]
        } else {
            Vec::new()
        }
    }
}

impl fmt::Debug for ExpressionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionRule").finish_non_exhaustive()
    }
}

impl ValidationRule for ExpressionRule {
    fn validate(&self, spec: &ColumnSpec, _context: &ValidationContext) -> Vec<ValidationIssue> {
        if is_blank(&spec.expression) {
            return Vec::new();
        }
        match spec.kind {
            ColumnKind::Field => Self::field(spec),
            ColumnKind::Script => self.script(spec),
            ColumnKind::Transform => Self::transform(spec),
        }
    }
}

/// Cross-field checks: stray transforms, width range and target views.
#[derive(Debug, Default)]
pub struct ConsistencyRule;

impl ValidationRule for ConsistencyRule {
    fn validate(&self, spec: &ColumnSpec, _context: &ValidationContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if spec.kind != ColumnKind::Transform && spec.transform.is_some() {
            issues.push(ValidationIssue::warning(
                "transform",
                "TRANSFORM_INCONSISTENT",
                format!("Transform specified but the column kind is {}", spec.kind),
            ));
        }
        match spec.width {
            Some(width) if width <= 0 => {
                issues.push(ValidationIssue::error("width", "WIDTH_INVALID", "Width must be positive"));
            }
            Some(width) if width > MAX_WIDTH => {
                issues.push(ValidationIssue::warning(
                    "width",
                    "WIDTH_TOO_LARGE",
                    "Very wide columns may impact the layout",
                ));
            }
            _ => {}
        }

        if parse_add_to(&spec.add_to).is_empty() {
            issues.push(ValidationIssue::warning(
                "add_to",
                "NO_VIEWS_SELECTED",
                "Column will not be visible in any view",
            ));
        }
        let known = ViewId::defaults();
        let mut unknown: Vec<String> = spec
            .add_to
            .split(',')
            .map(|token| token.trim().to_ascii_uppercase())
            .filter(|token| !token.is_empty() && !known.iter().any(|view| view.as_str() == token.as_str()))
            .collect();
        unknown.sort();
        unknown.dedup();
        if !unknown.is_empty() {
            issues.push(ValidationIssue::warning(
                "add_to",
                "UNKNOWN_VIEWS",
                format!("Unknown views in add_to: {}", unknown.join(", ")),
            ));
        }
        issues
    }
}

/// Runs the validation rules over specs.
pub struct ColumnSpecValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl ColumnSpecValidator {
    /// Validator with the standard rules; scripts are checked with
    /// `evaluator`.
    pub fn new(evaluator: Rc<dyn ScriptEvaluator>) -> Self {
        ColumnSpecValidator {
            rules: vec![
                Box::new(RequiredFieldRule),
                Box::new(UniqueKeyRule),
                Box::new(ExpressionRule::new(evaluator)),
                Box::new(ConsistencyRule),
            ],
        }
    }

    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    pub fn validate(&self, spec: &ColumnSpec, context: &ValidationContext) -> ValidationReport {
        ValidationReport {
            issues: self
                .rules
                .iter()
                .flat_map(|rule| rule.validate(spec, context))
                .collect(),
        }
    }

    /// Validates a batch, each spec against the keys of the others.
    ///
    /// Reports are keyed by spec key; specs without one are reported as
    /// `<unnamed:N>` with their position.
    pub fn validate_multiple(&self, specs: &[ColumnSpec]) -> BTreeMap<String, ValidationReport> {
        specs
            .iter()
            .enumerate()
            .map(|(position, spec)| {
                let others = specs
                    .iter()
                    .enumerate()
                    .filter(|(other, s)| *other != position && !is_blank(&s.key))
                    .map(|(_, s)| s.key.clone());
                let context = ValidationContext::with_existing_keys(others);
                let name = if is_blank(&spec.key) {
                    format!("<unnamed:{position}>")
                } else {
                    spec.key.clone()
                };
                (name, self.validate(spec, &context))
            })
            .collect()
    }
}

impl fmt::Debug for ColumnSpecValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnSpecValidator")
            .field("rules", &self.rules.len())
            .finish()
    }
}
