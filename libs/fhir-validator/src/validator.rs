use crate::config::ValidatorConfig;
use crate::error::{ConfigError, Result, ValidatorError};
use crate::plan::{Step, ValidationPlan};
use crate::resolver::ValueSetResolver;
use crate::steps::{self, field_path};
use crate::violation::Violation;
use ferrum_models::{TypedRecord, Value};
use ferrum_schema::{FieldKind, FieldSpec, RecordTypeSpec, SchemaRegistry, TypeRef};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Reusable validator - borrows the registry, owns the plan and resolver
#[derive(Clone)]
pub struct Validator<'r> {
    registry: &'r SchemaRegistry,
    plan: ValidationPlan,
    resolver: Option<Arc<dyn ValueSetResolver>>,
}

impl<'r> Validator<'r> {
    /// Validator running the default plan: cardinality and required bindings,
    /// descending into inline resources.
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self::with_plan(registry, ValidationPlan::default())
    }

    pub fn with_plan(registry: &'r SchemaRegistry, plan: ValidationPlan) -> Self {
        Self {
            registry,
            plan,
            resolver: None,
        }
    }

    pub fn from_config(
        registry: &'r SchemaRegistry,
        config: &ValidatorConfig,
    ) -> std::result::Result<Self, ConfigError> {
        let plan = config.compile()?;
        Ok(Self::with_plan(registry, plan))
    }

    /// Consult `resolver` for required bindings without inline codes.
    pub fn with_resolver(mut self, resolver: impl ValueSetResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn with_shared_resolver(mut self, resolver: Arc<dyn ValueSetResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Validate a record against the spec registered for its type.
    ///
    /// Violations are collected, never raised. Errors are reserved for types
    /// the registry does not know and for nested records whose type differs
    /// from the one their field declares.
    pub fn validate(&self, record: &TypedRecord) -> Result<Vec<Violation>> {
        let spec = self.registry.lookup(record.type_name())?;
        self.validate_against(record, &spec)
    }

    /// Validate a record against an explicit spec.
    ///
    /// Fails with [`ValidatorError::SpecMismatch`] when the record is not of
    /// the spec's type.
    pub fn validate_against(
        &self,
        record: &TypedRecord,
        spec: &RecordTypeSpec,
    ) -> Result<Vec<Violation>> {
        Ok(self.run(record, spec)?.violations)
    }

    /// Validate and render the result as an outcome with issues.
    pub fn outcome(&self, record: &TypedRecord) -> Result<ValidationOutcome> {
        let spec = self.registry.lookup(record.type_name())?;
        let findings = self.run(record, &spec)?;

        let mut issues: Vec<ValidationIssue> =
            findings.violations.iter().map(Violation::to_issue).collect();
        issues.extend(findings.advisories);

        Ok(ValidationOutcome {
            resource_type: record.type_name().to_string(),
            valid: findings.violations.is_empty(),
            violations: findings.violations,
            issues,
        })
    }

    pub fn validate_batch(&self, records: &[TypedRecord]) -> Result<Vec<ValidationOutcome>> {
        records.iter().map(|r| self.outcome(r)).collect()
    }

    pub fn plan(&self) -> &ValidationPlan {
        &self.plan
    }

    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    fn run(&self, record: &TypedRecord, spec: &RecordTypeSpec) -> Result<Findings> {
        ValidationRun::new(self.registry, &self.plan, self.resolver.as_deref())
            .execute(record, spec)
    }
}

impl std::fmt::Debug for Validator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("plan", &self.plan)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Violations and advisory issues collected during a run
#[derive(Debug, Default)]
pub(crate) struct Findings {
    violations: Vec<Violation>,
    advisories: Vec<ValidationIssue>,
    limit: Option<usize>,
}

impl Findings {
    fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub(crate) fn push(&mut self, violation: Violation) {
        if !self.is_full() {
            self.violations.push(violation);
        }
    }

    pub(crate) fn advise(&mut self, issue: ValidationIssue) {
        self.advisories.push(issue);
    }

    fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.violations.len() >= limit)
    }
}

/// Record nested in a field occurrence, with the spec name it is checked against
struct Nested<'a> {
    type_name: &'a str,
    record: &'a TypedRecord,
    inline_resource: bool,
}

/// Short-lived validation execution
struct ValidationRun<'a> {
    registry: &'a SchemaRegistry,
    plan: &'a ValidationPlan,
    resolver: Option<&'a dyn ValueSetResolver>,
    findings: Findings,
}

impl<'a> ValidationRun<'a> {
    fn new(
        registry: &'a SchemaRegistry,
        plan: &'a ValidationPlan,
        resolver: Option<&'a dyn ValueSetResolver>,
    ) -> Self {
        Self {
            registry,
            plan,
            resolver,
            findings: Findings::new(plan.max_violations),
        }
    }

    fn execute(mut self, record: &TypedRecord, spec: &RecordTypeSpec) -> Result<Findings> {
        self.walk(record, spec, record.type_name())?;

        tracing::debug!(
            record = spec.name(),
            violations = self.findings.violations.len(),
            advisories = self.findings.advisories.len(),
            "validation finished"
        );
        Ok(self.findings)
    }

    /// Depth-first over the fields in declaration order
    fn walk(&mut self, record: &TypedRecord, spec: &RecordTypeSpec, path: &str) -> Result<()> {
        if record.type_name() != spec.name() {
            return Err(ValidatorError::SpecMismatch {
                record: record.type_name().to_string(),
                spec: spec.name().to_string(),
            });
        }

        for field in spec.fields() {
            if self.findings.is_full() {
                break;
            }

            let values = record.get(&field.name);
            let plan = self.plan;
            for step in &plan.steps {
                self.execute_step(step, record, field, values, path);
            }

            for (index, value) in values.iter().enumerate() {
                let Some(nested) = nested(field, value) else {
                    continue;
                };
                if nested.inline_resource && !self.plan.recurse_resources {
                    continue;
                }

                let nested_spec = self.registry.lookup(nested.type_name)?;
                let location = field_path(path, &field.name, field.is_repeating().then_some(index));
                self.walk(nested.record, &nested_spec, &location)?;
            }
        }

        Ok(())
    }

    fn execute_step(
        &mut self,
        step: &Step,
        record: &TypedRecord,
        field: &FieldSpec,
        values: &[Value],
        path: &str,
    ) {
        match step {
            Step::Cardinality(_) => {
                steps::cardinality::check_field(record, field, values, path, &mut self.findings)
            }
            Step::Bindings(plan) => {
                let Some(binding) = &field.binding else {
                    return;
                };
                for (index, value) in values.iter().enumerate() {
                    let location = field_path(path, &field.name, field.is_repeating().then_some(index));
                    let value = match value {
                        Value::Choice(choice) => choice.value.as_ref(),
                        other => other,
                    };
                    steps::bindings::check_value(
                        field,
                        binding,
                        value,
                        &location,
                        plan,
                        self.resolver,
                        &mut self.findings,
                    );
                }
            }
        }
    }
}

fn nested<'a>(field: &'a FieldSpec, value: &'a Value) -> Option<Nested<'a>> {
    let (type_name, record, inline_resource) = match (&field.kind, value) {
        (FieldKind::Record(name), Value::Record(record)) => (name.as_str(), record, false),
        (FieldKind::Reference(_), Value::Record(record)) => ("Reference", record, false),
        (FieldKind::Resource, Value::Record(record)) => (record.type_name(), record, true),
        (FieldKind::Choice(_), Value::Choice(choice)) => {
            match (field.alternative(&choice.type_code)?, choice.value.as_ref()) {
                (TypeRef::Complex(name), Value::Record(record)) => (name.as_str(), record, false),
                _ => return None,
            }
        }
        _ => return None,
    };
    Some(Nested {
        type_name,
        record,
        inline_resource,
    })
}

/// Validation result for a single resource
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub resource_type: String,
    pub valid: bool,
    pub violations: Vec<Violation>,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    pub fn has_errors(&self) -> bool {
        !self.valid
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .count()
    }

    pub fn to_operation_outcome(&self) -> JsonValue {
        serde_json::json!({
            "resourceType": "OperationOutcome",
            "issue": self.issues.iter().map(|i| i.to_json()).collect::<Vec<_>>()
        })
    }
}

/// Individual validation issue
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: IssueCode,
    pub diagnostics: String,
    pub location: Option<String>,
    pub expression: Option<Vec<String>>,
}

impl ValidationIssue {
    pub fn error(code: IssueCode, diagnostics: String) -> Self {
        Self {
            severity: IssueSeverity::Error,
            code,
            diagnostics,
            location: None,
            expression: None,
        }
    }

    pub fn information(code: IssueCode, diagnostics: String) -> Self {
        Self {
            severity: IssueSeverity::Information,
            code,
            diagnostics,
            location: None,
            expression: None,
        }
    }

    pub fn with_location(mut self, location: String) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_expression(mut self, expression: Vec<String>) -> Self {
        self.expression = Some(expression);
        self
    }

    pub fn to_json(&self) -> JsonValue {
        let mut issue = serde_json::json!({
            "severity": self.severity.to_string().to_lowercase(),
            "code": self.code.to_string(),
            "diagnostics": self.diagnostics,
        });

        if let Some(ref loc) = self.location {
            issue["location"] = serde_json::json!([loc]);
        }

        if let Some(ref expr) = self.expression {
            issue["expression"] = serde_json::json!(expr);
        }

        issue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Information,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "Error"),
            Self::Information => write!(f, "Information"),
        }
    }
}

/// Subset of the FHIR `issue-type` codes produced here
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCode {
    Structure,
    Required,
    CodeInvalid,
    NotSupported,
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Structure => "structure",
            Self::Required => "required",
            Self::CodeInvalid => "code-invalid",
            Self::NotSupported => "not-supported",
        };
        write!(f, "{}", s)
    }
}
