use crate::config::{BindingsConfig, CardinalityConfig, UnresolvedBindings};

/// Compiled validation plan - list of steps to execute
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationPlan {
    pub steps: Vec<Step>,
    /// Stop collecting once this many violations were found
    pub max_violations: Option<usize>,
    /// Descend into inline resources (`contained`, `Bundle.entry.resource`)
    pub recurse_resources: bool,
}

impl Default for ValidationPlan {
    fn default() -> Self {
        Self {
            steps: vec![
                Step::Cardinality(CardinalityPlan {}),
                Step::Bindings(BindingPlan {
                    unresolved: UnresolvedBindings::Advisory,
                }),
            ],
            max_violations: None,
            recurse_resources: true,
        }
    }
}

impl ValidationPlan {
    pub fn cardinality(&self) -> Option<&CardinalityPlan> {
        self.steps.iter().find_map(|step| match step {
            Step::Cardinality(plan) => Some(plan),
            _ => None,
        })
    }

    pub fn bindings(&self) -> Option<&BindingPlan> {
        self.steps.iter().find_map(|step| match step {
            Step::Bindings(plan) => Some(plan),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Cardinality(CardinalityPlan),
    Bindings(BindingPlan),
}

// ============================================================================
// Step Plans
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CardinalityPlan {}

impl From<&CardinalityConfig> for CardinalityPlan {
    fn from(_cfg: &CardinalityConfig) -> Self {
        Self {}
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindingPlan {
    /// What to do with required bindings whose codes cannot be determined
    pub unresolved: UnresolvedBindings,
}

impl From<&BindingsConfig> for BindingPlan {
    fn from(cfg: &BindingsConfig) -> Self {
        Self {
            unresolved: cfg.unresolved,
        }
    }
}
