//! Validator configuration
//!
//! A [`ValidatorConfig`] is plain data: build it from a [`Preset`], the
//! builder, YAML or JSON, then [`compile`](ValidatorConfig::compile) it into a
//! [`ValidationPlan`].

use crate::error::ConfigError;
use crate::plan::{BindingPlan, CardinalityPlan, Step, ValidationPlan};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    /// Everything on, unresolvable bindings reported as information
    Authoring,
    /// Everything on, unresolvable bindings ignored, capped report
    Ingestion,
    /// Top-level record only, unresolvable bindings ignored
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedBindings {
    /// Logged and reported as an information issue in the outcome
    Advisory,
    /// Skipped silently
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardinalityConfig {
    pub enabled: bool,
}

impl Default for CardinalityConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingsConfig {
    pub enabled: bool,
    pub unresolved: UnresolvedBindings,
}

impl Default for BindingsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            unresolved: UnresolvedBindings::Advisory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub cardinality: CardinalityConfig,
    pub bindings: BindingsConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_violations: Option<usize>,
    pub recurse_resources: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self::preset(Preset::Authoring)
    }
}

impl ValidatorConfig {
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Authoring => Self {
                cardinality: CardinalityConfig::default(),
                bindings: BindingsConfig::default(),
                max_violations: None,
                recurse_resources: true,
            },
            Preset::Ingestion => Self {
                cardinality: CardinalityConfig::default(),
                bindings: BindingsConfig {
                    enabled: true,
                    unresolved: UnresolvedBindings::Ignore,
                },
                max_violations: Some(100),
                recurse_resources: true,
            },
            Preset::Server => Self {
                cardinality: CardinalityConfig::default(),
                bindings: BindingsConfig {
                    enabled: true,
                    unresolved: UnresolvedBindings::Ignore,
                },
                max_violations: Some(1000),
                recurse_resources: false,
            },
        }
    }

    pub fn builder() -> ValidatorConfigBuilder {
        ValidatorConfigBuilder::default()
    }

    pub fn from_yaml(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Turn the configuration into an executable plan.
    pub fn compile(&self) -> Result<ValidationPlan, ConfigError> {
        if self.max_violations == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "max_violations must be greater than zero".to_string(),
            ));
        }

        let mut steps = Vec::new();
        if self.cardinality.enabled {
            steps.push(Step::Cardinality(CardinalityPlan::from(&self.cardinality)));
        }
        if self.bindings.enabled {
            steps.push(Step::Bindings(BindingPlan::from(&self.bindings)));
        }
        if steps.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "at least one of cardinality or bindings must be enabled".to_string(),
            ));
        }

        Ok(ValidationPlan {
            steps,
            max_violations: self.max_violations,
            recurse_resources: self.recurse_resources,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidatorConfigBuilder {
    config: ValidatorConfig,
}

impl ValidatorConfigBuilder {
    pub fn preset(mut self, preset: Preset) -> Self {
        self.config = ValidatorConfig::preset(preset);
        self
    }

    pub fn cardinality(mut self, enabled: bool) -> Self {
        self.config.cardinality.enabled = enabled;
        self
    }

    pub fn bindings(mut self, enabled: bool) -> Self {
        self.config.bindings.enabled = enabled;
        self
    }

    pub fn unresolved_bindings(mut self, handling: UnresolvedBindings) -> Self {
        self.config.bindings.unresolved = handling;
        self
    }

    pub fn max_violations(mut self, max: usize) -> Self {
        self.config.max_violations = Some(max);
        self
    }

    pub fn recurse_resources(mut self, recurse: bool) -> Self {
        self.config.recurse_resources = recurse;
        self
    }

    pub fn build(self) -> ValidatorConfig {
        self.config
    }
}
