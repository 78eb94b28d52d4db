//! Calculation settings

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Upper bound on crafting chain passes, guards against cyclic recipes
pub const MAX_EXPANSION_DEPTH: usize = 16;

/// How demand from a craft is combined with what a resource already carries.
///
/// `Max` keeps the larger of the two, so crafted items competing for the same
/// resource do not stack. This matches the figures the back-office has always
/// produced; `Sum` adds them. Pending product-owner confirmation of which one
/// the business wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionPolicy {
    #[default]
    Max,
    Sum,
}

pub const DEFAULT_EXPANSION_POLICY: ExpansionPolicy = ExpansionPolicy::Max;

impl ExpansionPolicy {
    pub fn combine(self, current: u32, needed: u32) -> u32 {
        match self {
            ExpansionPolicy::Max => current.max(needed),
            ExpansionPolicy::Sum => current.saturating_add(needed),
        }
    }
}

impl FromStr for ExpansionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "max" => Ok(ExpansionPolicy::Max),
            "sum" => Ok(ExpansionPolicy::Sum),
            other => Err(format!("unknown expansion policy '{}' (expected max or sum)", other)),
        }
    }
}

impl fmt::Display for ExpansionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpansionPolicy::Max => write!(f, "max"),
            ExpansionPolicy::Sum => write!(f, "sum"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorConfig {
    pub policy: ExpansionPolicy,
    /// Crafting chain passes; 1 expands each crafted item once
    pub max_depth: usize,
    /// Reject empty requests instead of answering with an empty list
    pub strict: bool,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            policy: DEFAULT_EXPANSION_POLICY,
            max_depth: 1,
            strict: true,
        }
    }
}

impl CalculatorConfig {
    pub fn with_policy(mut self, policy: ExpansionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn permissive(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Depth clamped to `1..=MAX_EXPANSION_DEPTH`
    pub fn depth(&self) -> usize {
        self.max_depth.clamp(1, MAX_EXPANSION_DEPTH)
    }
}
