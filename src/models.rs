//! Data models for catalog materials and calculation results

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static LEVEL_UPPER_BOUND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*$").expect("level pattern is valid"));

/// Skill bracket of a material or request: `300`, `"300"` or `"225-300"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelRange {
    Number(u32),
    Text(String),
}

impl LevelRange {
    /// Comparable level: the number itself, or the last integer of a text range
    pub fn upper_bound(&self) -> Option<u32> {
        match self {
            LevelRange::Number(n) => Some(*n),
            LevelRange::Text(text) => LEVEL_UPPER_BOUND
                .captures(text.trim())
                .and_then(|cap| cap[1].parse().ok()),
        }
    }
}

impl fmt::Display for LevelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelRange::Number(n) => write!(f, "{}", n),
            LevelRange::Text(text) => write!(f, "{}", text),
        }
    }
}

/// A recipe input: which material a craft consumes and how much of it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_per_bar: Option<u32>,
}

impl ResourceRef {
    pub fn is_named(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CraftAlternative {
    #[serde(flatten)]
    pub resource: ResourceRef,
    #[serde(default)]
    pub is_preferred: bool,
}

/// Recipe of a crafted item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarCrafting {
    #[serde(default)]
    pub primary_resource: ResourceRef,
    #[serde(default)]
    pub has_secondary_resource: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_resource: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub craft_alternatives: Vec<CraftAlternative>,
}

impl BarCrafting {
    /// Resources consumed by one craft, primary first.
    ///
    /// Unnamed resources are left out, and the secondary resource only counts
    /// when `hasSecondaryResource` is set.
    pub fn inputs(&self) -> Vec<&ResourceRef> {
        let mut inputs = Vec::with_capacity(2);
        if self.primary_resource.is_named() {
            inputs.push(&self.primary_resource);
        }
        if self.has_secondary_resource {
            if let Some(secondary) = self.secondary_resource.as_ref().filter(|r| r.is_named()) {
                inputs.push(secondary);
            }
        }
        inputs
    }

    pub fn preferred_alternative(&self) -> Option<&CraftAlternative> {
        self.craft_alternatives.iter().find(|alt| alt.is_preferred)
    }
}

/// A catalog entry: either a raw gatherable resource or a crafted item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub professions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_range: Option<LevelRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
    #[serde(default)]
    pub is_bar: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_crafting: Option<BarCrafting>,
}

impl Material {
    pub fn level(&self) -> Option<u32> {
        self.level_range.as_ref().and_then(LevelRange::upper_bound)
    }

    /// All professions this material is listed under, deduplicated
    pub fn all_professions(&self) -> Vec<&str> {
        let mut all: Vec<&str> = Vec::new();
        for p in self.profession.iter().chain(self.professions.iter()) {
            let p = p.trim();
            if !p.is_empty() && !all.contains(&p) {
                all.push(p);
            }
        }
        all
    }

    pub fn requires_profession(&self, profession: &str) -> bool {
        self.all_professions().contains(&profession)
    }

    /// The recipe, only when the material is flagged as crafted
    pub fn recipe(&self) -> Option<&BarCrafting> {
        if self.is_bar {
            self.bar_crafting.as_ref()
        } else {
            None
        }
    }
}

/// One profession selection as submitted by a caller; either field may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionRequest {
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub level_range: Option<LevelRange>,
}

impl ProfessionRequest {
    pub fn new(profession: impl Into<String>, level_range: LevelRange) -> Self {
        Self {
            profession: Some(profession.into()),
            level_range: Some(level_range),
        }
    }

    /// Parse a `Profession:level` pair, e.g. `Blacksmithing:300`
    pub fn parse_pair(pair: &str) -> Option<Self> {
        let (profession, level) = pair.rsplit_once(':')?;
        Some(Self::new(
            profession.trim(),
            LevelRange::Text(level.trim().to_string()),
        ))
    }

    /// A usable selection, or `None` when the request is malformed
    pub fn validate(&self) -> Option<ProfessionSelection> {
        let profession = self.profession.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
        let max_level = self.level_range.as_ref()?.upper_bound()?;
        Some(ProfessionSelection {
            profession: profession.to_string(),
            max_level,
        })
    }
}

/// A validated profession selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfessionSelection {
    pub profession: String,
    pub max_level: u32,
}

/// Which crafted item pulled demand onto a resource, and how much
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftedFor {
    pub name: String,
    pub quantity: u32,
}

/// A merged and expanded material in a calculation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandEntry {
    #[serde(flatten)]
    pub material: Material,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crafted_for: Vec<CraftedFor>,
}

impl DemandEntry {
    pub fn new(material: Material, quantity: u32) -> Self {
        let mut material = material;
        material.quantity = Some(quantity);
        Self {
            material,
            crafted_for: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.material.name
    }

    pub fn quantity(&self) -> u32 {
        self.material.quantity.unwrap_or_default()
    }

    pub fn set_quantity(&mut self, quantity: u32) {
        self.material.quantity = Some(quantity);
    }

    pub fn is_crafted(&self) -> bool {
        self.material.recipe().is_some()
    }

    /// Units pulled onto this entry by crafted items
    pub fn crafted_total(&self) -> u64 {
        self.crafted_for.iter().map(|c| u64::from(c.quantity)).sum()
    }
}
