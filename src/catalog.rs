//! Catalog access used by the demand collector

use crate::error::CatalogError;
use crate::models::Material;

/// Query for materials a profession needs up to a level (inclusive)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialFilter {
    pub profession: String,
    pub max_level: u32,
}

impl MaterialFilter {
    pub fn new(profession: impl Into<String>, max_level: u32) -> Self {
        Self {
            profession: profession.into(),
            max_level,
        }
    }

    /// Materials without a readable level never match
    pub fn matches(&self, material: &Material) -> bool {
        material.requires_profession(&self.profession)
            && material.level().is_some_and(|level| level <= self.max_level)
    }
}

/// Read-only source of catalog materials
pub trait Catalog {
    fn find_materials(&self, filter: &MaterialFilter) -> Result<Vec<Material>, CatalogError>;
}

/// Catalog held in memory, in insertion order
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    materials: Vec<Material>,
}

impl InMemoryCatalog {
    pub fn new(materials: Vec<Material>) -> Self {
        Self { materials }
    }
}

impl Catalog for InMemoryCatalog {
    fn find_materials(&self, filter: &MaterialFilter) -> Result<Vec<Material>, CatalogError> {
        Ok(self
            .materials
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LevelRange;

    fn material(name: &str, profession: &str, level: u32) -> Material {
        Material {
            name: name.into(),
            profession: Some(profession.into()),
            level_range: Some(LevelRange::Number(level)),
            ..Default::default()
        }
    }

    #[test]
    fn test_level_bound_is_inclusive() {
        let catalog = InMemoryCatalog::new(vec![
            material("Copper Ore", "Blacksmithing", 75),
            material("Iron Ore", "Blacksmithing", 150),
            material("Thorium Ore", "Blacksmithing", 250),
        ]);

        let found = catalog
            .find_materials(&MaterialFilter::new("Blacksmithing", 150))
            .unwrap();
        let names: Vec<&str> = found.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Copper Ore", "Iron Ore"]);
    }

    #[test]
    fn test_filter_by_profession() {
        let catalog = InMemoryCatalog::new(vec![
            material("Copper Ore", "Blacksmithing", 75),
            material("Linen Cloth", "Tailoring", 75),
        ]);

        let found = catalog.find_materials(&MaterialFilter::new("Tailoring", 300)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Linen Cloth");
    }

    #[test]
    fn test_material_without_level_never_matches() {
        let mut m = material("Mystery", "Blacksmithing", 1);
        m.level_range = Some(LevelRange::Text("soon".into()));
        assert!(!MaterialFilter::new("Blacksmithing", 300).matches(&m));
        m.level_range = None;
        assert!(!MaterialFilter::new("Blacksmithing", 300).matches(&m));
    }
}
