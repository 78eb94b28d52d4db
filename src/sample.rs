//! Sample catalog for trying the calculator without an exported catalog

use rusqlite::Connection;

use crate::db;
use crate::error::CatalogError;
use crate::models::{BarCrafting, CraftAlternative, LevelRange, Material, ResourceRef};

fn gathered(name: &str, professions: &[&str], level: u32, quantity: u32, category: &str) -> Material {
    Material {
        id: Some(format!("sample-{}", name.to_lowercase().replace(' ', "-"))),
        name: name.to_string(),
        quantity: Some(quantity),
        profession: professions.first().map(|p| p.to_string()),
        professions: professions.iter().skip(1).map(|p| p.to_string()).collect(),
        level_range: Some(LevelRange::Number(level)),
        category_id: Some(category.to_string()),
        ..Default::default()
    }
}

fn input(name: &str, per_bar: u32) -> ResourceRef {
    ResourceRef {
        name: name.to_string(),
        material_id: Some(format!("sample-{}", name.to_lowercase().replace(' ', "-"))),
        icon_name: None,
        quantity_per_bar: Some(per_bar),
    }
}

fn crafted(
    name: &str,
    profession: &str,
    level: u32,
    quantity: u32,
    primary: ResourceRef,
    secondary: Option<ResourceRef>,
    output: u32,
) -> Material {
    Material {
        is_bar: true,
        bar_crafting: Some(BarCrafting {
            primary_resource: primary,
            has_secondary_resource: secondary.is_some(),
            secondary_resource: secondary,
            output_quantity: Some(output),
            craft_alternatives: Vec::new(),
        }),
        ..gathered(name, &[profession], level, quantity, "bars")
    }
}

/// The sample materials, in catalog order
pub fn sample_materials() -> Vec<Material> {
    let mut bronze = crafted(
        "Bronze Bar",
        "Blacksmithing",
        125,
        40,
        input("Copper Ore", 2),
        Some(input("Tin Ore", 1)),
        1,
    );
    if let Some(recipe) = bronze.bar_crafting.as_mut() {
        recipe.craft_alternatives.push(CraftAlternative {
            resource: input("Copper Bar", 1),
            is_preferred: false,
        });
    }

    vec![
        gathered("Rough Stone", &["Blacksmithing", "Engineering"], 65, 40, "stone"),
        gathered("Copper Ore", &["Blacksmithing", "Mining"], 75, 5, "ore"),
        crafted("Copper Bar", "Blacksmithing", 75, 20, input("Copper Ore", 1), None, 1),
        gathered("Tin Ore", &["Blacksmithing"], 125, 0, "ore"),
        bronze,
        gathered("Iron Ore", &["Blacksmithing"], 175, 0, "ore"),
        gathered("Coal", &["Blacksmithing"], 200, 10, "reagent"),
        crafted(
            "Steel Bar",
            "Blacksmithing",
            200,
            30,
            input("Iron Ore", 1),
            Some(input("Coal", 1)),
            1,
        ),
        gathered("Thorium Ore", &["Blacksmithing"], 300, 0, "ore"),
        crafted("Thorium Bar", "Blacksmithing", 300, 60, input("Thorium Ore", 1), None, 1),
        crafted(
            "Rough Blasting Powder",
            "Engineering",
            75,
            60,
            input("Rough Stone", 1),
            None,
            1,
        ),
        gathered("Linen Cloth", &["Tailoring"], 75, 80, "cloth"),
        gathered("Coarse Thread", &["Tailoring"], 75, 30, "reagent"),
    ]
}

/// Replace the catalog with the sample materials; returns how many were stored
pub fn load_sample_data(conn: &Connection) -> Result<usize, CatalogError> {
    let tx = conn.unchecked_transaction()?;
    db::clear_materials(&tx)?;

    let materials = sample_materials();
    for material in &materials {
        db::write_material(&tx, material)?;
    }

    tx.commit()?;
    Ok(materials.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::calculate_resources;
    use crate::config::CalculatorConfig;
    use crate::db::SqliteCatalog;
    use crate::models::ProfessionRequest;

    #[test]
    fn test_sample_loads_and_calculates() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let count = load_sample_data(&conn).unwrap();
        assert_eq!(count, sample_materials().len());

        let requests = vec![ProfessionRequest::parse_pair("Blacksmithing:125").unwrap()];
        let result = calculate_resources(
            &SqliteCatalog::new(&conn),
            &requests,
            &CalculatorConfig::default(),
        )
        .unwrap();

        let copper = result.iter().find(|e| e.name() == "Copper Ore").unwrap();
        // Copper Bar pulls 20, Bronze Bar pulls 80; the larger wins
        assert_eq!(copper.quantity(), 80);
        assert_eq!(copper.crafted_for.len(), 2);
        let tin = result.iter().find(|e| e.name() == "Tin Ore").unwrap();
        assert_eq!(tin.quantity(), 40);
        assert!(result.iter().all(|e| e.name() != "Iron Ore"));
    }
}
