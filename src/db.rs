//! Database schema and operations
//!
//! Materials are stored as JSON documents, with the fields the calculator
//! filters on (name, level, professions) copied into indexed columns.

use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

use crate::catalog::{Catalog, MaterialFilter};
use crate::error::CatalogError;
use crate::models::Material;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), CatalogError> {
    conn.execute_batch(
        r#"
        -- Material documents, one JSON body per catalog entry.
        -- seq is the catalog order: set on first insert, kept on update.
        CREATE TABLE IF NOT EXISTS materials (
            id TEXT PRIMARY KEY,
            seq INTEGER NOT NULL,
            name TEXT NOT NULL,
            level_max INTEGER,
            is_bar INTEGER NOT NULL DEFAULT 0,
            body TEXT NOT NULL
        );

        -- Professions a material is required by (profession + professions[])
        CREATE TABLE IF NOT EXISTS material_professions (
            material_id TEXT NOT NULL,
            profession TEXT NOT NULL,
            PRIMARY KEY (material_id, profession)
        );

        CREATE INDEX IF NOT EXISTS idx_materials_name ON materials(name);
        CREATE INDEX IF NOT EXISTS idx_materials_seq ON materials(seq);
        CREATE INDEX IF NOT EXISTS idx_material_professions_profession
            ON material_professions(profession);
        "#,
    )?;
    Ok(())
}

/// Document id of a material.
///
/// Documents without an id are keyed by name, professions and level range, so
/// same-name materials of different professions stay separate documents.
pub fn document_id(material: &Material) -> String {
    if let Some(id) = material.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }

    let level = material
        .level_range
        .as_ref()
        .map(|l| l.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}|{}|{}",
        material.name,
        material.all_professions().join(","),
        level.trim()
    )
}

/// Write one document and its profession rows on the caller's connection.
///
/// Does not open a transaction; callers wrap it in one.
pub fn write_material(conn: &Connection, material: &Material) -> Result<String, CatalogError> {
    let id = document_id(material);
    let body = serde_json::to_string(material).map_err(|source| CatalogError::Document {
        id: id.clone(),
        source,
    })?;

    conn.execute(
        "INSERT INTO materials (id, seq, name, level_max, is_bar, body)
         VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM materials), ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             level_max = excluded.level_max,
             is_bar = excluded.is_bar,
             body = excluded.body",
        (&id, &material.name, material.level(), material.is_bar, &body),
    )?;
    conn.execute(
        "DELETE FROM material_professions WHERE material_id = ?1",
        [&id],
    )?;
    for profession in material.all_professions() {
        conn.execute(
            "INSERT INTO material_professions (material_id, profession) VALUES (?1, ?2)",
            (&id, profession),
        )?;
    }
    Ok(id)
}

/// Insert or replace a material document
pub fn upsert_material(conn: &Connection, material: &Material) -> Result<String, CatalogError> {
    let tx = conn.unchecked_transaction()?;
    let id = write_material(&tx, material)?;
    tx.commit()?;
    Ok(id)
}

/// Remove a material document; returns whether it existed
pub fn delete_material(conn: &Connection, id: &str) -> Result<bool, CatalogError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM material_professions WHERE material_id = ?1", [id])?;
    let removed = tx.execute("DELETE FROM materials WHERE id = ?1", [id])?;
    tx.commit()?;
    Ok(removed > 0)
}

/// Clear all material documents (for re-import)
pub fn clear_materials(conn: &Connection) -> Result<(), CatalogError> {
    conn.execute_batch(
        r#"
        DELETE FROM material_professions;
        DELETE FROM materials;
        "#,
    )?;
    Ok(())
}

fn parse_document(id: String, body: String) -> Result<Material, CatalogError> {
    serde_json::from_str(&body).map_err(|source| CatalogError::Document { id, source })
}

fn collect_documents(
    stmt: &mut rusqlite::Statement<'_>,
    params: impl rusqlite::Params,
) -> Result<Vec<Material>, CatalogError> {
    let rows = stmt.query_map(params, |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut results = Vec::new();
    for row in rows {
        let (id, body) = row?;
        results.push(parse_document(id, body)?);
    }
    Ok(results)
}

/// Get all materials a profession needs up to (and including) a level
pub fn find_materials(
    conn: &Connection,
    profession: &str,
    max_level: u32,
) -> Result<Vec<Material>, CatalogError> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.body
         FROM materials m
         JOIN material_professions mp ON m.id = mp.material_id
         WHERE mp.profession = ?1 AND m.level_max IS NOT NULL AND m.level_max <= ?2
         ORDER BY m.seq",
    )?;
    collect_documents(&mut stmt, (profession, max_level))
}

/// Get the first material document with a given name
pub fn get_material_by_name(conn: &Connection, name: &str) -> Result<Option<Material>, CatalogError> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT id, body FROM materials WHERE name = ?1 ORDER BY seq LIMIT 1",
            [name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    row.map(|(id, body)| parse_document(id, body)).transpose()
}

/// List all materials, optionally limited to one profession
pub fn list_materials(
    conn: &Connection,
    profession: Option<&str>,
) -> Result<Vec<Material>, CatalogError> {
    match profession {
        Some(profession) => {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.body
                 FROM materials m
                 JOIN material_professions mp ON m.id = mp.material_id
                 WHERE mp.profession = ?1
                 ORDER BY m.level_max, m.name",
            )?;
            collect_documents(&mut stmt, [profession])
        }
        None => {
            let mut stmt =
                conn.prepare("SELECT id, body FROM materials ORDER BY level_max, name")?;
            collect_documents(&mut stmt, rusqlite::params![])
        }
    }
}

/// List all professions that have at least one material
pub fn list_professions(conn: &Connection) -> Result<Vec<String>, CatalogError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT profession FROM material_professions ORDER BY profession",
    )?;

    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Count stored material documents
pub fn count_materials(conn: &Connection) -> Result<usize, CatalogError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM materials", [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or_default())
}

/// Catalog backed by the SQLite material documents
pub struct SqliteCatalog<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCatalog<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl Catalog for SqliteCatalog<'_> {
    fn find_materials(&self, filter: &MaterialFilter) -> Result<Vec<Material>, CatalogError> {
        let materials = find_materials(self.conn, &filter.profession, filter.max_level)?;
        // the indexed columns are derived; re-check against the document itself
        Ok(materials
            .into_iter()
            .filter(|m| {
                let keep = filter.matches(m);
                if !keep {
                    warn!(material = %m.name, "stored document disagrees with its index, skipping");
                }
                keep
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LevelRange;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn material(name: &str, profession: &str, level: &str, quantity: u32) -> Material {
        Material {
            name: name.into(),
            quantity: Some(quantity),
            profession: Some(profession.into()),
            level_range: Some(LevelRange::Text(level.into())),
            ..Default::default()
        }
    }

    #[test]
    fn test_upsert_and_find_by_level() {
        let conn = conn();
        upsert_material(&conn, &material("Copper Ore", "Mining", "1-75", 20)).unwrap();
        upsert_material(&conn, &material("Iron Ore", "Mining", "125-175", 30)).unwrap();

        let found = find_materials(&conn, "Mining", 75).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Copper Ore");
        assert_eq!(found[0].quantity, Some(20));

        assert_eq!(find_materials(&conn, "Mining", 175).unwrap().len(), 2);
        assert!(find_materials(&conn, "Tailoring", 300).unwrap().is_empty());
    }

    #[test]
    fn test_upsert_replaces_document() {
        let conn = conn();
        let mut ore = material("Copper Ore", "Mining", "75", 20);
        ore.id = Some("ore-1".into());
        upsert_material(&conn, &ore).unwrap();

        ore.quantity = Some(40);
        ore.profession = Some("Blacksmithing".into());
        upsert_material(&conn, &ore).unwrap();

        assert_eq!(count_materials(&conn).unwrap(), 1);
        assert!(find_materials(&conn, "Mining", 300).unwrap().is_empty());
        let found = find_materials(&conn, "Blacksmithing", 300).unwrap();
        assert_eq!(found[0].quantity, Some(40));
    }

    #[test]
    fn test_materials_with_several_professions() {
        let conn = conn();
        let mut ore = material("Copper Ore", "Mining", "75", 5);
        ore.professions = vec!["Blacksmithing".into(), "Engineering".into()];
        upsert_material(&conn, &ore).unwrap();

        assert_eq!(
            list_professions(&conn).unwrap(),
            vec!["Blacksmithing", "Engineering", "Mining"]
        );
        assert_eq!(find_materials(&conn, "Engineering", 75).unwrap().len(), 1);
    }

    #[test]
    fn test_unleveled_material_is_never_found() {
        let conn = conn();
        upsert_material(&conn, &material("Mystery Ore", "Mining", "unknown", 1)).unwrap();

        assert!(find_materials(&conn, "Mining", 1000).unwrap().is_empty());
        assert_eq!(list_materials(&conn, Some("Mining")).unwrap().len(), 1);
    }

    #[test]
    fn test_get_and_delete() {
        let conn = conn();
        let id = upsert_material(&conn, &material("Tin Ore", "Mining", "65", 10)).unwrap();
        assert_eq!(id, "Tin Ore|Mining|65");

        assert!(get_material_by_name(&conn, "Tin Ore").unwrap().is_some());
        assert!(delete_material(&conn, &id).unwrap());
        assert!(get_material_by_name(&conn, "Tin Ore").unwrap().is_none());
        assert!(!delete_material(&conn, &id).unwrap());
    }

    #[test]
    fn test_corrupt_document_is_reported() {
        let conn = conn();
        conn.execute(
            "INSERT INTO materials (id, seq, name, level_max, is_bar, body) VALUES ('x', 1, 'Broken', 10, 0, '{not json')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO material_professions (material_id, profession) VALUES ('x', 'Mining')",
            [],
        )
        .unwrap();

        let err = SqliteCatalog::new(&conn)
            .find_materials(&MaterialFilter::new("Mining", 10))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Document { ref id, .. } if id == "x"));
    }

    #[test]
    fn test_clear_materials() {
        let conn = conn();
        upsert_material(&conn, &material("Coal", "Mining", "65", 1)).unwrap();
        clear_materials(&conn).unwrap();
        assert_eq!(count_materials(&conn).unwrap(), 0);
        assert!(list_professions(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_idless_documents_of_different_professions_stay_apart() {
        let conn = conn();
        let smith = upsert_material(&conn, &material("Copper Ore", "Blacksmithing", "75", 5)).unwrap();
        let eng = upsert_material(&conn, &material("Copper Ore", "Engineering", "75", 8)).unwrap();

        assert_ne!(smith, eng);
        assert_eq!(count_materials(&conn).unwrap(), 2);
        assert_eq!(find_materials(&conn, "Engineering", 300).unwrap()[0].quantity, Some(8));
    }

    #[test]
    fn test_update_keeps_catalog_order() {
        let conn = conn();
        let mut copper = material("Copper Ore", "Mining", "75", 5);
        copper.id = Some("copper".into());
        upsert_material(&conn, &copper).unwrap();
        upsert_material(&conn, &material("Tin Ore", "Mining", "75", 3)).unwrap();

        copper.quantity = Some(9);
        upsert_material(&conn, &copper).unwrap();

        let names: Vec<String> = find_materials(&conn, "Mining", 75)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Copper Ore", "Tin Ore"]);
        assert_eq!(get_material_by_name(&conn, "Copper Ore").unwrap().unwrap().quantity, Some(9));
    }

    fn block_profession(conn: &Connection, profession: &str) {
        conn.execute_batch(&format!(
            "CREATE TRIGGER block_profession BEFORE INSERT ON material_professions
             WHEN NEW.profession = '{}'
             BEGIN SELECT RAISE(ABORT, 'profession blocked'); END;",
            profession
        ))
        .unwrap();
    }

    #[test]
    fn test_failed_upsert_leaves_document_untouched() {
        let conn = conn();
        let mut ore = material("Copper Ore", "Mining", "75", 20);
        ore.id = Some("ore-1".into());
        upsert_material(&conn, &ore).unwrap();
        block_profession(&conn, "Cursed");

        ore.quantity = Some(99);
        ore.professions = vec!["Cursed".into()];
        assert!(upsert_material(&conn, &ore).is_err());

        let stored = find_materials(&conn, "Mining", 75).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].quantity, Some(20));
        assert_eq!(list_professions(&conn).unwrap(), vec!["Mining"]);
    }

    #[test]
    fn test_failed_insert_stores_nothing() {
        let conn = conn();
        block_profession(&conn, "Cursed");

        let mut ore = material("Dark Iron Ore", "Mining", "230", 4);
        ore.professions = vec!["Cursed".into()];
        assert!(upsert_material(&conn, &ore).is_err());

        assert_eq!(count_materials(&conn).unwrap(), 0);
        assert!(list_professions(&conn).unwrap().is_empty());
    }
}
