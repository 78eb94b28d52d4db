//! Crafting resource calculator logic
//!
//! A calculation runs three stages in order: materials are collected from the
//! catalog per profession selection, merged by name, and crafted items are
//! expanded into demand on the resources their recipes consume.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, error, warn};

use crate::catalog::{Catalog, MaterialFilter};
use crate::config::{CalculatorConfig, ExpansionPolicy};
use crate::defaults;
use crate::error::CalcError;
use crate::models::{CraftedFor, DemandEntry, Material, ProfessionRequest, ProfessionSelection};

/// Calculate the combined shopping list for a set of profession requests
///
/// Fails with [`CalcError::InvalidRequest`] when no usable selection was given
/// (strict mode only) and with [`CalcError::DataSource`] when any catalog
/// lookup fails. Nothing partial is returned on failure.
pub fn calculate_resources<C: Catalog + ?Sized>(
    catalog: &C,
    requests: &[ProfessionRequest],
    config: &CalculatorConfig,
) -> Result<Vec<DemandEntry>, CalcError> {
    let selections = validate_requests(requests, config)?;
    calculate_selections(catalog, &selections, config)
}

/// Run collection, merge and expansion for already validated selections
pub fn calculate_selections<C: Catalog + ?Sized>(
    catalog: &C,
    selections: &[ProfessionSelection],
    config: &CalculatorConfig,
) -> Result<Vec<DemandEntry>, CalcError> {
    let collected = collect_demand(catalog, selections)?;
    let merged = merge_quantities(&collected);
    let expanded = expand_crafts(&merged, config);
    debug!(
        collected = collected.len(),
        merged = merged.len(),
        "resource calculation finished"
    );
    Ok(expanded.into_entries())
}

/// Validate the requests, dropping malformed ones
///
/// When nothing usable is left, strict mode fails with
/// [`CalcError::InvalidRequest`] and permissive mode returns no selections.
pub fn validate_requests(
    requests: &[ProfessionRequest],
    config: &CalculatorConfig,
) -> Result<Vec<ProfessionSelection>, CalcError> {
    let valid: Vec<ProfessionSelection> = requests
        .iter()
        .filter_map(|request| {
            let selection = request.validate();
            if selection.is_none() {
                warn!(?request, "skipping malformed profession request");
            }
            selection
        })
        .collect();

    if valid.is_empty() && config.strict {
        return Err(CalcError::InvalidRequest(if requests.is_empty() {
            "no professions selected".to_string()
        } else {
            "no valid profession selection (each needs profession and levelRange)".to_string()
        }));
    }

    Ok(valid)
}

/// Fetch every material the selected professions need up to their level
///
/// The result is flat: a material needed by two professions shows up twice.
pub fn collect_demand<C: Catalog + ?Sized>(
    catalog: &C,
    selections: &[ProfessionSelection],
) -> Result<Vec<Material>, CalcError> {
    if selections.is_empty() {
        debug!("no usable profession selection, returning empty result");
        return Ok(Vec::new());
    }

    let mut collected = Vec::new();
    for selection in selections {
        let filter = MaterialFilter::new(&selection.profession, selection.max_level);
        let found = catalog.find_materials(&filter).map_err(|e| {
            error!(
                profession = %selection.profession,
                level = selection.max_level,
                "material lookup failed: {}",
                e
            );
            CalcError::from(e)
        })?;
        debug!(
            profession = %selection.profession,
            level = selection.max_level,
            found = found.len(),
            "collected materials"
        );
        collected.extend(found);
    }

    Ok(collected)
}

/// Materials keyed by name, kept in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemandTable {
    entries: Vec<DemandEntry>,
    index: HashMap<String, usize>,
}

impl DemandTable {
    pub fn get(&self, name: &str) -> Option<&DemandEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[DemandEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<DemandEntry> {
        self.entries
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn insert(&mut self, entry: DemandEntry) {
        self.index.insert(entry.name().to_string(), self.entries.len());
        self.entries.push(entry);
    }
}

/// Merge duplicate materials by name, summing their quantities
///
/// Everything except the quantity comes from the first occurrence.
pub fn merge_quantities(materials: &[Material]) -> DemandTable {
    let mut table = DemandTable::default();

    for material in materials {
        let quantity = defaults::quantity(material.quantity);
        match table.position(&material.name) {
            Some(i) => {
                let entry = &mut table.entries[i];
                let total = entry.quantity().saturating_add(quantity);
                entry.set_quantity(total);
            }
            None => table.insert(DemandEntry::new(material.clone(), quantity)),
        }
    }

    table
}

/// Expand crafted items into demand on the resources they consume
///
/// Returns a new table; `merged` is left untouched. Each crafted item adds a
/// `craftedFor` record to every input resource already in the table and raises
/// that resource's quantity according to the configured policy. Resources not
/// in the table are never added.
///
/// With the default depth of 1 the table is walked once in order; a crafted
/// resource raised after its own turn is not expanded again. Larger depths keep
/// walking while crafted resources were raised, up to the configured bound.
pub fn expand_crafts(merged: &DemandTable, config: &CalculatorConfig) -> DemandTable {
    let mut table = merged.clone();
    if table.is_empty() {
        return table;
    }
    let mut expanded_crafts = vec![0u32; table.len()];
    let depth = config.depth();

    for pass in 0..depth {
        let changed = expansion_pass(&mut table, &mut expanded_crafts, config.policy, pass == 0);
        debug!(pass = pass + 1, changed, "craft expansion pass");
        if changed == 0 {
            break;
        }
    }

    let pending = pending_crafts(&table, &expanded_crafts);
    if pending > 0 {
        if depth > 1 {
            warn!(
                pending,
                depth, "crafting chain exceeds expansion depth, possible recipe cycle"
            );
        } else {
            debug!(pending, "crafted resources left unexpanded at depth 1");
        }
    }

    table
}

/// One walk over the crafted entries; returns how many were expanded
fn expansion_pass(
    table: &mut DemandTable,
    expanded_crafts: &mut [u32],
    policy: ExpansionPolicy,
    first_pass: bool,
) -> usize {
    let mut changed = 0;

    for i in 0..table.entries.len() {
        let Some(recipe) = table.entries[i].material.recipe().cloned() else {
            continue;
        };
        let crafted_name = table.entries[i].name().to_string();
        let crafts = defaults::crafts_needed(
            table.entries[i].quantity(),
            defaults::output_quantity(recipe.output_quantity),
        );
        if crafts <= expanded_crafts[i] {
            continue;
        }
        let new_crafts = match policy {
            ExpansionPolicy::Max => crafts,
            ExpansionPolicy::Sum => crafts - expanded_crafts[i],
        };
        expanded_crafts[i] = crafts;
        changed += 1;

        for resource in recipe.inputs() {
            if resource.name == crafted_name {
                debug!(item = %crafted_name, "recipe consumes its own output, skipping");
                continue;
            }
            let Some(r) = table.position(&resource.name) else {
                debug!(
                    item = %crafted_name,
                    resource = %resource.name,
                    "resource not collected, nothing to expand"
                );
                continue;
            };
            let needed =
                new_crafts.saturating_mul(defaults::quantity_per_bar(resource.quantity_per_bar));
            let entry = &mut table.entries[r];
            entry.set_quantity(policy.combine(entry.quantity(), needed));
            record_pull(entry, &crafted_name, needed, policy, first_pass);
        }
    }

    changed
}

fn record_pull(
    entry: &mut DemandEntry,
    crafted_name: &str,
    needed: u32,
    policy: ExpansionPolicy,
    first_pass: bool,
) {
    if !first_pass {
        if let Some(existing) = entry.crafted_for.iter_mut().find(|c| c.name == crafted_name) {
            existing.quantity = match policy {
                ExpansionPolicy::Max => needed,
                ExpansionPolicy::Sum => existing.quantity.saturating_add(needed),
            };
            return;
        }
    }
    entry.crafted_for.push(CraftedFor {
        name: crafted_name.to_string(),
        quantity: needed,
    });
}

fn pending_crafts(table: &DemandTable, expanded_crafts: &[u32]) -> usize {
    table
        .entries
        .iter()
        .zip(expanded_crafts)
        .filter(|&(entry, &done)| {
            entry.material.recipe().is_some_and(|recipe| {
                defaults::crafts_needed(
                    entry.quantity(),
                    defaults::output_quantity(recipe.output_quantity),
                ) > done
            })
        })
        .count()
}

/// Format a calculation result as a readable shopping list
pub fn format_shopping_list(entries: &[DemandEntry]) -> String {
    let mut output = String::new();

    for entry in entries {
        let kind = if entry.is_crafted() { "crafted" } else { "raw" };
        output.push_str(&format!("{:>6}x {} ({})\n", entry.quantity(), entry.name(), kind));

        if let Some(recipe) = entry.material.recipe() {
            let per_craft = defaults::output_quantity(recipe.output_quantity);
            let crafts = defaults::crafts_needed(entry.quantity(), per_craft);
            output.push_str(&format!(
                "        {} craft(s) at {} per craft\n",
                crafts, per_craft
            ));
            for resource in recipe.inputs() {
                output.push_str(&format!(
                    "        uses {} x{} per craft\n",
                    resource.name,
                    defaults::quantity_per_bar(resource.quantity_per_bar)
                ));
            }
        }

        for pull in &entry.crafted_for {
            output.push_str(&format!(
                "        needed for crafting {} ({})\n",
                pull.name, pull.quantity
            ));
        }
        if entry.crafted_for.len() > 1 {
            output.push_str(&format!(
                "        {} pulled by crafts in total\n",
                entry.crafted_total()
            ));
        }
    }

    output
}

/// Summary of a calculation result
#[derive(Debug)]
pub struct ResourceSummary {
    pub professions: Vec<String>,
    pub crafted_items: Vec<(String, u32)>,
    pub raw_resources: Vec<(String, u32)>,
    pub total_raw_units: u64,
}

/// Generate a summary of a calculation result
pub fn summarize(entries: &[DemandEntry], selections: &[ProfessionSelection]) -> ResourceSummary {
    let mut crafted_items = Vec::new();
    let mut raw_resources = Vec::new();

    for entry in entries {
        let line = (entry.name().to_string(), entry.quantity());
        if entry.is_crafted() {
            crafted_items.push(line);
        } else {
            raw_resources.push(line);
        }
    }

    crafted_items.sort_by(|a, b| a.0.cmp(&b.0));
    raw_resources.sort_by(|a, b| a.0.cmp(&b.0));

    let total_raw_units = raw_resources.iter().map(|(_, q)| u64::from(*q)).sum();

    ResourceSummary {
        professions: selections
            .iter()
            .map(|s| format!("{} (up to {})", s.profession, s.max_level))
            .collect(),
        crafted_items,
        raw_resources,
        total_raw_units,
    }
}

impl fmt::Display for ResourceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Resource Summary ===")?;
        writeln!(f, "Professions: {}", self.professions.join(", "))?;
        writeln!(f)?;

        writeln!(f, "Crafted items:")?;
        for (name, quantity) in &self.crafted_items {
            writeln!(f, "  {:>6}x {}", quantity, name)?;
        }
        writeln!(f)?;

        writeln!(f, "Raw resources to buy:")?;
        for (name, quantity) in &self.raw_resources {
            writeln!(f, "  {:>6}x {}", quantity, name)?;
        }
        writeln!(f)?;

        writeln!(f, "Total raw units: {}", self.total_raw_units)?;

        Ok(())
    }
}
