//! Default rules for incomplete catalog data
//!
//! Catalog documents are edited by hand and often leave numeric fields empty.
//! Missing or zero values fall back to 1 instead of failing the calculation.

/// Demand for a material when its `quantity` is absent or zero
pub fn quantity(value: Option<u32>) -> u32 {
    one_if_unset(value)
}

/// Units of a resource consumed per craft when `quantityPerBar` is absent or zero
pub fn quantity_per_bar(value: Option<u32>) -> u32 {
    one_if_unset(value)
}

/// Units yielded by one craft when `outputQuantity` is absent or zero
pub fn output_quantity(value: Option<u32>) -> u32 {
    one_if_unset(value)
}

/// Number of craft actions needed to produce `quantity` units.
///
/// Partial crafts are impossible, so this always rounds up.
pub fn crafts_needed(quantity: u32, output_quantity: u32) -> u32 {
    quantity.div_ceil(output_quantity.max(1))
}

fn one_if_unset(value: Option<u32>) -> u32 {
    match value {
        Some(0) | None => 1,
        Some(v) => v,
    }
}
