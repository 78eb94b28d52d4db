//! Crafting resource calculator
//!
//! Turns a set of profession leveling selections into a single shopping list:
//! catalog materials are collected per profession, merged by name, and crafted
//! items ("bars") are expanded into demand on the raw resources they consume.

pub mod calculator;
pub mod catalog;
pub mod config;
pub mod db;
pub mod defaults;
pub mod error;
pub mod import;
pub mod models;
pub mod sample;

pub use calculator::calculate_resources;
pub use catalog::{Catalog, InMemoryCatalog, MaterialFilter};
pub use config::{CalculatorConfig, ExpansionPolicy};
pub use error::{CalcError, CatalogError};
pub use models::{DemandEntry, Material, ProfessionRequest};
