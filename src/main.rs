//! Crafting Resource Calculator
//!
//! Shopping lists for profession leveling orders.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use craft_calculator::calculator;
use craft_calculator::config::{CalculatorConfig, ExpansionPolicy};
use craft_calculator::db::{self, SqliteCatalog};
use craft_calculator::import;
use craft_calculator::models::ProfessionRequest;
use craft_calculator::sample;

#[derive(Parser)]
#[command(name = "craft-calculator")]
#[command(about = "Crafting resource calculator for profession leveling orders")]
struct Cli {
    /// Path to the SQLite material catalog
    #[arg(short, long, env = "CRAFT_CALC_DB", default_value = "craft_data.db")]
    database: PathBuf,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct CalcOptions {
    /// How competing crafts combine on a shared resource
    #[arg(long, env = "CRAFT_CALC_POLICY", default_value = "max")]
    policy: ExpansionPolicy,

    /// Crafting chain passes (1 = expand every crafted item once)
    #[arg(long, env = "CRAFT_CALC_DEPTH", default_value = "1")]
    depth: usize,

    /// Answer an empty request with an empty list instead of an error
    #[arg(long)]
    permissive: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl CalcOptions {
    fn config(&self) -> CalculatorConfig {
        let config = CalculatorConfig::default()
            .with_policy(self.policy)
            .with_max_depth(self.depth);
        if self.permissive {
            config.permissive()
        } else {
            config
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate the shopping list for profession selections
    Calc {
        /// Selections as Profession:level (e.g. "Blacksmithing:300")
        #[arg(required = true)]
        professions: Vec<String>,

        #[command(flatten)]
        options: CalcOptions,
    },

    /// Calculate from a JSON file holding [{"profession", "levelRange"}, ...]
    CalcFile {
        /// Path to the request file
        path: PathBuf,

        #[command(flatten)]
        options: CalcOptions,
    },

    /// Import material documents from a directory of JSON files
    Import {
        /// Directory with exported catalog documents
        source_dir: PathBuf,

        /// Clear existing materials before import
        #[arg(long)]
        clear: bool,
    },

    /// List materials in the catalog
    ListMaterials {
        /// Only materials required by this profession
        #[arg(short, long)]
        profession: Option<String>,
    },

    /// List professions that have materials
    ListProfessions,

    /// Show details for a material
    Material {
        /// Material name
        name: String,
    },

    /// Initialize empty database with schema
    Init,

    /// Load sample data for testing (without an exported catalog)
    LoadSample,
}

fn init_logging(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Calc {
            professions,
            options,
        } => {
            let mut requests = Vec::new();
            for pair in &professions {
                let request = ProfessionRequest::parse_pair(pair).with_context(|| {
                    format!("Invalid selection '{}', expected Profession:level", pair)
                })?;
                requests.push(request);
            }
            run_calculation(&conn, &requests, &options)?;
        }

        Commands::CalcFile { path, options } => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let requests: Vec<ProfessionRequest> = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a list of profession requests", path.display()))?;
            run_calculation(&conn, &requests, &options)?;
        }

        Commands::Import { source_dir, clear } => {
            let stats = import::import_directory(&conn, &source_dir, clear)?;
            println!("\n{}", stats);
        }

        Commands::ListMaterials { profession } => {
            let materials = db::list_materials(&conn, profession.as_deref())?;
            if materials.is_empty() {
                println!("No materials in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<28} {:>8} {:>8} {:<8}", "Material", "Level", "Qty", "Kind");
                println!("{}", "-".repeat(56));
                for m in materials {
                    let level = m
                        .level_range
                        .as_ref()
                        .map(|l| l.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let kind = if m.recipe().is_some() { "crafted" } else { "raw" };
                    println!(
                        "{:<28} {:>8} {:>8} {:<8}",
                        m.name,
                        level,
                        m.quantity.unwrap_or_default(),
                        kind
                    );
                }
            }
        }

        Commands::ListProfessions => {
            let professions = db::list_professions(&conn)?;
            if professions.is_empty() {
                println!("No professions in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("Professions:");
                for p in professions {
                    println!("  {}", p);
                }
            }
        }

        Commands::Material { name } => match db::get_material_by_name(&conn, &name)? {
            Some(m) => {
                println!("Material: {}", m.name);
                if let Some(id) = &m.id {
                    println!("  ID: {}", id);
                }
                println!("  Professions: {}", m.all_professions().join(", "));
                if let Some(level) = &m.level_range {
                    println!("  Level range: {}", level);
                }
                println!("  Quantity: {}", m.quantity.unwrap_or_default());

                if let Some(recipe) = m.recipe() {
                    println!(
                        "  Crafted, {} per craft from:",
                        craft_calculator::defaults::output_quantity(recipe.output_quantity)
                    );
                    for r in recipe.inputs() {
                        println!(
                            "    {} x{}",
                            r.name,
                            craft_calculator::defaults::quantity_per_bar(r.quantity_per_bar)
                        );
                    }
                    if !recipe.craft_alternatives.is_empty() {
                        println!("  Alternatives:");
                        for alt in &recipe.craft_alternatives {
                            println!(
                                "    {} x{}",
                                alt.resource.name,
                                craft_calculator::defaults::quantity_per_bar(
                                    alt.resource.quantity_per_bar
                                )
                            );
                        }
                        if let Some(preferred) = recipe.preferred_alternative() {
                            println!("  Preferred alternative: {}", preferred.resource.name);
                        }
                    }
                }
            }
            None => println!("Material '{}' not found", name),
        },

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            let count = sample::load_sample_data(&conn)?;
            println!("Loaded {} sample materials", count);
        }
    }

    Ok(())
}

fn run_calculation(
    conn: &Connection,
    requests: &[ProfessionRequest],
    options: &CalcOptions,
) -> Result<()> {
    let config = options.config();
    let selections = calculator::validate_requests(requests, &config)?;
    let entries =
        calculator::calculate_selections(&SqliteCatalog::new(conn), &selections, &config)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No materials required.");
        return Ok(());
    }

    println!("Shopping list:\n");
    println!("{}", calculator::format_shopping_list(&entries));
    let summary = calculator::summarize(&entries, &selections);
    println!("{}", summary);
    Ok(())
}
