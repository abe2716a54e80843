use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use ratioplan_planner::{get_multi_plan, GameData, NodeData, PlanError, PlanRequest, ProductionPlanner, Relaxation};
use ratioplan_solver::{PivotRuleKind, Rational, RoundingMode, Solver};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ratioplan")]
#[command(about = "Exact production chain planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a game data file
    Check {
        /// The game data JSON file
        game_data: PathBuf,
    },
    /// Solve a plan request and print the plan
    Plan {
        /// The game data JSON file
        game_data: PathBuf,
        /// The plan request JSON file
        request: PathBuf,
        /// Also print the item flows between recipes
        #[arg(short, long)]
        graph: bool,
        /// Pivot rule (bland, dantzig, optimal-increase)
        #[arg(short, long, default_value = "optimal-increase")]
        pivot: PivotRuleKind,
        /// Abort after this many pivots per solve
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Output the plan snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Explain why a plan request is infeasible
    Diagnose {
        /// The game data JSON file
        game_data: PathBuf,
        /// The plan request JSON file
        request: PathBuf,
        /// Output the diagnosis as JSON
        #[arg(long)]
        json: bool,
    },
}

fn read(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn load_game_data(path: &Path) -> GameData {
    match GameData::from_json(&read(path)) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("✗ {} has errors:", path.display());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}

fn load_planner(data: &GameData, path: &Path) -> ProductionPlanner {
    match PlanRequest::from_json(&read(path)).and_then(|request| request.to_planner(data)) {
        Ok(planner) => planner,
        Err(e) => {
            eprintln!("Request error: {}", e);
            std::process::exit(1);
        }
    }
}

fn rate(value: &Rational) -> String {
    if value.is_integer() {
        value.to_string()
    } else {
        format!("{} ({})", value.to_decimal_string(3, RoundingMode::HalfEven), value)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { game_data } => {
            let data = load_game_data(&game_data);
            println!("✓ {} is valid", game_data.display());
            println!("  {} items", data.items().count());
            println!("  {} buildings", data.buildings().count());
            println!("  {} recipes", data.recipes().count());
            println!("  {} raw resources", data.resource_caps().len());
        }
        Commands::Plan {
            game_data,
            request,
            graph,
            pivot,
            max_iterations,
            json,
        } => {
            let data = load_game_data(&game_data);
            let planner = load_planner(&data, &request);

            let mut solver = Solver::new().with_pivot_rule(pivot.into_rule());
            if let Some(max) = max_iterations {
                solver = solver.with_max_iterations(max);
            }
            debug!(pivot_rule = solver.pivot_rule().name(), ?max_iterations, "solver configured");

            let plan = match planner.create_plan_with(&solver) {
                Ok(plan) => plan,
                Err(PlanError::NotFeasible) => {
                    println!("Status: INFEASIBLE");
                    println!("No plan satisfies the request; try `ratioplan diagnose`.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            if json {
                match plan.snapshot().to_json() {
                    Ok(s) => println!("{}", s),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
                return;
            }

            println!("Status: OPTIMAL");
            println!();
            println!("Inputs (per minute):");
            for (item, amount) in plan.input_item_amounts() {
                println!("  {:24} {}", item.label(), rate(amount));
            }
            println!();
            println!("Outputs (per minute):");
            for (item, amount) in plan.output_item_amounts() {
                let marker = if plan.is_byproduct(item) { " (byproduct)" } else { "" };
                println!("  {:24} {}{}", item.label(), rate(amount), marker);
            }
            println!();
            println!("Recipes (machines):");
            for (recipe, amount) in plan.recipe_amounts() {
                println!("  {:24} {:16} {}", recipe.label(), recipe.building().name, rate(amount));
            }
            println!();
            println!("Power: {} MW", rate(&plan.power_consumption()));
            println!("Buildings: {}", rate(&plan.building_count()));
            let points = plan.sink_points();
            if points.is_positive() {
                println!("Sink points: {}", rate(&points));
            }

            if graph {
                let flows = plan.to_graph();
                println!();
                println!("Flows:");
                let label = |node: &NodeData| match node {
                    NodeData::Recipe { recipe, .. } => format!("[{}]", recipe.label()),
                    NodeData::Input { item, .. } => format!("in:{}", item.label()),
                    NodeData::Output { item, .. } => format!("out:{}", item.label()),
                };
                for edge in flows.edges() {
                    let (Some(source), Some(target)) = (flows.node(edge.source), flows.node(edge.target)) else {
                        continue;
                    };
                    for (item, amount) in edge.data.flows() {
                        println!("  {} -> {}: {} {}", label(source), label(target), rate(amount), item.label());
                    }
                }
            }
        }
        Commands::Diagnose {
            game_data,
            request,
            json,
        } => {
            let data = load_game_data(&game_data);
            let planner = load_planner(&data, &request);

            let multi = match get_multi_plan(&data, &planner, &Solver::new()) {
                Ok(multi) => multi,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let diagnosis = multi.diagnosis();

            if json {
                println!("{}", serde_json::to_string_pretty(&diagnosis).unwrap_or_else(|e| format!("Error: {}", e)));
                return;
            }

            match multi.status() {
                Some(Relaxation::None) => println!("✓ The request is feasible as given"),
                Some(Relaxation::Resources) => println!("✗ The request needs more raw resources"),
                Some(Relaxation::Recipes) => println!("✗ The request needs more recipes"),
                Some(Relaxation::ResourcesAndRecipes) => println!("✗ The request needs more raw resources and recipes"),
                None => {
                    println!("✗ The request is impossible even with every resource and recipe");
                    std::process::exit(1);
                }
            }
            if !diagnosis.missing_resources.is_empty() {
                println!();
                println!("Missing resources (per minute):");
                for (name, amount) in &diagnosis.missing_resources {
                    println!("  {:24} {}", name, rate(amount));
                }
            }
            if !diagnosis.missing_recipes.is_empty() {
                println!();
                println!("Missing recipes:");
                for name in &diagnosis.missing_recipes {
                    println!("  - {}", name);
                }
            }
        }
    }
}
