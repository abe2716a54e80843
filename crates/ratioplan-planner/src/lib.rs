mod error;
mod gamedata;
mod graph;
mod multiplan;
mod optimization;
mod plan;
mod planner;
mod pruning;
#[cfg(feature = "serde")]
mod request;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{GameDataError, PlanError};
pub use gamedata::{Building, GameData, GameDataBuilder, GameDataDocument, Item, MatterState, Recipe, RecipeSpec};
pub use graph::{Edge, EdgeData, EdgeId, Graph, NodeData, NodeId};
pub use multiplan::{get_multi_plan, Diagnosis, MultiPlan, PlanAttempt, Relaxation};
pub use optimization::{OptimizationModel, Stage};
pub use plan::{PlanSnapshot, ProductionPlan};
pub use planner::{ObjectiveComposition, OptimizationTarget, OutputRequirement, ProductionPlanner, ProductionPlannerBuilder};
pub use pruning::{recipes_that_build_what_we_need, recipes_we_can_build};
#[cfg(feature = "serde")]
pub use request::{OutputRequest, PlanRequest};

pub use ratioplan_solver as solver;
