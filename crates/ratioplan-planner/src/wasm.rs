//! WASM bindings for the planner
//!
//! Both functions take the game data and plan request as JSON strings, the
//! same documents the CLI reads.

use wasm_bindgen::prelude::*;

use ratioplan_solver::Solver;

use crate::gamedata::GameData;
use crate::multiplan::get_multi_plan;
use crate::request::PlanRequest;

fn load(game_data: &str, request: &str) -> Result<(GameData, PlanRequest), JsValue> {
    let data = GameData::from_json(game_data).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let request = PlanRequest::from_json(request).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok((data, request))
}

/// Solve a plan request and return the plan snapshot as JSON
#[wasm_bindgen]
pub fn create_plan(game_data: &str, request: &str) -> Result<JsValue, JsValue> {
    let (data, request) = load(game_data, request)?;
    let planner = request.to_planner(&data).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let plan = planner.create_plan().map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&plan.snapshot()).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Explain what an infeasible request is missing
#[wasm_bindgen]
pub fn diagnose(game_data: &str, request: &str) -> Result<JsValue, JsValue> {
    let (data, request) = load(game_data, request)?;
    let planner = request.to_planner(&data).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let multi = get_multi_plan(&data, &planner, &Solver::new()).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&multi.diagnosis()).map_err(|e| JsValue::from_str(&e.to_string()))
}
