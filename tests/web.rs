#![cfg(target_arch = "wasm32")]

use cricket_core::{
    clone_match_state, compute_delivery, create_match_state, place_field, resolve_ball,
    update_learner, validate_state, CricketEngine,
};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn engine_plays_a_ball_end_to_end() {
    let mut engine = CricketEngine::with_seed(9, None).expect("engine");
    let before: serde_json::Value =
        serde_json::from_str(&engine.state_json().expect("state")).expect("json");

    let response = engine
        .play_ball_json("drive", None, Some("expert".into()))
        .expect("ball");
    let response: serde_json::Value = serde_json::from_str(&response).expect("json");

    assert!(response["decision"]["delivery"].is_string());
    assert!(response["field"]["placements"].is_array());
    assert_eq!(
        response["resolution"]["state"]["balls_bowled"].as_u64(),
        before["balls_bowled"].as_u64().map(|balls| balls + 1)
    );
}

#[wasm_bindgen_test]
fn engine_rejects_unknown_shot() {
    let mut engine = CricketEngine::new(None).expect("engine");
    assert!(engine.play_ball_json("scoop", None, None).is_err());
}

#[wasm_bindgen_test]
fn sample_state_round_trips_and_validates() {
    let state = create_match_state().expect("sample");
    let copy = clone_match_state(state.clone()).expect("clone");
    validate_state(copy).expect("valid");
    validate_state(state).expect("valid");
}

#[wasm_bindgen_test]
fn detached_helpers_agree_on_the_state() {
    let state = create_match_state().expect("sample");

    let decision = compute_delivery(state.clone(), JsValue::NULL, Some("expert".into()))
        .expect("decision");
    let decision: serde_json::Value =
        serde_wasm_bindgen::from_value(decision).expect("decision json");
    let delivery = decision["delivery"].as_str().expect("delivery name");

    let plan = place_field(state.clone(), delivery).expect("plan");
    let plan: serde_json::Value = serde_wasm_bindgen::from_value(plan).expect("plan json");
    assert!(plan["efficiency"].as_f64().expect("efficiency") >= 0.0);

    let resolved = resolve_ball(state.clone(), delivery, "block", Some(7)).expect("ball");
    let resolved: serde_json::Value =
        serde_wasm_bindgen::from_value(resolved).expect("ball json");
    assert!(resolved["resolution"]["state"]["balls_bowled"].as_u64().is_some());

    let update = update_learner(JsValue::NULL, state, delivery, 1.0).expect("update");
    let update: serde_json::Value = serde_wasm_bindgen::from_value(update).expect("update json");
    assert!(update["delta"].as_f64().expect("delta") > 0.0);
}
