use district_prep::assign;
use district_prep::config::RefineConfig;
use district_prep::data::read_feature_collection;
use district_prep::error::{exit_code, PrepError};
use district_prep::types::feature_id;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]
    })
}

fn district(id: &str, geometry: Value) -> Value {
    json!({"type": "Feature", "properties": {"shapeID": id}, "geometry": geometry})
}

fn write_fc(path: &Path, features: Vec<Value>) {
    let fc = json!({"type": "FeatureCollection", "features": features});
    fs::write(path, fc.to_string()).unwrap();
}

fn ids_in(path: &Path) -> Vec<String> {
    read_feature_collection(path)
        .unwrap()
        .features
        .iter()
        .filter_map(feature_id)
        .collect()
}

struct Layout {
    _dir: tempfile::TempDir,
    config: RefineConfig,
}

fn layout() -> Layout {
    let dir = tempfile::tempdir().unwrap();
    let states_dir = dir.path().join("state-districts");
    fs::create_dir(&states_dir).unwrap();
    let config = RefineConfig {
        districts: dir.path().join("districts.geojson"),
        states_dir,
    };
    Layout { _dir: dir, config }
}

fn state_outline(key: &str) -> Value {
    json!({"type": "Feature", "properties": {"name": key}, "geometry": square(70.0, 10.0, 80.0, 20.0)})
}

#[test]
fn district_already_in_maharashtra_is_not_reassigned() {
    let Layout { _dir, config } = layout();
    let d1 = district("IND-ADM4-1", square(74.0, 14.0, 75.0, 15.0));
    write_fc(&config.districts, vec![d1.clone()]);
    write_fc(&config.states_dir.join("maharashtra.geojson"), vec![state_outline("Maharashtra"), d1]);

    let report = assign::refine(&config).unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.reassignments, 0);
    assert_eq!(report.written, 1);
    assert_eq!(ids_in(&config.states_dir.join("maharashtra.geojson")), vec!["IND-ADM4-1"]);
}

#[test]
fn district_recorded_elsewhere_is_reassigned() {
    let Layout { _dir, config } = layout();
    let d1 = district("IND-ADM4-1", square(74.0, 14.0, 75.0, 15.0));
    write_fc(&config.districts, vec![d1.clone()]);
    write_fc(&config.states_dir.join("maharashtra.geojson"), vec![state_outline("Maharashtra")]);
    write_fc(&config.states_dir.join("goa.geojson"), vec![district("IND-ADM4-1", square(0.0, 0.0, 1.0, 1.0))]);

    let report = assign::refine(&config).unwrap();
    assert_eq!(report.reassignments, 1);
    assert_eq!(report.written, 1);
    assert_eq!(ids_in(&config.states_dir.join("maharashtra.geojson")), vec!["IND-ADM4-1"]);
}

#[test]
fn second_run_on_own_output_changes_nothing() {
    let Layout { _dir, config } = layout();
    let mut districts = Vec::new();
    for i in 0..10 {
        for j in 0..10 {
            let (x, y) = (i as f64, j as f64);
            districts.push(district(&format!("d{i}-{j}"), square(x, y, x + 1.0, y + 1.0)));
        }
    }
    write_fc(&config.districts, districts);
    write_fc(
        &config.states_dir.join("north.geojson"),
        vec![json!({"type": "Feature", "properties": {}, "geometry": square(0.0, 5.0, 10.0, 10.0)})],
    );
    write_fc(
        &config.states_dir.join("south.geojson"),
        vec![json!({"type": "Feature", "properties": {}, "geometry": square(0.0, 0.0, 10.0, 5.0)})],
    );

    let first = assign::refine(&config).unwrap();
    assert_eq!(first.total, 100);
    assert_eq!(first.unassigned, 0);
    assert_eq!(first.written, 2);

    let north = ids_in(&config.states_dir.join("north.geojson"));
    let south = ids_in(&config.states_dir.join("south.geojson"));
    assert_eq!(north.len() + south.len(), 100);
    assert!(north.contains(&"d3-7".to_string()));
    assert!(south.contains(&"d3-2".to_string()));
    assert!(north.iter().all(|id| !south.contains(id)));

    let second = assign::refine(&config).unwrap();
    assert_eq!(second.reassignments, 0);
    assert_eq!(ids_in(&config.states_dir.join("north.geojson")), north);
    assert_eq!(ids_in(&config.states_dir.join("south.geojson")), south);
}

#[test]
fn missing_inputs_fail_without_output() {
    let Layout { _dir, config } = layout();
    let err = assign::refine(&config).unwrap_err();
    assert!(matches!(err.downcast_ref::<PrepError>(), Some(PrepError::MissingInput { .. })));
    assert_eq!(exit_code(&err), 1);
    assert_eq!(fs::read_dir(&config.states_dir).unwrap().count(), 0);

    write_fc(&config.districts, vec![]);
    let missing_dir = RefineConfig {
        states_dir: config.states_dir.join("absent"),
        ..config.clone()
    };
    assert!(assign::refine(&missing_dir).is_err());
}

#[test]
fn malformed_geometry_falls_back_to_previous_state() {
    let Layout { _dir, config } = layout();
    let broken = json!({"type": "Feature", "properties": {"shapeID": "x"}, "geometry": null});
    write_fc(&config.districts, vec![broken.clone(), json!({"type": "Feature", "properties": {"shapeID": "ghost"}, "geometry": null})]);
    write_fc(&config.states_dir.join("kerala.geojson"), vec![broken]);

    let report = assign::refine(&config).unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.unassigned, 1);
    assert_eq!(report.reassignments, 0);
    assert_eq!(ids_in(&config.states_dir.join("kerala.geojson")), vec!["x"]);
}
