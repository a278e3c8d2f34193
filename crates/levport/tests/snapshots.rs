//! Snapshot tests of whole generated modules.
//!
//! Run `cargo insta review` to update snapshots after intentional changes.

use levport::{LevportConfig, translate};

fn translate_ok(source: &str, name: &str) -> String {
    let translation = translate(source, name, &LevportConfig::default());
    assert!(
        !translation.diagnostics.has_fatal(),
        "unexpected errors: {:?}",
        translation.diagnostics
    );
    translation.output.expect("no output")
}

#[test]
fn test_corridor_level() {
    let output = translate_ok(include_str!("fixtures/corridor.lua"), "corridor.lua");
    insta::assert_snapshot!("corridor_level", output);
}

#[test]
fn test_loops_level() {
    let output = translate_ok(include_str!("fixtures/loops.lua"), "loops.lua");
    insta::assert_snapshot!("loops_level", output);
}

#[test]
fn test_hazard_diagnostics() {
    let translation = translate(
        include_str!("fixtures/hazards.lua"),
        "hazards.lua",
        &LevportConfig::default(),
    );
    assert!(translation.output.is_none());
    let report = translation
        .diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    insta::assert_snapshot!("hazard_diagnostics", report);
}
