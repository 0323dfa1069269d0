use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};

fn write_json(path: &std::path::Path, value: &Value) {
    std::fs::write(path, value.to_string()).unwrap();
}

#[test]
fn test_init_compile_and_apply() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().to_str().unwrap();

    // Init project
    cargo_bin_cmd!("tooldrawer")
        .args(["init", project, "--name", "demo"])
        .assert()
        .success();

    // Verify generated files exist
    assert!(dir.path().join("tooldrawer.yaml").exists());
    assert!(dir.path().join("widgets/faq/spec.json").exists());
    assert!(dir.path().join("stencils/repeater/repeater.html").exists());
    assert!(dir.path().join("stencils/textfield/textfield.spec.json").exists());

    // Compile
    cargo_bin_cmd!("tooldrawer")
        .args(["--config", project, "compile"])
        .assert()
        .success();

    let compiled_path = dir.path().join(".tooldrawer/compiled/faq.json");
    let compiled: Value =
        serde_json::from_str(&std::fs::read_to_string(&compiled_path).unwrap()).unwrap();
    assert_eq!(compiled["widgetname"], "faq");
    assert_eq!(compiled["panels"][0]["id"], "content");
    assert_eq!(
        compiled["assets"]["dieter"]["scripts"][0],
        "http://localhost:4000/dieter/components/repeater/repeater.js"
    );

    // Apply a valid batch to instance data missing its item ids
    let data = dir.path().join("instance.json");
    write_json(
        &data,
        &json!({
            "title": "Help",
            "showTitle": true,
            "background": "#000000",
            "faqs": [{"question": "Who are you?", "answer": "A shop."}]
        }),
    );
    let ops = dir.path().join("ops.json");
    write_json(
        &ops,
        &json!([
            {"op": "set", "path": "title", "value": "Support"},
            {"op": "insert", "path": "faqs", "index": 1,
             "value": {"id": "hours", "question": "When are you open?", "answer": "Always."}}
        ]),
    );

    let output = cargo_bin_cmd!("tooldrawer")
        .args(["--config", project, "apply", "--widget", "faq"])
        .args(["--data", data.to_str().unwrap(), "--ops", ops.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["ok"], true);
    assert_eq!(result["data"]["title"], "Support");
    assert_eq!(result["data"]["faqs"][0]["id"], "who-are-you");
    assert_eq!(result["data"]["faqs"][1]["id"], "hours");
}

#[test]
fn test_rejected_batch_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().to_str().unwrap();

    cargo_bin_cmd!("tooldrawer")
        .args(["init", project])
        .assert()
        .success();
    cargo_bin_cmd!("tooldrawer")
        .args(["--config", project, "compile"])
        .assert()
        .success();

    let spec = dir.path().join("widgets/faq/spec.json");
    let data = dir.path().join("instance.json");
    let defaults = serde_json::from_str::<Value>(&std::fs::read_to_string(&spec).unwrap())
        .unwrap()["defaults"]
        .clone();
    write_json(&data, &defaults);

    let ops = dir.path().join("ops.json");
    write_json(&ops, &json!([{"op": "set", "path": "showTitle", "value": "yes"}]));

    cargo_bin_cmd!("tooldrawer")
        .args(["--config", project, "apply", "--widget", "faq"])
        .args(["--data", data.to_str().unwrap(), "--ops", ops.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"ok\": false"));

    // Permissive coercion accepts the same batch
    cargo_bin_cmd!("tooldrawer")
        .args(["--config", project, "apply", "--widget", "faq", "--permissive"])
        .args(["--data", data.to_str().unwrap(), "--ops", ops.to_str().unwrap()])
        .assert()
        .success();

    // Unknown paths are not editable
    write_json(&ops, &json!([{"op": "set", "path": "secret", "value": "x"}]));
    cargo_bin_cmd!("tooldrawer")
        .args(["--config", project, "apply", "--widget", "faq"])
        .args(["--data", data.to_str().unwrap(), "--ops", ops.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Path is not editable"));
}

#[test]
fn test_validate_and_inspect() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().to_str().unwrap();

    cargo_bin_cmd!("tooldrawer")
        .args(["init", project])
        .assert()
        .success();
    cargo_bin_cmd!("tooldrawer")
        .args(["--config", project, "compile"])
        .assert()
        .success();

    let data = dir.path().join("instance.json");
    write_json(
        &data,
        &json!({"title": 7, "showTitle": true, "background": "#fff", "faqs": []}),
    );
    cargo_bin_cmd!("tooldrawer")
        .args(["--config", project, "validate", "--widget", "faq"])
        .args(["--data", data.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Value must be a string"));

    cargo_bin_cmd!("tooldrawer")
        .args(["--config", project, "inspect", "--widget", "faq", "--path", "faqs.3.answer"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"textfield\""));
}

#[test]
fn test_compile_skips_unchanged_output() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().to_str().unwrap();

    cargo_bin_cmd!("tooldrawer")
        .args(["init", project])
        .assert()
        .success();
    cargo_bin_cmd!("tooldrawer")
        .args(["--config", project, "compile"])
        .assert()
        .success();

    cargo_bin_cmd!("tooldrawer")
        .args(["--config", project, "compile", "--widget", "faq"])
        .assert()
        .success()
        .stderr(predicate::str::contains("unchanged"));

    cargo_bin_cmd!("tooldrawer")
        .args(["--config", project, "compile", "--widget", "missing"])
        .assert()
        .failure();
}

#[test]
fn test_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("base.json");
    let ops = dir.path().join("ops.json");
    let allowlist = dir.path().join("allowlist.json");
    write_json(&data, &json!({"title": "Hello", "faqs": [{"question": "Why?"}]}));
    write_json(&allowlist, &json!(["title", {"path": "faqs.*.question", "type": "richtext"}]));

    write_json(
        &ops,
        &json!([
            {"op": "set", "path": "title", "value": "Bonjour"},
            {"op": "set", "path": "faqs[0].question", "value": "Pourquoi ?"}
        ]),
    );
    let output = cargo_bin_cmd!("tooldrawer")
        .args(["overlay", "--data", data.to_str().unwrap()])
        .args(["--ops", ops.to_str().unwrap(), "--allowlist", allowlist.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["data"]["title"], "Bonjour");
    assert_eq!(result["data"]["faqs"][0]["question"], "Pourquoi ?");

    write_json(&ops, &json!([{"op": "set", "path": "faqs.0.answer", "value": "x"}]));
    cargo_bin_cmd!("tooldrawer")
        .args(["overlay", "--data", data.to_str().unwrap()])
        .args(["--ops", ops.to_str().unwrap(), "--allowlist", allowlist.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Path is not allowlisted"));
}
