use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content.to_string()).unwrap();
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_validate-json"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_valid_instance_exits_zero() {
    let dir = TempDir::new().unwrap();
    let schema = write(dir.path(), "schema.json", &json!({"type": "object"}));
    let instance = write(dir.path(), "instance.json", &json!({}));

    let output = run(&[
        "--schema",
        schema.to_str().unwrap(),
        "--instance",
        instance.to_str().unwrap(),
        "--output",
        "flag",
    ]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_json(&output), json!({"valid": true}));
}

#[test]
fn test_invalid_instance_exits_one_with_basic_errors() {
    let dir = TempDir::new().unwrap();
    let schema = write(dir.path(), "schema.json", &json!({"required": ["name"]}));
    let instance = write(dir.path(), "instance.json", &json!({}));

    let output = run(&[
        "--schema",
        schema.to_str().unwrap(),
        "--instance",
        instance.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let report = stdout_json(&output);
    assert_eq!(report["valid"], json!(false));
    assert_eq!(report["errors"][0]["keywordLocation"], json!("/required"));
}

#[test]
fn test_schema_directory_serves_references() {
    let dir = TempDir::new().unwrap();
    let schemas = dir.path().join("schemas");
    fs::create_dir(&schemas).unwrap();
    write(&schemas, "name.json", &json!({"type": "string", "minLength": 1}));
    let schema = write(
        &schemas,
        "person.json",
        &json!({"properties": {"name": {"$ref": "name.json"}}}),
    );
    let good = write(dir.path(), "good.json", &json!({"name": "Ada"}));
    let bad = write(dir.path(), "bad.json", &json!({"name": ""}));

    let base = ["--schema-dir", schemas.to_str().unwrap(), "--base-uri", "https://schemas.example/"];
    let mut args = vec!["--schema", schema.to_str().unwrap(), "--instance"];
    args.push(good.to_str().unwrap());
    args.extend(base);
    assert_eq!(run(&args).status.code(), Some(0));

    args[3] = bad.to_str().unwrap();
    assert_eq!(run(&args).status.code(), Some(1));
}

#[test]
fn test_options_file() {
    let dir = TempDir::new().unwrap();
    let schema = write(dir.path(), "schema.json", &json!({"format": "ipv4"}));
    let instance = write(dir.path(), "instance.json", &json!("not an address"));
    let options = write(
        dir.path(),
        "options.json",
        &json!({"evaluation": {"assertFormats": true}, "output": "detailed"}),
    );

    let output = run(&[
        "--schema",
        schema.to_str().unwrap(),
        "--instance",
        instance.to_str().unwrap(),
        "--options",
        options.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let report = stdout_json(&output);
    assert_eq!(report["nested"][0]["keywordLocation"], json!("/format"));
}

#[test]
fn test_engine_errors_exit_two() {
    let dir = TempDir::new().unwrap();
    let schema = write(dir.path(), "schema.json", &json!({"$ref": "#/$defs/missing"}));
    let instance = write(dir.path(), "instance.json", &json!(1));

    let output = run(&[
        "--schema",
        schema.to_str().unwrap(),
        "--instance",
        instance.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to compile schema"));

    let output = run(&[
        "--schema",
        schema.to_str().unwrap(),
        "--instance",
        instance.to_str().unwrap(),
        "--output",
        "terse",
    ]);
    assert_eq!(output.status.code(), Some(2));
}
