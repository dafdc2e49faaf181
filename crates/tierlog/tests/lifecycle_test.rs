//! Integration tests for the full setup → emit → teardown lifecycle.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tierlog::{Level, LogError, LoggingRuntime, Options};

// ==================== Helper Functions ====================

fn read_lines(path: &Path) -> Vec<serde_json::Value> {
    let content = fs::read_to_string(path).expect("read log file");
    content
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid JSON line"))
        .collect()
}

fn messages(path: &Path) -> Vec<String> {
    read_lines(path)
        .into_iter()
        .map(|value| {
            value["message"]
                .as_str()
                .expect("message string")
                .to_string()
        })
        .collect()
}

// ==================== Severity Routing ====================

#[test]
fn records_land_in_the_sinks_their_severity_selects() {
    let dir = TempDir::new().expect("temp dir");
    let runtime = LoggingRuntime::new();
    let handle = runtime
        .setup(
            &Options::new("svc")
                .with_dir(dir.path())
                .with_level(Level::Trace)
                .with_critical_sink()
                .with_verbose_sink(),
        )
        .expect("setup");

    let logger = handle.logger();
    logger.info("a");
    logger.error("b");
    logger.debug("c");

    handle.teardown().close().expect("close");

    assert_eq!(messages(&dir.path().join("svc.log")), vec!["a", "b"]);
    assert_eq!(messages(&dir.path().join("svc.critical.log")), vec!["b"]);
    assert_eq!(messages(&dir.path().join("svc.verbose.log")), vec!["c"]);
}

#[test]
fn component_fields_travel_with_every_record() {
    let dir = TempDir::new().expect("temp dir");
    let runtime = LoggingRuntime::new();
    let handle = runtime
        .setup(&Options::new("svc").with_dir(dir.path()))
        .expect("setup");

    let http = handle.logger().with_field("component", serde_json::json!("http"));
    http.info("request handled");
    http.warn("slow response");

    handle.teardown().close().expect("close");

    for value in read_lines(&dir.path().join("svc.log")) {
        assert_eq!(value["fields"]["component"], "http");
    }
}

// ==================== Lifecycle ====================

#[test]
fn invalid_options_yield_an_error_and_no_handle() {
    let runtime = LoggingRuntime::new();
    let err = runtime
        .setup(&Options::new(""))
        .expect_err("empty name must be rejected");
    assert!(matches!(*err, LogError::InvalidOptions { .. }));
}

#[test]
fn emissions_after_teardown_are_quietly_discarded() {
    let dir = TempDir::new().expect("temp dir");
    let runtime = LoggingRuntime::new();
    let handle = runtime
        .setup(&Options::new("svc").with_dir(dir.path()))
        .expect("setup");

    handle.logger().info("kept");
    handle.teardown().close().expect("close");
    handle.teardown().close().expect("idempotent close");
    handle.logger().error("discarded");

    assert_eq!(messages(&dir.path().join("svc.log")), vec!["kept"]);
}

#[test]
fn a_restarted_process_appends_to_the_previous_run() {
    let dir = TempDir::new().expect("temp dir");

    // First run.
    {
        let runtime = LoggingRuntime::new();
        let handle = runtime
            .setup(&Options::new("svc").with_dir(dir.path()))
            .expect("first setup");
        handle.logger().info("first run");
        handle.teardown().close().expect("close");
    }

    // Restart: fresh runtime state, same name and directory.
    {
        let runtime = LoggingRuntime::new();
        let handle = runtime
            .setup(&Options::new("svc").with_dir(dir.path()))
            .expect("second setup");
        handle.logger().info("second run");
        handle.teardown().close().expect("close");
    }

    assert_eq!(
        messages(&dir.path().join("svc.log")),
        vec!["first run", "second run"]
    );
}

#[test]
fn caller_reporting_captures_this_test_file() {
    let dir = TempDir::new().expect("temp dir");
    let runtime = LoggingRuntime::new();
    let handle = runtime
        .setup(
            &Options::new("svc")
                .with_dir(dir.path())
                .with_caller_reporting(""),
        )
        .expect("setup");

    handle.logger().info("located");
    handle.teardown().close().expect("close");

    let lines = read_lines(&dir.path().join("svc.log"));
    let file = lines[0]["caller"]["file"].as_str().expect("caller file");
    assert!(
        file.ends_with("lifecycle_test.rs"),
        "unexpected caller file: {file}"
    );
}
