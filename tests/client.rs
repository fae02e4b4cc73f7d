#![cfg(unix)]

mod support;

use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use serial_test::serial;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use toolbridge::{
    BridgeConfig, CommandOptions, MemoryOutputSink, RunError, RunOverrides, ToolClient, ToolError,
};

use support::{CountingSpawner, FULL_HELP, Fixture, install_local, invocations};

fn options(value: serde_json::Value) -> CommandOptions {
    match value {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => CommandOptions::new(),
    }
}

fn client(fixture: &Fixture, spawner: Option<Arc<CountingSpawner>>) -> ToolClient {
    let config = BridgeConfig::default();
    let mut engine = fixture.engine(&config);
    if let Some(spawner) = spawner {
        engine = engine.with_spawner(spawner);
    }
    let detector = Arc::new(fixture.detector(engine, &config));
    ToolClient::new(detector, config.runner.clone())
}

#[tokio::test]
#[serial]
async fn invalid_input_is_rejected_before_any_process_starts() -> io::Result<()> {
    let fixture = Fixture::new()?;
    install_local(&fixture.root, FULL_HELP)?;
    let spawner = Arc::new(CountingSpawner::default());
    let client = client(&fixture, Some(Arc::clone(&spawner)));

    let bogus = client
        .generate("bogus-type", "Name", &CommandOptions::new())
        .await;
    assert!(matches!(
        bogus,
        Err(ToolError::InvalidInput { field: "type", .. })
    ));

    let bad_name = client
        .generate("component", "Bad Name!", &CommandOptions::new())
        .await;
    assert!(matches!(
        bad_name,
        Err(ToolError::InvalidInput { field: "name", .. })
    ));

    let bad_option = client
        .generate("page", "Home", &options(json!({ "path": ["a", "b"] })))
        .await;
    assert!(matches!(bad_option, Err(ToolError::InvalidInput { .. })));

    let unknown_option = client
        .analyze::<serde_json::Value>(&options(json!({ "rm-rf": true })))
        .await;
    assert!(unknown_option.is_err_and(|err| err.is_validation()));

    let bad_feature = client.add_feature("../auth", &CommandOptions::new()).await;
    assert!(matches!(
        bad_feature,
        Err(ToolError::InvalidInput { field: "feature", .. })
    ));

    assert_eq!(spawner.calls(), 0);
    assert!(client.detector().cached().is_none());
    Ok(())
}

#[tokio::test]
#[serial]
async fn generate_passes_subcommand_and_flags() -> io::Result<()> {
    let fixture = Fixture::new()?;
    install_local(&fixture.root, FULL_HELP)?;
    let client = client(&fixture, None);

    let result = client
        .generate(
            "component",
            "UserCard",
            &options(json!({ "style": "scss", "skip-tests": true, "flat": false })),
        )
        .await
        .map_err(io::Error::other)?;

    assert!(result.success());
    assert_eq!(
        result.stdout(),
        "ran generate component UserCard --skip-tests --style scss\n"
    );
    Ok(())
}

#[derive(Debug, Deserialize, PartialEq)]
struct Report {
    files: u32,
    last: String,
}

#[tokio::test]
#[serial]
async fn analyze_appends_json_flag_and_parses_stdout() -> io::Result<()> {
    let fixture = Fixture::new()?;
    install_local(&fixture.root, FULL_HELP)?;
    let client = client(&fixture, None);

    let report: Report = client
        .analyze(&options(json!({ "depth": 2 })))
        .await
        .map_err(io::Error::other)?;

    assert_eq!(
        report,
        Report {
            files: 3,
            last: "--json".to_string(),
        }
    );
    Ok(())
}

#[tokio::test]
#[serial]
async fn doctor_output_is_teed_into_the_sink() -> io::Result<()> {
    let fixture = Fixture::new()?;
    install_local(&fixture.root, FULL_HELP)?;
    let sink = Arc::new(MemoryOutputSink::new());
    let client = client(&fixture, None).with_output(sink.clone());

    let result = client.doctor().await.map_err(io::Error::other)?;

    assert_eq!(result.stdout(), "ran doctor\n");
    assert_eq!(sink.contents(), "ran doctor\n");
    Ok(())
}

#[tokio::test]
#[serial]
async fn raw_run_reports_non_zero_exit_without_error() -> io::Result<()> {
    let fixture = Fixture::new()?;
    install_local(&fixture.root, FULL_HELP)?;
    let client = client(&fixture, None);

    let result = client
        .run(["fail"], RunOverrides::default())
        .await
        .map_err(io::Error::other)?;

    assert!(!result.success());
    assert_eq!(result.exit_code(), 4);
    assert_eq!(result.stderr(), "boom\n");
    Ok(())
}

#[tokio::test]
#[serial]
async fn raw_run_applies_environment_overrides() -> io::Result<()> {
    let fixture = Fixture::new()?;
    install_local(&fixture.root, FULL_HELP)?;
    let client = client(&fixture, None);

    let overrides = RunOverrides {
        env: HashMap::from([("WEBFORGE_MODE".to_string(), "ci".to_string())]),
        ..RunOverrides::default()
    };
    let result = client
        .run(["env-check"], overrides)
        .await
        .map_err(io::Error::other)?;

    assert_eq!(result.stdout(), "mode=ci\n");
    Ok(())
}

#[tokio::test]
#[serial]
async fn version_comes_from_detection() -> io::Result<()> {
    let fixture = Fixture::new()?;
    let log = install_local(&fixture.root, FULL_HELP)?;
    let client = client(&fixture, None);

    assert_eq!(
        client.version().await.map_err(io::Error::other)?,
        "2.4.1"
    );
    client.doctor().await.map_err(io::Error::other)?;
    assert_eq!(invocations(&log, "--version"), 1);
    assert_eq!(invocations(&log, "doctor"), 1);
    Ok(())
}

#[tokio::test]
#[serial]
async fn missing_tool_is_reported_as_not_detected() -> io::Result<()> {
    let fixture = Fixture::new()?;
    let client = client(&fixture, None);

    let err = client.doctor().await;
    assert!(matches!(err, Err(ToolError::NotDetected { .. })));
    assert!(matches!(
        client.version().await,
        Err(ToolError::NotDetected { .. })
    ));
    Ok(())
}

#[tokio::test]
#[serial]
async fn subcommands_missing_from_help_are_unsupported() -> io::Result<()> {
    let fixture = Fixture::new()?;
    let log = install_local(&fixture.root, &["generate", "doctor"])?;
    let client = client(&fixture, None);

    let err = client.add_feature("auth", &CommandOptions::new()).await;
    assert!(matches!(
        err,
        Err(ToolError::UnsupportedFeature { ref feature }) if feature == "add"
    ));
    assert_eq!(invocations(&log, "add"), 0);
    Ok(())
}

#[tokio::test]
#[serial]
async fn disposed_client_rejects_further_commands() -> io::Result<()> {
    let fixture = Fixture::new()?;
    install_local(&fixture.root, FULL_HELP)?;
    let client = client(&fixture, None);
    assert!(client.detector().detect(false).await.is_some());

    client.dispose();

    assert!(client.engine().is_disposed());
    assert!(client.detector().cached().is_none());
    let err = client
        .generate("hook", "useAuth", &CommandOptions::new())
        .await;
    assert!(matches!(err, Err(ToolError::Run(RunError::Disposed))));
    assert!(client.detector().cached().is_none());
    Ok(())
}

#[tokio::test]
#[serial]
async fn raw_run_confines_working_directory_to_workspace() -> io::Result<()> {
    let fixture = Fixture::new()?;
    install_local(&fixture.root, FULL_HELP)?;
    std::fs::create_dir_all(fixture.root.join("apps/web"))?;
    let spawner = Arc::new(CountingSpawner::default());
    let client = client(&fixture, Some(Arc::clone(&spawner)));

    let escape = RunOverrides {
        cwd: Some("..".into()),
        ..RunOverrides::default()
    };
    let err = client.run(["build"], escape).await;
    assert!(matches!(
        err,
        Err(ToolError::InvalidInput { field: "cwd", .. })
    ));
    assert_eq!(spawner.calls(), 0);

    let nested = RunOverrides {
        cwd: Some("apps/web".into()),
        ..RunOverrides::default()
    };
    let result = client
        .run(["build"], nested)
        .await
        .map_err(io::Error::other)?;
    assert_eq!(result.stdout(), "ran build\n");
    Ok(())
}
