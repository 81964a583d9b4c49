use site_pulse::config::Config;
use site_pulse::monitor::Monitor;
use site_pulse::provider::{FetchError, ScriptedProvider};
use site_pulse::storage::{JsonFileRepository, Repository};
use site_pulse_core::{Opportunity, Priority, RawMeasurement};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn config(dir: &Path) -> Config {
    let content = format!(
        r#"
[[sites]]
id = "shop"
url = "https://shop.example"
label = "Shop"
role = "target"

[[sites]]
id = "rival"
url = "https://rival.example"
label = "Rival"
role = "competitor"

[[sites]]
id = "flaky"
url = "https://flaky.example"
label = "Flaky"
role = "competitor"

[collector]
max_retries = 1
base_delay_ms = 10
max_delay_ms = 10

[storage]
path = "{}"

[delivery]
kind = "file"
dir = "{}"
"#,
        dir.join("data/history.json").display(),
        dir.join("out").display()
    );
    Config::from_toml(&content).unwrap()
}

fn measurement(score: f64, lcp_ms: f64, opportunities: Vec<Opportunity>) -> RawMeasurement {
    RawMeasurement {
        performance_score: Some(score),
        lcp_ms: Some(lcp_ms),
        cls: Some(0.02),
        opportunities,
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_persists_and_delivers_report() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());

    let provider = ScriptedProvider::new()
        .respond(
            "https://shop.example",
            Ok(measurement(
                0.62,
                3400.0,
                vec![Opportunity::new("unused-javascript", "Reduce unused JavaScript")
                    .with_savings_ms(400)
                    .with_savings_bytes(60_000)],
            )),
        )
        .respond(
            "https://rival.example",
            Ok(measurement(
                0.88,
                1900.0,
                vec![Opportunity::new("unused-javascript", "Reduce unused JavaScript")
                    .with_savings_ms(900)],
            )),
        )
        .respond(
            "https://flaky.example",
            Err(FetchError::Transient("HTTP 503".to_string())),
        );

    let monitor = Monitor::from_config(&config, Arc::new(provider)).unwrap();
    let outcome = monitor.run(false).await.unwrap();

    let report = &outcome.report;
    assert_eq!(report.comparisons.len(), 3);
    assert_eq!(report.trailing_count(), 2);
    assert!(report.missing_competitors.contains("flaky"));
    assert_eq!(report.recommendations.len(), 1);
    assert_eq!(report.recommendations[0].estimated_savings_ms, Some(400));
    assert_eq!(report.recommendations[0].priority, Priority::Medium);

    let markdown = std::fs::read_to_string(dir.path().join("out/report.md")).unwrap();
    assert!(markdown.contains("## vs Rival"));
    assert!(markdown.contains("- Flaky"));
    assert!(dir.path().join("out/report.html").exists());

    let repository = JsonFileRepository::new(dir.path().join("data/history.json"), None);
    let saved = repository.latest_report().unwrap().unwrap();
    assert_eq!(saved.generated_at, report.generated_at);
    assert_eq!(saved.missing_competitors, report.missing_competitors);
    assert_eq!(repository.load_history("shop", 10).unwrap().len(), 1);
    assert!(repository.load_history("flaky", 10).unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unmeasurable_target_leaves_no_trace() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());

    let provider = ScriptedProvider::new()
        .respond(
            "https://shop.example",
            Err(FetchError::Transient("HTTP 429".to_string())),
        )
        .respond("https://rival.example", Ok(measurement(0.88, 1900.0, Vec::new())))
        .respond("https://flaky.example", Ok(measurement(0.7, 2500.0, Vec::new())));

    let monitor = Monitor::from_config(&config, Arc::new(provider)).unwrap();
    let err = monitor.run(false).await.unwrap_err();

    assert!(err.is_missing_target());
    assert!(!dir.path().join("data/history.json").exists());
    assert!(!dir.path().join("out/report.md").exists());
}
