use codemaster::service::WeatherService;
use codemaster::service::doctor::{self, CheckStatus};
use codemaster::{ApiKeys, Config, ConfigStore, DataDir};

#[tokio::test]
async fn fresh_data_directory_without_keys_still_works() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let data_dir = DataDir::resolve(Some(dir.path().join("home")));
    data_dir.ensure().expect("ensure failed");

    let store = ConfigStore::open(data_dir.config_file()).expect("open store");
    assert_eq!(store.config().recent_projects, Config::default().recent_projects);

    let keys = ApiKeys::default();
    let weather = WeatherService::new(reqwest::Client::new(), store.config(), keys.weather.clone())
        .current(None)
        .await;
    assert!(weather.fallback);
    assert_eq!(weather.location, store.config().weather_location);

    let report = doctor::run(&data_dir, &keys).await;
    assert!(report.healthy());
    let key_checks: Vec<_> = report
        .checks
        .iter()
        .filter(|c| c.name.ends_with(" key"))
        .collect();
    assert!(!key_checks.is_empty());
    assert!(key_checks.iter().all(|c| c.status == CheckStatus::Warn));
}
