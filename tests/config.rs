use std::fs;

use landval::{config::ConfigLoader, parcel::ParcelKind, valuation::Valuation};
use tempfile::tempdir;

const RURAL_DEMO: &str = r#"
name: delta_farm
seed: 99
tick_interval_ms: 250
parcel:
  location_name: Thanjavur Delta
  kind: Rural
  area: 10
  distance_from_center_km: 20
  infrastructure_rating: 5
market_trend:
  - { label: "2024", price: 7100000 }
  - { label: "2025", price: 8500000 }
"#;

#[test]
fn loader_reads_yaml_file() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("delta.yaml"), RURAL_DEMO).unwrap();

    let config = ConfigLoader::new(dir.path())
        .load("delta.yaml")
        .expect("config parses");
    assert_eq!(config.name, "delta_farm");
    assert_eq!(config.seed, Some(99));
    assert_eq!(config.tick_interval().as_millis(), 250);
    assert_eq!(config.parcel.kind, ParcelKind::Rural);
    assert_eq!(config.parcel.nitrogen, 45.0, "unset fields keep form defaults");
    assert_eq!(config.market_trend.len(), 2);

    let valuation = Valuation::appraise(&config.parcel).expect("valid parcel");
    assert!((valuation.final_price - 9_200_000.0).abs() < 1e-6);
}

#[test]
fn missing_file_reports_path() {
    let dir = tempdir().expect("tempdir");
    let err = ConfigLoader::new(dir.path())
        .load("absent.yaml")
        .expect_err("file does not exist");
    assert!(format!("{err:#}").contains("absent.yaml"));
}

#[test]
fn invalid_values_are_rejected() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("bad.yaml"), "tick_interval_ms: 0\n").unwrap();
    fs::write(
        dir.path().join("blank.yaml"),
        "market_trend:\n  - { label: \" \", price: 1 }\n",
    )
    .unwrap();

    let loader = ConfigLoader::new(dir.path());
    assert!(loader.load("bad.yaml").is_err());
    assert!(loader.load("blank.yaml").is_err());
}

#[test]
fn no_file_means_defaults() {
    let config = ConfigLoader::new(".").load_or_default(None).unwrap();
    assert_eq!(config.parcel.location_name, "Chennai Suburban");
    assert_eq!(config.tick_interval().as_millis(), 1_500);
}

#[test]
fn bundled_scenarios_load() {
    let loader = ConfigLoader::new(env!("CARGO_MANIFEST_DIR"));
    for file in ["scenarios/chennai_suburban.yaml", "scenarios/delta_farm.yaml"] {
        let config = loader.load(file).expect("bundled scenario parses");
        config.parcel.validate().expect("bundled parcel is in range");
    }
}
