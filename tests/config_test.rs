//! Tests for layered settings loading

use std::path::PathBuf;

use rollup::application::{ApplicationError, Reducer, RenderStyle};
use rollup::config::{local_config_path, Settings, LOCAL_CONFIG_FILE};
use rollup::domain::ReparentPolicy;
use rollup::util::testing;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join(LOCAL_CONFIG_FILE);
    std::fs::write(&path, content).expect("write config");
    path
}

#[test]
fn given_local_file_when_loading_then_overrides_defaults() {
    // Arrange
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        r#"
sentinel = "ROOT"
reparent = "last-writer-wins"
reducer = "mean"
default_leaf_value = 0.0

[render]
style = "tabular"
value_column = "Exposure"
"#,
    );

    // Act
    let settings = Settings::load_file(&path).unwrap();

    // Assert
    assert_eq!(settings.sentinel, "ROOT");
    assert_eq!(settings.reparent, ReparentPolicy::LastWriterWins);
    assert_eq!(settings.reducer, Reducer::Mean);
    assert_eq!(settings.default_leaf_value, Some(0.0));
    assert_eq!(settings.render.style, RenderStyle::Csv);
    assert_eq!(settings.render.value_column, "Exposure");
    assert_eq!(settings.render.precision, 2);
}

#[test]
fn given_unparsable_file_when_loading_then_config_error() {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "reducer = [\n");

    let result = Settings::load_file(&path);

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_unknown_reducer_when_loading_then_config_error() {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "reducer = \"median\"\n");

    assert!(matches!(
        Settings::load_file(&path),
        Err(ApplicationError::Config { .. })
    ));
}

#[test]
fn given_unknown_reducer_in_environment_when_loading_then_config_error() {
    // Only test in this binary that touches the process environment
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "");
    std::env::set_var("ROLLUP_REDUCER", "bogus");

    let result = Settings::load(Some(&path));
    std::env::remove_var("ROLLUP_REDUCER");

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_precision_above_limit_when_loading_then_rejected() {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "[render]\nprecision = 400\n");

    assert!(matches!(
        Settings::load_file(&path),
        Err(ApplicationError::Config { .. })
    ));
}

#[test]
fn given_zero_value_width_when_loading_then_rejected() {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "[render]\nvalue_width = 0\n");

    assert!(matches!(
        Settings::load_file(&path),
        Err(ApplicationError::Config { .. })
    ));
}

#[test]
fn given_missing_explicit_file_when_loading_then_config_error() {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();

    let result = Settings::load_file(&temp.path().join("nope.toml"));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_template_when_written_and_loaded_then_defaults() {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, &Settings::template());

    assert_eq!(Settings::load_file(&path).unwrap(), Settings::default());
}

#[test]
fn given_directory_when_resolving_local_path_then_dotfile_inside() {
    let dir = PathBuf::from("/work/project");

    assert_eq!(
        local_config_path(&dir),
        PathBuf::from("/work/project/.rollup.toml")
    );
}
