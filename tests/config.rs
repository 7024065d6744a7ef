use typeconsole::components::editor::{ContentSyntax, EditorMode};
use typeconsole::config::{Config, FormConfig};

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.console.base_url, "http://localhost:8080/");
    assert_eq!(config.console.locale, "en");
    assert_eq!(config.search.page_size, 10);
    assert!(!config.logging.enabled);
    assert_eq!(config.strings.accept, "Accept");
}

#[test]
fn test_config_validation() {
    let mut config = Config::default();

    // Valid config should pass
    assert!(config.validate().is_ok());

    config.console.base_url = "not a url".to_string();
    assert!(config.validate().is_err());

    config = Config::default();
    config.search.page_size = 0;
    assert!(config.validate().is_err());

    config = Config::default();
    config.logging.level = "loud".to_string();
    assert!(config.validate().is_err());

    config = Config::default();
    config.console.locale = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string_pretty(&config).unwrap();
    assert!(toml_str.contains("locale = \"en\""));
    assert!(toml_str.contains("page_size = 10"));
}

#[test]
fn test_partial_config_deserialization() {
    // Partial TOML configs merge with defaults
    let partial_toml = r#"
[console]
locale = "es"

[logging]
enabled = true
"#;

    let config: Config = toml::from_str(partial_toml).unwrap();
    assert_eq!(config.console.locale, "es");
    assert_eq!(config.console.base_url, "http://localhost:8080/");
    assert!(config.logging.enabled);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.search.page_size, 10);
}

#[test]
fn test_form_config_deserialization() {
    let form_toml = r#"
target_url = "http://localhost:8080/en/product"
data_url = "http://localhost:8080/en/product?view=html"
component_id = "2"
large_payload = true

[confirmations]
drop = "Drop these fields?"

[editors]
description = "visual"
attributes = "json"
stylesheet = "css"
"#;

    let config: FormConfig = toml::from_str(form_toml).unwrap();
    assert!(config.large_payload);
    assert!(!config.unload_guard);
    assert_eq!(config.component_id.as_deref(), Some("2"));
    assert_eq!(config.confirmations.drop, "Drop these fields?");
    assert_eq!(config.confirmations.delete, "Delete the selected objects?");
    assert_eq!(config.labels.drop_index, "Drop index");
    assert_eq!(config.editors["description"], EditorMode::Visual);
    assert_eq!(config.editors["attributes"], EditorMode::Source(ContentSyntax::Json));
    assert_eq!(
        config.editors["stylesheet"],
        EditorMode::Source(ContentSyntax::Named("css".to_string()))
    );
}
