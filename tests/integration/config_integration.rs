//! Integration tests for Configuration System

use super::test_utils::with_xdg_env;
use clausecraft::cli::RunContext;
use clausecraft::config::{ConfigLoader, ProviderType, ValidationError};
use clausecraft::error::ApiError;
use tempfile::TempDir;

#[test]
fn test_xdg_config_path_follows_xdg_config_home() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        assert_eq!(
            ConfigLoader::xdg_config_path(),
            Some(test_dir.path().join("clausecraft").join("config.toml"))
        );
    });
}

#[test]
fn test_layers_merge_in_order() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        let global = test_dir.path().join("clausecraft");
        std::fs::create_dir_all(&global).unwrap();
        std::fs::write(
            global.join("config.toml"),
            r#"
[provider]
provider_type = "openai"
api_key_env = "TEAM_OPENAI_KEY"

[retry]
max_attempts = 4
base_delay_ms = 500
"#,
        )
        .unwrap();

        let workspace = test_dir.path().join("workspace");
        std::fs::create_dir_all(workspace.join("config")).unwrap();
        std::fs::write(
            workspace.join("config/config.toml"),
            r#"
[provider]
model = "gpt-4o"

[server]
port = 8080
permissive_cors = true
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.provider.provider_type, ProviderType::OpenAI);
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.provider.api_key_env_name(), "TEAM_OPENAI_KEY");
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.server.port, 8080);
        assert!(config.server.permissive_cors);
        assert!(config.validate().is_ok());
    });
}

#[test]
fn test_invalid_values_are_reported_per_section() {
    let test_dir = TempDir::new().unwrap();
    let config_file = test_dir.path().join("clausecraft.toml");
    std::fs::write(
        &config_file,
        r#"
[provider]
endpoint = "ftp://example.com"

[provider.default_options]
temperature = 0.7

[jobs]
idle_timeout_secs = 0

[logging]
output = "syslog"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 3);
    assert!(matches!(errors[0], ValidationError::Provider(_)));
    assert!(matches!(errors[1], ValidationError::Jobs(_)));
    assert!(matches!(errors[2], ValidationError::Logging(_)));

    match RunContext::new(test_dir.path().to_path_buf(), Some(config_file)) {
        Err(ApiError::ConfigError(message)) => {
            assert!(message.contains("Provider: endpoint"));
            assert!(message.contains("Logging: Invalid log output"));
        }
        Err(other) => panic!("expected ConfigError, got {}", other),
        Ok(_) => panic!("expected ConfigError"),
    }
}

#[test]
fn test_run_context_uses_workspace_config() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        let workspace = test_dir.path().join("workspace");
        std::fs::create_dir_all(workspace.join("config")).unwrap();
        std::fs::write(
            workspace.join("config/config.toml"),
            "[jobs]\nchannel_capacity = 8\n",
        )
        .unwrap();

        let context = RunContext::new(workspace, None).unwrap();
        assert_eq!(context.config().jobs.channel_capacity, 8);
        assert_eq!(context.config().provider.model, "gemini-2.5-flash");
    });
}
