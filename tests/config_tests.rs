use shardconn::{Config, ConfigSource, ConnectionName};
use std::io::Write;

#[test]
fn test_config_loading() {
    let config = Config::from_file("tests/fixtures/shardconn.toml").unwrap();
    assert_eq!(config.connections.len(), 2);

    let reports = &config.connections["reports"];
    assert_eq!(reports.host, "r1");
    assert_eq!(reports.port, 5432);

    let shard = config
        .lookup(&ConnectionName::parse("shard-one").unwrap())
        .unwrap();
    assert_eq!(shard.user, "app");
    assert_eq!(shard.password_env.as_deref(), Some("SHARD_ONE_PASSWORD"));
    assert_eq!(shard.dbname.as_deref(), Some("orders"));
}

#[test]
fn test_config_missing_file() {
    let result = Config::from_file("nonexistent.toml");
    assert!(result.is_err());
}

#[test]
fn test_empty_config_has_no_connections() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# nothing configured yet").unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert!(config.connections.is_empty());
    assert!(config.connection_names().is_empty());
}

#[test]
fn test_connection_names_are_normalized() {
    let config = Config::from_file("tests/fixtures/shardconn.toml").unwrap();
    let names: Vec<String> = config
        .connection_names()
        .iter()
        .map(|n| n.as_str().to_string())
        .collect();
    assert_eq!(names, vec!["reports".to_string(), "shard_one".to_string()]);
}
