use dbmcp_domain::config::Config;

#[test]
fn default_host_is_wildcard() {
    let config = Config::default();
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn explicit_host_parses() {
    let toml_str = r#"
[server]
host = "127.0.0.1"
port = 3210
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 3210);
}

#[test]
fn default_pool_max_size_matches_spec() {
    let config = Config::default();
    assert_eq!(config.pool.pool_max_size, 20);
    assert_eq!(config.pool.pool_size, 5);
    assert_eq!(config.pool.max_overflow, 10);
}

#[test]
fn default_llm_max_iterations_matches_spec() {
    let config = Config::default();
    assert_eq!(config.llm.max_iterations, 15);
    assert_eq!(config.llm.scheduler_step_cap(), 40);
}
