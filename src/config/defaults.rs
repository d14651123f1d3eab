//! Default configuration values

use super::schema::Config;

/// Get the default configuration
pub fn default_config() -> Config {
    Config::default()
}

/// Annotated starter file written by `config init`
pub fn starter_yaml() -> String {
    let body = serde_yaml::to_string(&default_config()).unwrap_or_default();
    format!(
        "# topomap configuration\n# Env overrides: TOPOMAP_ENDPOINT, TOPOMAP_DEFAULT_NAMESPACE, TOPOMAP_LAYOUT_ENGINE\n{}",
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_yaml_round_trips() {
        let yaml = starter_yaml();
        assert!(yaml.starts_with("# topomap configuration"));
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, default_config());
    }
}
