use ad_core::config::Config;

/// Run the `config` subcommand: print the effective configuration as TOML.
pub fn run(config: &Config) -> anyhow::Result<()> {
    print!("{}", render(config)?);
    Ok(())
}

fn render(config: &Config) -> anyhow::Result<String> {
    let body = config.to_toml()?;
    Ok(format!("# effective configuration\n{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_config_parses_back() {
        let mut config = Config::default();
        config.poller.interval_ms = 500;
        let text = render(&config).unwrap();
        assert!(text.starts_with("# "));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, &text).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.poller.interval_ms, 500);
        assert_eq!(loaded.backend.base_url, config.backend.base_url);
    }
}
