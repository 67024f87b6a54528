use std::env;
use std::path::PathBuf;

pub const DEFAULT_REGISTRY_PATH: &str = "assets/block_palette.json";

/// Settings read from the environment (and `.env`, if present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub registry_path: PathBuf,
    pub log_sections: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            registry_path: lookup("REGISTRY_PATH")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_REGISTRY_PATH.to_string())
                .into(),
            log_sections: lookup("LOG_SECTIONS").is_some_and(|s| s == "true"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.registry_path, PathBuf::from(DEFAULT_REGISTRY_PATH));
        assert!(!config.log_sections);
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(|key| match key {
            "REGISTRY_PATH" => Some("/tmp/palette.json".into()),
            "LOG_SECTIONS" => Some("true".into()),
            _ => None,
        });
        assert_eq!(config.registry_path, PathBuf::from("/tmp/palette.json"));
        assert!(config.log_sections);
    }
}
