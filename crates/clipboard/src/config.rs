use serde::Deserialize;

/// Clipboard subsystem settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Bounded size of the copy content cache; oldest entries are evicted.
    pub cache_capacity: usize,
    /// Upper bound on resolved destination size. A paste whose destination
    /// exceeds this fails rather than tiling without bound.
    pub max_paste_cells: usize,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 10,
            max_paste_cells: 1_000_000,
        }
    }
}

impl ClipboardConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClipboardConfig::default();
        assert_eq!(config.cache_capacity, 10);
        assert_eq!(config.max_paste_cells, 1_000_000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClipboardConfig::from_toml_str("cache_capacity = 4\n").unwrap();
        assert_eq!(config.cache_capacity, 4);
        assert_eq!(config.max_paste_cells, 1_000_000);
    }
}
