use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_DB_PATH: &str = "data/areas.redb";
pub const DEFAULT_DIST_DIR: &str = "dist";
pub const DEFAULT_CELL_LEVEL: u8 = 13;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub dist_dir: PathBuf,
    /// S2 level used both to index areas and to cover query viewports.
    pub cell_level: u8,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unset or empty variables take their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| format!("PORT must be a port number, got {:?}", v))?,
            None => DEFAULT_PORT,
        };
        let cell_level = match var("S2_CELL_LEVEL") {
            Some(v) => {
                let level: u8 = v
                    .trim()
                    .parse()
                    .map_err(|_| format!("S2_CELL_LEVEL must be an integer, got {:?}", v))?;
                if level > 30 {
                    return Err(format!("S2_CELL_LEVEL must be at most 30, got {}", level));
                }
                level
            }
            None => DEFAULT_CELL_LEVEL,
        };

        Ok(Config {
            port,
            db_path: PathBuf::from(var("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string())),
            dist_dir: PathBuf::from(
                var("DIST_DIR").unwrap_or_else(|| DEFAULT_DIST_DIR.to_string()),
            ),
            cell_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.port, 8081);
        assert_eq!(cfg.db_path, PathBuf::from("data/areas.redb"));
        assert_eq!(cfg.dist_dir, PathBuf::from("dist"));
        assert_eq!(cfg.cell_level, 13);
    }

    #[test]
    fn test_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("DB_PATH", "/var/lib/areas.redb"),
            ("DIST_DIR", "public"),
            ("S2_CELL_LEVEL", "12"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.db_path, PathBuf::from("/var/lib/areas.redb"));
        assert_eq!(cfg.dist_dir, PathBuf::from("public"));
        assert_eq!(cfg.cell_level, 12);
    }

    #[test]
    fn test_empty_value_falls_back_to_default() {
        let cfg = Config::from_lookup(lookup(&[("PORT", "  ")])).unwrap();
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(Config::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup(&[("S2_CELL_LEVEL", "31")])).is_err());
        assert!(Config::from_lookup(lookup(&[("S2_CELL_LEVEL", "-1")])).is_err());
    }
}
