use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::Limits;
use crate::error::Error;

/// Run configuration, read from YAML.
///
/// ```yaml
/// start: 0x0
/// max_steps: 1000000
/// max_depth: 64
/// dump:
///   - { addr: 0x300, len: 16 }
///   - { addr: 0x400, len: 8, words: true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub start: u32,
    pub max_steps: u64,
    pub max_depth: usize,
    pub dump: Vec<Region>,
}

/// Memory range printed after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub addr: u32,
    pub len: u32,
    /// Print 32-bit words instead of bytes
    #[serde(default)]
    pub words: bool,
}

impl Default for Config {
    fn default() -> Self {
        let limits = Limits::default();
        Config {
            start: 0,
            max_steps: limits.max_steps,
            max_depth: limits.max_depth,
            dump: vec![],
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| Error::FileOpen(name.clone(), e))?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|e| Error::Config(name, e))
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        serde_yaml::from_str(text).map_err(|e| Error::Config("<inline>".to_string(), e))
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_steps: self.max_steps,
            max_depth: self.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.limits(), Limits::default());
    }

    #[test]
    fn regions() {
        let config = Config::parse(
            "
start: 0x100
max_depth: 8
dump:
  - { addr: 0x300, len: 16 }
  - addr: 1024
    len: 8
    words: true
",
        )
        .unwrap();
        assert_eq!(config.start, 0x100);
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.max_steps, Limits::default().max_steps);
        assert_eq!(
            config.dump,
            vec![
                Region {
                    addr: 0x300,
                    len: 16,
                    words: false
                },
                Region {
                    addr: 0x400,
                    len: 8,
                    words: true
                },
            ]
        );
    }

    #[test]
    fn bad_yaml() {
        assert!(matches!(
            Config::parse("dump: 3"),
            Err(Error::Config(..))
        ));
    }
}
