use anyhow::{anyhow, bail, Context};
use gamefinder_engine::elastic::DEFAULT_GAME_INDEX;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineConfig {
    Elastic {
        endpoint: String,
        index: String,
        timeout: Duration,
    },
    Memory {
        seed: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind: SocketAddr,
    pub engine: EngineConfig,
    pub tag_cache_ttl: Duration,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR")?;
        let timeout_ms = parse_or(var("ENGINE_TIMEOUT_MS"), 10_000, "ENGINE_TIMEOUT_MS")?;
        let tag_cache_secs = parse_or(var("TAG_CACHE_SECS"), 86_400, "TAG_CACHE_SECS")?;

        let engine = match var("ENGINE").as_deref().unwrap_or("elastic") {
            "elastic" => EngineConfig::Elastic {
                endpoint: var("ELASTICSEARCH_ENDPOINT")
                    .ok_or_else(|| anyhow!("ELASTICSEARCH_ENDPOINT is required"))?,
                index: var("GAME_INDEX").unwrap_or_else(|| DEFAULT_GAME_INDEX.to_string()),
                timeout: Duration::from_millis(timeout_ms),
            },
            "memory" => EngineConfig::Memory {
                seed: var("SEED_PATH").map(PathBuf::from),
            },
            other => bail!("unknown ENGINE {:?} (expected elastic or memory)", other),
        };

        Ok(Config {
            bind,
            engine,
            tag_cache_ttl: Duration::from_secs(tag_cache_secs),
            otlp_endpoint: var("OTLP_ENDPOINT"),
        })
    }
}

fn parse_or(value: Option<String>, default: u64, key: &str) -> anyhow::Result<u64> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", key, v)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn elastic_defaults() {
        let cfg = load(&[("ELASTICSEARCH_ENDPOINT", "http://es:9200")]).unwrap();
        assert_eq!(cfg.bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.tag_cache_ttl, Duration::from_secs(86_400));
        assert_eq!(
            cfg.engine,
            EngineConfig::Elastic {
                endpoint: "http://es:9200".into(),
                index: "boardgames".into(),
                timeout: Duration::from_millis(10_000),
            }
        );
        assert_eq!(cfg.otlp_endpoint, None);
    }

    #[test]
    fn elastic_requires_endpoint() {
        assert!(load(&[]).is_err());
        assert!(load(&[("ELASTICSEARCH_ENDPOINT", "  ")]).is_err());
    }

    #[test]
    fn memory_engine_needs_no_cluster() {
        let cfg = load(&[("ENGINE", "memory"), ("SEED_PATH", "/data/games.json")]).unwrap();
        assert_eq!(
            cfg.engine,
            EngineConfig::Memory {
                seed: Some(PathBuf::from("/data/games.json"))
            }
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load(&[("ENGINE", "solr")]).is_err());
        assert!(load(&[("ENGINE", "memory"), ("TAG_CACHE_SECS", "a day")]).is_err());
        assert!(load(&[("ENGINE", "memory"), ("BIND_ADDR", "localhost")]).is_err());
    }
}
