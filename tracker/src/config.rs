use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

pub const DEFAULT_COLLECTION: &str = "transactions";
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Runtime settings read from `TRACKER_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub collection: String,
    pub recent_limit: usize,
    pub seed_path: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            recent_limit: DEFAULT_RECENT_LIMIT,
            seed_path: None,
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key -> value source. Bad values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let collection = match lookup("TRACKER_COLLECTION") {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            Some(_) => {
                warn!(
                    "Empty TRACKER_COLLECTION in environment. Using default collection '{}'.",
                    DEFAULT_COLLECTION
                );
                DEFAULT_COLLECTION.to_string()
            }
            None => DEFAULT_COLLECTION.to_string(),
        };

        let recent_limit = match lookup("TRACKER_RECENT_LIMIT") {
            Some(raw) => match usize::from_str(raw.trim()) {
                Ok(limit) if limit > 0 => {
                    info!("Using recent limit {} from TRACKER_RECENT_LIMIT.", limit);
                    limit
                }
                _ => {
                    warn!(
                        "Invalid TRACKER_RECENT_LIMIT value '{}'. Using default {}.",
                        raw, DEFAULT_RECENT_LIMIT
                    );
                    DEFAULT_RECENT_LIMIT
                }
            },
            None => DEFAULT_RECENT_LIMIT,
        };

        let seed_path = lookup("TRACKER_SEED")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Self {
            collection,
            recent_limit,
            seed_path,
        }
    }
}
