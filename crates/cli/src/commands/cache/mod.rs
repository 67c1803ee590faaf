use clap::Subcommand;
use keystone_cache::{Cache, Document, EntrySummary};
use keystone_codec::{serialize, MarshalOptions};
use keystone_core::CacheConfig;

#[derive(Subcommand)]
pub enum CacheCommands {
    /// List live entries
    List,
    /// Remove expired entries
    Clean,
    /// Remove every entry
    Clear,
    /// Print one entry as JSON
    Get {
        /// Key before prefixing
        key: String,
    },
    /// Remove one entry
    Unset {
        /// Key before prefixing
        key: String,
    },
}

impl CacheCommands {
    pub async fn execute(self, config: &CacheConfig) -> eyre::Result<()> {
        let cache = Cache::from_config(config).await?;
        tracing::debug!(driver = cache.driver_id(), "using cache driver");

        let outcome = self.run(&cache).await;
        cache.destroy().await?;
        outcome
    }

    async fn run(self, cache: &Cache) -> eyre::Result<()> {
        match self {
            CacheCommands::List => {
                let mut entries = cache.list().await?;
                entries.sort_by(|a, b| a.id.cmp(&b.id));
                for entry in &entries {
                    println!("{}", format_entry(entry));
                }
                tracing::info!(count = entries.len(), "listed cache entries");
            }
            CacheCommands::Clean => {
                cache.clean().await?;
                tracing::info!(driver = cache.driver_id(), "cleaned expired entries");
            }
            CacheCommands::Clear => {
                cache.clear().await?;
                tracing::info!(driver = cache.driver_id(), "cleared cache");
            }
            CacheCommands::Get { key } => match cache.get(&key).await? {
                Some(value) => println!("{}", render(&value)?),
                None => eyre::bail!("no live entry for '{key}'"),
            },
            CacheCommands::Unset { key } => {
                cache.unset(&key).await?;
                tracing::info!(key = %key, "removed entry");
            }
        }
        Ok(())
    }
}

fn format_entry(entry: &EntrySummary) -> String {
    let expiry = entry
        .expiry
        .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());
    format!("{}\texpires {}", entry.id, expiry)
}

/// Plain JSON when possible; graphs with cycles fall back to the tagged encoding
fn render(value: &Document) -> eyre::Result<String> {
    match value.to_json() {
        Ok(json) => Ok(serde_json::to_string_pretty(&json)?),
        Err(_) => Ok(serialize(value, &MarshalOptions::default())?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_entry() {
        let entry = EntrySummary {
            id: "app:user".to_string(),
            created: None,
            expiry: None,
        };
        assert_eq!(format_entry(&entry), "app:user\texpires never");

        let at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let entry = EntrySummary {
            expiry: Some(at),
            ..entry
        };
        assert_eq!(format_entry(&entry), "app:user\texpires 2030-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_render_plain_json() {
        let value = Document::from("hello");
        assert_eq!(render(&value).unwrap(), "\"hello\"");
    }
}
