use clap::Subcommand;
use keystone_core::LockConfig;
use keystone_lock::{Lock, LockRecord};

#[derive(Subcommand)]
pub enum LockCommands {
    /// List stored lock records
    List,
    /// Remove records past their expiry or TTL
    Clean,
    /// Remove every record
    Clear,
    /// Release one lock by key
    Release {
        /// Text key as passed to the lock
        key: String,
    },
}

impl LockCommands {
    pub async fn execute(self, config: &LockConfig) -> eyre::Result<()> {
        let lock = Lock::from_config(config).await?;
        let outcome = self.run(&lock).await;
        lock.destroy().await?;
        outcome
    }

    async fn run(self, lock: &Lock) -> eyre::Result<()> {
        match self {
            LockCommands::List => {
                let now = chrono::Utc::now();
                let records = lock.list().await?;
                for record in &records {
                    println!("{}", format_record(record, now));
                }
                tracing::info!(count = records.len(), "listed lock records");
            }
            LockCommands::Clean => {
                let removed = lock.clean().await?;
                tracing::info!(removed, "cleaned abandoned locks");
            }
            LockCommands::Clear => {
                let removed = lock.clear().await?;
                tracing::info!(removed, "cleared locks");
            }
            LockCommands::Release { key } => {
                if lock.release(key.as_str()).await {
                    tracing::info!(key = %key, "released lock");
                } else {
                    eyre::bail!("no lock held for '{key}'");
                }
            }
        }
        Ok(())
    }
}

fn format_record(record: &LockRecord, now: chrono::DateTime<chrono::Utc>) -> String {
    let state = if record.is_live(now) { "live" } else { "abandoned" };
    format!(
        "{}\t{}\texpires {}\tttl {}",
        record.key_hash,
        state,
        record.expires_at.to_rfc3339(),
        record.ttl_at.to_rfc3339()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};

    #[test]
    fn test_format_record() {
        let created = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let record = LockRecord {
            key_hash: "nightly".to_string(),
            created_at: created,
            expires_at: created + TimeDelta::hours(1),
            ttl_at: created + TimeDelta::minutes(1),
            fields: Default::default(),
            meta: Default::default(),
        };

        assert_eq!(
            format_record(&record, created),
            "nightly\tlive\texpires 2030-01-01T01:00:00+00:00\tttl 2030-01-01T00:01:00+00:00"
        );
        assert!(format_record(&record, created + TimeDelta::minutes(2)).contains("abandoned"));
    }
}
