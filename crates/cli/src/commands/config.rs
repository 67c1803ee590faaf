use keystone_core::CoordinationConfig;

pub fn show(config: &CoordinationConfig) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    tracing::debug!(source = ?config.source, "printed configuration");
    Ok(())
}
