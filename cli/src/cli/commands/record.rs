use snc_core::config::Config;
use snc_core::{GlideRecord, SerializeMode, ServiceNowClient};

use crate::cli::{connect, parse_assignments};

async fn fetch(client: &ServiceNowClient, table: &str, sys_id: &str) -> anyhow::Result<GlideRecord> {
    let mut gr = client.glide_record(table);
    if !gr.get(sys_id).await? {
        anyhow::bail!("No record {} in {}", sys_id, table);
    }
    Ok(gr)
}

fn print_record(gr: &GlideRecord) -> anyhow::Result<()> {
    if let Some(row) = gr.serialize(SerializeMode::Both, None, false) {
        println!("{}", serde_json::to_string_pretty(&row)?);
    }
    Ok(())
}

pub async fn get(config: &Config, table: &str, sys_id: &str) -> anyhow::Result<()> {
    let client = connect(config)?;
    let mut gr = client.glide_record(table);
    gr.set_display_mode(config.display_mode()?);
    if !gr.get(sys_id).await? {
        anyhow::bail!("No record {} in {}", sys_id, table);
    }
    print_record(&gr)
}

pub async fn insert(config: &Config, table: &str, set: &[String]) -> anyhow::Result<()> {
    let assignments = parse_assignments(set)?;
    let client = connect(config)?;

    let mut gr = client.glide_record(table);
    gr.initialize();
    for (field, value) in assignments {
        gr.set_value(&field, value)?;
    }
    match gr.insert().await? {
        Some(sys_id) => println!("{}", sys_id),
        None => anyhow::bail!("Insert into {} returned no sys_id", table),
    }
    Ok(())
}

pub async fn update(config: &Config, table: &str, sys_id: &str, set: &[String]) -> anyhow::Result<()> {
    let assignments = parse_assignments(set)?;
    let client = connect(config)?;

    let mut gr = fetch(&client, table, sys_id).await?;
    for (field, value) in assignments {
        gr.set_value(&field, value)?;
    }
    if !gr.changes() {
        println!("Nothing to update.");
        return Ok(());
    }
    gr.update().await?;
    print_record(&gr)
}

pub async fn delete(config: &Config, table: &str, sys_id: &str) -> anyhow::Result<()> {
    let client = connect(config)?;
    let mut gr = fetch(&client, table, sys_id).await?;
    gr.delete().await?;
    println!("Deleted {} from {}", sys_id, table);
    Ok(())
}
