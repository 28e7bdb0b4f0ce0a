use std::path::Path;

use snc_core::config::Config;

use crate::cli::{connect, AttachmentCommands};

pub async fn run(config: &Config, command: AttachmentCommands) -> anyhow::Result<()> {
    match command {
        AttachmentCommands::List { table, record } => {
            list(config, &table, record.as_deref()).await?;
        }
        AttachmentCommands::Download { sys_id, path } => {
            download(config, &sys_id, &path).await?;
        }
        AttachmentCommands::Upload { table, sys_id, file, content_type } => {
            upload(config, &table, &sys_id, &file, content_type).await?;
        }
    }
    Ok(())
}

async fn list(config: &Config, table: &str, record: Option<&str>) -> anyhow::Result<()> {
    let client = connect(config)?;
    let mut attachments = client.attachment(table);
    if let Some(record) = record {
        attachments.add_query("table_sys_id", record, None);
    }
    attachments.query().await?;

    if attachments.is_empty() {
        println!("No attachments found.");
        return Ok(());
    }

    println!("{:<34} {:<40} {:<30} {:>10}", "SYS_ID", "FILE NAME", "CONTENT TYPE", "SIZE");
    println!("{}", "-".repeat(117));

    let text = |v: Option<&serde_json::Value>| {
        v.and_then(|v| v.as_str()).unwrap_or("-").to_string()
    };
    while attachments.next().await? {
        println!(
            "{:<34} {:<40} {:<30} {:>10}",
            attachments.sys_id().unwrap_or_default(),
            attachments.file_name().unwrap_or_else(|| "-".to_string()),
            text(attachments.get_value("content_type")),
            text(attachments.get_value("size_bytes")),
        );
    }
    Ok(())
}

async fn download(config: &Config, sys_id: &str, path: &Path) -> anyhow::Result<()> {
    let client = connect(config)?;
    let mut attachment = client.attachment("");
    if !attachment.get(sys_id).await? {
        anyhow::bail!("No attachment {}", sys_id);
    }
    let written = attachment.write_to(path).await?;
    println!("Saved to: {:?}", written);
    Ok(())
}

async fn upload(
    config: &Config,
    table: &str,
    sys_id: &str,
    file: &Path,
    content_type: Option<String>,
) -> anyhow::Result<()> {
    if !file.is_file() {
        anyhow::bail!("File not found: {:?}", file);
    }
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Cannot take a file name from {:?}", file))?
        .to_string();
    let content_type = content_type
        .unwrap_or_else(|| mime_guess::from_path(file).first_or_octet_stream().to_string());

    let data = tokio::fs::read(file).await?;
    let client = connect(config)?;
    let location = client
        .attachment(table)
        .add_attachment(sys_id, &file_name, data, Some(&content_type), None)
        .await?;
    println!("{}", location);
    Ok(())
}
