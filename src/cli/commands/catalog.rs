//! `datasets` and `schemas` listings.

use crate::cli::RuntimeConfig;
use crate::error::Result;

pub async fn datasets(runtime: &RuntimeConfig) -> Result<i32> {
    let client = runtime.client()?;
    let mut names = client.list_dataset_names().await?;
    names.sort_by_key(|n| n.to_lowercase());
    log::info!("Fetched {} dataset names", names.len());

    let output = runtime.output();
    if names.is_empty() {
        output.warn("No datasets found");
    }
    for name in &names {
        output.println(name);
    }
    Ok(0)
}

pub async fn schemas(runtime: &RuntimeConfig) -> Result<i32> {
    let client = runtime.client()?;
    let mut schemas = client.list_schemas().await?;
    schemas.sort_by_key(|s| s.schema_name.to_lowercase());
    log::info!("Fetched {} schemas", schemas.len());

    let output = runtime.output();
    if schemas.is_empty() {
        output.warn("No schemas found");
        return Ok(0);
    }
    let width = schemas.iter().map(|s| s.schema_name.chars().count()).max().unwrap_or(0);
    for schema in &schemas {
        output.println(&format!("{:<width$}  {}", schema.schema_name, schema.schema_id, width = width));
    }
    Ok(0)
}
