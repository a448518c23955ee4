//! `upload`: send a folder for processing.

use super::{cancel_on_ctrl_c, report_exit_code};
use crate::api::Schema;
use crate::cli::RuntimeConfig;
use crate::cli::args::UploadArgs;
use crate::cli::progress::BarReporter;
use crate::error::{CliError, Result};
use crate::transfer::{TransferSettings, UploadOptions, scan_folder, upload_folder};
use std::time::Duration;

pub async fn execute(args: UploadArgs, runtime: &RuntimeConfig) -> Result<i32> {
    if !args.folder.is_dir() {
        return Err(CliError::InvalidArguments {
            reason: format!("{} is not a folder", args.folder.display()),
        }
        .into());
    }
    let client = runtime.client()?;
    let output = runtime.output();

    let scan = scan_folder(&args.folder, args.recursive)?;
    output.progress(&format!(
        "Found {} files, {} supported",
        scan.total_files,
        scan.allowed.len()
    ));

    let schema_id = match &args.schema {
        Some(wanted) => {
            let schemas = client.list_schemas().await?;
            let id = resolve_schema(&schemas, wanted)?;
            output.progress(&format!("Standardizing with schema {}", id));
            Some(id)
        }
        None => None,
    };

    let options = UploadOptions {
        folder: args.folder,
        dataset: args.dataset.trim().to_string(),
        schema_id,
        recursive: args.recursive,
    };
    let settings = TransferSettings::default()
        .with_workers(args.transfer.workers)
        .with_poll_interval(Duration::from_secs(args.poll_interval));

    let cancel = cancel_on_ctrl_c(runtime);
    let mut reporter = BarReporter::new("files", output.clone());
    let report = upload_folder(&client, &options, &settings, &mut reporter, &cancel).await?;
    Ok(report_exit_code(&report, runtime))
}

/// Matches `wanted` against schema ids first, then names (case-insensitive).
fn resolve_schema(schemas: &[Schema], wanted: &str) -> Result<String> {
    let wanted = wanted.trim();
    if let Some(schema) = schemas.iter().find(|s| s.schema_id == wanted) {
        return Ok(schema.schema_id.clone());
    }
    let by_name: Vec<&Schema> = schemas
        .iter()
        .filter(|s| s.schema_name.eq_ignore_ascii_case(wanted))
        .collect();
    match by_name.as_slice() {
        [schema] => Ok(schema.schema_id.clone()),
        [] => Err(CliError::InvalidArguments {
            reason: format!("no schema named or with id '{}'; see `docupipe schemas`", wanted),
        }
        .into()),
        many => Err(CliError::InvalidArguments {
            reason: format!(
                "{} schemas are named '{}'; pass one of their ids: {}",
                many.len(),
                wanted,
                many.iter().map(|s| s.schema_id.as_str()).collect::<Vec<_>>().join(", ")
            ),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(name: &str, id: &str) -> Schema {
        Schema {
            schema_name: name.into(),
            schema_id: id.into(),
        }
    }

    #[test]
    fn resolves_by_id_then_name() {
        let schemas = vec![schema("Invoice", "s1"), schema("Receipt", "s2")];
        assert_eq!(resolve_schema(&schemas, "s2").unwrap(), "s2");
        assert_eq!(resolve_schema(&schemas, "invoice").unwrap(), "s1");
        assert!(resolve_schema(&schemas, "Contract").is_err());
    }

    #[test]
    fn ambiguous_names_are_rejected() {
        let schemas = vec![schema("Invoice", "s1"), schema("invoice", "s9")];
        let err = resolve_schema(&schemas, "Invoice").unwrap_err().to_string();
        assert!(err.contains("s1") && err.contains("s9"));
    }
}
