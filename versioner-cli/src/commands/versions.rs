use super::Context;
use crate::error::CliError;
use versioner_core::fs::CopyStats;
use versioner_core::transfer::progress::format_bytes;
use versioner_core::{RestoreEngine, VersionKind, VersionRecord};

pub fn list(ctx: &Context) -> anyhow::Result<Vec<VersionRecord>> {
    let config = ctx.config();
    let versions = ctx.catalog(&config).list();

    if versions.is_empty() {
        println!("No versions saved yet.");
        return Ok(versions);
    }

    for record in &versions {
        println!("{}", describe(record));
    }

    Ok(versions)
}

/// One listing line: id, time, kind, size and description.
pub fn describe(record: &VersionRecord) -> String {
    let kind = match (&record.kind, &record.included_folders) {
        (VersionKind::Selective, Some(folders)) => format!("folders: {}", folders.join(", ")),
        (VersionKind::Selective, None) => "selective".to_string(),
        (VersionKind::Full, _) => "full".to_string(),
    };

    format!(
        "{}  {}  [{}]  {}  {}",
        record.id,
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
        kind,
        format_bytes(record.size_bytes),
        record.description
    )
}

/// Restore a catalogued version over the workspace after confirmation.
pub fn restore(ctx: &mut Context, id: &str, assume_yes: bool) -> anyhow::Result<CopyStats> {
    let config = ctx.config();
    let catalog = ctx.catalog(&config);

    let record = catalog
        .find(id)
        .ok_or_else(|| versioner_core::VersionerError::VersionNotFound(id.to_string()))?;

    if !assume_yes {
        println!("{}", describe(&record));
        let question = format!(
            "Restore {} over {}? Files in the workspace will be overwritten",
            record.id,
            ctx.workspace_root.display()
        );
        if !ctx.prompter.confirm(&question) {
            return Err(CliError::cancelled("Restore cancelled"));
        }
    }

    let engine = RestoreEngine::new(ctx.progress.clone());
    let stats = engine.restore_version(&catalog, id, &ctx.workspace_root)?;

    println!("Version {} restored ({} files).", id, stats.files);
    Ok(stats)
}
