use super::Context;
use crate::error::CliError;
use std::path::Path;
use versioner_core::catalog::default_description;
use versioner_core::transfer::progress::format_bytes;
use versioner_core::workspace::{candidate_folders, validate_selected_folders};
use versioner_core::{ProjectConfig, SnapshotEngine, SnapshotMode, SnapshotScope, VersionKind, VersionRecord};

#[derive(Debug, Default, Clone)]
pub struct SnapshotArgs {
    pub full: bool,
    pub folders: Vec<String>,
    pub message: Option<String>,
}

pub fn run(ctx: &mut Context, args: &SnapshotArgs) -> anyhow::Result<VersionRecord> {
    let config = ctx.config();
    let scope = resolve_scope(ctx, &config, args)?;
    let description = resolve_description(ctx, &scope, args)?;

    let engine = SnapshotEngine::new(ctx.progress.clone());
    let record = engine.create_snapshot(&ctx.workspace_root, &scope, description.as_deref(), &config)?;

    let scope_label = match &record.included_folders {
        Some(folders) => format!("folders: {}", folders.join(", ")),
        None => "full project".to_string(),
    };
    println!(
        "Snapshot created: {} ({}, {})",
        record.id,
        scope_label,
        format_bytes(record.size_bytes)
    );

    Ok(record)
}

/// `-m` wins; otherwise a terminal user may edit the default description.
fn resolve_description(ctx: &mut Context, scope: &SnapshotScope, args: &SnapshotArgs) -> anyhow::Result<Option<String>> {
    if args.message.is_some() || !ctx.prompter.is_interactive() {
        return Ok(args.message.clone());
    }

    let folders = match scope {
        SnapshotScope::Full => Vec::new(),
        SnapshotScope::Selective(folders) => folders.clone(),
    };
    let default = default_description(scope.kind(), &folders);

    match ctx.prompter.input("Description", Some(&default)) {
        Some(description) => Ok(Some(description)),
        None => Err(CliError::cancelled("Snapshot cancelled")),
    }
}

/// Turn flags and the configured mode into a concrete scope, prompting
/// where the configuration leaves it open.
pub fn resolve_scope(ctx: &mut Context, config: &ProjectConfig, args: &SnapshotArgs) -> anyhow::Result<SnapshotScope> {
    if args.full && !args.folders.is_empty() {
        return Err(CliError::InvalidInput("--full and --folders cannot be combined".into()).into());
    }
    if args.full {
        return Ok(SnapshotScope::Full);
    }
    if !args.folders.is_empty() {
        let existing = validate_selected_folders(&ctx.workspace_root, &args.folders);
        if existing.is_empty() {
            return Err(CliError::InvalidInput(format!(
                "None of the folders exist: {}",
                args.folders.join(", ")
            ))
            .into());
        }
        return Ok(SnapshotScope::Selective(existing));
    }

    let kind = match config.default_snapshot_mode {
        SnapshotMode::Full => VersionKind::Full,
        SnapshotMode::Selective => VersionKind::Selective,
        SnapshotMode::Ask => {
            let options = vec![
                "Full project snapshot".to_string(),
                "Selected folders only".to_string(),
            ];
            match ctx.prompter.choose("What should the snapshot include?", &options) {
                Some(0) => VersionKind::Full,
                Some(_) => VersionKind::Selective,
                None => return Err(CliError::cancelled("Snapshot cancelled")),
            }
        }
    };

    if kind == VersionKind::Full {
        return Ok(SnapshotScope::Full);
    }

    let configured = validate_selected_folders(&ctx.workspace_root, &config.selected_folders);
    if !configured.is_empty() {
        return Ok(SnapshotScope::Selective(configured));
    }
    if !config.selected_folders.is_empty() {
        tracing::warn!(
            folders = %config.selected_folders.join(", "),
            "None of the configured folders exist, asking for a new selection"
        );
    }

    let root = ctx.workspace_root.clone();
    let folders = pick_folders(ctx, &root, config, &[])?;
    Ok(SnapshotScope::Selective(folders))
}

/// Ask for one or more top-level folders. An empty pick is a cancellation.
pub fn pick_folders(
    ctx: &mut Context,
    root: &Path,
    config: &ProjectConfig,
    current: &[String],
) -> anyhow::Result<Vec<String>> {
    let candidates = candidate_folders(root, &config.exclude_patterns, &config.versions_path)?;
    if candidates.is_empty() {
        return Err(CliError::cancelled("No folders available to select"));
    }

    let preselected: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, name)| current.contains(name))
        .map(|(i, _)| i)
        .collect();

    let picked = ctx
        .prompter
        .choose_many("Select the folders to include", &candidates, &preselected)
        .unwrap_or_default();

    if picked.is_empty() {
        return Err(CliError::cancelled("No folders selected"));
    }

    Ok(picked.into_iter().filter_map(|i| candidates.get(i).cloned()).collect())
}
