use super::Context;
use crate::error::CliError;
use std::path::PathBuf;
use versioner_core::fs::CopyStats;
use versioner_core::mirror::{mirror_destination, sync_to_backup_folder};

/// Mirror the version store into the backup folder, asking for one when
/// none is configured.
pub fn run(ctx: &mut Context) -> anyhow::Result<CopyStats> {
    let config = ctx.config();

    let backup_root = match config.backup_folder() {
        Some(folder) => folder,
        None => {
            let answer = ctx
                .prompter
                .input("Backup folder path (empty to skip)", None)
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            if answer.is_empty() {
                return Err(CliError::cancelled(
                    "No backup folder configured, versions stay in the local store",
                ));
            }
            ctx.settings.set("backupFolderPath", &answer)?;
            PathBuf::from(answer)
        }
    };

    let versions_dir = config.versions_dir(&ctx.workspace_root);
    let stats = sync_to_backup_folder(&versions_dir, &backup_root, &config.project_name)?;

    println!(
        "Mirrored {} files to {}",
        stats.files,
        mirror_destination(&backup_root, &config.project_name).display()
    );
    Ok(stats)
}
