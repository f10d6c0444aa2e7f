use super::snapshot::pick_folders;
use super::Context;
use crate::error::{is_cancellation, CliError};
use chrono::Utc;
use versioner_core::config::CONFIG_FILE;
use versioner_core::workspace::register_in_gitignore;
use versioner_core::{ProjectConfig, SnapshotMode};

const MODE_CHOICES: [(&str, SnapshotMode); 3] = [
    ("Ask every time", SnapshotMode::Ask),
    ("Always snapshot the full project", SnapshotMode::Full),
    ("Only selected folders", SnapshotMode::Selective),
];

/// First-time setup: walk through the main options and write the project file.
///
/// Returns `None` when the summary is shown but the user declines to save.
pub fn run(ctx: &mut Context) -> anyhow::Result<Option<ProjectConfig>> {
    let mut config = ctx.config();
    println!("Setting up project versioning for {}", config.project_name);

    let backup = ctx
        .prompter
        .input(
            "Backup folder for mirrored versions (empty for none)",
            Some(&config.backup_folder_path),
        )
        .ok_or_else(|| CliError::cancelled("Setup cancelled"))?;
    config.backup_folder_path = backup.trim().to_string();

    let labels: Vec<String> = MODE_CHOICES.iter().map(|(label, _)| label.to_string()).collect();
    config.default_snapshot_mode = ctx
        .prompter
        .choose("Default snapshot mode", &labels)
        .and_then(|i| MODE_CHOICES.get(i))
        .map(|(_, mode)| *mode)
        .ok_or_else(|| CliError::cancelled("Setup cancelled"))?;

    config.selected_folders = Vec::new();
    if config.default_snapshot_mode == SnapshotMode::Selective {
        let root = ctx.workspace_root.clone();
        match pick_folders(ctx, &root, &config, &[]) {
            Ok(folders) => config.selected_folders = folders,
            Err(e) if is_cancellation(&e) => {
                config.default_snapshot_mode = fallback_mode(ctx)?;
            }
            Err(e) => return Err(e),
        }
    }

    config.created_at = Some(Utc::now());
    print_summary(&config);

    if !ctx.prompter.confirm("Save this configuration?") {
        println!("Configuration not saved.");
        return Ok(None);
    }

    config.save(&ctx.workspace_root)?;
    println!("Saved {}", CONFIG_FILE);

    let question = format!(
        "Add {} and {}/ to .gitignore?",
        CONFIG_FILE, config.versions_path
    );
    if ctx.prompter.confirm(&question) && register_in_gitignore(&ctx.workspace_root, &config.versions_path)? {
        println!("Updated .gitignore");
    }

    Ok(Some(config))
}

/// No folder was picked: settle on another mode or abort.
fn fallback_mode(ctx: &mut Context) -> anyhow::Result<SnapshotMode> {
    let options = vec![
        "Use the full project".to_string(),
        "Ask every time".to_string(),
        "Cancel".to_string(),
    ];
    match ctx.prompter.choose("No folders selected. What now?", &options) {
        Some(0) => Ok(SnapshotMode::Full),
        Some(1) => Ok(SnapshotMode::Ask),
        _ => Err(CliError::cancelled("Setup cancelled")),
    }
}

fn print_summary(config: &ProjectConfig) {
    println!();
    println!("Project:         {}", config.project_name);
    println!(
        "Backup folder:   {}",
        if config.backup_folder_path.is_empty() { "(none)" } else { config.backup_folder_path.as_str() }
    );
    println!("Version store:   {}", config.versions_path);
    println!("Snapshot mode:   {}", config.default_snapshot_mode);
    if !config.selected_folders.is_empty() {
        println!("Folders:         {}", config.selected_folders.join(", "));
    }
    println!("Keep versions:   {}", config.max_versions);
    println!("Exclude:         {}", config.exclude_patterns.join(", "));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::TestEnv;
    use crate::prompt::testing::Answer;
    use std::fs;

    #[test]
    fn test_selective_setup_saves_file_and_gitignore() -> anyhow::Result<()> {
        let env = TestEnv::new();
        env.write("docs/readme.md", b"");
        env.write("src/lib.rs", b"");

        let mut ctx = env.context(vec![
            Answer::Input(Some("/mnt/backup".into())),
            Answer::Choose(Some(2)),
            Answer::ChooseMany(Some(vec![1])),
            Answer::Confirm(true),
            Answer::Confirm(true),
        ]);
        let saved = run(&mut ctx)?.expect("configuration saved");

        assert_eq!(saved.default_snapshot_mode, SnapshotMode::Selective);
        assert_eq!(saved.selected_folders, vec!["src"]);
        assert!(saved.created_at.is_some());

        let reloaded = ctx.config();
        assert_eq!(reloaded.backup_folder_path, "/mnt/backup");
        assert_eq!(reloaded.selected_folders, vec!["src"]);

        let gitignore = fs::read_to_string(env.workspace.path().join(".gitignore"))?;
        assert!(gitignore.contains(CONFIG_FILE));
        assert!(gitignore.contains(".local-versions/"));
        Ok(())
    }

    #[test]
    fn test_empty_pick_falls_back_to_full() -> anyhow::Result<()> {
        let env = TestEnv::new();
        env.write("src/lib.rs", b"");

        let mut ctx = env.context(vec![
            Answer::Input(Some(String::new())),
            Answer::Choose(Some(2)),
            Answer::ChooseMany(Some(vec![])),
            Answer::Choose(Some(0)),
            Answer::Confirm(true),
            Answer::Confirm(false),
        ]);
        let saved = run(&mut ctx)?.expect("configuration saved");

        assert_eq!(saved.default_snapshot_mode, SnapshotMode::Full);
        assert!(saved.selected_folders.is_empty());
        assert!(!env.workspace.path().join(".gitignore").exists());
        Ok(())
    }

    #[test]
    fn test_declining_save_writes_nothing() -> anyhow::Result<()> {
        let env = TestEnv::new();
        let mut ctx = env.context(vec![
            Answer::Input(Some(String::new())),
            Answer::Choose(Some(1)),
            Answer::Confirm(false),
        ]);

        assert_eq!(run(&mut ctx)?, None);
        assert!(!ProjectConfig::file_exists(env.workspace.path()));
        Ok(())
    }

    #[test]
    fn test_cancelled_fallback_aborts() {
        let env = TestEnv::new();
        env.write("src/lib.rs", b"");

        let mut ctx = env.context(vec![
            Answer::Input(Some(String::new())),
            Answer::Choose(Some(2)),
            Answer::ChooseMany(None),
            Answer::Choose(Some(2)),
        ]);

        let err = run(&mut ctx).unwrap_err();
        assert!(is_cancellation(&err));
        assert!(!ProjectConfig::file_exists(env.workspace.path()));
    }
}
