use super::Context;
use crate::error::CliError;
use crate::progress::transfer_line;
use versioner_core::remote::{RemoteOutcome, RemoteSyncClient};
use versioner_core::transfer::progress::TransferProgress;
use versioner_core::workspace::is_workspace_effectively_empty;
use versioner_core::RestoreEngine;

/// Offer to rebuild an empty workspace from the newest remote version.
///
/// Returns the restored version id, or `None` when there was nothing to do.
pub fn run(ctx: &mut Context, assume_yes: bool) -> anyhow::Result<Option<String>> {
    let config = ctx.config();

    if !is_workspace_effectively_empty(&ctx.workspace_root, &config.versions_path)? {
        println!("Workspace is not empty, nothing to restore.");
        return Ok(None);
    }
    if config.remote.is_none() {
        println!("Workspace is empty but no remote server is configured.");
        return Ok(None);
    }

    let client = ctx.remote_client(&config)?;
    restore_latest(ctx, &client, assume_yes)
}

/// Download the newest remote version of the project and restore it.
pub fn restore_latest(
    ctx: &mut Context,
    client: &RemoteSyncClient,
    assume_yes: bool,
) -> anyhow::Result<Option<String>> {
    let config = ctx.config();

    let Some(latest) = client.list_remote_versions(&config.project_name)?.into_iter().next() else {
        println!("No versions of {} on the server.", config.project_name);
        return Ok(None);
    };

    if !assume_yes {
        let question = format!("Workspace looks empty. Restore {latest} from the server?");
        if !ctx.prompter.confirm(&question) {
            return Err(CliError::cancelled("Automatic restore skipped"));
        }
    }

    let catalog = ctx.ensure_catalog(&config)?;
    let outcome = client.download_into_catalog(
        &catalog,
        &config.project_name,
        &latest,
        &mut |p: &TransferProgress| println!("{}", transfer_line(p)),
    )?;

    if outcome == RemoteOutcome::NotFound {
        println!("Version {latest} disappeared from the server.");
        return Ok(None);
    }

    RestoreEngine::new(ctx.progress.clone()).restore_version(&catalog, &latest, &ctx.workspace_root)?;
    println!("Workspace restored from {latest}");

    Ok(Some(latest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{FolderServer, TestEnv};
    use crate::error::is_cancellation;
    use crate::prompt::testing::Answer;
    use std::fs;
    use versioner_core::config::CONFIG_FILE;

    fn project_file(name: &str) -> String {
        format!(r#"{{ "projectName": "{name}" }}"#)
    }

    fn seed_server(server: &FolderServer) {
        server.write("/versions/demo/v_full_2024-01-01T00-00-00-000/main.rs", b"old");
        server.write("/versions/demo/v_full_2024-02-01T00-00-00-000/main.rs", b"new");
        server.write("/versions/demo/v_full_2024-02-01T00-00-00-000/src/lib.rs", b"pub fn f() {}");
    }

    #[test]
    fn test_restores_newest_remote_version() -> anyhow::Result<()> {
        let server = FolderServer::new();
        seed_server(&server);

        let env = TestEnv::new();
        env.write(CONFIG_FILE, project_file("demo").as_bytes());

        let mut ctx = env.context(vec![Answer::Confirm(true)]);
        let restored = restore_latest(&mut ctx, &server.client(), false)?;

        assert_eq!(restored.as_deref(), Some("v_full_2024-02-01T00-00-00-000"));
        assert_eq!(fs::read(env.workspace.path().join("main.rs"))?, b"new");
        assert!(env.workspace.path().join("src/lib.rs").is_file());

        let catalog = ctx.catalog(&ctx.config());
        assert_eq!(catalog.list()[0].description, "Downloaded from remote server");
        Ok(())
    }

    #[test]
    fn test_declined_restore_downloads_nothing() {
        let server = FolderServer::new();
        seed_server(&server);

        let env = TestEnv::new();
        env.write(CONFIG_FILE, project_file("demo").as_bytes());

        let mut ctx = env.context(vec![Answer::Confirm(false)]);
        let err = restore_latest(&mut ctx, &server.client(), false).unwrap_err();

        assert!(is_cancellation(&err));
        assert!(!env.workspace.path().join("main.rs").exists());
        assert!(!env.workspace.path().join(".local-versions").exists());
    }

    #[test]
    fn test_no_remote_versions() -> anyhow::Result<()> {
        let server = FolderServer::new();
        let env = TestEnv::new();

        let mut ctx = env.context(vec![]);
        assert_eq!(restore_latest(&mut ctx, &server.client(), true)?, None);
        Ok(())
    }

    #[test]
    fn test_non_empty_workspace_is_left_alone() -> anyhow::Result<()> {
        let env = TestEnv::new();
        env.write("src/main.rs", b"");
        env.write("Cargo.toml", b"");
        env.write("build.rs", b"");

        assert_eq!(run(&mut env.context(vec![]), true)?, None);
        Ok(())
    }

    #[test]
    fn test_empty_workspace_without_remote() -> anyhow::Result<()> {
        let env = TestEnv::new();
        env.write("README.md", b"# demo");

        assert_eq!(run(&mut env.context(vec![]), true)?, None);
        Ok(())
    }
}
