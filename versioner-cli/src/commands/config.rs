use super::Context;
use crate::error::CliError;
use std::collections::BTreeMap;
use versioner_core::config::SETTING_KEYS;
use versioner_core::ProjectConfig;

fn check_key(key: &str) -> anyhow::Result<()> {
    if SETTING_KEYS.contains(&key) {
        return Ok(());
    }
    Err(CliError::InvalidInput(format!(
        "Unknown setting '{key}'. Known settings: {}",
        SETTING_KEYS.join(", ")
    ))
    .into())
}

/// Effective value of `key` for this workspace, rendered for display.
pub fn get(ctx: &Context, key: &str) -> anyhow::Result<String> {
    check_key(key)?;

    let effective = serde_json::to_value(ctx.config())?;
    let value = match effective.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    println!("{value}");
    Ok(value)
}

/// Store a host-wide setting after checking that it parses.
pub fn set(ctx: &Context, key: &str, value: &str) -> anyhow::Result<()> {
    check_key(key)?;

    let mut scratch = ProjectConfig::defaults("");
    scratch.apply_setting(key, value)?;

    ctx.settings.set(key, value)?;
    tracing::info!(key = %key, "Setting stored");

    if ProjectConfig::file_exists(&ctx.workspace_root) {
        println!(
            "Saved {key}. Values in the project file still take precedence for this workspace."
        );
    } else {
        println!("Saved {key}.");
    }
    Ok(())
}

/// Drop a stored setting so the built-in default applies again.
pub fn unset(ctx: &Context, key: &str) -> anyhow::Result<bool> {
    check_key(key)?;
    let removed = ctx.settings.delete(key)?;
    if removed {
        println!("Removed {key}.");
    } else {
        println!("{key} was not set.");
    }
    Ok(removed)
}

/// Print the effective configuration followed by the raw stored settings.
pub fn list(ctx: &Context) -> anyhow::Result<BTreeMap<String, String>> {
    let config = ctx.config();
    let mut shown = serde_json::to_value(&config)?;

    // Never echo credentials
    if let Some(remote) = shown.get_mut("remote").and_then(|r| r.as_object_mut()) {
        for secret in ["password", "privateKey", "passphrase"] {
            if remote.contains_key(secret) {
                remote.insert(secret.to_string(), "<redacted>".into());
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&shown)?);

    let stored = ctx.settings.all()?;
    if !stored.is_empty() {
        println!();
        println!("Stored settings:");
        for (key, value) in &stored {
            println!("  {key} = {value}");
        }
    }

    Ok(stored)
}
