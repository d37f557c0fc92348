//! Command execution and terminal output.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clinicsite_admin::{AdminConsole, ImageSlot, SettingView, StatusKind};
use clinicsite_backend::{ObjectStore, SettingsStore};
use clinicsite_context::SiteContext;
use serde_json::json;

use crate::SiteCommand;
use crate::config::SiteConfig;

/// Runs one backend command. The exit code is a failure when the admin
/// console recorded an error.
pub async fn execute<B, W>(
    backend: Arc<B>,
    config: &SiteConfig,
    command: &SiteCommand,
    out: &mut W,
) -> anyhow::Result<ExitCode>
where
    B: ObjectStore + SettingsStore + 'static,
    W: Write,
{
    let ctx = Arc::new(SiteContext::from_backend(
        backend.clone(),
        config.resolver_config(),
    ));
    let console = AdminConsole::from_backend(
        backend,
        &config.image_bucket,
        &config.settings_table,
        ctx.clone(),
    );

    match command {
        SiteCommand::Resolve => {
            ctx.init().await;
            let images = ctx.images();
            let settings = ctx.settings();
            let body = json!({
                "images": &*images.value,
                "settings": &*settings.value,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
        }
        SiteCommand::Images => {
            ctx.refresh_images().await;
            print_slots(&console.image_slots(), out)?;
        }
        SiteCommand::Settings => {
            ctx.refresh_settings().await;
            print_fields(&console.setting_fields(), out)?;
        }
        SiteCommand::Upload { id, file } => {
            console.upload_image_file(id, file).await;
        }
        SiteCommand::ResetImage { id } => {
            console.reset_image(id).await;
        }
        SiteCommand::Set { key, value } => {
            console.save_setting(key, value).await;
        }
        SiteCommand::Unset { key } => {
            console.reset_setting(key).await;
        }
    }

    print_messages(&console, out)?;
    ctx.dispose();

    if console.has_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_slots(slots: &[ImageSlot], out: &mut impl Write) -> anyhow::Result<()> {
    let mut section = None;
    for slot in slots {
        if section != Some(slot.section) {
            if section.is_some() {
                writeln!(out)?;
            }
            writeln!(out, "{}", slot.section.title())?;
            section = Some(slot.section);
        }
        let state = if slot.customized { "custom" } else { "default" };
        writeln!(out, "  {:<28} {:<8} {}", slot.id, state, slot.url)?;
    }
    Ok(())
}

fn print_fields(fields: &[SettingView], out: &mut impl Write) -> anyhow::Result<()> {
    for field in fields {
        let marker = if field.customized { '*' } else { ' ' };
        writeln!(out, "{marker} {:<18} {}", field.key, field.value)?;
    }
    Ok(())
}

fn print_messages(console: &AdminConsole, out: &mut impl Write) -> anyhow::Result<()> {
    for msg in console.messages() {
        let tag = match msg.kind {
            StatusKind::Success => "ok",
            StatusKind::Error => "error",
            StatusKind::Warning => "warning",
            StatusKind::Info => "info",
        };
        match &msg.detail {
            Some(detail) => writeln!(out, "[{tag}] {}: {detail}", msg.title)?,
            None => writeln!(out, "[{tag}] {}", msg.title)?,
        }
    }
    Ok(())
}

pub fn print_config(config: &SiteConfig, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(&config.redacted())?)?;
    Ok(())
}

pub fn print_path(path: &Path, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "{}", path.display())?;
    Ok(())
}
