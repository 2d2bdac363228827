// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations.

use std::collections::HashMap;
use std::path::Path;

use colored::Colorize;
use kontext_config::KontextConfig;
use kontext_core::{KontextError, Provider, models};
use kontext_state::{AutoSummary, ConversationStore, SettingsPatch, SummaryReport};
use kontext_vault::mask_secret;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::App;
use crate::render::{paint_role, paint_usage, thousands, truncate};

const TITLE_WIDTH: usize = 40;

/// Resolves a full id or a unique id prefix.
pub fn resolve_id(store: &ConversationStore, id: &str) -> Result<String, KontextError> {
    if store.conversation(id).is_some() {
        return Ok(id.to_string());
    }
    let not_found = || KontextError::ConversationNotFound { id: id.to_string() };
    if id.is_empty() {
        return Err(not_found());
    }
    let mut matches = store
        .conversations()
        .into_iter()
        .filter(|c| c.id.starts_with(id))
        .map(|c| c.id);
    match (matches.next(), matches.next()) {
        (Some(found), None) => Ok(found),
        _ => Err(not_found()),
    }
}

pub fn models() {
    for model in models::all() {
        println!(
            "{:<18} {:<22} {:<10} {:>9} ctx {:>7} out",
            model.key.bold(),
            model.name,
            model.provider.display_name(),
            thousands(model.context_window),
            thousands(model.max_output_tokens),
        );
    }
}

pub fn config_check(config: &KontextConfig) {
    println!("{} configuration is valid", "✓".green());
    println!("  database:       {}", config.storage.database_path);
    println!("  default model:  {}", config.chat.default_model);
    let auto = &config.auto_summarization;
    println!(
        "  auto-summarize: {} (threshold {:.0}%, keep {}, {} style)",
        if auto.enabled { "on" } else { "off" },
        auto.threshold * 100.0,
        auto.keep_recent_count,
        auto.style,
    );
}

pub fn list(app: &App) {
    let store = app.store();
    let conversations = store.conversations();
    if conversations.is_empty() {
        println!("{}", "no conversations yet".dimmed());
        return;
    }
    let active = store.active_conversation_id();
    for conv in conversations {
        let marker = if active.as_deref() == Some(conv.id.as_str()) { "*" } else { " " };
        println!(
            "{marker} {}  {:<width$}  {:>4} msgs  {:>8} tokens  {}",
            conv.id.dimmed(),
            truncate(&conv.title, TITLE_WIDTH),
            conv.messages.len(),
            thousands(conv.total_tokens),
            conv.metadata.model,
            width = TITLE_WIDTH,
        );
    }
}

pub fn new_conversation(app: &App, model: Option<&str>) -> Result<(), KontextError> {
    if let Some(key) = model
        && models::lookup(key).is_none()
    {
        return Err(KontextError::UnknownModel {
            model_id: key.to_string(),
        });
    }
    let store = app.store();
    let id = store.create_conversation();
    if let Some(key) = model {
        store.set_conversation_model(&id, key)?;
    }
    info!(conversation_id = %id, "conversation created");
    println!("{id}");
    Ok(())
}

pub fn show(app: &App, id: &str) -> Result<(), KontextError> {
    let id = resolve_id(app.store(), id)?;
    let conv = app
        .store()
        .conversation(&id)
        .ok_or_else(|| KontextError::ConversationNotFound { id: id.clone() })?;
    app.store().load_conversation(&id);

    println!("{} {}", conv.title.bold(), format!("({})", conv.metadata.model).dimmed());
    println!("{}", paint_usage(&app.session.usage(&id)?));
    if let Some(summary) = &conv.summary {
        println!("{} {}", "saved summary:".dimmed(), truncate(summary, 120));
    }
    for message in &conv.messages {
        println!();
        println!("{}", paint_role(message));
        println!("{}", message.content);
    }
    Ok(())
}

fn print_report(prefix: &str, report: &SummaryReport) {
    println!(
        "{} {} messages summarized, {} tokens saved, {} tokens in context",
        prefix.cyan(),
        report.summarized_count,
        report.tokens_saved,
        thousands(report.total_tokens),
    );
}

pub async fn send(app: &App, id: &str, text: &str) -> Result<(), KontextError> {
    let id = resolve_id(app.store(), id)?;
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling request");
            on_interrupt.cancel();
        }
    });

    let result = app.session.send_message(&id, text, cancel).await;
    watcher.abort();
    let outcome = result?;

    println!("{}", outcome.reply.content);
    match outcome.auto_summary {
        AutoSummary::Applied(report) => print_report("[auto-summarized]", &report),
        AutoSummary::Failed(e) => {
            eprintln!("{}: auto-summarization failed: {e}", "warning".yellow());
        }
        AutoSummary::AlreadyRunning | AutoSummary::NotTriggered => {}
    }
    eprintln!("{}", paint_usage(&outcome.usage));
    Ok(())
}

pub fn usage(app: &App, id: &str) -> Result<(), KontextError> {
    let id = resolve_id(app.store(), id)?;
    let usage = app.session.usage(&id)?;
    println!("{}", paint_usage(&usage));
    println!("{} tokens remaining", thousands(usage.remaining_tokens()));
    Ok(())
}

pub async fn compress(app: &App, id: &str) -> Result<(), KontextError> {
    let id = resolve_id(app.store(), id)?;
    let report = app.session.compress_now(&id).await?;
    print_report("[compressed]", &report);
    Ok(())
}

pub async fn summarize(
    app: &App,
    id: &str,
    text: Option<String>,
    save: bool,
    start_fresh: bool,
) -> Result<(), KontextError> {
    let id = resolve_id(app.store(), id)?;
    let summary = match text {
        Some(text) => text,
        None => app.session.draft_summary(&id).await?,
    };
    println!("{summary}");

    if start_fresh {
        let new_id = app.session.start_fresh(&id, &summary)?;
        println!();
        println!("{} {new_id}", "continuing in".cyan());
    } else if save {
        app.session.save_summary(&id, &summary)?;
        println!();
        println!("{}", "summary saved".cyan());
    }
    Ok(())
}

pub fn rename(app: &App, id: &str, title: &str) -> Result<(), KontextError> {
    let id = resolve_id(app.store(), id)?;
    if !app.store().rename_conversation(&id, title) {
        return Err(KontextError::ConversationNotFound { id });
    }
    Ok(())
}

pub fn delete(app: &App, id: &str) -> Result<(), KontextError> {
    let id = resolve_id(app.store(), id)?;
    if !app.store().delete_conversation(&id) {
        return Err(KontextError::ConversationNotFound { id });
    }
    println!("deleted {id}");
    Ok(())
}

pub fn export(app: &App, id: &str, out: &Path) -> Result<(), KontextError> {
    let id = resolve_id(app.store(), id)?;
    let export = app.store().export_conversation(&id)?;
    let path = out.join(&export.file_name);
    std::fs::write(&path, export.json)
        .map_err(|e| KontextError::Internal(format!("failed to write {}: {e}", path.display())))?;
    println!("{}", path.display());
    Ok(())
}

pub async fn set_key(app: &App, provider: Provider) -> Result<(), KontextError> {
    let key = rpassword::prompt_password(format!(
        "{} API key (empty to remove): ",
        provider.display_name()
    ))
    .map_err(|e| KontextError::Internal(format!("failed to read API key: {e}")))?;
    let key = key.trim().to_string();
    let masked = mask_secret(&key);
    let removed = key.is_empty();

    let patch = SettingsPatch {
        api_keys: Some(HashMap::from([(provider, SecretString::from(key))])),
        ..SettingsPatch::default()
    };
    app.session.update_settings(patch).await?;

    if removed {
        println!("{} key removed", provider.display_name());
    } else {
        println!("{} key saved ({masked})", provider.display_name());
    }
    Ok(())
}
