//! History command - inspect or clear recorded runs

use crate::cli::args::{HistoryAction, HistoryArgs};
use crate::config::Config;
use crate::error::WeavrResult;
use crate::history::{HistoryRecord, HistoryStore};
use crate::ui;

/// Execute the history command
pub async fn execute(args: HistoryArgs, config: &Config) -> WeavrResult<()> {
    let store = HistoryStore::new(
        config
            .history
            .dir
            .clone()
            .unwrap_or_else(HistoryStore::default_dir),
    );

    match args.action {
        None => show(&store, false).await,
        Some(HistoryAction::Show { json }) => show(&store, json).await,
        Some(HistoryAction::Clear) => clear(&store).await,
    }
}

async fn show(store: &HistoryStore, json: bool) -> WeavrResult<()> {
    let records = store.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        ui::remark(&format!("No recorded runs in {}", store.dir().display()));
        return Ok(());
    }

    for record in &records {
        print_record(record);
    }
    Ok(())
}

fn print_record(record: &HistoryRecord) {
    ui::section(&record.target.display().to_string());
    ui::key_value("workspace", &record.workspace.display().to_string());
    ui::key_value("artifact", &record.artifact_signature);
    ui::key_value(
        "updated",
        &record.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    for plugin in &record.plugins {
        ui::key_value(
            &format!("plugin {}", plugin.name),
            &format!("{} ({})", plugin.signature, plugin.path.display()),
        );
    }
}

async fn clear(store: &HistoryStore) -> WeavrResult<()> {
    let removed = store.clear().await?;
    ui::step_ok(&format!("Removed {} history record(s)", removed));
    Ok(())
}
