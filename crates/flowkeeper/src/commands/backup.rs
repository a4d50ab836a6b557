//! Backup archive commands

use anyhow::Result;
use console::style;
use flowkeeper_backup::tools::{
    CreateBackupArgs, ListBackupsArgs, MigrateConfigArgs, NameArgs, RestoreBackupArgs,
};
use flowkeeper_backup::{BackupTools, ElementKind, FlowPayload, IndexConfig};
use flowkeeper_core::human_bytes;

use super::emit;
use crate::cli::{CreateArgs, GetArgs, ListArgs, MigrateArgs, NameArg, RestoreArgs};
use crate::output;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

pub async fn create(tools: &BackupTools, args: CreateArgs, json: bool) -> Result<()> {
    if json {
        let result = tools
            .create_backup(CreateBackupArgs {
                name: args.name,
                reason: args.reason,
            })
            .await;
        return emit("create_backup", result);
    }

    let entry = tools
        .manager()
        .create(args.name.as_deref(), args.reason.as_deref())
        .await?;

    output::success(&format!("Created backup '{}'", entry.name));
    output::kv("Reason", &entry.reason);
    output::kv("Flows", &entry.flows_count.to_string());
    output::kv("Nodes", &entry.nodes_count.to_string());
    output::kv("Size", &human_bytes(entry.size));
    output::kv("Checksum", &entry.checksum);
    Ok(())
}

pub async fn list(tools: &BackupTools, args: ListArgs, json: bool) -> Result<()> {
    if json {
        let result = tools
            .list_backups(ListBackupsArgs {
                detailed: args.detailed,
            })
            .await;
        return emit("list_backups", result);
    }

    let backups = tools.manager().list(args.detailed).await?;
    output::header(&format!("Backups ({})", backups.len()));
    if backups.is_empty() {
        output::info("No backups found");
        return Ok(());
    }

    for view in &backups {
        let marker = if view.is_latest {
            style("*").green().bold().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{} {:<50} {}  {}",
            marker,
            style(&view.name).cyan(),
            view.timestamp.format(TIMESTAMP_FORMAT),
            style(&view.reason).dim()
        );
        if let (Some(flows), Some(nodes), Some(size)) = (view.flows_count, view.nodes_count, view.size) {
            println!(
                "    {} flows, {} nodes, {}",
                flows,
                nodes,
                human_bytes(size)
            );
        }
    }
    Ok(())
}

pub async fn get(tools: &BackupTools, args: GetArgs, json: bool) -> Result<()> {
    if json {
        let result = tools.get_backup_flows(NameArgs { name: args.name }).await;
        return emit("get_backup_flows", result);
    }

    let record = tools.manager().fetch(&args.name).await?;
    let meta = &record.metadata;

    output::header(&format!("Backup '{}'", meta.name));
    output::kv("Created", &meta.timestamp.format(TIMESTAMP_FORMAT).to_string());
    output::kv("Reason", &meta.reason);
    output::kv("Checksum", &format!("{} (verified)", meta.checksum));
    output::kv("Size", &human_bytes(meta.size));

    if args.flows {
        println!();
        output::json(&record.flows)?;
    } else {
        print_outline(&record.flows);
    }
    Ok(())
}

/// Tabs and subflows with the number of nodes each contains
fn print_outline(flows: &FlowPayload) {
    let nodes_in = |id: Option<&str>| {
        flows
            .elements()
            .iter()
            .filter(|e| id.is_some() && e.parent() == id)
            .count()
    };

    println!();
    for element in flows.elements() {
        let title = |key: &str| {
            element
                .get(key)
                .and_then(|v| v.as_str())
                .or(element.id())
                .unwrap_or("?")
                .to_string()
        };
        match element.kind() {
            ElementKind::Tab => println!(
                "  {} {} ({} nodes)",
                style("flow").blue(),
                title("label"),
                nodes_in(element.id())
            ),
            ElementKind::Subflow => println!(
                "  {} {} ({} nodes)",
                style("subflow").magenta(),
                title("name"),
                nodes_in(element.id())
            ),
            ElementKind::Node(_) | ElementKind::Untyped => {}
        }
    }

    let global = flows
        .elements()
        .iter()
        .filter(|e| matches!(e.kind(), ElementKind::Node(_)) && e.parent().is_none())
        .count();
    if global > 0 {
        println!("  {} {} config nodes", style("global").dim(), global);
    }
}

pub async fn health(tools: &BackupTools, json: bool) -> Result<()> {
    if json {
        return emit("backup_health", tools.backup_health().await);
    }

    let report = tools.manager().health().await;

    output::header("Backup Health");
    output::kv("Directory", &report.backup_dir);
    output::kv(
        "Backups",
        &format!("{} of {}", report.backup_count, report.max_backups),
    );
    output::kv(
        "Auto-cleanup",
        if report.auto_cleanup { "enabled" } else { "disabled" },
    );
    output::kv("Total size", &human_bytes(report.total_size_bytes));
    if let (Some(name), Some(age)) = (&report.latest_backup, report.latest_age_minutes) {
        output::kv("Latest", &format!("{} ({} minutes ago)", name, age));
    }
    println!();

    for issue in &report.issues {
        output::warning(issue);
    }
    for recommendation in &report.recommendations {
        output::info(recommendation);
    }

    if report.healthy {
        output::success("Backup archive is healthy");
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Backup archive is unhealthy ({} corrupted, {} missing)",
            report.corrupted_count,
            report.missing_count
        ))
    }
}

pub async fn delete(tools: &BackupTools, args: NameArg, json: bool) -> Result<()> {
    if json {
        let result = tools.delete_backup(NameArgs { name: args.name }).await;
        return emit("delete_backup", result);
    }

    let entry = tools.manager().delete(&args.name).await?;
    output::success(&format!("Deleted backup '{}'", entry.name));
    Ok(())
}

pub async fn restore(tools: &BackupTools, args: RestoreArgs, json: bool) -> Result<()> {
    let safety_backup = !args.no_safety_backup;
    if json {
        let result = tools
            .restore_backup(RestoreBackupArgs {
                name: args.name,
                safety_backup,
            })
            .await;
        return emit("restore_backup", result);
    }

    let target = tools.manager().paths().live_flow_file.clone();
    let flows = flowkeeper_backup::FileFlowSource::new(target.clone());
    let outcome = tools
        .manager()
        .restore(&args.name, &flows, safety_backup)
        .await?;

    if let Some(safety) = &outcome.safety_backup {
        output::info(&format!("Saved current flows as '{}'", safety.name));
    }
    output::success(&format!(
        "Restored '{}' ({} elements) to {}",
        outcome.restored.name, outcome.elements, target
    ));
    output::info("Restart Node-RED or reload its flows to apply the change");
    Ok(())
}

pub async fn migrate(tools: &BackupTools, args: MigrateArgs, json: bool) -> Result<()> {
    if json {
        let result = tools
            .migrate_backup_config(MigrateConfigArgs {
                max_backups: args.max_backups,
                auto_cleanup: args.auto_cleanup,
            })
            .await;
        return emit("migrate_backup_config", result);
    }

    let outcome = tools
        .manager()
        .migrate_config(IndexConfig {
            max_backups: args.max_backups,
            auto_cleanup: args.auto_cleanup,
        })
        .await?;

    output::success(&format!(
        "Archive now keeps up to {} backups (auto-cleanup {})",
        outcome.current.max_backups,
        if outcome.current.auto_cleanup { "on" } else { "off" }
    ));
    if !outcome.evicted.is_empty() {
        output::warning(&format!(
            "Evicted {} backup(s): {}",
            outcome.evicted.len(),
            outcome.evicted.join(", ")
        ));
    }
    Ok(())
}
