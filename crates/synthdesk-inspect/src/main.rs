//! project-inspect - preview how a project lands in the engine filesystem
//!
//! Reads a project snapshot (YAML), syncs it into an in-memory engine
//! filesystem and prints the resulting tree plus how the selected target
//! would be compiled. No engine is started.
//!
//! ## Usage
//!
//! ```text
//! project-inspect <snapshot.yaml> [--target <name>]
//! ```

use anyhow::{bail, Context, Result};

use synthdesk_core::config::{default_config_path, load_config, SessionConfig};
use synthdesk_core::engine::MemoryFs;
use synthdesk_core::sync::{snapshot_tree, sync_project};
use synthdesk_core::ProjectSnapshot;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(snapshot_path) = args.first() else {
        bail!("usage: project-inspect <snapshot.yaml> [--target <name>]");
    };
    let target = args
        .iter()
        .position(|arg| arg == "--target")
        .and_then(|idx| args.get(idx + 1))
        .map(String::as_str);

    let config: SessionConfig = load_config(&default_config_path("session.yaml"));

    let contents = std::fs::read_to_string(snapshot_path)
        .with_context(|| format!("Failed to read snapshot: {}", snapshot_path))?;
    let snapshot: ProjectSnapshot =
        serde_yaml::from_str(&contents).context("Failed to parse project snapshot")?;
    log::info!(
        "Loaded project {} ({} documents)",
        snapshot.id(),
        snapshot.documents.len()
    );

    let fs = MemoryFs::new();
    let report = sync_project(&fs, &snapshot)?;
    let tree = snapshot_tree(&fs)?;

    println!("Project: {} ({})", snapshot.project.name, snapshot.id());
    println!(
        "Synced {} files, {} folders, {} bytes",
        report.files, report.folders, report.bytes
    );
    println!();
    for (path, size) in &tree {
        println!("  {:>8}  {}", size, path);
    }
    println!();

    match snapshot.target_document(target) {
        Some((target, document)) => {
            let path = snapshot.resolve_path(document);
            if config.is_project_file(&document.filename) {
                println!("Target '{}': compile descriptor {}", target.name, path);
            } else {
                println!("Target '{}': compile {} as raw orchestra", target.name, path);
            }
            println!(
                "Render output: {}",
                config.default_output_name(&document.filename)
            );
        }
        None => println!("No target found"),
    }

    Ok(())
}
