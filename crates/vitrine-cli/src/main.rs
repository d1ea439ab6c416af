//! Vitrine CLI: create and edit site entities with their assets, and reorder
//! entity lists, against a running admin API.
//!
//! Set VITRINE_API_URL and VITRINE_API_KEY. Uses X-API-Key auth.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use vitrine_api_client::{ApiClient, HttpUploadTransport};
use vitrine_cli::{init_tracing, load_file, moves_to, parse_fields, AssetArg, ListedEntity, ReuseArg};
use vitrine_core::{ClientConfig, EntityType, FileConstraints};
use vitrine_uploads::{
    AssetSlot, CommitOutcome, EntityCreationCoordinator, InMemoryPreviews, PipelineDeps,
    ReorderCoordinator, SelectOutcome, UploadStatus,
};

#[derive(Parser)]
#[command(name = "vitrine", about = "Vitrine admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an entity, then upload its assets and attach them in one patch
    Create {
        /// Entity collection, e.g. projects, team-members
        entity_type: EntityType,
        /// JSON object of entity fields, inline or @file.json
        #[arg(long)]
        fields: Option<String>,
        /// Asset slot as intent=field[=path], repeatable
        #[arg(long = "asset")]
        assets: Vec<AssetArg>,
        /// Reuse one slot's upload for another as primary:secondary, repeatable
        #[arg(long = "reuse")]
        reuses: Vec<ReuseArg>,
    },
    /// Upload assets for an existing entity and patch them on immediately
    Attach {
        entity_type: EntityType,
        /// Entity UUID
        id: Uuid,
        #[arg(long = "asset")]
        assets: Vec<AssetArg>,
        #[arg(long = "reuse")]
        reuses: Vec<ReuseArg>,
        /// Extra fields to patch after the assets
        #[arg(long)]
        fields: Option<String>,
    },
    /// Save a new order for every entity of a type
    Reorder {
        entity_type: EntityType,
        /// All entity ids, in the desired order
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// List entities of a type
    List { entity_type: EntityType },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn pipeline_deps(client: &ApiClient, config: &ClientConfig) -> anyhow::Result<PipelineDeps> {
    let client = Arc::new(client.clone());
    let transport = Arc::new(HttpUploadTransport::from_config(config)?);
    Ok(PipelineDeps::new(
        client.clone(),
        client,
        transport,
        Arc::new(InMemoryPreviews::new()),
    ))
}

/// Register slots and aliases, and log upload progress per slot.
fn configure(
    mut coordinator: EntityCreationCoordinator,
    assets: &[AssetArg],
    reuses: &[ReuseArg],
) -> anyhow::Result<EntityCreationCoordinator> {
    for asset in assets {
        coordinator = coordinator.with_slot(AssetSlot::new(
            asset.intent.clone(),
            asset.field.clone(),
            FileConstraints::new(),
        ));
        if let Some(session) = coordinator.session(&asset.intent) {
            let mut updates = session.subscribe();
            tokio::spawn(async move {
                while updates.changed().await.is_ok() {
                    let snapshot = updates.borrow_and_update().clone();
                    match snapshot.status {
                        UploadStatus::Uploading => {
                            tracing::info!(intent = %snapshot.intent, progress = snapshot.progress, "Uploading")
                        }
                        UploadStatus::Error => tracing::warn!(
                            intent = %snapshot.intent,
                            error = snapshot.last_error.as_deref().unwrap_or_default(),
                            "Upload failed"
                        ),
                        _ => {}
                    }
                }
            });
        }
    }
    for reuse in reuses {
        coordinator = coordinator.with_alias(reuse.primary.clone(), reuse.secondary.clone())?;
        coordinator.set_alias_enabled(&reuse.secondary, true)?;
    }
    Ok(coordinator)
}

async fn create(
    client: &ApiClient,
    config: &ClientConfig,
    entity_type: EntityType,
    fields: serde_json::Value,
    assets: Vec<AssetArg>,
    reuses: Vec<ReuseArg>,
) -> anyhow::Result<()> {
    let deps = pipeline_deps(client, config)?;
    let mut coordinator = configure(
        EntityCreationCoordinator::for_create(entity_type, deps),
        &assets,
        &reuses,
    )?;

    for asset in &assets {
        if let Some(path) = &asset.path {
            let file = load_file(path).await?;
            coordinator.select(&asset.intent, file).await?;
        }
    }

    let mut report = coordinator.submit(fields).await?;
    if report.attach_error.is_some() {
        tracing::warn!("Attaching assets failed, retrying once");
        if let Ok(fields) = coordinator.retry_attach().await {
            report.attached = fields;
            report.attach_error = None;
        }
    }

    let complete = report.is_complete();
    print_json(&json!({
        "entity_id": report.entity_id,
        "entity": report.entity,
        "uploaded": report.uploaded,
        "failed": report.failed,
        "attached": report.attached,
        "attach_error": report.attach_error,
        "unattached": coordinator.unattached(),
        "notices": coordinator.drain_notices(),
    }))?;
    if !complete {
        bail!("Entity {} was created but not all assets were attached", report.entity_id);
    }
    Ok(())
}

async fn attach(
    client: &ApiClient,
    config: &ClientConfig,
    entity_type: EntityType,
    id: Uuid,
    assets: Vec<AssetArg>,
    reuses: Vec<ReuseArg>,
    fields: Option<serde_json::Value>,
) -> anyhow::Result<()> {
    let deps = pipeline_deps(client, config)?;
    let mut coordinator = configure(
        EntityCreationCoordinator::for_edit(entity_type, id, deps),
        &assets,
        &reuses,
    )?;

    // Primaries first so reusing secondaries can adopt their URL.
    let mut ordered: Vec<&AssetArg> = assets.iter().filter(|a| a.path.is_some()).collect();
    ordered.sort_by_key(|a| reuses.iter().any(|r| r.secondary == a.intent));

    let mut results = Vec::new();
    let mut failures = 0;
    for asset in ordered {
        let Some(path) = &asset.path else { continue };
        let file = load_file(path).await?;
        match coordinator.select(&asset.intent, file).await {
            Ok(SelectOutcome::Uploaded { url, patched }) => {
                results.push(json!({"intent": asset.intent, "url": url, "patched": patched}))
            }
            Ok(SelectOutcome::Reused { url, from, patched }) => results.push(
                json!({"intent": asset.intent, "url": url, "reused_from": from, "patched": patched}),
            ),
            Ok(SelectOutcome::Staged { .. }) => {}
            Err(e) => {
                failures += 1;
                results.push(json!({"intent": asset.intent, "error": e.to_string()}));
            }
        }
    }

    if let Some(fields) = fields {
        coordinator.submit(fields).await?;
    }

    print_json(&json!({
        "entity_id": id,
        "assets": results,
        "unattached": coordinator.unattached(),
        "notices": coordinator.drain_notices(),
    }))?;
    let unattached = coordinator.unattached().len();
    if failures > 0 || unattached > 0 {
        bail!("{} upload(s) failed, {} field(s) left unattached", failures, unattached);
    }
    Ok(())
}

async fn reorder(client: &ApiClient, entity_type: EntityType, ids: Vec<Uuid>) -> anyhow::Result<()> {
    let listed = client.list_entities(entity_type).await?;
    let items = listed
        .into_iter()
        .map(serde_json::from_value::<ListedEntity>)
        .collect::<Result<Vec<_>, _>>()
        .context("Listed entities must carry id and position")?;

    let coordinator = ReorderCoordinator::seed(Arc::new(client.clone()), entity_type, items);
    let current: Vec<Uuid> = coordinator.ordered().iter().map(|e| e.id).collect();
    for (from, to) in moves_to(&current, &ids)? {
        coordinator.move_item(from, to)?;
    }

    match coordinator.commit().await? {
        CommitOutcome::NoChanges => print_json(&json!({"updated": 0, "message": "Order unchanged"})),
        CommitOutcome::Saved { updated } => print_json(&json!({"updated": updated})),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::from_env()
        .context("Invalid client configuration. Set VITRINE_API_URL and VITRINE_API_KEY")?;
    let client = ApiClient::from_config(&config)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Create {
            entity_type,
            fields,
            assets,
            reuses,
        } => {
            let fields = parse_fields(fields.as_deref())?;
            create(&client, &config, entity_type, fields, assets, reuses).await?;
        }
        Commands::Attach {
            entity_type,
            id,
            assets,
            reuses,
            fields,
        } => {
            let fields = fields.as_deref().map(|f| parse_fields(Some(f))).transpose()?;
            attach(&client, &config, entity_type, id, assets, reuses, fields).await?;
        }
        Commands::Reorder { entity_type, ids } => {
            reorder(&client, entity_type, ids).await?;
        }
        Commands::List { entity_type } => {
            let entities = client.list_entities(entity_type).await?;
            print_json(&entities)?;
        }
    }

    Ok(())
}
