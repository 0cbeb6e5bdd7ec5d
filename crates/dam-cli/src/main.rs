//! DAM CLI: command-line client for the digital asset management API.
//!
//! Set DAM_API_BASE_URL (or API_BASE_URL) and, in production, DAM_ORIGIN.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dam_api_client::{ApiClient, AssetApi};
use dam_cli::{download_file_name, init_tracing, output};
use dam_core::models::{
    AssetFilters, DateRangePreset, DuplicateAction, FileHandle, FilterUpdate, PageLimit,
    SortField, SortOrder, StatsPeriod, TrackEventRequest, UploadOptions,
};
use dam_state::{AssetCatalog, StatsPoller, UploadSession};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "dam", about = "Digital asset management CLI")]
struct Cli {
    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = Format::Table)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more files in a single request
    Upload {
        /// Paths of the files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        options: UploadArgs,
    },
    /// List assets with filters and pagination
    List {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Search assets by name and metadata
    Search {
        /// Search query (at least 2 characters)
        query: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Get a single asset by ID
    Get { id: i64 },
    /// Delete an asset by ID
    Delete { id: i64 },
    /// Download an asset's bytes
    Download {
        id: i64,
        /// Destination path (defaults to the asset's original name)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the streaming URL of an asset
    StreamUrl { id: i64 },
    /// Analytics
    Stats {
        #[command(subcommand)]
        sub: StatsCommands,
    },
    /// Check that the backend is up
    Health,
    /// Record a view event
    TrackView {
        asset_id: i64,
        #[arg(long)]
        user: Option<String>,
    },
    /// Record a download event
    TrackDownload {
        asset_id: i64,
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand)]
enum StatsCommands {
    /// Dashboard totals
    Overview,
    /// Upload statistics for a period
    Uploads {
        #[arg(long, default_value = "month")]
        period: StatsPeriod,
    },
    /// Download statistics for a period
    Downloads {
        #[arg(long, default_value = "month")]
        period: StatsPeriod,
    },
    /// Most recently uploaded assets
    Latest {
        #[arg(long, default_value = "10")]
        limit: u32,
    },
    /// Most downloaded assets
    Popular {
        #[arg(long, default_value = "10")]
        limit: u32,
    },
    /// Live counters; with --watch, refresh until Ctrl-C
    Realtime {
        #[arg(long)]
        watch: bool,
    },
    /// Every analytics view fetched together
    Dashboard {
        #[arg(long, default_value = "month")]
        period: StatsPeriod,
    },
    /// Usage of a single asset
    Asset { id: i64 },
    /// Activity of a single user
    User { user_id: String },
}

#[derive(Args)]
struct UploadArgs {
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Repeat for several tags
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    project: Option<String>,
    /// What the server does with files it already has: skip, replace or error
    #[arg(long = "on-duplicate")]
    duplicate_action: Option<DuplicateAction>,
    /// Asset to overwrite when replacing a duplicate
    #[arg(long, requires = "duplicate_action")]
    replace_asset_id: Option<i64>,
}

impl From<UploadArgs> for UploadOptions {
    fn from(args: UploadArgs) -> Self {
        UploadOptions {
            category: args.category,
            description: args.description,
            tags: args.tags,
            author: args.author,
            department: args.department,
            project: args.project,
            duplicate_action: args.duplicate_action,
            replace_asset_id: args.replace_asset_id,
        }
    }
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long, default_value = "1")]
    page: u32,
    /// Page size: 10, 20, 50 or 100
    #[arg(long)]
    limit: Option<u32>,
    /// created_at, updated_at, filename, file_size, mime_type
    #[arg(long)]
    sort_by: Option<SortField>,
    /// asc or desc
    #[arg(long)]
    sort_order: Option<SortOrder>,
    /// image, video, audio, document
    #[arg(long)]
    file_type: Option<String>,
    #[arg(long)]
    status: Option<String>,
    /// today, week, month, year, all
    #[arg(long, conflicts_with_all = ["date_from", "date_to"])]
    date: Option<DateRangePreset>,
    /// YYYY-MM-DD
    #[arg(long)]
    date_from: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    date_to: Option<String>,
    /// Repeat for several tags
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    project: Option<String>,
}

impl FilterArgs {
    fn into_filters(self) -> anyhow::Result<AssetFilters> {
        let mut update = FilterUpdate::default();
        if let Some(limit) = self.limit {
            let limit = PageLimit::new(limit)
                .with_context(|| format!("Unsupported page size {}; use 10, 20, 50 or 100", limit))?;
            update = update.limit(limit);
        }
        if let Some(sort_by) = self.sort_by {
            update = update.sort_by(sort_by);
        }
        if let Some(sort_order) = self.sort_order {
            update = update.sort_order(sort_order);
        }
        if self.file_type.is_some() {
            update = update.file_type(self.file_type);
        }
        if self.status.is_some() {
            update = update.status(self.status);
        }
        if let Some(preset) = self.date {
            update = update.date_preset(preset, chrono::Local::now().date_naive());
        } else if self.date_from.is_some() || self.date_to.is_some() {
            update = update.date_range(self.date_from, self.date_to);
        }
        if !self.tags.is_empty() {
            update = update.tags(self.tags);
        }
        if self.category.is_some() {
            update = update.category(self.category);
        }
        if self.author.is_some() {
            update = update.author(self.author);
        }
        if self.department.is_some() {
            update = update.department(self.department);
        }
        if self.project.is_some() {
            update = update.project(self.project);
        }

        // Non-page changes reset to page 1, so the page goes on last.
        let filters = AssetFilters::default().with(update);
        Ok(filters.with(FilterUpdate::default().page(self.page)))
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn run_upload(
    client: &ApiClient,
    files: Vec<PathBuf>,
    options: UploadOptions,
    format: Format,
) -> anyhow::Result<()> {
    let mut handles = Vec::with_capacity(files.len());
    for path in &files {
        handles.push(FileHandle::from_path(path)?);
    }

    let api: Arc<dyn AssetApi> = Arc::new(client.clone());
    let config = client.config();
    let catalog = AssetCatalog::new(api.clone(), config.search.clone());
    let session =
        UploadSession::new(api, config.upload_rules.clone()).with_catalog(catalog.clone());
    session.set_options(options)?;

    let selection = session.select_files(handles)?;
    for rejected in &selection.rejected {
        eprintln!("Skipping: {}", rejected);
    }
    if selection.accepted.is_empty() {
        anyhow::bail!("No valid files to upload");
    }

    let mut progress_rx = session.subscribe();
    let progress_task = tokio::spawn(async move {
        while progress_rx.changed().await.is_ok() {
            let line = output::progress_line(&progress_rx.borrow_and_update());
            eprintln!("{}", line);
        }
    });

    let canceller = session.canceller();
    let cancel_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && canceller.cancel() {
            eprintln!("Cancelling upload...");
        }
    });

    let result = session.upload().await;
    cancel_task.abort();
    drop(session);
    let _ = progress_task.await;

    let summary = result.context("Upload failed")?;
    let view = catalog.view();

    match format {
        Format::Json => print_json(&serde_json::json!({ "summary": summary, "assets": view.assets }))?,
        Format::Table => {
            output::print_upload_summary(&summary);
            output::print_asset_table("Newest Assets", &view.assets, view.pagination.as_ref());
        }
    }
    Ok(())
}

async fn run_stats(client: &ApiClient, sub: StatsCommands, format: Format) -> anyhow::Result<()> {
    let json = format == Format::Json;
    match sub {
        StatsCommands::Overview => {
            let stats = client.dashboard_stats().await?;
            if json {
                print_json(&stats)?;
            } else {
                output::print_dashboard(&stats);
            }
        }
        StatsCommands::Uploads { period } => {
            let stats = client.upload_stats(period).await?;
            if json {
                print_json(&stats)?;
            } else {
                output::print_upload_stats(&stats);
            }
        }
        StatsCommands::Downloads { period } => {
            let stats = client.download_stats(period).await?;
            if json {
                print_json(&stats)?;
            } else {
                output::print_download_stats(&stats);
            }
        }
        StatsCommands::Latest { limit } => {
            let assets = client.latest_assets(limit).await?;
            if json {
                print_json(&assets)?;
            } else {
                output::print_latest(&assets);
            }
        }
        StatsCommands::Popular { limit } => {
            let assets = client.popular_assets(limit).await?;
            if json {
                print_json(&assets)?;
            } else {
                output::print_popular(&assets);
            }
        }
        StatsCommands::Realtime { watch: false } => {
            let stats = client.realtime_stats().await?;
            if json {
                print_json(&stats)?;
            } else {
                println!("{}", output::realtime_line(&stats));
            }
        }
        StatsCommands::Realtime { watch: true } => {
            let api: Arc<dyn AssetApi> = Arc::new(client.clone());
            let poller = StatsPoller::spawn(api, client.config().stats_refresh_interval);
            let mut updates = poller.subscribe();

            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = updates.borrow_and_update().clone();
                        if json {
                            print_json(&snapshot)?;
                        } else if let Some(err) = &snapshot.error {
                            eprintln!("Refresh failed: {}", err);
                        } else if let Some(stats) = &snapshot.stats {
                            println!("{}", output::realtime_line(stats));
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            poller.shutdown().await;
        }
        StatsCommands::Asset { id } => {
            let usage = client.asset_analytics(id).await?;
            if json {
                print_json(&usage)?;
            } else {
                output::print_asset_usage(&usage);
            }
        }
        StatsCommands::User { user_id } => {
            let behavior = client.user_behavior(&user_id).await?;
            if json {
                print_json(&behavior)?;
            } else {
                output::print_user_behavior(&behavior);
            }
        }
        StatsCommands::Dashboard { period } => {
            let snapshot = client.analytics_snapshot(period).await?;
            if json {
                print_json(&snapshot)?;
            } else {
                output::print_dashboard(&snapshot.dashboard);
                output::print_upload_stats(&snapshot.uploads);
                output::print_download_stats(&snapshot.downloads);
                println!("\n=== Latest ===");
                output::print_latest(&snapshot.latest);
                println!("\n=== Popular ===");
                output::print_popular(&snapshot.popular);
                println!("\n{}", output::realtime_line(&snapshot.real_time));
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let client = ApiClient::from_env().context(
        "Failed to create API client. Set DAM_API_BASE_URL, or DAM_ORIGIN in production",
    )?;

    let cli = Cli::parse();
    let format = cli.format;

    match cli.command {
        Commands::Upload { files, options } => {
            run_upload(&client, files, options.into(), format).await?
        }
        Commands::List { filters } => {
            let api: Arc<dyn AssetApi> = Arc::new(client.clone());
            let catalog = AssetCatalog::new(api, client.config().search.clone());
            catalog.fetch(filters.into_filters()?).await?;
            let view = catalog.view();
            match format {
                Format::Json => print_json(&view)?,
                Format::Table => {
                    output::print_asset_table("Assets", &view.assets, view.pagination.as_ref())
                }
            }
        }
        Commands::Search { query, filters } => {
            let min_chars = client.config().search.min_chars;
            if query.trim().chars().count() < min_chars {
                anyhow::bail!("Search query must be at least {} characters", min_chars);
            }
            let api: Arc<dyn AssetApi> = Arc::new(client.clone());
            let catalog = AssetCatalog::new(api, client.config().search.clone());
            catalog.search(&query, filters.into_filters()?).await?;
            let state = catalog.snapshot();
            match format {
                Format::Json => print_json(&serde_json::json!({
                    "assets": state.search_results,
                    "pagination": state.search_pagination,
                }))?,
                Format::Table => output::print_asset_table(
                    &format!("Search: {}", query.trim()),
                    &state.search_results,
                    state.search_pagination.as_ref(),
                ),
            }
        }
        Commands::Get { id } => {
            let asset = client.get_asset(id).await?;
            match format {
                Format::Json => print_json(&asset)?,
                Format::Table => output::print_asset_detail(&asset),
            }
        }
        Commands::Delete { id } => {
            client.delete_asset(id).await?;
            print_json(
                &serde_json::json!({ "success": true, "message": format!("Asset {} deleted", id) }),
            )?;
        }
        Commands::Download { id, output } => {
            let path = match output {
                Some(path) => path,
                None => download_file_name(&client.get_asset(id).await?.original_name, id),
            };
            let bytes = client.download_asset(id).await?;
            std::fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Saved {} ({})",
                path.display(),
                dam_cli::format_file_size(bytes.len() as u64)
            );
        }
        Commands::StreamUrl { id } => println!("{}", client.stream_url(id)),
        Commands::Health => {
            let healthy = client.check_health().await;
            match format {
                Format::Json => print_json(
                    &serde_json::json!({ "healthy": healthy, "url": client.health_url() }),
                )?,
                Format::Table => println!(
                    "{}: {}",
                    client.health_url(),
                    if healthy { "up" } else { "down" }
                ),
            }
            if !healthy {
                anyhow::bail!("Backend is not reachable");
            }
        }
        Commands::Stats { sub } => run_stats(&client, sub, format).await?,
        Commands::TrackView { asset_id, user } => {
            let event = TrackEventRequest {
                user_id: user,
                ..TrackEventRequest::new(asset_id)
            };
            print_json(&client.track_view(&event).await?)?;
        }
        Commands::TrackDownload { asset_id, user } => {
            let event = TrackEventRequest {
                user_id: user,
                ..TrackEventRequest::new(asset_id)
            };
            print_json(&client.track_download(&event).await?)?;
        }
    }

    Ok(())
}
