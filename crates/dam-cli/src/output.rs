//! Terminal projections of catalog, upload and analytics state.

use dam_core::models::{
    Asset, AssetUsageAnalytics, DashboardStats, DownloadStats, LatestAsset, Pagination,
    PopularAsset, RealTimeStats, UploadStats, UploadSummary, UserBehaviorAnalytics,
};
use dam_state::{UploadPhase, UploadState};

use crate::{format_count, format_file_size, truncate_string};

pub fn print_asset_table(title: &str, assets: &[Asset], pagination: Option<&Pagination>) {
    println!("\n=== {} ===\n", title);

    if let Some(p) = pagination {
        println!(
            "Page {} of {} ({} items, {} per page)",
            p.current_page,
            p.total_pages.max(1),
            p.total_items,
            p.limit
        );
    }

    if assets.is_empty() {
        println!("\nNo assets found.");
        return;
    }

    println!(
        "\n{:>8} {:<9} {:<32} {:<24} {:>10} {:<11} {:>20}",
        "ID", "Category", "Original Name", "Mime Type", "Size", "Status", "Created At"
    );
    println!("{}", "-".repeat(120));

    for asset in assets {
        println!(
            "{:>8} {:<9} {:<32} {:<24} {:>10} {:<11} {:>20}",
            asset.id,
            asset.category().to_string(),
            truncate_string(&asset.original_name, 32),
            truncate_string(&asset.mime_type, 24),
            format_file_size(asset.file_size),
            truncate_string(&asset.status, 11),
            asset.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    if let Some(p) = pagination {
        if p.has_next {
            println!("\n... (more assets available, use --page {} to see more)", p.current_page + 1);
        }
    }

    println!();
}

pub fn print_asset_detail(asset: &Asset) {
    println!("\n=== Asset {} ===\n", asset.id);
    println!("Original name: {}", asset.original_name);
    println!("Stored as:     {}", asset.filename);
    println!("Type:          {} ({})", asset.mime_type, asset.category());
    println!("Size:          {}", format_file_size(asset.file_size));
    println!("Status:        {}", asset.status);
    println!("Location:      {}/{}", asset.storage_bucket, asset.storage_path);
    println!("Created:       {}", asset.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated:       {}", asset.updated_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(processed) = asset.processed_at {
        println!("Processed:     {}", processed.format("%Y-%m-%d %H:%M:%S"));
    }

    let meta = &asset.metadata;
    if !meta.tags.is_empty() {
        println!("Tags:          {}", meta.tags.join(", "));
    }
    let fields = [
        ("Category", &meta.category),
        ("Author", &meta.author),
        ("Department", &meta.department),
        ("Project", &meta.project),
        ("Description", &meta.description),
    ];
    for (label, value) in fields {
        if let Some(v) = value {
            println!("{:<15}{}", format!("{}:", label), v);
        }
    }
    println!();
}

/// One status line for the upload session, e.g.
/// `Uploading 45% (file 2 of 3)`.
pub fn progress_line(state: &UploadState) -> String {
    let count = state.files.len();
    match state.phase {
        UploadPhase::Uploading => match state.current_file_index {
            Some(index) if count > 0 => format!(
                "Uploading {}% (file {} of {})",
                state.progress,
                index + 1,
                count
            ),
            _ => format!("Uploading {}%", state.progress),
        },
        UploadPhase::Processing => "Processing on server...".to_string(),
        UploadPhase::Validating => "Validating files...".to_string(),
        UploadPhase::Succeeded => "Upload complete".to_string(),
        UploadPhase::Failed => format!(
            "Upload failed: {}",
            state.error.as_deref().unwrap_or("unknown error")
        ),
        UploadPhase::Selecting => format!("{} file(s) ready", count),
        UploadPhase::Idle => "Idle".to_string(),
    }
}

pub fn print_upload_summary(summary: &UploadSummary) {
    println!("\n=== Upload Summary ===\n");
    println!(
        "Uploaded: {}   Replaced: {}   Skipped: {}",
        summary.uploaded, summary.replaced, summary.skipped
    );

    let sections = [
        ("Uploaded", &summary.details.uploaded),
        ("Replaced", &summary.details.replaced),
        ("Skipped", &summary.details.skipped),
    ];
    for (label, names) in sections {
        if names.is_empty() {
            continue;
        }
        println!("\n--- {} ---", label);
        for name in names {
            println!("  {}", name);
        }
    }
    println!();
}

pub fn print_dashboard(stats: &DashboardStats) {
    println!("\n=== Dashboard ===\n");
    println!("Total assets:    {}", format_count(stats.total_assets));
    println!("Total storage:   {}", stats.total_storage);
    println!("Total uploads:   {}", format_count(stats.total_uploads));
    println!("Total downloads: {}", format_count(stats.total_downloads));
    println!("Total views:     {}", format_count(stats.total_views));

    if !stats.file_type_breakdown.is_empty() {
        println!("\n--- By Type ---");
        for (file_type, count) in &stats.file_type_breakdown {
            println!("{:<12} {:>8}", file_type, format_count(*count));
        }
    }

    let recent = &stats.recent_activity;
    println!(
        "\nRecent activity: {} uploads, {} downloads, {} views",
        format_count(recent.uploads),
        format_count(recent.downloads),
        format_count(recent.views)
    );
    println!();
}

pub fn print_upload_stats(stats: &UploadStats) {
    println!("\n=== Upload Statistics ===\n");
    println!("Total:      {}", format_count(stats.total_uploads));
    println!("Today:      {}", format_count(stats.uploads_today));
    println!("This week:  {}", format_count(stats.uploads_this_week));
    println!("This month: {}", format_count(stats.uploads_this_month));
    println!("Avg size:   {}", stats.average_file_size);
    for (file_type, count) in &stats.file_type_breakdown {
        println!("  {:<12} {:>8}", file_type, format_count(*count));
    }
    println!();
}

pub fn print_download_stats(stats: &DownloadStats) {
    println!("\n=== Download Statistics ===\n");
    println!("Total:      {}", format_count(stats.total_downloads));
    println!("Today:      {}", format_count(stats.downloads_today));
    println!("This week:  {}", format_count(stats.downloads_this_week));
    println!("This month: {}", format_count(stats.downloads_this_month));
    if !stats.popular_assets.is_empty() {
        print_popular(&stats.popular_assets);
    }
    println!();
}

pub fn print_popular(assets: &[PopularAsset]) {
    println!(
        "\n{:>8} {:<32} {:<10} {:>10} {:>8}",
        "ID", "Filename", "Type", "Downloads", "Score"
    );
    println!("{}", "-".repeat(72));
    for asset in assets {
        println!(
            "{:>8} {:<32} {:<10} {:>10} {:>8.1}",
            asset.id,
            truncate_string(&asset.filename, 32),
            truncate_string(&asset.file_type, 10),
            format_count(asset.total_downloads),
            asset.popularity_score
        );
    }
}

pub fn print_latest(assets: &[LatestAsset]) {
    println!("\n{:>8} {:<32} {:<10} {:<11} {:>20}", "ID", "Filename", "Type", "Status", "Created At");
    println!("{}", "-".repeat(85));
    for asset in assets {
        println!(
            "{:>8} {:<32} {:<10} {:<11} {:>20}",
            asset.id,
            truncate_string(&asset.filename, 32),
            truncate_string(&asset.file_type, 10),
            truncate_string(&asset.status, 11),
            truncate_string(&asset.created_at, 20)
        );
    }
}

pub fn print_asset_usage(usage: &AssetUsageAnalytics) {
    println!("\n=== Asset {} Usage ===\n", usage.asset_id);
    println!("File:       {} ({})", usage.filename, usage.file_type);
    println!(
        "Accesses:   {} ({} views, {} downloads)",
        format_count(usage.total_accesses),
        format_count(usage.total_views),
        format_count(usage.total_downloads)
    );
    println!("Frequency:  {}", usage.access_frequency);
    println!("Popularity: {:.1}", usage.popularity_score);

    println!("\n{:<12} {:>8} {:>10}", "Window", "Views", "Downloads");
    println!("{}", "-".repeat(32));
    let windows = [
        ("Today", usage.views_today, usage.downloads_today),
        ("This week", usage.views_this_week, usage.downloads_this_week),
        ("This month", usage.views_this_month, usage.downloads_this_month),
    ];
    for (label, views, downloads) in windows {
        println!(
            "{:<12} {:>8} {:>10}",
            label,
            format_count(views),
            format_count(downloads)
        );
    }

    if let Some(at) = &usage.last_viewed {
        println!("\nLast viewed:     {}", at);
    }
    if let Some(at) = &usage.last_downloaded {
        println!("Last downloaded: {}", at);
    }
    println!();
}

pub fn print_user_behavior(behavior: &UserBehaviorAnalytics) {
    println!("\n=== User {} ===\n", behavior.user_id);
    println!("Segment:         {}", behavior.user_segment);
    println!(
        "Assets accessed: {}",
        format_count(behavior.total_assets_accessed)
    );
    println!("Views:           {}", format_count(behavior.total_views));
    println!("Downloads:       {}", format_count(behavior.total_downloads));
    if let Some(at) = &behavior.last_activity {
        println!("Last activity:   {}", at);
    }
    if !behavior.favorite_file_types.is_empty() {
        println!("Favorite types:  {}", behavior.favorite_file_types.join(", "));
    }
    println!("Active:          {}", activity_line(behavior));
    println!();
}

/// `morning 40 | afternoon 35 | evening 20 | night 5`
pub fn activity_line(behavior: &UserBehaviorAnalytics) -> String {
    let p = &behavior.activity_pattern;
    format!(
        "morning {} | afternoon {} | evening {} | night {}",
        p.morning, p.afternoon, p.evening, p.night
    )
}

pub fn realtime_line(stats: &RealTimeStats) -> String {
    format!(
        "views {} | downloads {} | uploads {} | at {}",
        format_count(stats.total_views),
        format_count(stats.total_downloads),
        format_count(stats.total_uploads),
        stats.timestamp
    )
}
