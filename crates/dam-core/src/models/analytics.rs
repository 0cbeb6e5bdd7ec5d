use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Reporting window for upload/download statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl StatsPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsPeriod::Day => "day",
            StatsPeriod::Week => "week",
            StatsPeriod::Month => "month",
            StatsPeriod::Year => "year",
        }
    }
}

impl Display for StatsPeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatsPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(StatsPeriod::Day),
            "week" => Ok(StatsPeriod::Week),
            "month" => Ok(StatsPeriod::Month),
            "year" => Ok(StatsPeriod::Year),
            _ => Err(anyhow::anyhow!("Invalid stats period: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityCounts {
    pub uploads: u64,
    pub downloads: u64,
    pub views: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealTimeStats {
    pub total_views: u64,
    pub total_downloads: u64,
    pub total_uploads: u64,
    pub timestamp: String,
}

/// `GET /stats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_assets: u64,
    pub total_downloads: u64,
    pub total_uploads: u64,
    pub total_views: u64,
    pub total_storage: String,
    pub file_type_breakdown: BTreeMap<String, u64>,
    pub recent_activity: ActivityCounts,
    pub real_time_stats: RealTimeStats,
}

/// `GET /stats/uploads?period=`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadStats {
    pub total_uploads: u64,
    pub uploads_today: u64,
    pub uploads_this_week: u64,
    pub uploads_this_month: u64,
    pub average_file_size: String,
    pub file_type_breakdown: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PopularAsset {
    pub id: i64,
    pub filename: String,
    #[serde(rename = "file_type")]
    pub file_type: String,
    pub total_downloads: u64,
    pub last_downloaded: Option<String>,
    pub popularity_score: f64,
}

/// `GET /stats/downloads?period=`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadStats {
    pub total_downloads: u64,
    pub downloads_today: u64,
    pub downloads_this_week: u64,
    pub downloads_this_month: u64,
    pub popular_assets: Vec<PopularAsset>,
}

/// `GET /stats/latest?limit=`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatestAsset {
    pub id: i64,
    pub filename: String,
    pub file_type: String,
    pub file_size: JsonValue,
    pub status: String,
    pub created_at: String,
    pub metadata: JsonValue,
}

/// Body of `POST /stats/track-view` and `POST /stats/track-download`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
    pub asset_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

impl TrackEventRequest {
    pub fn new(asset_id: i64) -> Self {
        TrackEventRequest {
            asset_id,
            user_id: None,
            metadata: None,
        }
    }
}

/// `GET /stats/asset/{id}/analytics`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetUsageAnalytics {
    pub asset_id: i64,
    pub filename: String,
    pub file_type: String,
    pub total_views: u64,
    pub total_downloads: u64,
    pub total_accesses: u64,
    pub last_viewed: Option<String>,
    pub last_downloaded: Option<String>,
    pub views_today: u64,
    pub downloads_today: u64,
    pub views_this_week: u64,
    pub downloads_this_week: u64,
    pub views_this_month: u64,
    pub downloads_this_month: u64,
    /// `high`, `medium` or `low`.
    pub access_frequency: String,
    pub popularity_score: f64,
}

/// Share of a user's activity per time of day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityPattern {
    pub morning: u64,
    pub afternoon: u64,
    pub evening: u64,
    pub night: u64,
}

/// `GET /stats/user/{id}/behavior`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserBehaviorAnalytics {
    pub user_id: String,
    pub total_assets_accessed: u64,
    pub total_views: u64,
    pub total_downloads: u64,
    pub last_activity: Option<String>,
    pub favorite_file_types: Vec<String>,
    pub activity_pattern: ActivityPattern,
    /// `power`, `regular` or `casual`.
    pub user_segment: String,
}

/// Everything the analytics dashboard shows, fetched together.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub dashboard: DashboardStats,
    pub uploads: UploadStats,
    pub downloads: DownloadStats,
    pub latest: Vec<LatestAsset>,
    pub popular: Vec<PopularAsset>,
    pub real_time: RealTimeStats,
}
