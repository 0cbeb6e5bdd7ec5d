//! Domain methods for the DAM API client.
//!
//! Wire types come from `dam_core::models`. The [`AssetApi`] trait is the seam
//! the upload session, asset catalog and stats poller depend on, so they can be
//! driven by a fake in tests.

use async_trait::async_trait;
use bytes::Bytes;
use dam_core::models::{
    AnalyticsSnapshot, Asset, AssetFilters, AssetListResponse, AssetPage, AssetUsageAnalytics,
    DashboardStats, DataEnvelope, DownloadStats, LatestAsset, PopularAsset, RealTimeStats,
    StatsPeriod, TrackEventRequest, UploadOptions, UploadResponse, UploadStats,
    UserBehaviorAnalytics,
};
use dam_core::DamResult;

use crate::progress::ProgressCallback;
use crate::{ApiClient, UploadPart};

/// Default row count for the latest/popular asset lists.
pub const DEFAULT_STATS_LIST_LIMIT: u32 = 10;

#[async_trait]
pub trait AssetApi: Send + Sync {
    /// `GET /assets` with the filter's query parameters.
    async fn list_assets(&self, filters: &AssetFilters) -> DamResult<AssetPage>;

    /// `GET /assets/search?query=...` with the filter's query parameters.
    async fn search_assets(&self, query: &str, filters: &AssetFilters) -> DamResult<AssetPage>;

    async fn get_asset(&self, id: i64) -> DamResult<Asset>;

    async fn delete_asset(&self, id: i64) -> DamResult<()>;

    /// `POST /assets/upload`, one `files` part per entry in order, plus the
    /// non-blank metadata and duplicate-handling fields of `options`.
    async fn upload_assets(
        &self,
        files: Vec<UploadPart>,
        options: &UploadOptions,
        on_progress: Option<ProgressCallback>,
    ) -> DamResult<UploadResponse>;

    async fn realtime_stats(&self) -> DamResult<RealTimeStats>;
}

impl ApiClient {
    /// URL of the inline stream for an asset (no request is made).
    pub fn stream_url(&self, id: i64) -> String {
        self.build_url(&format!("/assets/{}/stream", id))
    }

    /// URL of the attachment download for an asset (no request is made).
    pub fn download_url(&self, id: i64) -> String {
        self.build_url(&format!("/assets/{}/download", id))
    }

    /// Fetch the asset's bytes from `/assets/{id}/download`.
    pub async fn download_asset(&self, id: i64) -> DamResult<Bytes> {
        self.get_bytes(&format!("/assets/{}/download", id)).await
    }

    pub async fn dashboard_stats(&self) -> DamResult<DashboardStats> {
        let envelope: DataEnvelope<DashboardStats> = self.get("/stats", &[]).await?;
        Ok(envelope.data)
    }

    pub async fn upload_stats(&self, period: StatsPeriod) -> DamResult<UploadStats> {
        let envelope: DataEnvelope<UploadStats> = self
            .get("/stats/uploads", &[("period", period.to_string())])
            .await?;
        Ok(envelope.data)
    }

    pub async fn download_stats(&self, period: StatsPeriod) -> DamResult<DownloadStats> {
        let envelope: DataEnvelope<DownloadStats> = self
            .get("/stats/downloads", &[("period", period.to_string())])
            .await?;
        Ok(envelope.data)
    }

    pub async fn latest_assets(&self, limit: u32) -> DamResult<Vec<LatestAsset>> {
        let envelope: DataEnvelope<Vec<LatestAsset>> = self
            .get("/stats/latest", &[("limit", limit.to_string())])
            .await?;
        Ok(envelope.data)
    }

    pub async fn popular_assets(&self, limit: u32) -> DamResult<Vec<PopularAsset>> {
        let envelope: DataEnvelope<Vec<PopularAsset>> = self
            .get("/stats/popular", &[("limit", limit.to_string())])
            .await?;
        Ok(envelope.data)
    }

    /// Usage counters and popularity for one asset.
    pub async fn asset_analytics(&self, id: i64) -> DamResult<AssetUsageAnalytics> {
        let envelope: DataEnvelope<AssetUsageAnalytics> = self
            .get(&format!("/stats/asset/{}/analytics", id), &[])
            .await?;
        Ok(envelope.data)
    }

    /// Access history and segment for one user. The id is sent as a single
    /// encoded path segment.
    pub async fn user_behavior(&self, user_id: &str) -> DamResult<UserBehaviorAnalytics> {
        let envelope: DataEnvelope<UserBehaviorAnalytics> = self
            .get_segments(&["stats", "user", user_id, "behavior"])
            .await?;
        Ok(envelope.data)
    }

    /// Record a view of an asset.
    pub async fn track_view(&self, event: &TrackEventRequest) -> DamResult<serde_json::Value> {
        self.post_json("/stats/track-view", event).await
    }

    /// Record a download of an asset.
    pub async fn track_download(&self, event: &TrackEventRequest) -> DamResult<serde_json::Value> {
        self.post_json("/stats/track-download", event).await
    }

    /// Everything the analytics dashboard shows, fetched concurrently. Any
    /// failing endpoint fails the whole snapshot.
    pub async fn analytics_snapshot(&self, period: StatsPeriod) -> DamResult<AnalyticsSnapshot> {
        let (dashboard, uploads, downloads, latest, popular, real_time) = tokio::try_join!(
            self.dashboard_stats(),
            self.upload_stats(period),
            self.download_stats(period),
            self.latest_assets(DEFAULT_STATS_LIST_LIMIT),
            self.popular_assets(DEFAULT_STATS_LIST_LIMIT),
            AssetApi::realtime_stats(self),
        )?;

        Ok(AnalyticsSnapshot {
            dashboard,
            uploads,
            downloads,
            latest,
            popular,
            real_time,
        })
    }
}

#[async_trait]
impl AssetApi for ApiClient {
    async fn list_assets(&self, filters: &AssetFilters) -> DamResult<AssetPage> {
        let query = filters.query_pairs();
        let response: AssetListResponse = self
            .get_with_timeout("/assets", &query, self.config().list_timeout)
            .await?;

        tracing::debug!(
            page = filters.page,
            count = response.data.len(),
            total = response.pagination.total,
            "Fetched assets"
        );

        Ok(response.into())
    }

    async fn search_assets(&self, query: &str, filters: &AssetFilters) -> DamResult<AssetPage> {
        let mut params = vec![("query", query.trim().to_string())];
        params.extend(filters.query_pairs());

        let response: AssetListResponse = self.get("/assets/search", &params).await?;

        tracing::debug!(
            query = query,
            count = response.data.len(),
            total = response.pagination.total,
            "Searched assets"
        );

        Ok(response.into())
    }

    async fn get_asset(&self, id: i64) -> DamResult<Asset> {
        let envelope: DataEnvelope<Asset> = self.get(&format!("/assets/{}", id), &[]).await?;
        Ok(envelope.data)
    }

    async fn delete_asset(&self, id: i64) -> DamResult<()> {
        self.delete(&format!("/assets/{}", id)).await?;
        tracing::info!(asset_id = id, "Asset deleted");
        Ok(())
    }

    async fn upload_assets(
        &self,
        files: Vec<UploadPart>,
        options: &UploadOptions,
        on_progress: Option<ProgressCallback>,
    ) -> DamResult<UploadResponse> {
        let file_count = files.len();
        let response: UploadResponse = self
            .post_multipart("/assets/upload", files, options.form_fields(), on_progress)
            .await?;

        tracing::info!(
            files = file_count,
            success = response.success,
            "Upload request completed"
        );

        Ok(response)
    }

    async fn realtime_stats(&self) -> DamResult<RealTimeStats> {
        let envelope: DataEnvelope<RealTimeStats> = self.get("/stats/realtime", &[]).await?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransferProgress;
    use dam_core::models::{DuplicateAction, FilterUpdate, SortField, SortOrder};
    use dam_core::{ClientConfig, RetryConfig};
    use mockito::Matcher;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const ASSET_JSON: &str = r#"{
        "id": 42,
        "filename": "1700000000-report.pdf",
        "original_name": "report.pdf",
        "file_type": "document",
        "mime_type": "application/pdf",
        "file_size": 2048,
        "storage_path": "uploads/1700000000-report.pdf",
        "storage_bucket": "assets",
        "status": "processed",
        "metadata": {"tags": ["q3"], "author": "Dana"},
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:05:00Z"
    }"#;

    fn list_body() -> String {
        format!(
            r#"{{"data":[{}],"pagination":{{"page":1,"limit":20,"total":1,"totalPages":1,"hasNext":false,"hasPrev":false}}}}"#,
            ASSET_JSON
        )
    }

    fn client_for(server: &mockito::Server) -> ApiClient {
        ApiClient::new(ClientConfig {
            api_base_url: server.url(),
            retry: RetryConfig {
                max_retries: 2,
                base_delay: Duration::from_millis(10),
            },
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_assets_sends_filters_and_maps_pagination() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/assets")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("limit".into(), "20".into()),
                Matcher::UrlEncoded("sortBy".into(), "filename".into()),
                Matcher::UrlEncoded("sortOrder".into(), "ASC".into()),
                Matcher::UrlEncoded("fileType".into(), "document".into()),
            ]))
            .with_status(200)
            .with_body(list_body())
            .expect(1)
            .create_async()
            .await;

        let filters = AssetFilters::default().with(
            FilterUpdate::default()
                .sort_by(SortField::Filename)
                .sort_order(SortOrder::Asc)
                .file_type(Some("document".to_string())),
        );
        let page = client_for(&server).list_assets(&filters).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.assets.len(), 1);
        assert_eq!(page.assets[0].original_name, "report.pdf");
        assert_eq!(page.pagination.current_page, 1);
        assert_eq!(page.pagination.total_items, 1);
        assert!(!page.pagination.has_next);
    }

    #[tokio::test]
    async fn test_search_uses_query_parameter() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/assets/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "report".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(list_body())
            .create_async()
            .await;

        let page = client_for(&server)
            .search_assets("report", &AssetFilters::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.assets[0].id, 42);
    }

    #[tokio::test]
    async fn test_get_asset_unwraps_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/assets/42")
            .with_status(200)
            .with_body(format!(r#"{{"success":true,"data":{}}}"#, ASSET_JSON))
            .create_async()
            .await;

        let asset = client_for(&server).get_asset(42).await.unwrap();
        assert_eq!(asset.metadata.tags, vec!["q3".to_string()]);
        assert_eq!(asset.metadata.author.as_deref(), Some("Dana"));
    }

    #[tokio::test]
    async fn test_upload_is_not_retried_and_reports_progress() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/assets/upload")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data".to_string()),
            )
            .with_status(502)
            .expect(1)
            .create_async()
            .await;

        let seen = Arc::new(Mutex::new(Vec::<TransferProgress>::new()));
        let sink = seen.clone();
        let files = vec![
            UploadPart {
                file_name: "a.txt".to_string(),
                mime_type: "text/plain".to_string(),
                content: Bytes::from_static(b"hello"),
            },
            UploadPart {
                file_name: "b.txt".to_string(),
                mime_type: "text/plain".to_string(),
                content: Bytes::from_static(b"world!"),
            },
        ];

        let err = client_for(&server)
            .upload_assets(
                files,
                &UploadOptions::default(),
                Some(Arc::new(move |p: TransferProgress| {
                    sink.lock().unwrap().push(p)
                })),
            )
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.status(), Some(502));
        let last = seen.lock().unwrap().last().copied().unwrap();
        assert_eq!(last, TransferProgress { loaded: 11, total: 11 });
    }

    #[tokio::test]
    async fn test_upload_parses_summary() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/assets/upload")
            .with_status(201)
            .with_body(
                r#"{"success":true,"data":[{"id":1,"original_name":"a.txt"}],"message":"1 file uploaded","summary":{"uploaded":1,"replaced":0,"skipped":0}}"#,
            )
            .create_async()
            .await;

        let response = client_for(&server)
            .upload_assets(
                vec![UploadPart {
                    file_name: "a.txt".to_string(),
                    mime_type: "text/plain".to_string(),
                    content: Bytes::from_static(b"hello"),
                }],
                &UploadOptions::default(),
                None,
            )
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.summary.map(|s| s.uploaded), Some(1));
    }

    #[tokio::test]
    async fn test_upload_sends_metadata_and_duplicate_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/assets/upload")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("name=\"tags\"\r\n\r\nq3,finance\r\n".to_string()),
                Matcher::Regex("name=\"author\"\r\n\r\nDana\r\n".to_string()),
                Matcher::Regex("name=\"duplicateAction\"\r\n\r\nreplace\r\n".to_string()),
                Matcher::Regex("name=\"replaceAssetId\"\r\n\r\n42\r\n".to_string()),
            ]))
            .with_status(201)
            .with_body(r#"{"success":true,"data":[]}"#)
            .expect(1)
            .create_async()
            .await;

        let options = UploadOptions {
            tags: vec!["q3".to_string(), "finance".to_string()],
            author: Some("Dana".to_string()),
            description: Some("  ".to_string()),
            duplicate_action: Some(DuplicateAction::Replace),
            replace_asset_id: Some(42),
            ..UploadOptions::default()
        };
        client_for(&server)
            .upload_assets(
                vec![UploadPart {
                    file_name: "report.pdf".to_string(),
                    mime_type: "application/pdf".to_string(),
                    content: Bytes::from_static(b"%PDF"),
                }],
                &options,
                None,
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_asset_analytics_unwraps_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/stats/asset/42/analytics")
            .with_status(200)
            .with_body(
                r#"{"success":true,"data":{"assetId":42,"filename":"report.pdf","fileType":"document","totalViews":9,"totalDownloads":4,"totalAccesses":13,"accessFrequency":"high","popularityScore":7.5}}"#,
            )
            .create_async()
            .await;

        let usage = client_for(&server).asset_analytics(42).await.unwrap();
        assert_eq!(usage.asset_id, 42);
        assert_eq!(usage.total_accesses, 13);
        assert_eq!(usage.access_frequency, "high");
        assert!(usage.last_viewed.is_none());
    }

    #[tokio::test]
    async fn test_user_behavior_encodes_user_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/stats/user/dana@example.com%2Fx/behavior")
            .with_status(200)
            .with_body(
                r#"{"data":{"userId":"dana@example.com/x","totalViews":3,"favoriteFileTypes":["image"],"userSegment":"casual"}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let behavior = client_for(&server)
            .user_behavior("dana@example.com/x")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(behavior.user_id, "dana@example.com/x");
        assert_eq!(behavior.favorite_file_types, vec!["image".to_string()]);
    }

    #[tokio::test]
    async fn test_stats_endpoints_unwrap_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/stats/uploads")
            .match_query(Matcher::UrlEncoded("period".into(), "week".into()))
            .with_status(200)
            .with_body(r#"{"data":{"totalUploads":12,"uploadsToday":2}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/stats/realtime")
            .with_status(200)
            .with_body(r#"{"data":{"totalViews":5,"totalDownloads":3,"totalUploads":1,"timestamp":"2024-05-01T10:00:00Z"}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let uploads = client.upload_stats(StatsPeriod::Week).await.unwrap();
        assert_eq!(uploads.total_uploads, 12);
        assert_eq!(uploads.uploads_today, 2);

        let realtime = client.realtime_stats().await.unwrap();
        assert_eq!(realtime.total_views, 5);
    }

    #[tokio::test]
    async fn test_track_view_posts_camel_case_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/stats/track-view")
            .match_body(Matcher::Json(serde_json::json!({ "assetId": 42 })))
            .with_status(200)
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;

        client_for(&server)
            .track_view(&TrackEventRequest::new(42))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[test]
    fn test_stream_and_download_urls() {
        let client = ApiClient::new(ClientConfig::default()).unwrap();
        assert_eq!(
            client.stream_url(7),
            "http://localhost:5000/api/assets/7/stream"
        );
        assert_eq!(
            client.download_url(7),
            "http://localhost:5000/api/assets/7/download"
        );
    }
}
