//! In-memory [`AssetApi`] used by the state machine tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dam_api_client::progress::ProgressCallback;
use dam_api_client::{AssetApi, TransferProgress, UploadPart};
use dam_core::models::{
    Asset, AssetFilters, AssetMetadata, AssetPage, BackendPagination, RealTimeStats,
    UploadCounts, UploadOptions, UploadResponse,
};
use dam_core::{DamError, DamResult};

pub fn asset(id: i64, name: &str) -> Asset {
    let created = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    Asset {
        id,
        filename: format!("{}-{}", id, name),
        original_name: name.to_string(),
        file_type: "image".to_string(),
        mime_type: "image/png".to_string(),
        file_size: 1024,
        storage_path: format!("uploads/{}-{}", id, name),
        storage_bucket: "assets".to_string(),
        status: "processed".to_string(),
        metadata: AssetMetadata::default(),
        created_at: created,
        updated_at: created,
        processed_at: None,
        signed_url: None,
    }
}

#[derive(Default)]
pub struct FakeApi {
    assets: Mutex<Vec<Asset>>,
    list_errors: Mutex<VecDeque<DamError>>,
    list_calls: Mutex<Vec<AssetFilters>>,
    search_calls: Mutex<Vec<(String, AssetFilters)>>,
    deleted: Mutex<Vec<i64>>,
    request_delay: Mutex<Option<Duration>>,
    upload_results: Mutex<VecDeque<DamResult<UploadResponse>>>,
    uploads: Mutex<Vec<Vec<String>>>,
    upload_options: Mutex<Vec<UploadOptions>>,
    upload_delay: Mutex<Option<Duration>>,
    partial_progress: AtomicBool,
    realtime_results: Mutex<VecDeque<DamResult<RealTimeStats>>>,
    realtime_calls: AtomicU32,
}

impl FakeApi {
    pub fn set_assets(&self, assets: Vec<Asset>) {
        *self.assets.lock().unwrap() = assets;
    }

    pub fn fail_next_list(&self, err: DamError) {
        self.list_errors.lock().unwrap().push_back(err);
    }

    pub fn list_calls(&self) -> Vec<AssetFilters> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn search_calls(&self) -> Vec<(String, AssetFilters)> {
        self.search_calls.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<i64> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn push_upload_result(&self, result: DamResult<UploadResponse>) {
        self.upload_results.lock().unwrap().push_back(result);
    }

    pub fn uploads(&self) -> Vec<Vec<String>> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn upload_options(&self) -> Vec<UploadOptions> {
        self.upload_options.lock().unwrap().clone()
    }

    /// Delay every list and search response.
    pub fn set_request_delay(&self, delay: Duration) {
        *self.request_delay.lock().unwrap() = Some(delay);
    }

    async fn request_latency(&self) {
        let delay = *self.request_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        *self.upload_delay.lock().unwrap() = Some(delay);
    }

    /// Stop reporting byte progress halfway through the payload.
    pub fn set_partial_progress(&self) {
        self.partial_progress.store(true, Ordering::SeqCst);
    }

    pub fn push_realtime_result(&self, result: DamResult<RealTimeStats>) {
        self.realtime_results.lock().unwrap().push_back(result);
    }

    pub fn realtime_calls(&self) -> u32 {
        self.realtime_calls.load(Ordering::SeqCst)
    }

    fn page(&self, assets: Vec<Asset>, filters: &AssetFilters) -> AssetPage {
        let total = assets.len() as u64;
        let limit = filters.limit.get();
        let total_pages = total.div_ceil(limit as u64).max(1) as u32;
        AssetPage {
            assets,
            pagination: BackendPagination {
                page: filters.page,
                limit,
                total,
                total_pages,
                has_next: filters.page < total_pages,
                has_prev: filters.page > 1,
            }
            .into(),
        }
    }
}

#[async_trait]
impl AssetApi for FakeApi {
    async fn list_assets(&self, filters: &AssetFilters) -> DamResult<AssetPage> {
        self.list_calls.lock().unwrap().push(filters.clone());
        self.request_latency().await;
        if let Some(err) = self.list_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        let assets = self.assets.lock().unwrap().clone();
        Ok(self.page(assets, filters))
    }

    async fn search_assets(&self, query: &str, filters: &AssetFilters) -> DamResult<AssetPage> {
        self.search_calls
            .lock()
            .unwrap()
            .push((query.to_string(), filters.clone()));
        self.request_latency().await;
        let needle = query.to_lowercase();
        let assets: Vec<Asset> = self
            .assets
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.original_name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(self.page(assets, filters))
    }

    async fn get_asset(&self, id: i64) -> DamResult<Asset> {
        self.assets
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(DamError::Http {
                status: 404,
                message: "Asset not found".to_string(),
            })
    }

    async fn delete_asset(&self, id: i64) -> DamResult<()> {
        self.deleted.lock().unwrap().push(id);
        self.assets.lock().unwrap().retain(|a| a.id != id);
        Ok(())
    }

    async fn upload_assets(
        &self,
        files: Vec<UploadPart>,
        options: &UploadOptions,
        on_progress: Option<ProgressCallback>,
    ) -> DamResult<UploadResponse> {
        let names: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
        self.uploads.lock().unwrap().push(names.clone());
        self.upload_options.lock().unwrap().push(options.clone());

        let total: u64 = files.iter().map(|f| f.content.len() as u64).sum();
        if let Some(callback) = &on_progress {
            callback(TransferProgress {
                loaded: total / 2,
                total,
            });
            if !self.partial_progress.load(Ordering::SeqCst) {
                callback(TransferProgress {
                    loaded: total,
                    total,
                });
            }
        }

        let delay = *self.upload_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.upload_results.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| {
            Ok(UploadResponse {
                success: true,
                summary: Some(UploadCounts {
                    uploaded: names.len(),
                    replaced: 0,
                    skipped: 0,
                }),
                ..UploadResponse::default()
            })
        })
    }

    async fn realtime_stats(&self) -> DamResult<RealTimeStats> {
        let n = self.realtime_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let queued = self.realtime_results.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| {
            Ok(RealTimeStats {
                total_views: n as u64,
                ..RealTimeStats::default()
            })
        })
    }
}
