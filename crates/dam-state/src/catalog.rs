//! Asset catalog state: the filtered asset list, a parallel search result
//! list, and the debounced search box that switches between them.
//!
//! State is published through a `watch` channel. Responses are applied only
//! if no newer request of the same kind was started in the meantime.
//! Requests are never aborted mid-flight, so every loading flag a request
//! raises is lowered by that request or by a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Local;
use dam_api_client::AssetApi;
use dam_core::models::{Asset, AssetFilters, DateRangePreset, FilterUpdate, Pagination};
use dam_core::{DamResult, SearchConfig};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogState {
    pub assets: Vec<Asset>,
    pub pagination: Option<Pagination>,
    pub loading: bool,
    pub error: Option<String>,
    pub filters: AssetFilters,

    /// Raw text of the search box, updated on every keystroke.
    pub search_query: String,
    pub search_results: Vec<Asset>,
    pub search_pagination: Option<Pagination>,
    pub search_loading: bool,
    pub search_error: Option<String>,
}

/// What a gallery should render: search results while the query is long
/// enough, the regular catalog otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogView {
    pub is_search: bool,
    pub assets: Vec<Asset>,
    pub pagination: Option<Pagination>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct AssetCatalog {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn AssetApi>,
    search: SearchConfig,
    state: watch::Sender<CatalogState>,
    fetch_seq: AtomicU64,
    search_seq: AtomicU64,
    /// Cancels the debounce timer of the last keystroke.
    pending_search: Mutex<Option<CancellationToken>>,
}

impl AssetCatalog {
    pub fn new(api: Arc<dyn AssetApi>, search: SearchConfig) -> Self {
        let (state, _) = watch::channel(CatalogState::default());
        Self {
            inner: Arc::new(Inner {
                api,
                search,
                state,
                fetch_seq: AtomicU64::new(0),
                search_seq: AtomicU64::new(0),
                pending_search: Mutex::new(None),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> CatalogState {
        self.inner.state.borrow().clone()
    }

    pub fn filters(&self) -> AssetFilters {
        self.inner.state.borrow().filters.clone()
    }

    fn is_searchable(&self, query: &str) -> bool {
        query.trim().chars().count() >= self.inner.search.min_chars
    }

    pub fn view(&self) -> CatalogView {
        let state = self.inner.state.borrow();
        if self.is_searchable(&state.search_query) {
            CatalogView {
                is_search: true,
                assets: state.search_results.clone(),
                pagination: state.search_pagination,
                loading: state.search_loading,
                error: state.search_error.clone(),
            }
        } else {
            CatalogView {
                is_search: false,
                assets: state.assets.clone(),
                pagination: state.pagination,
                loading: state.loading,
                error: state.error.clone(),
            }
        }
    }

    /// Load the catalog with `filters`. On failure the previous list and
    /// pagination stay in place and the error is recorded.
    pub async fn fetch(&self, filters: AssetFilters) -> DamResult<()> {
        let seq = self.inner.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.send_modify(|s| {
            s.filters = filters.clone();
            s.loading = true;
            s.error = None;
        });

        let result = self.inner.api.list_assets(&filters).await;

        if self.inner.fetch_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(page = filters.page, "Discarding superseded catalog response");
            return result.map(|_| ());
        }

        match result {
            Ok(page) => {
                self.inner.state.send_modify(|s| {
                    s.assets = page.assets;
                    s.pagination = Some(page.pagination);
                    s.loading = false;
                });
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, page = filters.page, "Failed to fetch assets");
                self.inner.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(err.user_message());
                });
                Err(err)
            }
        }
    }

    /// Re-run the last fetch with the current filters.
    pub async fn refresh(&self) -> DamResult<()> {
        self.fetch(self.filters()).await
    }

    /// Apply a filter mutation and reload whichever list is on screen.
    pub async fn update_filters(&self, update: FilterUpdate) -> DamResult<()> {
        let filters = self.filters().with(update);
        let query = self.inner.state.borrow().search_query.clone();

        if self.is_searchable(&query) {
            self.inner.state.send_modify(|s| s.filters = filters.clone());
            self.search(&query, filters).await
        } else {
            self.fetch(filters).await
        }
    }

    pub async fn set_page(&self, page: u32) -> DamResult<()> {
        self.update_filters(FilterUpdate::default().page(page)).await
    }

    pub async fn apply_date_preset(&self, preset: DateRangePreset) -> DamResult<()> {
        let today = Local::now().date_naive();
        self.update_filters(FilterUpdate::default().date_preset(preset, today))
            .await
    }

    /// Back to default filters.
    pub async fn clear_filters(&self) -> DamResult<()> {
        self.fetch(AssetFilters::default()).await
    }

    /// First page, newest first, other constraints kept. Used after a
    /// successful upload so new assets are visible.
    pub async fn refresh_after_upload(&self) -> DamResult<()> {
        self.fetch(self.filters().newest_first()).await
    }

    /// Search with `query`. Queries shorter than the minimum length are
    /// ignored.
    pub async fn search(&self, query: &str, filters: AssetFilters) -> DamResult<()> {
        let trimmed = query.trim();
        if !self.is_searchable(trimmed) {
            return Ok(());
        }

        let seq = self.inner.search_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.send_modify(|s| {
            s.search_loading = true;
            s.search_error = None;
        });

        let result = self.inner.api.search_assets(trimmed, &filters).await;

        if self.inner.search_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(query = trimmed, "Discarding superseded search response");
            return result.map(|_| ());
        }

        match result {
            Ok(page) => {
                tracing::debug!(query = trimmed, results = page.assets.len(), "Search completed");
                self.inner.state.send_modify(|s| {
                    s.search_results = page.assets;
                    s.search_pagination = Some(page.pagination);
                    s.search_loading = false;
                });
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, query = trimmed, "Search failed");
                self.inner.state.send_modify(|s| {
                    s.search_loading = false;
                    s.search_error = Some(err.user_message());
                });
                Err(err)
            }
        }
    }

    /// Forget the search box and its results. A pending debounced search
    /// never fires and the response of an in-flight one is discarded.
    pub fn clear_search(&self) {
        self.cancel_pending_search();
        self.inner.search_seq.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_modify(|s| {
            s.search_query.clear();
            s.search_results.clear();
            s.search_pagination = None;
            s.search_loading = false;
            s.search_error = None;
        });
    }

    pub fn clear_error(&self) {
        self.inner.state.send_modify(|s| {
            s.error = None;
            s.search_error = None;
        });
    }

    /// Remove an asset server-side, then reload the list on screen.
    pub async fn delete(&self, id: i64) -> DamResult<()> {
        if let Err(err) = self.inner.api.delete_asset(id).await {
            self.inner
                .state
                .send_modify(|s| s.error = Some(err.user_message()));
            return Err(err);
        }

        let query = self.inner.state.borrow().search_query.clone();
        if self.is_searchable(&query) {
            self.search(&query, self.filters()).await
        } else {
            self.refresh().await
        }
    }

    /// Record a keystroke in the search box. After the debounce delay with no
    /// further input the query is searched (page 1), or, if it is empty, the
    /// search is cleared and the catalog reloaded. Input still waiting out its
    /// delay is cancelled; a request already sent runs to completion.
    pub fn on_query_input(&self, query: impl Into<String>) {
        let query = query.into();
        let token = CancellationToken::new();
        let previous = self
            .inner
            .pending_search
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        self.inner
            .state
            .send_modify(|s| s.search_query = query.clone());

        let catalog = self.clone();
        let debounce = self.inner.search.debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }
            catalog.run_debounced(query).await;
        });
    }

    async fn run_debounced(&self, query: String) {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            self.inner.search_seq.fetch_add(1, Ordering::SeqCst);
            self.inner.state.send_modify(|s| {
                s.search_results.clear();
                s.search_pagination = None;
                s.search_loading = false;
                s.search_error = None;
            });
            let _ = self.refresh().await;
        } else if self.is_searchable(trimmed) {
            let filters = self.filters().with(FilterUpdate::default().page(1));
            let _ = self.search(trimmed, filters).await;
        }
    }

    fn cancel_pending_search(&self) {
        let pending = self
            .inner
            .pending_search
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = pending {
            token.cancel();
        }
    }
}
