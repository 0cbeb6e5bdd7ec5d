use serde::{Deserialize, Serialize};

/// Pagination block exactly as the backend returns it (1-based `page`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendPagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Client-side pagination. A renamed projection of [`BackendPagination`];
/// never computed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub limit: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl From<BackendPagination> for Pagination {
    fn from(backend: BackendPagination) -> Self {
        Pagination {
            current_page: backend.page,
            limit: backend.limit,
            total_items: backend.total,
            total_pages: backend.total_pages,
            has_next: backend.has_next,
            has_prev: backend.has_prev,
        }
    }
}

impl From<Pagination> for BackendPagination {
    fn from(client: Pagination) -> Self {
        BackendPagination {
            page: client.current_page,
            limit: client.limit,
            total: client.total_items,
            total_pages: client.total_pages,
            has_next: client.has_next,
            has_prev: client.has_prev,
        }
    }
}
