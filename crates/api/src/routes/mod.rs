//! HTTP route handlers.

use serde::Serialize;

pub mod health;
pub mod keep_alive;
pub mod settings;

/// Success envelope shared by every JSON endpoint: `{success: true, data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// List envelope: `{success: true, data: [...], pagination: {...}}`.
#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub page: shared::pagination::PaginationResponse<T>,
}

impl<T> From<shared::pagination::PaginationResponse<T>> for PagedResponse<T> {
    fn from(page: shared::pagination::PaginationResponse<T>) -> Self {
        Self {
            success: true,
            page,
        }
    }
}
