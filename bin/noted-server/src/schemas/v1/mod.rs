pub mod activity;
pub mod chat;
pub mod note;
pub mod profile;
pub mod project;

use serde::Deserialize;
use utoipa::IntoParams;

/// `?limit=&offset=` pagination.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> noted_core::services::Page {
        noted_core::services::Page::new(self.limit, self.offset)
    }
}
