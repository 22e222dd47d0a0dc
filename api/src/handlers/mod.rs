pub mod admin;
pub mod health;
pub mod payments;
pub mod stats;
pub mod users;
pub mod votes;
pub mod words;

use serde::Deserialize;

use hotmap_core::model::PageParams;

/// `?page=&limit=` pair shared by every paginated route.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn params(&self) -> PageParams {
        let default = PageParams::default();
        PageParams::new(
            self.page.unwrap_or(default.page),
            self.limit.unwrap_or(default.limit),
        )
    }
}
