use serde::Serialize;

use crate::database::Db;
use crate::models::PostSummary;
use crate::Result;

pub const DEFAULT_PAGE_SIZE : u32 = 10;

/// Page numbers at or past this are treated as junk.
pub const MAX_PAGE : u32 = 10_000;

#[derive(Debug, Serialize)]
pub struct Page {
    pub items :       Vec<PostSummary>,
    pub total_pages : u32,
}

impl Page {
    pub fn contains(&self, page : u32) -> bool {
        (1..=self.total_pages).contains(&page)
    }
}

/// One window of live posts, oldest first.
pub async fn list_page(db : &Db, page : u32, page_size : u32) -> Result<Page> {
    let page_size = page_size.max(1);
    let offset = page.saturating_sub(1).saturating_mul(page_size);

    let items = db.list_live_notes(page_size, offset).await?;
    let count = db.count_live_notes().await?;

    let total_pages = (count / page_size + u32::from(count % page_size != 0)).max(1);

    tracing::debug!(page, total_pages, items = items.len(), "listed page");

    Ok(Page {
        items,
        total_pages,
    })
}

/// Reads `page` from a raw query string, falling back to the first page.
pub fn parse_page(query : &str) -> u32 {
    let pairs : Vec<(String, String)> =
        serde_urlencoded::from_str(query).unwrap_or_default();

    let raw = pairs
        .iter()
        .find(|(key, _)| key == "page")
        .map(|(_, value)| value.as_str())
        .unwrap_or("1");

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return 1;
    }

    match raw.parse::<u32>() {
        Ok(page) if page < MAX_PAGE => page,
        _ => 1,
    }
}
