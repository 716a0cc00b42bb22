use salvo::Request;
use sea_orm::ItemsAndPagesNumber;
use serde::Serialize;

/// Fixed page size for every listing.
pub const PER_PAGE: u64 = 8;

/// 1-based page window handed to templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub current: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageInfo {
    pub fn new(current: u64, counts: ItemsAndPagesNumber) -> Self {
        Self {
            current,
            total_pages: counts.number_of_pages,
            total_items: counts.number_of_items,
            has_prev: current > 1,
            has_next: current < counts.number_of_pages,
        }
    }

    pub fn empty() -> Self {
        Self {
            current: 1,
            total_pages: 0,
            total_items: 0,
            has_prev: false,
            has_next: false,
        }
    }
}

/// Page number from the `page` query parameter; 1 when absent or invalid.
pub fn page_param(req: &Request) -> u64 {
    req.query::<u64>("page").unwrap_or(1).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts() -> ItemsAndPagesNumber {
        ItemsAndPagesNumber {
            number_of_items: 17,
            number_of_pages: 3,
        }
    }

    #[test]
    fn window_flags_follow_the_current_page() {
        let first = PageInfo::new(1, counts());
        assert!(!first.has_prev);
        assert!(first.has_next);

        let last = PageInfo::new(3, counts());
        assert!(last.has_prev);
        assert!(!last.has_next);
        assert_eq!(last.total_pages, 3);
        assert_eq!(last.total_items, 17);
    }
}
