//! Page-number pagination results.

use serde::Serialize;

/// One page of a paged list query, as handed back to callers and cached.
///
/// Built fresh on every cache miss and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositePage<T> {
    pub page_index: u32,
    pub page_size: u32,
    pub total_records: u64,
    pub total_pages: u64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub items: Vec<T>,
}

impl<T> CompositePage<T> {
    pub fn new(window: PageWindow, total_records: u64, items: Vec<T>) -> Self {
        let total_pages = if window.size == 0 {
            0
        } else {
            total_records.div_ceil(u64::from(window.size))
        };
        Self {
            page_index: window.index,
            page_size: window.size,
            total_records,
            total_pages,
            has_previous_page: window.index > 1,
            has_next_page: u64::from(window.index) < total_pages,
            items,
        }
    }
}

/// The requested slice of a paged query. Validated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub index: u32,
    pub size: u32,
}

impl PageWindow {
    pub fn new(index: u32, size: u32) -> Self {
        Self { index, size }
    }
}

/// What the query executor returns for one page: the rows plus the total count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRows<T> {
    pub total_records: u64,
    pub items: Vec<T>,
}

impl<T> PageRows<T> {
    pub fn new(total_records: u64, items: Vec<T>) -> Self {
        Self {
            total_records,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_arithmetic_rounds_up() {
        let first = CompositePage::new(PageWindow::new(1, 20), 101, vec![(); 20]);
        assert_eq!(first.total_pages, 6);
        assert!(!first.has_previous_page);
        assert!(first.has_next_page);

        let last = CompositePage::new(PageWindow::new(6, 20), 101, vec![(); 1]);
        assert_eq!(last.total_pages, 6);
        assert!(last.has_previous_page);
        assert!(!last.has_next_page);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let page = CompositePage::<()>::new(PageWindow::new(1, 10), 0, Vec::new());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next_page);
        assert!(!page.has_previous_page);
    }

    #[test]
    fn exact_multiple_does_not_add_page() {
        let page = CompositePage::<()>::new(PageWindow::new(2, 10), 20, Vec::new());
        assert_eq!(page.total_pages, 2);
        assert!(!page.has_next_page);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let page = CompositePage::new(PageWindow::new(1, 10), 25, vec!["a"]);
        let json = serde_json::to_value(&page).expect("page serializes");
        assert_eq!(json["pageIndex"], 1);
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["hasPreviousPage"], false);
        assert_eq!(json["hasNextPage"], true);
        assert_eq!(json["items"][0], "a");
    }
}
