//! Page-number pagination requests.

use thiserror::Error;

use crate::cache::PageWindow;

/// Largest page a caller may ask for.
pub const MAX_PAGE_SIZE: u32 = 1_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page index must be at least 1, got {0}")]
    InvalidIndex(i64),
    #[error("page size must be between 1 and 1000, got {0}")]
    InvalidSize(i64),
}

/// A validated page request: 1-based index, bounded size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    index: u32,
    size: u32,
}

impl PageRequest {
    pub fn new(index: i64, size: i64) -> Result<Self, PaginationError> {
        let index = u32::try_from(index)
            .ok()
            .filter(|index| *index >= 1)
            .ok_or(PaginationError::InvalidIndex(index))?;
        let size = u32::try_from(size)
            .ok()
            .filter(|size| (1..=MAX_PAGE_SIZE).contains(size))
            .ok_or(PaginationError::InvalidSize(size))?;
        Ok(Self { index, size })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.index, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_positive_values() {
        let request = PageRequest::new(3, 20).expect("valid request");
        assert_eq!(request.index(), 3);
        assert_eq!(request.size(), 20);
        assert_eq!(request.window(), PageWindow::new(3, 20));
    }

    #[test]
    fn rejects_non_positive_index() {
        assert_eq!(PageRequest::new(0, 10), Err(PaginationError::InvalidIndex(0)));
        assert_eq!(PageRequest::new(-1, 10), Err(PaginationError::InvalidIndex(-1)));
    }

    #[test]
    fn rejects_out_of_range_size() {
        assert_eq!(PageRequest::new(1, 0), Err(PaginationError::InvalidSize(0)));
        assert_eq!(
            PageRequest::new(1, i64::from(MAX_PAGE_SIZE) + 1),
            Err(PaginationError::InvalidSize(1_001))
        );
    }
}
