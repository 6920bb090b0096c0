use serde::{Deserialize, Serialize};

use crate::config::QuerySettings;

/// Two equivalent ways to address a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum PaginationParameters {
    Page {
        page_number: u64,
        #[serde(default)]
        page_size: u64,
    },
    Offset {
        skip: u64,
        #[serde(default)]
        page_size: u64,
    },
}

impl Default for PaginationParameters {
    fn default() -> Self {
        PaginationParameters::Page {
            page_number: 1,
            page_size: 0,
        }
    }
}

/// Resolved skip/take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub take: u64,
}

impl PaginationParameters {
    pub fn page(page_number: u64, page_size: u64) -> Self {
        PaginationParameters::Page {
            page_number,
            page_size,
        }
    }

    pub fn offset(skip: u64, page_size: u64) -> Self {
        PaginationParameters::Offset { skip, page_size }
    }

    /// Page numbers below 1 read as 1. A page size of 0 means the
    /// configured default; larger sizes are capped at the configured maximum.
    pub fn resolve(&self, settings: &QuerySettings) -> Window {
        match *self {
            PaginationParameters::Page {
                page_number,
                page_size,
            } => {
                let take = settings.page_size(page_size);
                Window {
                    skip: (page_number.max(1) - 1).saturating_mul(take),
                    take,
                }
            }
            PaginationParameters::Offset { skip, page_size } => Window {
                skip,
                take: settings.page_size(page_size),
            },
        }
    }
}

/// One materialized page plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedList<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub page_size: u64,
    pub page_number: u64,
    pub total_pages: u64,
}

impl<T> PaginatedList<T> {
    pub fn new(items: Vec<T>, total_items: u64, window: Window) -> Self {
        let page_size = window.take.max(1);
        Self {
            items,
            total_items,
            page_size,
            page_number: window.skip / page_size + 1,
            total_pages: total_items.div_ceil(page_size),
        }
    }

    pub fn empty(window: Window) -> Self {
        Self::new(Vec::new(), 0, window)
    }

    pub fn has_next_page(&self) -> bool {
        self.page_number < self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_number > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedList<U> {
        PaginatedList {
            items: self.items.into_iter().map(f).collect(),
            total_items: self.total_items,
            page_size: self.page_size,
            page_number: self.page_number,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> QuerySettings {
        QuerySettings {
            default_page_size: 10,
            max_page_size: 50,
        }
    }

    #[test]
    fn page_addressing_computes_skip() {
        let w = PaginationParameters::page(3, 20).resolve(&settings());
        assert_eq!(w, Window { skip: 40, take: 20 });
    }

    #[test]
    fn page_zero_reads_as_first_page() {
        let w = PaginationParameters::page(0, 20).resolve(&settings());
        assert_eq!(w.skip, 0);
    }

    #[test]
    fn page_size_defaults_and_caps() {
        assert_eq!(PaginationParameters::page(1, 0).resolve(&settings()).take, 10);
        assert_eq!(PaginationParameters::offset(5, 500).resolve(&settings()).take, 50);
    }

    #[test]
    fn offset_and_page_agree() {
        let s = settings();
        assert_eq!(
            PaginationParameters::page(2, 20).resolve(&s),
            PaginationParameters::offset(20, 20).resolve(&s)
        );
    }

    #[test]
    fn envelope_derives_page_info() {
        let list = PaginatedList::new(vec![1, 2], 42, Window { skip: 40, take: 20 });
        assert_eq!(list.page_number, 3);
        assert_eq!(list.total_pages, 3);
        assert!(!list.has_next_page());
        assert!(list.has_previous_page());
    }

    #[test]
    fn deserializes_either_addressing_mode() {
        let p: PaginationParameters =
            serde_json::from_str(r#"{"pageNumber":2,"pageSize":20}"#).unwrap();
        assert_eq!(p, PaginationParameters::page(2, 20));
        let p: PaginationParameters = serde_json::from_str(r#"{"skip":7,"pageSize":5}"#).unwrap();
        assert_eq!(p, PaginationParameters::offset(7, 5));
    }

    #[test]
    fn missing_page_size_means_default() {
        let p: PaginationParameters = serde_json::from_str(r#"{"pageNumber":2}"#).unwrap();
        assert_eq!(p, PaginationParameters::page(2, 0));
        assert_eq!(p.resolve(&settings()), Window { skip: 10, take: 10 });

        let p: PaginationParameters = serde_json::from_str(r#"{"skip":7}"#).unwrap();
        assert_eq!(p, PaginationParameters::offset(7, 0));
    }

    #[test]
    fn serializes_camel_case() {
        let list = PaginatedList::new(vec!["a"], 1, Window { skip: 0, take: 10 });
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["totalItems"], 1);
        assert_eq!(json["pageSize"], 10);
    }
}
