//! Page navigation for result listings.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::query::{OFFSET_KEY, encode_form_value, parse_query};

/// Pages shown on either side of the current one (one more after it).
pub const PAGE_WINDOW: usize = 2;

/// Query parameters grouped by key; keys iterate sorted.
pub type MultiQuery = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PageLink {
    Previous { href: String, disabled: bool },
    Page { number: usize, href: String, active: bool },
    Gap,
    Next { href: String, disabled: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub count: usize,
    pub limit: usize,
    pub offset: usize,
}

impl Pagination {
    pub fn new(count: usize, limit: usize, offset: usize) -> Self {
        Self {
            count,
            limit,
            offset,
        }
    }

    pub fn total_pages(&self) -> usize {
        if self.limit == 0 {
            return 0;
        }
        self.count.div_ceil(self.limit)
    }

    pub fn current_page(&self) -> usize {
        if self.limit == 0 {
            return 1;
        }
        (self.offset / self.limit).saturating_add(1)
    }

    /// First, last, and the pages whose end offset falls inside the window
    /// around the current offset.
    fn page_numbers(&self) -> Vec<usize> {
        let total = self.total_pages();
        let left = self
            .offset
            .saturating_sub(self.limit.saturating_mul(PAGE_WINDOW));
        let right = self
            .offset
            .saturating_add(self.limit.saturating_mul(PAGE_WINDOW + 1));
        (1..=total)
            .filter(|&page| {
                let end = page.saturating_mul(self.limit);
                page == 1 || page == total || (end > left && end <= right)
            })
            .collect()
    }

    /// Navigation links, each pointing at `/?{query}` with `_offset` set.
    /// Empty when there is nothing to page through.
    pub fn links(&self, query: &MultiQuery) -> Vec<PageLink> {
        let total = self.total_pages();
        if total == 0 {
            return Vec::new();
        }
        let href = |offset: usize| format!("/?{}", render_query(query, offset));

        let mut links = vec![PageLink::Previous {
            href: href(self.offset.saturating_sub(self.limit)),
            disabled: self.offset == 0,
        }];

        let mut previous = 0;
        for number in self.page_numbers() {
            if previous != 0 {
                if number - previous == 2 {
                    // a single skipped page is linked rather than elided
                    let offset = self.limit * previous;
                    links.push(PageLink::Page {
                        number: previous + 1,
                        href: href(offset),
                        active: offset == self.offset,
                    });
                } else if number - previous != 1 {
                    links.push(PageLink::Gap);
                }
            }
            let offset = self.limit * (number - 1);
            links.push(PageLink::Page {
                number,
                href: href(offset),
                active: offset == self.offset,
            });
            previous = number;
        }

        let last = self.current_page() >= total;
        links.push(PageLink::Next {
            href: href(if last {
                self.offset
            } else {
                self.offset.saturating_add(self.limit)
            }),
            disabled: last,
        });
        links
    }
}

/// Groups a raw query string by key, keeping value order.
pub fn multi_query(query: &str) -> MultiQuery {
    let mut grouped = MultiQuery::new();
    for param in parse_query(query) {
        grouped.entry(param.key).or_default().push(param.value);
    }
    grouped
}

/// Form-encodes `query` with `_offset` replaced. Keys are emitted sorted and
/// repeated values collapse to `[a,b]`.
pub fn render_query(query: &MultiQuery, offset: usize) -> String {
    let mut query = query.clone();
    query.insert(OFFSET_KEY.to_string(), vec![offset.to_string()]);
    query
        .iter()
        .map(|(key, values)| {
            let value = match values.as_slice() {
                [] => String::new(),
                [single] => single.clone(),
                many => format!("[{}]", many.join(",")),
            };
            format!("{}={}", encode_form_value(key), encode_form_value(&value))
        })
        .collect::<Vec<_>>()
        .join("&")
}
