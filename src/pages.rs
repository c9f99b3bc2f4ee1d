//! Page selection for multi-page input, e.g. `"1-3,5"`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageRangeError {
    #[error("empty page range item in '{0}'")]
    EmptyItem(String),
    #[error("invalid page number '{0}'")]
    InvalidNumber(String),
    #[error("page numbers start at 1, got 0")]
    Zero,
    #[error("page span {start}-{end} is reversed")]
    Reversed { start: u32, end: u32 },
}

/// A set of 1-based page numbers, in the order they were requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    pages: Vec<u32>,
}

impl PageRange {
    /// Parse a comma-separated list of pages and inclusive spans.
    pub fn parse(input: &str) -> Result<Self, PageRangeError> {
        let mut pages = Vec::new();

        for item in input.split(',') {
            let item = item.trim();
            if item.is_empty() {
                return Err(PageRangeError::EmptyItem(input.to_string()));
            }

            let (start, end) = match item.split_once('-') {
                Some((a, b)) => (parse_page(a)?, parse_page(b)?),
                None => {
                    let page = parse_page(item)?;
                    (page, page)
                }
            };
            if start > end {
                return Err(PageRangeError::Reversed { start, end });
            }

            for page in start..=end {
                if !pages.contains(&page) {
                    pages.push(page);
                }
            }
        }

        Ok(Self { pages })
    }

    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    pub fn pages(&self) -> &[u32] {
        &self.pages
    }
}

impl std::str::FromStr for PageRange {
    type Err = PageRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_page(raw: &str) -> Result<u32, PageRangeError> {
    let raw = raw.trim();
    let page: u32 = raw
        .parse()
        .map_err(|_| PageRangeError::InvalidNumber(raw.to_string()))?;
    if page == 0 {
        return Err(PageRangeError::Zero);
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spans_and_singles() {
        let range = PageRange::parse("1-3, 5").unwrap();
        assert_eq!(range.pages(), &[1, 2, 3, 5]);
        assert!(range.contains(2));
        assert!(!range.contains(4));
    }

    #[test]
    fn keeps_request_order_and_drops_duplicates() {
        let range = PageRange::parse("7,2-3,3").unwrap();
        assert_eq!(range.pages(), &[7, 2, 3]);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            PageRange::parse("1,,2"),
            Err(PageRangeError::EmptyItem("1,,2".into()))
        );
        assert_eq!(
            PageRange::parse("a"),
            Err(PageRangeError::InvalidNumber("a".into()))
        );
        assert_eq!(PageRange::parse("0-2"), Err(PageRangeError::Zero));
        assert_eq!(
            PageRange::parse("5-3"),
            Err(PageRangeError::Reversed { start: 5, end: 3 })
        );
        assert!(PageRange::parse("").is_err());
    }
}
