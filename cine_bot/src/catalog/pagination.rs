pub const PAGE_SIZE: usize = 10;

/// One page of an already fetched result list. Page `index` holds items
/// `[PAGE_SIZE * index, PAGE_SIZE * index + PAGE_SIZE)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub index: usize,
    total_items: usize,
}

impl<'a, T> Page<'a, T> {
    /// Past the end gives an empty page.
    pub fn of(all: &'a [T], index: usize) -> Self {
        let start = index.saturating_mul(PAGE_SIZE).min(all.len());
        let end = start.saturating_add(PAGE_SIZE).min(all.len());
        Page {
            items: &all[start..end],
            index,
            total_items: all.len(),
        }
    }

    /// Only if the page before this one has anything on it, so a page far
    /// past the end doesn't lead to another empty one.
    pub fn has_previous(&self) -> bool {
        self.index > 0 && (self.index - 1).saturating_mul(PAGE_SIZE) < self.total_items
    }

    pub fn has_next(&self) -> bool {
        self.index
            .saturating_add(1)
            .saturating_mul(PAGE_SIZE)
            < self.total_items
    }

    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(PAGE_SIZE)
    }

    /// Position of the first item of this page in the whole list.
    pub fn offset(&self) -> usize {
        self.index.saturating_mul(PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_split_in_tens() {
        let all: Vec<u32> = (0..25).collect();

        let first = Page::of(&all, 0);
        assert_eq!(first.items, &all[0..10]);
        assert!(!first.has_previous());
        assert!(first.has_next());
        assert_eq!(first.total_pages(), 3);

        let second = Page::of(&all, 1);
        assert_eq!(second.items, &all[10..20]);
        assert!(second.has_previous());
        assert!(second.has_next());

        let last = Page::of(&all, 2);
        assert_eq!(last.items, &all[20..25]);
        assert!(last.has_previous());
        assert!(!last.has_next());
        assert_eq!(last.offset(), 20);
    }

    #[test]
    fn exact_multiple_has_no_empty_trailing_page() {
        let all: Vec<u32> = (0..20).collect();
        assert!(!Page::of(&all, 1).has_next());
        assert_eq!(Page::of(&all, 1).total_pages(), 2);
    }

    #[test]
    fn single_page_and_out_of_range() {
        let all = [1, 2, 3];
        let only = Page::of(&all, 0);
        assert!(!only.has_previous());
        assert!(!only.has_next());

        let beyond = Page::of(&all, 7);
        assert!(beyond.items.is_empty());
        assert!(!beyond.has_next());
        assert!(!beyond.has_previous());

        // Right after the last page, going back still lands on something.
        let all: Vec<u32> = (0..10).collect();
        let after_last = Page::of(&all, 1);
        assert!(after_last.items.is_empty());
        assert!(after_last.has_previous());
        assert!(!Page::of(&all, 2).has_previous());

        let none: [u32; 0] = [];
        assert_eq!(Page::of(&none, 0).total_pages(), 0);
    }
}
