//! Pagination planning.
//!
//! Listings are split into a sticky partition and a normal partition
//! served by separate endpoints, but they present as one combined
//! sequence with sticky items first. The planner computes skip/limit
//! windows and page counts for either partition; the partition seam is
//! handled in [`plan_normal`], which shifts and shrinks the normal
//! window so the transition page blends the sticky tail with the normal
//! head without gaps or duplicates.

/// A skip/limit window into one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub limit: u64,
}

/// Coerce a raw page parameter: non-numeric or below 1 collapses to 1.
#[must_use]
pub fn coerce_page(raw: &str) -> u64 {
    raw.parse::<i64>().map_or(1, |page| page.max(1)) as u64
}

/// Number of pages needed for `total` items: `ceil(total / page_size)`,
/// 0 when the collection is empty.
#[must_use]
pub fn page_count(total: u64, page_size: u64) -> u64 {
    total.div_ceil(page_size)
}

/// Window for a plain partition (sticky listing, reply listing).
#[must_use]
pub fn plan(page: u64, page_size: u64) -> Window {
    Window {
        skip: (page.max(1) - 1) * page_size,
        limit: page_size,
    }
}

/// Window into the normal partition for a combined listing.
///
/// With page `p`, size `s` and `sticky_count` pinned items ahead of the
/// partition seam, the number of slots this page spends on sticky
/// content is `c = min(max(sticky_count - (p-1)*s, 0), s)`:
/// - `c == s`: the page lies entirely in the sticky range; the normal
///   partition contributes nothing (`None`)
/// - otherwise the window starts at `(p-1)*s - sticky_count` (clamped
///   to 0 on the transition page) and is shrunk to `s - c`
#[must_use]
pub fn plan_normal(page: u64, page_size: u64, sticky_count: u64) -> Option<Window> {
    let before = (page.max(1) - 1) * page_size;
    let sticky_slots = sticky_count.saturating_sub(before).min(page_size);
    if sticky_slots == page_size {
        return None;
    }
    Some(Window {
        skip: before.saturating_sub(sticky_count),
        limit: page_size - sticky_slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_page_normalizes_garbage_to_first_page() {
        assert_eq!(coerce_page("abc"), 1);
        assert_eq!(coerce_page(""), 1);
        assert_eq!(coerce_page("0"), 1);
        assert_eq!(coerce_page("-3"), 1);
        assert_eq!(coerce_page("1"), 1);
        assert_eq!(coerce_page("7"), 7);
    }

    #[test]
    fn test_page_count_ceiling() {
        assert_eq!(page_count(5, 2), 3);
        assert_eq!(page_count(4, 2), 2);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
    }

    #[test]
    fn test_plain_window() {
        assert_eq!(plan(1, 10), Window { skip: 0, limit: 10 });
        assert_eq!(plan(3, 10), Window { skip: 20, limit: 10 });
    }

    #[test]
    fn test_normal_page_inside_sticky_range_is_empty() {
        // pageSize=2, stickyCount=3: page 1 is covered by sticky items.
        assert_eq!(plan_normal(1, 2, 3), None);
    }

    #[test]
    fn test_transition_page_blends_partitions() {
        // pageSize=2, stickyCount=3: page 2 shows the last sticky item
        // plus exactly one normal item from the head of the partition.
        assert_eq!(plan_normal(2, 2, 3), Some(Window { skip: 0, limit: 1 }));
    }

    #[test]
    fn test_pages_past_the_seam_are_plainly_shifted() {
        // pageSize=2, stickyCount=3: page 3 covers combined positions
        // 4-5, i.e. normal items 1-2 (0-indexed skip 1).
        assert_eq!(plan_normal(3, 2, 3), Some(Window { skip: 1, limit: 2 }));
        assert_eq!(plan_normal(4, 2, 3), Some(Window { skip: 3, limit: 2 }));
    }

    #[test]
    fn test_no_sticky_items_degenerates_to_plain_paging() {
        assert_eq!(plan_normal(1, 10, 0), Some(Window { skip: 0, limit: 10 }));
        assert_eq!(plan_normal(2, 10, 0), Some(Window { skip: 10, limit: 10 }));
    }

    #[test]
    fn test_sticky_count_on_exact_page_boundary() {
        // stickyCount equal to a whole number of pages: no blended page.
        assert_eq!(plan_normal(1, 2, 4), None);
        assert_eq!(plan_normal(2, 2, 4), None);
        assert_eq!(plan_normal(3, 2, 4), Some(Window { skip: 0, limit: 2 }));
    }

    #[test]
    fn test_single_sticky_item() {
        assert_eq!(plan_normal(1, 2, 1), Some(Window { skip: 0, limit: 1 }));
        assert_eq!(plan_normal(2, 2, 1), Some(Window { skip: 1, limit: 2 }));
    }

    #[test]
    fn test_no_gaps_or_duplicates_across_seam() {
        // Walk a combined sequence and check every normal index is
        // served exactly once, in order.
        for sticky in 0..7_u64 {
            for size in 1..5_u64 {
                let mut expected_skip = 0;
                for page in 1..10_u64 {
                    if let Some(window) = plan_normal(page, size, sticky) {
                        assert_eq!(
                            window.skip, expected_skip,
                            "sticky={sticky} size={size} page={page}"
                        );
                        assert!(window.limit >= 1 && window.limit <= size);
                        expected_skip += window.limit;
                    }
                }
            }
        }
    }
}
