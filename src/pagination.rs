use crate::{DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS};

/// Picker windows at or below this many pages show every page.
const FULL_PICKER_MAX_PAGES: usize = 7;

/// Pages shown on each side of the current page in a windowed picker.
const WINDOW_RADIUS: usize = 5;

/// Slice out one page. Pages are 1-based; page 0 or pages past the end
/// return an empty slice, the last page may be short.
pub fn paginate<T>(items: &[T], page_size: usize, page: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size).min(items.len());
    let end = page.saturating_mul(page_size).min(items.len());
    &items[start..end]
}

/// `ceil(total_items / page_size)`, zero for an empty list.
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_items.div_ceil(page_size)
}

/// One slot in the page picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

/// Page numbers (and gaps) to render around `current`.
///
/// Up to 7 pages are all shown. Beyond that the picker shows the current
/// page with up to five neighbours either side, plus page 1 and the last
/// page behind an ellipsis when they fall outside that window.
pub fn page_window(current: usize, total: usize) -> Vec<PageItem> {
    if total <= FULL_PICKER_MAX_PAGES {
        return (1..=total).map(PageItem::Page).collect();
    }

    let mut items = Vec::with_capacity(2 * WINDOW_RADIUS + 5);
    let start = current.saturating_sub(WINDOW_RADIUS).max(1);
    let end = (current + WINDOW_RADIUS).min(total);

    if current > WINDOW_RADIUS + 1 {
        items.push(PageItem::Page(1));
        items.push(PageItem::Ellipsis);
    }

    for page in start..=end {
        push_page(&mut items, page);
    }

    if current + WINDOW_RADIUS < total {
        items.push(PageItem::Ellipsis);
        push_page(&mut items, total);
    }

    items
}

/// Push a page unless it would repeat or go backwards.
fn push_page(items: &mut Vec<PageItem>, page: usize) {
    let last = items.iter().rev().find_map(|item| match item {
        PageItem::Page(p) => Some(*p),
        PageItem::Ellipsis => None,
    });
    if last.is_none_or(|p| page > p) {
        items.push(PageItem::Page(page));
    }
}

/// Parse a typed page number the way a browser's `parseInt` would:
/// optional leading whitespace and sign, then the leading run of digits.
/// "12abc" is 12, "abc" and "" are rejected.
pub fn parse_page_input(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let value: i64 = rest[..digits_end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Page size, current page and item count of a paged list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_size: usize,
    current_page: usize,
    total_items: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            current_page: 1,
            total_items: 0,
        }
    }
}

impl Pagination {
    /// Falls back to the default page size when `page_size` is not offered.
    pub fn new(page_size: usize, total_items: usize) -> Self {
        let page_size = if PAGE_SIZE_OPTIONS.contains(&page_size) {
            page_size
        } else {
            log::debug!("Page size {page_size} not offered, using {DEFAULT_PAGE_SIZE}");
            DEFAULT_PAGE_SIZE
        };
        Self {
            page_size,
            current_page: 1,
            total_items,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total_items, self.page_size)
    }

    /// New result set: record its size and return to page 1.
    pub fn reset(&mut self, total_items: usize) {
        self.total_items = total_items;
        self.current_page = 1;
    }

    /// Switch page size. Only sizes from [`PAGE_SIZE_OPTIONS`] are accepted;
    /// an accepted change returns to page 1.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        if !PAGE_SIZE_OPTIONS.contains(&page_size) {
            return false;
        }
        self.page_size = page_size;
        self.current_page = 1;
        true
    }

    /// Move to `page` if it exists. Out-of-range targets are ignored rather
    /// than clamped; returns whether the page changed hands.
    pub fn go_to_page(&mut self, page: i64) -> bool {
        let total = self.total_pages() as i64;
        if page >= 1 && page <= total {
            self.current_page = page as usize;
            true
        } else {
            false
        }
    }

    pub fn next(&mut self) -> bool {
        self.go_to_page(self.current_page as i64 + 1)
    }

    pub fn previous(&mut self) -> bool {
        self.go_to_page(self.current_page as i64 - 1)
    }

    /// The visible rows of `items` for the current page.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        paginate(items, self.page_size, self.current_page)
    }

    pub fn window(&self) -> Vec<PageItem> {
        page_window(self.current_page, self.total_pages())
    }
}

/// Keys the table reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Left,
    Right,
    Escape,
    Other,
}

/// What a key press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The page changed to the given number.
    Moved(usize),
    /// Focus should leave the text field; the page is unchanged.
    ReleaseFocus,
    Ignored,
}

impl Pagination {
    /// Arrow keys page through results unless a text or number field has
    /// focus, in which case they belong to the field. Escape in a field
    /// releases it.
    pub fn handle_key(&mut self, key: NavKey, focus_in_field: bool) -> KeyOutcome {
        if focus_in_field {
            return match key {
                NavKey::Escape => KeyOutcome::ReleaseFocus,
                _ => KeyOutcome::Ignored,
            };
        }
        let moved = match key {
            NavKey::Left => self.previous(),
            NavKey::Right => self.next(),
            NavKey::Escape | NavKey::Other => false,
        };
        if moved {
            KeyOutcome::Moved(self.current_page)
        } else {
            KeyOutcome::Ignored
        }
    }
}
