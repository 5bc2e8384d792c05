use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::RangeInclusive;
use std::rc::Rc;

use crate::events::{Subscribers, Subscription};

/// 行號欄最少顯示的行數。 / Gutter floor so short documents still get a comfortable column.
pub const MIN_VISIBLE_LINES: usize = 10;

/// 計算文字的行數（換行數加一）。 / Counts lines as one plus the number of `\n` characters.
pub fn line_count(text: &str) -> usize {
    1 + text.bytes().filter(|byte| *byte == b'\n').count()
}

struct RegionInner {
    text: RefCell<String>,
    scroll_top: Cell<u32>,
    changed: Subscribers<String>,
    scrolled: Subscribers<u32>,
}

/// 可編輯的文字區域（原始碼或輸出窗格）。 / Editable text region backing a code pane.
///
/// User edits go through [`EditorRegion::input`] and notify change listeners.
/// Programmatic writes via [`EditorRegion::set_text`] are silent, so whoever
/// performs them is responsible for refreshing dependent views.
#[derive(Clone)]
pub struct EditorRegion {
    inner: Rc<RegionInner>,
}

impl EditorRegion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RegionInner {
                text: RefCell::new(text.into()),
                scroll_top: Cell::new(0),
                changed: Subscribers::new(),
                scrolled: Subscribers::new(),
            }),
        }
    }

    pub fn text(&self) -> String {
        self.inner.text.borrow().clone()
    }

    pub fn is_blank(&self) -> bool {
        self.inner.text.borrow().trim().is_empty()
    }

    /// 程式寫入內容，不觸發變更通知。 / Replaces the contents without notifying listeners.
    pub fn set_text(&self, text: impl Into<String>) {
        *self.inner.text.borrow_mut() = text.into();
    }

    /// 使用者輸入：更新內容並通知監聽者。 / Applies a user edit and notifies change listeners.
    pub fn input(&self, text: impl Into<String>) {
        let text = text.into();
        *self.inner.text.borrow_mut() = text.clone();
        self.inner.changed.emit(&text);
    }

    pub fn scroll_top(&self) -> u32 {
        self.inner.scroll_top.get()
    }

    /// 捲動區域並通知監聽者。 / Scrolls the region and notifies scroll listeners.
    pub fn scroll_to(&self, offset: u32) {
        self.inner.scroll_top.set(offset);
        self.inner.scrolled.emit(&offset);
    }

    pub fn on_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&String) + 'static,
    {
        self.inner.changed.subscribe(handler)
    }

    pub fn on_scroll<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&u32) + 'static,
    {
        self.inner.scrolled.subscribe(handler)
    }
}

impl fmt::Debug for EditorRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorRegion")
            .field("text", &*self.inner.text.borrow())
            .field("scroll_top", &self.scroll_top())
            .finish()
    }
}

#[derive(Debug)]
struct GutterState {
    minimum_lines: usize,
    lines: Cell<usize>,
    scroll_top: Cell<u32>,
}

impl GutterState {
    fn recompute(&self, text: &str) {
        self.lines.set(line_count(text).max(self.minimum_lines));
    }
}

/// 唯讀的行號欄。 / Read-only gutter view mirroring a region.
#[derive(Debug, Clone)]
pub struct Gutter {
    state: Rc<GutterState>,
}

impl Gutter {
    /// 目前顯示的行號數量。 / Number of line labels currently displayed.
    pub fn len(&self) -> usize {
        self.state.lines.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn numbers(&self) -> RangeInclusive<usize> {
        1..=self.len()
    }

    pub fn scroll_top(&self) -> u32 {
        self.state.scroll_top.get()
    }

    /// 以換行串接的行號文字。 / Gutter text, one number per line.
    pub fn render(&self) -> String {
        self.numbers()
            .map(|number| number.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 行號同步器：將行號欄綁定到文字區域。 / Binds gutters to editable regions.
#[derive(Debug, Clone, Copy)]
pub struct LineNumberSync {
    minimum_lines: usize,
}

impl Default for LineNumberSync {
    fn default() -> Self {
        Self::new(MIN_VISIBLE_LINES)
    }
}

impl LineNumberSync {
    pub fn new(minimum_lines: usize) -> Self {
        Self {
            minimum_lines: minimum_lines.max(1),
        }
    }

    pub fn minimum_lines(&self) -> usize {
        self.minimum_lines
    }

    /// 綁定區域並立即計算一次。 / Attaches to a region and performs the initial sync.
    pub fn attach(&self, region: &EditorRegion) -> GutterBinding {
        let state = Rc::new(GutterState {
            minimum_lines: self.minimum_lines,
            lines: Cell::new(self.minimum_lines),
            scroll_top: Cell::new(region.scroll_top()),
        });
        state.recompute(&region.text());

        let on_change = Rc::clone(&state);
        let change = region.on_change(move |text| on_change.recompute(text));
        let on_scroll = Rc::clone(&state);
        let scroll = region.on_scroll(move |offset| on_scroll.scroll_top.set(*offset));

        GutterBinding {
            region: region.clone(),
            gutter: Gutter { state },
            subscriptions: vec![change, scroll],
        }
    }
}

/// 一組已綁定的行號欄；捨棄或 `detach` 即解除訂閱。 / Live gutter attachment, released on detach or drop.
#[derive(Debug)]
pub struct GutterBinding {
    region: EditorRegion,
    gutter: Gutter,
    subscriptions: Vec<Subscription>,
}

impl GutterBinding {
    pub fn gutter(&self) -> &Gutter {
        &self.gutter
    }

    pub fn region(&self) -> &EditorRegion {
        &self.region
    }

    /// 強制依目前內容重新計算。 / Recomputes from the region's current text and scroll offset.
    pub fn refresh(&self) {
        self.gutter.state.recompute(&self.region.text());
        self.gutter.state.scroll_top.set(self.region.scroll_top());
    }

    /// 解除綁定；行號欄保留最後的狀態。 / Releases the subscriptions, leaving the gutter frozen.
    pub fn detach(self) -> Gutter {
        let GutterBinding {
            gutter,
            subscriptions,
            ..
        } = self;
        drop(subscriptions);
        gutter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_count_counts_breaks_plus_one() {
        assert_eq!(line_count(""), 1);
        assert_eq!(line_count("a"), 1);
        assert_eq!(line_count("a\nb\n"), 3);
        assert_eq!(line_count("\r\n\r\n"), 3);
    }

    #[test]
    fn short_documents_use_the_floor() {
        let region = EditorRegion::new("fn main() {}\n");
        let binding = LineNumberSync::default().attach(&region);
        assert_eq!(binding.gutter().len(), MIN_VISIBLE_LINES);
        assert_eq!(binding.gutter().numbers(), 1..=10);
    }

    #[test]
    fn input_recomputes_synchronously() {
        let region = EditorRegion::new("");
        let binding = LineNumberSync::new(3).attach(&region);
        region.input("1\n2\n3\n4\n5");
        assert_eq!(binding.gutter().len(), 5);
        assert_eq!(binding.gutter().render(), "1\n2\n3\n4\n5");
        region.input("only");
        assert_eq!(binding.gutter().len(), 3);
    }

    #[test]
    fn silent_writes_need_refresh() {
        let region = EditorRegion::new("");
        let binding = LineNumberSync::new(2).attach(&region);
        region.set_text("a\nb\nc\nd");
        assert_eq!(binding.gutter().len(), 2);
        binding.refresh();
        assert_eq!(binding.gutter().len(), 4);
    }

    #[test]
    fn gutter_follows_region_scroll_only() {
        let region = EditorRegion::new("x");
        let binding = LineNumberSync::default().attach(&region);
        region.scroll_to(42);
        assert_eq!(binding.gutter().scroll_top(), 42);
        assert_eq!(region.scroll_top(), 42);
    }

    #[test]
    fn detach_freezes_the_gutter() {
        let region = EditorRegion::new("a\nb");
        let binding = LineNumberSync::new(1).attach(&region);
        let gutter = binding.detach();
        region.input("a\nb\nc\nd");
        region.scroll_to(7);
        assert_eq!(gutter.len(), 2);
        assert_eq!(gutter.scroll_top(), 0);
    }
}
