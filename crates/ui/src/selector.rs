//! Searchable single-select dropdown.
//! 可搜尋的單選下拉選單。
//!
//! Every [`Selector`] belongs to a [`SelectorGroup`]; opening one member closes
//! the others so at most one dropdown per group is ever open.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;
use tracing::{debug, warn};

use crate::events::{Subscribers, Subscription};

/// Text shown on the trigger while nothing is selected.
/// 未選取時觸發按鈕顯示的文字。
pub const DEFAULT_PLACEHOLDER: &str = "Select Language";

/// One entry of the dropdown list.
/// 下拉清單中的一個選項。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Option whose label doubles as its value.
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// Snapshot of a selector's state.
/// 選單狀態快照。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectorState {
    pub is_open: bool,
    pub options: Vec<SelectOption>,
    pub filter_text: String,
    pub selected: Option<String>,
    pub filter_focused: bool,
}

/// Payload of the `selection-changed` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChanged {
    pub selector_id: String,
    pub value: String,
}

/// Misuse of the selector API.
/// 選單 API 的誤用。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("'{value}' is not an option of selector '{selector}'")]
    UnknownOption { selector: String, value: String },
}

struct SelectorInner {
    id: String,
    placeholder: String,
    state: RefCell<SelectorState>,
    changed: Subscribers<SelectionChanged>,
}

impl SelectorInner {
    fn close(&self) -> bool {
        let mut state = self.state.borrow_mut();
        let was_open = state.is_open;
        state.is_open = false;
        state.filter_focused = false;
        was_open
    }
}

/// Sibling registry that enforces the single-open rule.
/// 同頁選單的登記表，確保同時只開啟一個。
#[derive(Clone, Default)]
pub struct SelectorGroup {
    members: Rc<RefCell<Vec<Weak<SelectorInner>>>>,
}

impl SelectorGroup {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, member: &Rc<SelectorInner>) {
        let mut members = self.members.borrow_mut();
        members.retain(|weak| weak.strong_count() > 0);
        members.push(Rc::downgrade(member));
    }

    fn live_members(&self) -> Vec<Rc<SelectorInner>> {
        self.members
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    fn close_others(&self, keep: &Rc<SelectorInner>) {
        for member in self.live_members() {
            if !Rc::ptr_eq(&member, keep) && member.close() {
                debug!(selector = %member.id, "closed by sibling");
            }
        }
    }

    /// Handles a pointer press; every member the press is not inside closes.
    /// 處理指標按下事件；不在其範圍內的選單全部關閉。
    pub fn pointer_down(&self, inside: Option<&Selector>) {
        for member in self.live_members() {
            let is_target = inside
                .map(|selector| Rc::ptr_eq(&selector.inner, &member))
                .unwrap_or(false);
            if !is_target {
                member.close();
            }
        }
    }

    /// Number of open members; never more than one.
    pub fn open_count(&self) -> usize {
        self.live_members()
            .iter()
            .filter(|member| member.state.borrow().is_open)
            .count()
    }

    pub fn len(&self) -> usize {
        self.live_members().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SelectorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorGroup")
            .field("members", &self.len())
            .finish()
    }
}

/// Handle to one dropdown instance; clones refer to the same instance.
/// 單一選單實例的控制代碼。
#[derive(Clone)]
pub struct Selector {
    inner: Rc<SelectorInner>,
    group: SelectorGroup,
}

impl Selector {
    pub fn new(group: &SelectorGroup, id: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self::with_placeholder(group, id, options, DEFAULT_PLACEHOLDER)
    }

    pub fn with_placeholder(
        group: &SelectorGroup,
        id: impl Into<String>,
        options: Vec<SelectOption>,
        placeholder: impl Into<String>,
    ) -> Self {
        let inner = Rc::new(SelectorInner {
            id: id.into(),
            placeholder: placeholder.into(),
            state: RefCell::new(SelectorState {
                options,
                ..SelectorState::default()
            }),
            changed: Subscribers::new(),
        });
        group.register(&inner);
        Self {
            inner,
            group: group.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn state(&self) -> SelectorState {
        self.inner.state.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.borrow().is_open
    }

    pub fn has_filter_focus(&self) -> bool {
        self.inner.state.borrow().filter_focused
    }

    /// Opens the dropdown and closes every sibling.
    /// 開啟選單並關閉其他選單。
    pub fn open(&self) {
        self.group.close_others(&self.inner);
        let mut state = self.inner.state.borrow_mut();
        state.is_open = true;
        state.filter_focused = true;
        debug!(selector = %self.inner.id, "opened");
    }

    pub fn close(&self) {
        if self.inner.close() {
            debug!(selector = %self.inner.id, "closed");
        }
    }

    /// Trigger click: opens when closed, closes when open.
    pub fn toggle(&self) {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    /// Records the filter query; options and selection are untouched.
    /// 設定搜尋字串，不影響選項與選取值。
    pub fn filter(&self, query: &str) -> Vec<SelectOption> {
        self.inner.state.borrow_mut().filter_text = query.to_string();
        self.visible_options()
    }

    /// Options whose label contains the filter text, ignoring case.
    pub fn visible_options(&self) -> Vec<SelectOption> {
        let state = self.inner.state.borrow();
        let needle = state.filter_text.to_lowercase();
        state
            .options
            .iter()
            .filter(|option| option.label.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Selects an option, closes the dropdown and emits `selection-changed`.
    ///
    /// Re-selecting the current value emits again. Unknown values leave the
    /// state untouched and emit nothing.
    pub fn select(&self, value: &str) -> Result<(), SelectorError> {
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.options.iter().any(|option| option.value == value) {
                warn!(selector = %self.inner.id, value, "ignoring unknown option");
                return Err(SelectorError::UnknownOption {
                    selector: self.inner.id.clone(),
                    value: value.to_string(),
                });
            }
            state.selected = Some(value.to_string());
            state.is_open = false;
            state.filter_focused = false;
        }
        debug!(selector = %self.inner.id, value, "selected");
        self.inner.changed.emit(&SelectionChanged {
            selector_id: self.inner.id.clone(),
            value: value.to_string(),
        });
        Ok(())
    }

    pub fn selected(&self) -> Option<String> {
        self.inner.state.borrow().selected.clone()
    }

    /// Re-renders the trigger for `value` without emitting an event.
    ///
    /// Values that are not options clear the selection.
    pub fn set_display(&self, value: Option<&str>) {
        let mut state = self.inner.state.borrow_mut();
        let known = value.filter(|value| state.options.iter().any(|option| option.value == *value));
        state.selected = known.map(str::to_string);
    }

    /// Trigger text: the selected value or the placeholder.
    /// 觸發按鈕文字：選取值或提示文字。
    pub fn display_text(&self) -> String {
        self.inner
            .state
            .borrow()
            .selected
            .clone()
            .unwrap_or_else(|| self.inner.placeholder.clone())
    }

    pub fn on_selection_changed<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SelectionChanged) + 'static,
    {
        self.inner.changed.subscribe(handler)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("id", &self.inner.id)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn languages() -> Vec<SelectOption> {
        ["Python", "JavaScript", "TypeScript", "Rust"]
            .into_iter()
            .map(SelectOption::plain)
            .collect()
    }

    #[test]
    fn opening_one_closes_the_others() {
        let group = SelectorGroup::new();
        let source = Selector::new(&group, "source-select", languages());
        let target = Selector::new(&group, "target-select", languages());
        let extra = Selector::new(&group, "extra", languages());

        source.open();
        assert!(source.is_open());
        target.open();
        assert!(!source.is_open());
        assert!(target.is_open());
        extra.toggle();
        assert!(!target.is_open());
        assert_eq!(group.open_count(), 1);
        assert!(extra.has_filter_focus());
    }

    #[test]
    fn filter_is_case_insensitive_and_idempotent() {
        let group = SelectorGroup::new();
        let selector = Selector::new(&group, "s", languages());
        let once = selector.filter("SCRIPT");
        let twice = selector.filter("SCRIPT");
        assert_eq!(once, twice);
        let labels: Vec<_> = once.iter().map(|option| option.label.as_str()).collect();
        assert_eq!(labels, vec!["JavaScript", "TypeScript"]);
        assert_eq!(selector.state().options.len(), 4);
        assert_eq!(selector.selected(), None);
    }

    #[test]
    fn select_emits_every_time() {
        let group = SelectorGroup::new();
        let selector = Selector::new(&group, "source-select", languages());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _subscription = selector.on_selection_changed(move |event| {
            sink.borrow_mut().push(event.value.clone());
        });

        selector.open();
        selector.select("Rust").unwrap();
        selector.select("Rust").unwrap();
        assert!(!selector.is_open());
        assert_eq!(selector.display_text(), "Rust");
        assert_eq!(*seen.borrow(), vec!["Rust".to_string(), "Rust".to_string()]);
    }

    #[test]
    fn unknown_value_is_rejected_without_event() {
        let group = SelectorGroup::new();
        let selector = Selector::new(&group, "s", languages());
        let calls = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&calls);
        let _subscription = selector.on_selection_changed(move |_| *sink.borrow_mut() += 1);

        selector.open();
        let before = selector.state();
        let err = selector.select("Cobol").unwrap_err();
        assert_eq!(
            err,
            SelectorError::UnknownOption {
                selector: "s".into(),
                value: "Cobol".into()
            }
        );
        assert_eq!(selector.state(), before);
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn outside_pointer_closes_without_event() {
        let group = SelectorGroup::new();
        let first = Selector::new(&group, "a", languages());
        let second = Selector::new(&group, "b", languages());
        let calls = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&calls);
        let _subscription = first.on_selection_changed(move |_| *sink.borrow_mut() += 1);

        first.open();
        group.pointer_down(Some(&first));
        assert!(first.is_open());
        group.pointer_down(Some(&second));
        assert!(!first.is_open());
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn set_display_is_silent() {
        let group = SelectorGroup::new();
        let selector = Selector::new(&group, "s", languages());
        let calls = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&calls);
        let _subscription = selector.on_selection_changed(move |_| *sink.borrow_mut() += 1);

        selector.set_display(Some("Python"));
        assert_eq!(selector.selected().as_deref(), Some("Python"));
        selector.set_display(None);
        assert_eq!(selector.display_text(), DEFAULT_PLACEHOLDER);
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn dropped_selectors_leave_the_group() {
        let group = SelectorGroup::new();
        let kept = Selector::new(&group, "kept", languages());
        {
            let _temporary = Selector::new(&group, "temporary", languages());
            assert_eq!(group.len(), 2);
        }
        assert_eq!(group.len(), 1);
        kept.open();
        assert_eq!(group.open_count(), 1);
    }
}
