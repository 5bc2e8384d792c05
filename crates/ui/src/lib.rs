//! Headless interaction components for the CodeVertex client.
//! CodeVertex 用戶端的無介面互動元件。
//!
//! Everything here is single-threaded: handles are cheap `Rc` clones, events
//! are delivered synchronously, and timers are deadlines fired by `tick`.

pub mod clock;
pub mod events;
pub mod line_numbers;
pub mod selector;
pub mod toast;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{Subscribers, Subscription};
pub use line_numbers::{
    line_count, EditorRegion, Gutter, GutterBinding, LineNumberSync, MIN_VISIBLE_LINES,
};
pub use selector::{
    SelectOption, SelectionChanged, Selector, SelectorError, SelectorGroup, SelectorState,
    DEFAULT_PLACEHOLDER,
};
pub use toast::{
    Severity, ToastEntry, ToastId, ToastQueue, DEFAULT_TOAST_DURATION, EXIT_TRANSITION,
};
