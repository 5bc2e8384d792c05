use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::clock::Clock;
use crate::events::{Subscribers, Subscription};

/// 預設顯示時間。 / Default lifetime of a toast before it starts leaving.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(4000);

/// 離場動畫時間。 / Exit transition interval between dismissal and removal.
pub const EXIT_TRANSITION: Duration = Duration::from_millis(300);

/// 通知嚴重程度。 / Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// 對應的圖示名稱。 / Icon name used by hosts that draw one.
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Info => "info-circle",
            Severity::Success => "check-circle",
            Severity::Warning => "exclamation-triangle",
            Severity::Error => "exclamation-circle",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

/// 單一通知。 / One transient notification.
///
/// `dismiss_at` stays `None` (pending) until dismissal begins, either by the
/// auto-dismiss timer or an explicit [`ToastQueue::dismiss`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastEntry {
    pub id: ToastId,
    pub message: String,
    pub severity: Severity,
    pub created_at: Instant,
    pub expires_at: Instant,
    pub dismiss_at: Option<Instant>,
}

impl ToastEntry {
    pub fn is_dismissing(&self) -> bool {
        self.dismiss_at.is_some()
    }

    fn removal_due(&self, now: Instant) -> bool {
        self.dismiss_at
            .map(|started| now >= started + EXIT_TRANSITION)
            .unwrap_or(false)
    }
}

struct QueueState {
    next_id: u64,
    entries: Vec<ToastEntry>,
}

struct QueueInner {
    clock: Rc<dyn Clock>,
    default_duration: Duration,
    state: RefCell<QueueState>,
    shown: Subscribers<ToastEntry>,
}

/// 通知佇列；複製的控制代碼共享同一佇列。 / Toast queue; clones share the same queue.
///
/// The queue is unbounded. Timers are deadlines checked by [`ToastQueue::tick`].
#[derive(Clone)]
pub struct ToastQueue {
    inner: Rc<QueueInner>,
}

impl ToastQueue {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self::with_default_duration(clock, DEFAULT_TOAST_DURATION)
    }

    pub fn with_default_duration(clock: Rc<dyn Clock>, default_duration: Duration) -> Self {
        Self {
            inner: Rc::new(QueueInner {
                clock,
                default_duration,
                state: RefCell::new(QueueState {
                    next_id: 1,
                    entries: Vec::new(),
                }),
                shown: Subscribers::new(),
            }),
        }
    }

    /// 以預設時間顯示。 / Shows a toast with the default duration.
    pub fn show(&self, message: impl Into<String>, severity: Severity) -> ToastId {
        self.show_for(message, severity, self.inner.default_duration)
    }

    /// 以指定時間顯示。 / Shows a toast that starts leaving after `duration`.
    pub fn show_for(
        &self,
        message: impl Into<String>,
        severity: Severity,
        duration: Duration,
    ) -> ToastId {
        let now = self.inner.clock.now();
        let entry = {
            let mut state = self.inner.state.borrow_mut();
            let id = ToastId(state.next_id);
            state.next_id += 1;
            let entry = ToastEntry {
                id,
                message: message.into(),
                severity,
                created_at: now,
                expires_at: now + duration,
                dismiss_at: None,
            };
            state.entries.push(entry.clone());
            entry
        };
        debug!(id = %entry.id, severity = %entry.severity, message = %entry.message, "toast shown");
        self.inner.shown.emit(&entry);
        entry.id
    }

    /// 開始移除；未知或已在移除中的 id 不做任何事。 / Starts dismissal; unknown or leaving ids are no-ops.
    pub fn dismiss(&self, id: ToastId) {
        let now = self.inner.clock.now();
        let mut state = self.inner.state.borrow_mut();
        if let Some(entry) = state
            .entries
            .iter_mut()
            .find(|entry| entry.id == id && entry.dismiss_at.is_none())
        {
            entry.dismiss_at = Some(now);
            debug!(id = %id, "toast dismissed");
        }
    }

    /// 觸發到期的計時器。 / Fires due timers: expiry starts dismissal, finished exits are removed.
    pub fn tick(&self) {
        let now = self.inner.clock.now();
        let mut state = self.inner.state.borrow_mut();
        for entry in state.entries.iter_mut() {
            if entry.dismiss_at.is_none() && now >= entry.expires_at {
                entry.dismiss_at = Some(entry.expires_at);
            }
        }
        state.entries.retain(|entry| !entry.removal_due(now));
    }

    /// 尚未開始離場的通知，依插入順序。 / Visible toasts in insertion order.
    pub fn visible(&self) -> Vec<ToastEntry> {
        self.inner
            .state
            .borrow()
            .entries
            .iter()
            .filter(|entry| !entry.is_dismissing())
            .cloned()
            .collect()
    }

    /// 包含離場中的通知。 / Every entry still in the queue, including leaving ones.
    pub fn entries(&self) -> Vec<ToastEntry> {
        self.inner.state.borrow().entries.clone()
    }

    pub fn is_visible(&self, id: ToastId) -> bool {
        self.inner
            .state
            .borrow()
            .entries
            .iter()
            .any(|entry| entry.id == id && !entry.is_dismissing())
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 訂閱新通知。 / Subscribes to newly shown toasts.
    pub fn on_show<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ToastEntry) + 'static,
    {
        self.inner.shown.subscribe(handler)
    }
}

impl fmt::Debug for ToastQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToastQueue")
            .field("entries", &self.inner.state.borrow().entries)
            .finish()
    }
}
