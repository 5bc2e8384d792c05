use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use codevertex_ui::{Clock, EditorRegion, Subscription};
use tracing::{debug, warn};

use crate::config::{AutoSaveConfig, DraftLoadPolicy};
use crate::store::{PersistentStore, StoreError};

/// 草稿的儲存鍵。 / Store key for the source draft.
pub const DRAFT_KEY: &str = "draft-source";

#[derive(Debug, Default)]
struct PendingSave {
    text: String,
    due: Option<Instant>,
}

/// 原始碼草稿的延遲自動儲存。 / Debounced auto-save of the source pane.
///
/// Each edit restarts the debounce window; [`DraftAutoSave::tick`] writes the
/// latest text once the window has elapsed.
pub struct DraftAutoSave {
    store: Rc<dyn PersistentStore>,
    clock: Rc<dyn Clock>,
    pending: Rc<RefCell<PendingSave>>,
    restored: Option<String>,
    _subscription: Option<Subscription>,
}

impl DraftAutoSave {
    pub fn attach(
        region: &EditorRegion,
        store: Rc<dyn PersistentStore>,
        clock: Rc<dyn Clock>,
        config: &AutoSaveConfig,
    ) -> Self {
        let pending = Rc::new(RefCell::new(PendingSave::default()));
        if !config.enabled {
            return Self {
                store,
                clock,
                pending,
                restored: None,
                _subscription: None,
            };
        }

        let restored = match config.on_load {
            // restored through `input` so attached gutters recompute; the
            // save subscription below does not exist yet
            DraftLoadPolicy::Restore => store.get(DRAFT_KEY).map(|draft| {
                region.input(draft.clone());
                debug!(bytes = draft.len(), "draft restored");
                draft
            }),
            DraftLoadPolicy::Discard => {
                if let Err(err) = store.remove(DRAFT_KEY) {
                    warn!(error = %err, "failed to discard stored draft");
                }
                None
            }
        };

        let subscription = {
            let pending = Rc::clone(&pending);
            let clock = Rc::clone(&clock);
            let debounce = config.debounce();
            region.on_change(move |text| {
                let mut pending = pending.borrow_mut();
                pending.text = text.clone();
                pending.due = Some(clock.now() + debounce);
            })
        };

        Self {
            store,
            clock,
            pending,
            restored,
            _subscription: Some(subscription),
        }
    }

    /// 載入時還原的草稿。 / Draft placed into the region on attach, if any.
    pub fn restored(&self) -> Option<&str> {
        self.restored.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.borrow().due.is_some()
    }

    /// 時間到則寫入；回傳是否寫入。 / Writes the draft if its window has elapsed.
    pub fn tick(&self) -> Result<bool, StoreError> {
        let due = self.pending.borrow().due;
        match due {
            Some(due) if self.clock.now() >= due => self.flush(),
            _ => Ok(false),
        }
    }

    /// 立即寫入待存的草稿。 / Writes any pending draft immediately.
    ///
    /// A failed write leaves the draft pending for the next `tick` or `flush`.
    pub fn flush(&self) -> Result<bool, StoreError> {
        let text = {
            let pending = self.pending.borrow();
            if pending.due.is_none() {
                return Ok(false);
            }
            pending.text.clone()
        };
        self.store.set(DRAFT_KEY, &text)?;
        let mut pending = self.pending.borrow_mut();
        pending.due = None;
        pending.text.clear();
        debug!(bytes = text.len(), "draft saved");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use codevertex_ui::{LineNumberSync, ManualClock};
    use std::cell::Cell;
    use std::path::PathBuf;
    use std::time::Duration;

    /// Refuses writes until `accepting` is flipped on.
    #[derive(Default)]
    struct FlakyStore {
        accepting: Cell<bool>,
        inner: MemoryStore,
    }

    impl PersistentStore for FlakyStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if !self.accepting.get() {
                return Err(StoreError::Write {
                    path: PathBuf::from("flaky.json"),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    fn setup(
        store: Rc<MemoryStore>,
        config: AutoSaveConfig,
    ) -> (EditorRegion, DraftAutoSave, ManualClock) {
        let region = EditorRegion::new("");
        let clock = ManualClock::new();
        let autosave = DraftAutoSave::attach(&region, store, Rc::new(clock.clone()), &config);
        (region, autosave, clock)
    }

    #[test]
    fn edits_restart_the_debounce_window() {
        let store = Rc::new(MemoryStore::new());
        let (region, autosave, clock) = setup(store.clone(), AutoSaveConfig::default());

        region.input("fn main");
        clock.advance(Duration::from_millis(800));
        region.input("fn main() {}");
        clock.advance(Duration::from_millis(800));
        assert!(!autosave.tick().unwrap());
        assert!(store.get(DRAFT_KEY).is_none());

        clock.advance(Duration::from_millis(200));
        assert!(autosave.tick().unwrap());
        assert_eq!(store.get(DRAFT_KEY).as_deref(), Some("fn main() {}"));
        assert!(!autosave.is_pending());
    }

    #[test]
    fn stored_draft_is_discarded_by_default() {
        let store = Rc::new(MemoryStore::with_entries([(DRAFT_KEY, "old draft")]));
        let (region, autosave, _) = setup(store.clone(), AutoSaveConfig::default());
        assert!(store.get(DRAFT_KEY).is_none());
        assert!(autosave.restored().is_none());
        assert_eq!(region.text(), "");
    }

    #[test]
    fn restore_policy_puts_draft_back() {
        let store = Rc::new(MemoryStore::with_entries([(DRAFT_KEY, "print(1)")]));
        let config = AutoSaveConfig {
            on_load: DraftLoadPolicy::Restore,
            ..AutoSaveConfig::default()
        };
        let (region, autosave, _) = setup(store, config);
        assert_eq!(autosave.restored(), Some("print(1)"));
        assert_eq!(region.text(), "print(1)");
    }

    #[test]
    fn disabled_autosave_ignores_edits() {
        let store = Rc::new(MemoryStore::with_entries([(DRAFT_KEY, "kept")]));
        let config = AutoSaveConfig {
            enabled: false,
            ..AutoSaveConfig::default()
        };
        let (region, autosave, _) = setup(store.clone(), config);
        region.input("typed");
        assert!(!autosave.is_pending());
        assert!(!autosave.flush().unwrap());
        assert_eq!(store.get(DRAFT_KEY).as_deref(), Some("kept"));
    }

    #[test]
    fn failed_flush_keeps_the_draft_pending() {
        let store = Rc::new(FlakyStore::default());
        let region = EditorRegion::new("");
        let clock = ManualClock::new();
        let autosave = DraftAutoSave::attach(
            &region,
            store.clone(),
            Rc::new(clock.clone()),
            &AutoSaveConfig::default(),
        );

        region.input("draft");
        assert!(autosave.flush().is_err());
        assert!(autosave.is_pending());

        clock.advance(Duration::from_millis(1000));
        assert!(autosave.tick().is_err());
        assert!(autosave.is_pending());

        store.accepting.set(true);
        assert!(autosave.tick().unwrap());
        assert!(!autosave.is_pending());
        assert_eq!(store.get(DRAFT_KEY).as_deref(), Some("draft"));
    }

    #[test]
    fn restored_draft_reaches_attached_gutters() {
        let draft: String = (1..=31).map(|n| format!("line {n}\n")).collect();
        let store = Rc::new(MemoryStore::with_entries([(DRAFT_KEY, draft.clone())]));
        let region = EditorRegion::new("");
        let binding = LineNumberSync::default().attach(&region);
        assert_eq!(binding.gutter().len(), 10);

        let config = AutoSaveConfig {
            on_load: DraftLoadPolicy::Restore,
            ..AutoSaveConfig::default()
        };
        let autosave =
            DraftAutoSave::attach(&region, store, Rc::new(ManualClock::new()), &config);

        assert_eq!(autosave.restored(), Some(draft.as_str()));
        assert_eq!(binding.gutter().len(), 32);
        assert!(!autosave.is_pending());
    }
}
