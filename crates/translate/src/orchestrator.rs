use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use codevertex_ui::{
    EditorRegion, Gutter, GutterBinding, LineNumberSync, Selector, Severity, Subscription,
    ToastQueue,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clipboard::Clipboard;
use crate::endpoint::{EndpointReply, TranslationEndpoint, TranslationRequest};
use crate::languages::{output_tab_name, source_tab_name};
use crate::progress::ProgressState;
use crate::selection::{LanguageSelection, Slot};
use crate::shortcuts::{KeyChord, Keymap, ShortcutAction};

pub const MSG_TRANSLATED: &str = "Code translated successfully!";
pub const MSG_TRANSLATION_FAILED: &str = "Translation failed";
pub const MSG_NETWORK_ERROR: &str = "Network error. Please try again.";
pub const MSG_SWAPPED: &str = "Languages and code swapped";
pub const MSG_NOTHING_TO_COPY: &str = "No code to copy";
pub const MSG_COPIED: &str = "Code copied to clipboard!";
pub const MSG_COPY_FAILED: &str = "Failed to copy code";
pub const MSG_SOURCE_CLEARED: &str = "Source code cleared";

pub const STATUS_BUSY: &str = "AI Processing...";
pub const STATUS_READY: &str = "AI Ready";

/// 送出前的檢查失敗；訊息即為提示文字。 / Local validation failure; the message is what the user sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter some code to translate")]
    EmptyCode,
    #[error("Please select a source language")]
    MissingSource,
    #[error("Please select a target language")]
    MissingTarget,
    #[error("Source and target languages cannot be the same")]
    SameLanguage,
}

/// `translate()` 的結果。 / How one `translate()` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateOutcome {
    /// Another request was in flight; nothing was sent.
    Busy,
    Invalid(ValidationError),
    Translated,
    /// The service answered `success: false`; carries the toast text.
    Rejected(String),
    /// Transport or decoding failure.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    Empty,
    Failed,
}

/// 協調器所需的元件，由呼叫端建立後注入。 / Components the orchestrator coordinates, built by the host.
pub struct OrchestratorParts {
    pub source_selector: Selector,
    pub target_selector: Selector,
    pub source_pane: EditorRegion,
    pub output_pane: EditorRegion,
    pub line_numbers: LineNumberSync,
    pub toasts: ToastQueue,
    pub endpoint: Rc<dyn TranslationEndpoint>,
    pub clipboard: Rc<dyn Clipboard>,
    pub keymap: Keymap,
}

struct OrchestratorInner {
    source_selector: Selector,
    target_selector: Selector,
    source_pane: EditorRegion,
    output_pane: EditorRegion,
    source_gutter: GutterBinding,
    output_gutter: GutterBinding,
    toasts: ToastQueue,
    endpoint: Rc<dyn TranslationEndpoint>,
    clipboard: Rc<dyn Clipboard>,
    keymap: Keymap,
    source: RefCell<LanguageSelection>,
    target: RefCell<LanguageSelection>,
    progress: Cell<ProgressState>,
    busy: Cell<bool>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl OrchestratorInner {
    fn selection(&self, slot: Slot) -> &RefCell<LanguageSelection> {
        match slot {
            Slot::Source => &self.source,
            Slot::Target => &self.target,
        }
    }

    fn refresh_gutters(&self) {
        self.source_gutter.refresh();
        self.output_gutter.refresh();
    }
}

/// Clears the busy flag on every exit path, including a dropped future.
struct BusyGuard<'a>(&'a Cell<bool>);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// 翻譯流程協調器。 / Coordinates selectors, panes, gutters, toasts and the endpoint.
///
/// Handles are cheap clones of one shared instance. All operations take
/// `&self`; the only suspension point is the endpoint call inside
/// [`TranslationOrchestrator::translate`], during which every other
/// operation stays available and a second `translate` is refused.
#[derive(Clone)]
pub struct TranslationOrchestrator {
    inner: Rc<OrchestratorInner>,
}

impl TranslationOrchestrator {
    pub fn new(parts: OrchestratorParts) -> Self {
        let OrchestratorParts {
            source_selector,
            target_selector,
            source_pane,
            output_pane,
            line_numbers,
            toasts,
            endpoint,
            clipboard,
            keymap,
        } = parts;

        let source = LanguageSelection {
            slot: Slot::Source,
            value: source_selector.selected(),
        };
        let target = LanguageSelection {
            slot: Slot::Target,
            value: target_selector.selected(),
        };
        let inner = Rc::new(OrchestratorInner {
            source_gutter: line_numbers.attach(&source_pane),
            output_gutter: line_numbers.attach(&output_pane),
            source_selector,
            target_selector,
            source_pane,
            output_pane,
            toasts,
            endpoint,
            clipboard,
            keymap,
            source: RefCell::new(source),
            target: RefCell::new(target),
            progress: Cell::new(ProgressState::IDLE),
            busy: Cell::new(false),
            subscriptions: RefCell::new(Vec::new()),
        });

        let subscriptions = [Slot::Source, Slot::Target]
            .into_iter()
            .map(|slot| {
                let weak: Weak<OrchestratorInner> = Rc::downgrade(&inner);
                let selector = match slot {
                    Slot::Source => &inner.source_selector,
                    Slot::Target => &inner.target_selector,
                };
                selector.on_selection_changed(move |event| {
                    if let Some(inner) = weak.upgrade() {
                        TranslationOrchestrator { inner }.on_selection_changed(slot, &event.value);
                    }
                })
            })
            .collect();
        *inner.subscriptions.borrow_mut() = subscriptions;

        Self { inner }
    }

    /// 記錄選取的語言並設定進度步驟。 / Records a language choice and jumps the progress step.
    pub fn on_selection_changed(&self, slot: Slot, value: &str) {
        self.inner.selection(slot).borrow_mut().value = Some(value.to_string());
        let step = match slot {
            Slot::Source => ProgressState::SOURCE_CHOSEN,
            Slot::Target => ProgressState::TARGET_CHOSEN,
        };
        self.inner.progress.set(step);
        debug!(slot = %slot, value, step = step.step(), "language selected");
    }

    fn validate(&self) -> Result<TranslationRequest, ValidationError> {
        let code = self.inner.source_pane.text().trim().to_string();
        if code.is_empty() {
            return Err(ValidationError::EmptyCode);
        }
        let source_lang = self
            .inner
            .source
            .borrow()
            .value
            .clone()
            .ok_or(ValidationError::MissingSource)?;
        let target_lang = self
            .inner
            .target
            .borrow()
            .value
            .clone()
            .ok_or(ValidationError::MissingTarget)?;
        if source_lang == target_lang {
            return Err(ValidationError::SameLanguage);
        }
        Ok(TranslationRequest {
            code,
            source_lang,
            target_lang,
        })
    }

    /// 驗證並送出翻譯。 / Validates the form, sends one request and applies the reply.
    ///
    /// Every failure is reported through one Error toast. Calls made while a
    /// request is in flight return [`TranslateOutcome::Busy`] without a toast.
    pub async fn translate(&self) -> TranslateOutcome {
        if self.inner.busy.get() {
            debug!("translate ignored while a request is in flight");
            return TranslateOutcome::Busy;
        }
        let request = match self.validate() {
            Ok(request) => request,
            Err(err) => {
                self.inner.toasts.show(err.to_string(), Severity::Error);
                return TranslateOutcome::Invalid(err);
            }
        };

        self.inner.busy.set(true);
        let _busy = BusyGuard(&self.inner.busy);
        self.inner.progress.set(ProgressState::TRANSLATING);
        info!(
            source_lang = %request.source_lang,
            target_lang = %request.target_lang,
            bytes = request.code.len(),
            "translation started"
        );

        let endpoint = Rc::clone(&self.inner.endpoint);
        let reply = endpoint
            .translate(&request)
            .await
            .and_then(|response| response.into_reply());

        match reply {
            Ok(EndpointReply::Translated(code)) => {
                self.inner.output_pane.set_text(code);
                self.inner.refresh_gutters();
                self.inner.toasts.show(MSG_TRANSLATED, Severity::Success);
                info!("translation finished");
                TranslateOutcome::Translated
            }
            Ok(EndpointReply::Rejected(message)) => {
                let message = message.unwrap_or_else(|| MSG_TRANSLATION_FAILED.to_string());
                warn!(message = %message, "translation rejected");
                self.inner.toasts.show(message.clone(), Severity::Error);
                TranslateOutcome::Rejected(message)
            }
            Err(err) => {
                warn!(error = %err, "translation request failed");
                self.inner.toasts.show(MSG_NETWORK_ERROR, Severity::Error);
                TranslateOutcome::Failed
            }
        }
    }

    /// 交換語言與內容。 / Exchanges languages and pane contents; legal in any state.
    pub fn swap(&self) {
        {
            let mut source = self.inner.source.borrow_mut();
            let mut target = self.inner.target.borrow_mut();
            std::mem::swap(&mut source.value, &mut target.value);
            self.inner.source_selector.set_display(source.value());
            self.inner.target_selector.set_display(target.value());
            // a selector without the swapped option shows the placeholder; mirror it
            source.value = self.inner.source_selector.selected();
            target.value = self.inner.target_selector.selected();
        }

        let source_text = self.inner.source_pane.text();
        let output_text = self.inner.output_pane.text();
        self.inner.source_pane.set_text(output_text);
        self.inner.output_pane.set_text(source_text);

        self.inner.refresh_gutters();
        self.inner.toasts.show(MSG_SWAPPED, Severity::Info);
        debug!("languages and code swapped");
    }

    /// 複製輸出窗格。 / Copies the output pane to the clipboard.
    pub fn copy_result(&self) -> CopyOutcome {
        let text = self.inner.output_pane.text();
        if text.trim().is_empty() {
            self.inner.toasts.show(MSG_NOTHING_TO_COPY, Severity::Error);
            return CopyOutcome::Empty;
        }
        match self.inner.clipboard.write_text(&text) {
            Ok(()) => {
                self.inner.toasts.show(MSG_COPIED, Severity::Success);
                CopyOutcome::Copied
            }
            Err(err) => {
                warn!(error = %err, "clipboard write failed");
                self.inner.toasts.show(MSG_COPY_FAILED, Severity::Error);
                CopyOutcome::Failed
            }
        }
    }

    pub fn clear_source(&self) {
        self.inner.source_pane.set_text("");
        self.inner.refresh_gutters();
        self.inner.toasts.show(MSG_SOURCE_CLEARED, Severity::Info);
    }

    /// 執行組合鍵對應的動作。 / Runs the action bound to `chord`, if any.
    pub async fn handle_shortcut(&self, chord: &KeyChord) -> Option<ShortcutAction> {
        let action = self.inner.keymap.lookup(chord)?;
        match action {
            ShortcutAction::Translate => {
                if !self.is_busy() {
                    self.translate().await;
                }
            }
            ShortcutAction::Swap => self.swap(),
            ShortcutAction::Copy => {
                self.copy_result();
            }
        }
        Some(action)
    }

    pub fn selection(&self, slot: Slot) -> LanguageSelection {
        self.inner.selection(slot).borrow().clone()
    }

    pub fn progress(&self) -> ProgressState {
        self.inner.progress.get()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.get()
    }

    pub fn translate_enabled(&self) -> bool {
        !self.is_busy()
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_busy() {
            STATUS_BUSY
        } else {
            STATUS_READY
        }
    }

    pub fn source_tab_name(&self) -> String {
        source_tab_name(self.inner.source.borrow().value())
    }

    pub fn output_tab_name(&self) -> String {
        output_tab_name(self.inner.target.borrow().value())
    }

    pub fn source_gutter(&self) -> &Gutter {
        self.inner.source_gutter.gutter()
    }

    pub fn output_gutter(&self) -> &Gutter {
        self.inner.output_gutter.gutter()
    }

    pub fn source_pane(&self) -> &EditorRegion {
        &self.inner.source_pane
    }

    pub fn output_pane(&self) -> &EditorRegion {
        &self.inner.output_pane
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.inner.toasts
    }
}

impl fmt::Debug for TranslationOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationOrchestrator")
            .field("source", &*self.inner.source.borrow())
            .field("target", &*self.inner.target.borrow())
            .field("progress", &self.progress())
            .field("busy", &self.is_busy())
            .finish()
    }
}
