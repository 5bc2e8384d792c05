//! Translation workflow for the CodeVertex client: language catalog, the
//! remote endpoint seam and the orchestrator tying the UI components together.
//! CodeVertex 翻譯流程：語言清單、遠端端點與協調器。

pub mod clipboard;
pub mod endpoint;
pub mod languages;
pub mod orchestrator;
pub mod progress;
pub mod selection;
pub mod shortcuts;

pub use clipboard::{Clipboard, ClipboardError, MemoryClipboard};
pub use endpoint::{
    EndpointError, EndpointReply, HttpEndpoint, TranslationEndpoint, TranslationRequest,
    TranslationResponse,
};
pub use languages::{
    file_extension, language_options, output_tab_name, search_languages, source_tab_name,
    supported_languages, SUPPORTED_LANGUAGES,
};
pub use orchestrator::{
    CopyOutcome, OrchestratorParts, TranslateOutcome, TranslationOrchestrator, ValidationError,
    STATUS_BUSY, STATUS_READY,
};
pub use progress::{ProgressState, PROGRESS_STEPS};
pub use selection::{LanguageSelection, Slot};
pub use shortcuts::{ChordParseError, KeyChord, Keymap, Modifiers, ShortcutAction};
