//! Persistence, configuration and theme control for the CodeVertex client.
//! CodeVertex 用戶端的儲存、設定與主題控制。

mod atomic;
pub mod autosave;
pub mod config;
pub mod store;
pub mod theme;

pub use autosave::{DraftAutoSave, DRAFT_KEY};
pub use config::{
    AppConfig, AutoSaveConfig, ConfigError, ConfigStore, DraftLoadPolicy, EndpointConfig,
    UiConfig,
};
pub use store::{FileStore, MemoryStore, PersistentStore, StoreError};
pub use theme::{
    StaticAppearance, SystemAppearance, ThemeChanged, ThemeController, ThemeError, ThemeMode,
    ThemeOrigin, ThemeState, TransitionOverlay, DARK_META_COLOR, LIGHT_META_COLOR, THEME_KEY,
};
