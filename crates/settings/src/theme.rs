use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::{Duration, Instant};

use codevertex_ui::{Clock, Subscribers, Subscription};
use thiserror::Error;
use tracing::{debug, warn};

use crate::store::{PersistentStore, StoreError};

/// 主題偏好的儲存鍵。 / Store key holding the explicit theme choice.
pub const THEME_KEY: &str = "theme";

pub const LIGHT_META_COLOR: &str = "#ffffff";
pub const DARK_META_COLOR: &str = "#0f172a";

/// 轉場遮罩的初始不透明度。 / Opacity of the transition overlay before it fades.
pub const OVERLAY_OPACITY: f32 = 0.3;
pub const OVERLAY_HOLD: Duration = Duration::from_millis(100);
pub const OVERLAY_FADE: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("unknown theme mode `{0}` (expected `light` or `dark`)")]
    InvalidMode(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub fn from_prefers_dark(prefers_dark: bool) -> Self {
        if prefers_dark {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        }
    }

    /// 瀏覽器列使用的顏色。 / Colour advertised to the host chrome for this mode.
    pub fn meta_color(&self) -> &'static str {
        match self {
            ThemeMode::Light => LIGHT_META_COLOR,
            ThemeMode::Dark => DARK_META_COLOR,
        }
    }
}

impl FromStr for ThemeMode {
    type Err = ThemeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            _ => Err(ThemeError::InvalidMode(value.to_string())),
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 主題值的來源。 / Provenance of the current theme value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeOrigin {
    UserChosen,
    SystemDerived,
}

impl ThemeOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeOrigin::UserChosen => "user",
            ThemeOrigin::SystemDerived => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeState {
    pub mode: ThemeMode,
    pub origin: ThemeOrigin,
}

/// `theme-changed` 事件。 / Broadcast after every applied theme change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeChanged {
    pub previous: ThemeMode,
    pub state: ThemeState,
}

/// 作業系統的外觀偏好。 / OS-level colour scheme preference.
pub trait SystemAppearance {
    fn prefers_dark(&self) -> bool;
}

/// 固定值的外觀來源，可手動改變。 / Appearance source holding a settable value.
#[derive(Debug, Default)]
pub struct StaticAppearance {
    prefers_dark: Cell<bool>,
}

impl StaticAppearance {
    pub fn new(prefers_dark: bool) -> Self {
        Self {
            prefers_dark: Cell::new(prefers_dark),
        }
    }

    pub fn set_prefers_dark(&self, prefers_dark: bool) {
        self.prefers_dark.set(prefers_dark);
    }
}

impl SystemAppearance for StaticAppearance {
    fn prefers_dark(&self) -> bool {
        self.prefers_dark.get()
    }
}

/// 主題切換時的全畫面遮罩。 / Full-viewport cross-fade overlay started by a user change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionOverlay {
    pub color: &'static str,
    pub started_at: Instant,
}

impl TransitionOverlay {
    /// Opacity at `now`, or `None` once the overlay is gone.
    pub fn opacity_at(&self, now: Instant) -> Option<f32> {
        let elapsed = now.saturating_duration_since(self.started_at);
        if elapsed < OVERLAY_HOLD {
            return Some(OVERLAY_OPACITY);
        }
        let fading = elapsed - OVERLAY_HOLD;
        if fading >= OVERLAY_FADE {
            return None;
        }
        let remaining = 1.0 - fading.as_secs_f32() / OVERLAY_FADE.as_secs_f32();
        Some(OVERLAY_OPACITY * remaining)
    }
}

struct ControllerInner {
    store: Rc<dyn PersistentStore>,
    appearance: Rc<dyn SystemAppearance>,
    clock: Rc<dyn Clock>,
    state: Cell<ThemeState>,
    overlay: Cell<Option<TransitionOverlay>>,
    changed: Subscribers<ThemeChanged>,
}

/// 解析、套用並保存淺色／深色主題。 / Resolves, applies and persists the light/dark theme.
///
/// Only explicit user choices are written to the store. OS preference changes
/// are followed while the origin is [`ThemeOrigin::SystemDerived`].
#[derive(Clone)]
pub struct ThemeController {
    inner: Rc<ControllerInner>,
}

impl ThemeController {
    /// 啟動時解析：先讀儲存值，否則採用作業系統偏好。 / Resolves the stored choice, else the OS preference.
    pub fn new(
        store: Rc<dyn PersistentStore>,
        appearance: Rc<dyn SystemAppearance>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let stored = store
            .get(THEME_KEY)
            .and_then(|value| match value.parse::<ThemeMode>() {
                Ok(mode) => Some(mode),
                Err(_) => {
                    warn!(value = %value, "ignoring unreadable stored theme");
                    None
                }
            });
        let state = match stored {
            Some(mode) => ThemeState {
                mode,
                origin: ThemeOrigin::UserChosen,
            },
            None => ThemeState {
                mode: ThemeMode::from_prefers_dark(appearance.prefers_dark()),
                origin: ThemeOrigin::SystemDerived,
            },
        };
        debug!(mode = %state.mode, origin = state.origin.as_str(), "theme resolved");
        Self {
            inner: Rc::new(ControllerInner {
                store,
                appearance,
                clock,
                state: Cell::new(state),
                overlay: Cell::new(None),
                changed: Subscribers::new(),
            }),
        }
    }

    pub fn state(&self) -> ThemeState {
        self.inner.state.get()
    }

    pub fn mode(&self) -> ThemeMode {
        self.state().mode
    }

    pub fn meta_theme_color(&self) -> &'static str {
        self.mode().meta_color()
    }

    pub fn toggle_theme(&self) -> Result<ThemeState, ThemeError> {
        self.set_mode(self.mode().toggled())
    }

    /// 以文字設定主題；無效值不產生任何副作用。 / Sets the theme by name; invalid names change nothing.
    pub fn set_theme(&self, mode: &str) -> Result<ThemeState, ThemeError> {
        let mode = mode.parse::<ThemeMode>()?;
        self.set_mode(mode)
    }

    /// 使用者選擇主題：保存、套用並廣播。 / Records a user choice, then persists, applies and broadcasts it.
    ///
    /// If the store rejects the write the state is left untouched.
    pub fn set_mode(&self, mode: ThemeMode) -> Result<ThemeState, ThemeError> {
        self.inner.store.set(THEME_KEY, mode.as_str())?;
        let next = ThemeState {
            mode,
            origin: ThemeOrigin::UserChosen,
        };
        self.inner.overlay.set(Some(TransitionOverlay {
            color: mode.meta_color(),
            started_at: self.inner.clock.now(),
        }));
        self.apply(next);
        Ok(next)
    }

    /// 作業系統偏好改變；回傳是否採用。 / Handles an OS preference change, returning whether it was adopted.
    pub fn system_preference_changed(&self, prefers_dark: bool) -> bool {
        let current = self.state();
        if current.origin == ThemeOrigin::UserChosen {
            debug!("OS theme change ignored, user choice sticks");
            return false;
        }
        let mode = ThemeMode::from_prefers_dark(prefers_dark);
        if mode == current.mode {
            return false;
        }
        self.apply(ThemeState {
            mode,
            origin: ThemeOrigin::SystemDerived,
        });
        true
    }

    /// 清除使用者選擇，回到作業系統偏好。 / Forgets the user choice and follows the OS again.
    pub fn clear_preference(&self) -> Result<ThemeState, ThemeError> {
        self.inner.store.remove(THEME_KEY)?;
        let next = ThemeState {
            mode: ThemeMode::from_prefers_dark(self.inner.appearance.prefers_dark()),
            origin: ThemeOrigin::SystemDerived,
        };
        self.apply(next);
        Ok(next)
    }

    /// 主題切換控制項的鍵盤操作。 / Keyboard activation of the toggle control (`Enter` or `Space`).
    pub fn handle_toggle_key(&self, key: &str) -> Result<bool, ThemeError> {
        match key {
            "Enter" | " " | "Space" => {
                self.toggle_theme()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// 目前的轉場遮罩與其不透明度。 / Current overlay and its opacity, if one is showing.
    pub fn overlay(&self) -> Option<(TransitionOverlay, f32)> {
        let overlay = self.inner.overlay.get()?;
        overlay
            .opacity_at(self.inner.clock.now())
            .map(|opacity| (overlay, opacity))
    }

    /// 移除已結束的遮罩。 / Removes the overlay once its fade has finished.
    pub fn tick(&self) {
        if let Some(overlay) = self.inner.overlay.get() {
            if overlay.opacity_at(self.inner.clock.now()).is_none() {
                self.inner.overlay.set(None);
            }
        }
    }

    pub fn on_theme_changed<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ThemeChanged) + 'static,
    {
        self.inner.changed.subscribe(handler)
    }

    fn apply(&self, next: ThemeState) {
        let previous = self.inner.state.replace(next);
        debug!(
            from = %previous.mode,
            to = %next.mode,
            origin = next.origin.as_str(),
            "theme applied"
        );
        self.inner.changed.emit(&ThemeChanged {
            previous: previous.mode,
            state: next,
        });
    }
}

impl fmt::Debug for ThemeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeController")
            .field("state", &self.state())
            .field("overlay", &self.inner.overlay.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use codevertex_ui::ManualClock;
    use std::cell::RefCell;

    struct RejectingStore;

    impl PersistentStore for RejectingStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Write {
                path: key.into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn controller(
        store: Rc<dyn PersistentStore>,
        prefers_dark: bool,
    ) -> (ThemeController, Rc<StaticAppearance>, ManualClock) {
        let appearance = Rc::new(StaticAppearance::new(prefers_dark));
        let clock = ManualClock::new();
        let controller = ThemeController::new(store, appearance.clone(), Rc::new(clock.clone()));
        (controller, appearance, clock)
    }

    #[test]
    fn stored_choice_wins_over_os() {
        let store = Rc::new(MemoryStore::with_entries([(THEME_KEY, "light")]));
        let (controller, _, _) = controller(store, true);
        assert_eq!(
            controller.state(),
            ThemeState {
                mode: ThemeMode::Light,
                origin: ThemeOrigin::UserChosen
            }
        );
    }

    #[test]
    fn unreadable_stored_value_falls_back_to_os() {
        let store = Rc::new(MemoryStore::with_entries([(THEME_KEY, "sepia")]));
        let (controller, _, _) = controller(store, true);
        assert_eq!(controller.mode(), ThemeMode::Dark);
        assert_eq!(controller.state().origin, ThemeOrigin::SystemDerived);
    }

    #[test]
    fn os_changes_are_followed_without_persisting() {
        let store = Rc::new(MemoryStore::new());
        let (controller, _, _) = controller(store.clone(), false);
        assert!(controller.system_preference_changed(true));
        assert_eq!(controller.mode(), ThemeMode::Dark);
        assert!(store.get(THEME_KEY).is_none());
        assert!(!controller.system_preference_changed(true));
    }

    #[test]
    fn toggle_persists_and_broadcasts() {
        let store = Rc::new(MemoryStore::new());
        let (controller, _, _) = controller(store.clone(), false);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let _subscription = controller.on_theme_changed(move |event| {
            sink.borrow_mut().push(*event);
        });

        let state = controller.toggle_theme().unwrap();
        assert_eq!(state.mode, ThemeMode::Dark);
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark"));
        assert_eq!(
            *events.borrow(),
            vec![ThemeChanged {
                previous: ThemeMode::Light,
                state
            }]
        );
        assert_eq!(controller.meta_theme_color(), DARK_META_COLOR);
    }

    #[test]
    fn invalid_mode_has_no_side_effects() {
        let store = Rc::new(MemoryStore::new());
        let (controller, _, _) = controller(store.clone(), false);
        let before = controller.state();
        let err = controller.set_theme("purple").unwrap_err();
        assert!(matches!(err, ThemeError::InvalidMode(ref value) if value == "purple"));
        assert_eq!(controller.state(), before);
        assert!(store.is_empty());
        assert!(controller.overlay().is_none());
    }

    #[test]
    fn failed_persistence_leaves_state_unchanged() {
        let (controller, _, _) = controller(Rc::new(RejectingStore), false);
        assert!(matches!(
            controller.toggle_theme(),
            Err(ThemeError::Store(_))
        ));
        assert_eq!(controller.mode(), ThemeMode::Light);
        assert_eq!(controller.state().origin, ThemeOrigin::SystemDerived);
    }

    #[test]
    fn clear_preference_returns_to_os() {
        let store = Rc::new(MemoryStore::new());
        let (controller, appearance, _) = controller(store.clone(), false);
        controller.set_mode(ThemeMode::Dark).unwrap();
        appearance.set_prefers_dark(false);
        let state = controller.clear_preference().unwrap();
        assert_eq!(state.mode, ThemeMode::Light);
        assert_eq!(state.origin, ThemeOrigin::SystemDerived);
        assert!(store.get(THEME_KEY).is_none());
        assert!(controller.system_preference_changed(true));
    }

    #[test]
    fn overlay_holds_then_fades_out() {
        let (controller, _, clock) = controller(Rc::new(MemoryStore::new()), false);
        controller.set_mode(ThemeMode::Dark).unwrap();

        let (overlay, opacity) = controller.overlay().unwrap();
        assert_eq!(overlay.color, DARK_META_COLOR);
        assert_eq!(opacity, OVERLAY_OPACITY);

        clock.advance(Duration::from_millis(200));
        let (_, fading) = controller.overlay().unwrap();
        assert!(fading > 0.0 && fading < OVERLAY_OPACITY);

        clock.advance(Duration::from_millis(100));
        assert!(controller.overlay().is_none());
        controller.tick();
        assert!(format!("{controller:?}").contains("overlay: None"));
    }

    #[test]
    fn toggle_key_accepts_enter_and_space() {
        let (controller, _, _) = controller(Rc::new(MemoryStore::new()), false);
        assert!(controller.handle_toggle_key("Enter").unwrap());
        assert!(controller.handle_toggle_key(" ").unwrap());
        assert!(!controller.handle_toggle_key("Escape").unwrap());
        assert_eq!(controller.mode(), ThemeMode::Light);
    }
}
