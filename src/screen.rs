//! Named screens, transition routing, and FPS-gated draw dispatch.
//!
//! A screen combines the view part of MVC with a little controller mixed
//! in; widgets and icons are the true view components and are called from
//! a screen. The manager owns the registered screens, resolves transition
//! intents through a chain of routers (first answer wins), and calls the
//! current screen's `draw` at the configured FPS.

use std::collections::HashMap;

use log::debug;

/// Types of screen transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// The router decides which screen to transition to.
    Auto,
    /// The router can accept the provided screen name or redirect.
    Next,
    /// The router determines what the previous screen should be.
    Back,
    /// Initial transition; only the first router can resolve it.
    Init,
}

/// The type of transition and an optional requested screen name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionIntent {
    pub kind: TransitionKind,
    /// Optional requested screen id.
    pub requested: Option<String>,
}

impl TransitionIntent {
    pub fn new(kind: TransitionKind) -> Self {
        Self {
            kind,
            requested: None,
        }
    }

    pub fn to_screen(name: impl Into<String>) -> Self {
        Self {
            kind: TransitionKind::Next,
            requested: Some(name.into()),
        }
    }
}

/// Resolves screen transitions. Routers are consulted in the order they
/// were added; returning `None` means "no objection, ask the next one".
pub trait ScreenRouter {
    fn resolve(&mut self, current: Option<&str>, intent: &TransitionIntent) -> Option<String>;
}

/// A screen that can be managed by [`ScreenManager`].
pub trait Screen {
    /// The name of the screen, used as its id unless one is provided at
    /// registration.
    fn name(&self) -> &str;

    /// Called once, immediately after the screen is registered.
    fn begin(&mut self) {}

    /// Called when this screen becomes current.
    fn start(&mut self) {}

    /// Called at the configured FPS while this screen is current.
    fn draw(&mut self) {}

    /// Called before the next screen becomes current.
    fn end(&mut self) {}
}

/// Owns the registered screens and drives transitions and drawing.
pub struct ScreenManager {
    screens: HashMap<String, Box<dyn Screen>>,
    routers: Vec<Box<dyn ScreenRouter>>,
    initial: Option<String>,
    current: Option<String>,
    previous: Option<String>,
    pending: Option<TransitionIntent>,
    refresh_ms: u16,
    last_refresh: u32,
}

impl Default for ScreenManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenManager {
    pub fn new() -> Self {
        Self {
            screens: HashMap::new(),
            routers: Vec::new(),
            initial: None,
            current: None,
            previous: None,
            pending: None,
            refresh_ms: 100,
            last_refresh: 0,
        }
    }

    /// Called once during setup; queues the initial transition.
    pub fn begin(&mut self) {
        self.pending = Some(TransitionIntent::new(TransitionKind::Init));
    }

    /// Called from the driving loop. Resolves a pending transition and
    /// calls the current screen's `draw` at the configured FPS.
    pub fn update(&mut self, now: u32) {
        if let Some(intent) = self.pending.take() {
            self.resolve_transition(&intent);
        }
        if now.wrapping_sub(self.last_refresh) < self.refresh_ms as u32 {
            return;
        }
        self.last_refresh = now;
        if let Some(current) = &self.current {
            if let Some(screen) = self.screens.get_mut(current) {
                screen.draw();
            }
        }
    }

    /// Register a screen. Uses the screen's `name()` if no id is provided;
    /// the first registered screen becomes the initial one. Returns false
    /// for an empty id or a duplicate.
    pub fn register_screen(&mut self, mut screen: Box<dyn Screen>, id: Option<&str>) -> bool {
        let id = match id {
            Some(id) => id.to_string(),
            None => screen.name().to_string(),
        };
        if id.is_empty() || self.screens.contains_key(&id) {
            return false;
        }
        if self.screens.is_empty() {
            self.initial = Some(id.clone());
        }
        screen.begin();
        self.screens.insert(id, screen);
        true
    }

    /// Register or overwrite a screen under an id.
    pub fn overwrite_screen(&mut self, mut screen: Box<dyn Screen>, id: Option<&str>) -> bool {
        let id = match id {
            Some(id) => id.to_string(),
            None => screen.name().to_string(),
        };
        if id.is_empty() {
            return false;
        }
        if self.screens.is_empty() {
            self.initial = Some(id.clone());
        }
        screen.begin();
        self.screens.insert(id, screen);
        true
    }

    /// Add a router. Routers are called in the order they are added;
    /// the first to answer wins.
    pub fn add_router(&mut self, router: Box<dyn ScreenRouter>) {
        self.routers.push(router);
    }

    /// Request a transition to a named screen. The request is passed to
    /// the routers (if any) for validation and/or redirect.
    pub fn request_screen(&mut self, name: impl Into<String>) {
        self.request(TransitionIntent::to_screen(name));
    }

    /// Request a screen transition. Only one intent is held; a new request
    /// replaces an unresolved one.
    pub fn request(&mut self, intent: TransitionIntent) {
        self.pending = Some(intent);
    }

    /// A registered screen by id (not necessarily the current one).
    pub fn screen(&self, id: &str) -> Option<&dyn Screen> {
        self.screens.get(id).map(|s| s.as_ref())
    }

    pub fn screen_mut(&mut self, id: &str) -> Option<&mut (dyn Screen + 'static)> {
        match self.screens.get_mut(id) {
            Some(s) => Some(s.as_mut()),
            None => None,
        }
    }

    /// True if a screen is registered under `id`.
    pub fn have_screen(&self, id: &str) -> bool {
        self.screens.contains_key(id)
    }

    pub fn is_current(&self, id: &str) -> bool {
        self.current.as_deref() == Some(id)
    }

    pub fn is_previous(&self, id: &str) -> bool {
        self.previous.as_deref() == Some(id)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn previous_id(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    /// The current screen, if any transition has resolved yet.
    pub fn current_mut(&mut self) -> Option<&mut (dyn Screen + 'static)> {
        let id = self.current.clone()?;
        self.screen_mut(&id)
    }

    /// Set the frames per second at which `draw` is called. Clamped to at
    /// least 1.
    pub fn set_fps(&mut self, fps: u8) {
        self.refresh_ms = 1000 / fps.max(1) as u16;
    }

    pub fn fps(&self) -> u8 {
        (1000 / self.refresh_ms.max(1)).min(u8::MAX as u16) as u8
    }

    fn resolve_transition(&mut self, intent: &TransitionIntent) {
        if self.screens.is_empty() {
            return;
        }

        let mut resolved: Option<String> = None;

        if self.routers.is_empty() {
            if intent.kind == TransitionKind::Init {
                resolved = self.initial.clone();
            }
        } else {
            // Ask routers in priority order for the next screen.
            let current = self.current.clone();
            for router in &mut self.routers {
                resolved = router.resolve(current.as_deref(), intent);
                if resolved.is_some() {
                    break;
                }
                if intent.kind == TransitionKind::Init {
                    // Only the first router can resolve Init; fall back to
                    // the first registered screen.
                    resolved = self.initial.clone();
                    break;
                }
            }
        }

        // No router objected, so use the requested screen.
        let resolved = resolved.or_else(|| intent.requested.clone());
        let Some(next) = resolved else { return };
        if !self.screens.contains_key(&next) {
            debug!("Transition to unregistered screen '{next}' ignored");
            return;
        }
        if self.current.as_deref() == Some(next.as_str()) {
            return;
        }
        if let Some(current) = self.current.take() {
            if let Some(screen) = self.screens.get_mut(&current) {
                screen.end();
            }
            self.previous = Some(current);
        }
        if let Some(screen) = self.screens.get_mut(&next) {
            screen.start();
        }
        debug!("Screen transition to '{next}'");
        self.current = Some(next);
    }
}
