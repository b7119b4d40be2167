//! Pan/zoom state machine.
//!
//! The controller owns the map's screen transform. Pointer input and fixed
//! ticks move it between [`ViewMode`]s; every change is broadcast to the
//! registered [`ViewListener`]s as an immutable [`ViewSnapshot`].

use std::cell::RefCell;
use std::rc::Rc;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::extensions::easing::{mix, mix_vec2, Easing};

/// Deviation from identity below which the view counts as unzoomed.
const ZOOMED_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Scale multiplier applied by a click.
    pub zoom_factor: f64,
    /// Progress added per tick while zooming.
    pub zoom_step: f64,
    /// Manhattan distance in pixels a press must travel before it becomes a pan.
    pub slip_threshold: f64,
    pub easing: Easing,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            zoom_factor: 1.7,
            zoom_step: 0.07,
            slip_threshold: 2.0,
            easing: Easing::SineInOut,
        }
    }
}

/// Map-to-screen transform: `screen = map * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub offset: DVec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset: DVec2::ZERO,
    };

    pub fn new(scale: f64, offset: DVec2) -> Self {
        Self { scale, offset }
    }

    #[inline]
    pub fn apply(&self, p: DVec2) -> DVec2 {
        p * self.scale + self.offset
    }

    #[inline]
    pub fn invert(&self, p: DVec2) -> DVec2 {
        (p - self.offset) / self.scale
    }

    /// Transform scaled by `factor` around the screen point `p`, which stays put.
    pub fn zoom_about(&self, p: DVec2, factor: f64) -> Self {
        Self {
            scale: self.scale * factor,
            offset: p - (p - self.offset) * factor,
        }
    }

    /// Weighted blend; `a` at `t = 0`, `b` at `t = 1`.
    pub fn blend(a: &Self, b: &Self, t: f64) -> Self {
        Self {
            scale: mix(a.scale, b.scale, t),
            offset: mix_vec2(a.offset, b.offset, t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Idle,
    PointerDown,
    Panning,
    Zooming,
}

/// Lifecycle notifications sent to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    StartMove,
    Move,
    EndMove,
    Animate,
    Hover,
}

/// Immutable view state handed to listeners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSnapshot {
    /// The live transform.
    pub transform: ViewTransform,
    /// Transform when the current pan or zoom began.
    pub start: ViewTransform,
    /// Zoom destination. Equals `transform` outside of zooms.
    pub target: ViewTransform,
    pub mode: ViewMode,
    /// Zoom progress in [0, 1], uneased.
    pub progress: f64,
    /// Last pointer position over the map, `None` once it has left.
    pub pointer: Option<DVec2>,
}

impl ViewSnapshot {
    /// An idle view resting at `transform`.
    pub fn at_rest(transform: ViewTransform) -> Self {
        Self {
            transform,
            start: transform,
            target: transform,
            mode: ViewMode::Idle,
            progress: 0.0,
            pointer: None,
        }
    }

    pub fn scale(&self) -> f64 {
        self.transform.scale
    }

    pub fn offset(&self) -> DVec2 {
        self.transform.offset
    }

    /// Scale relative to the start of the current move.
    pub fn relative_zoom(&self) -> f64 {
        self.transform.scale / self.start.scale
    }

    /// Where a screen image captured at `start` must be drawn so it lines up
    /// with the live transform.
    pub fn relative_offset(&self) -> DVec2 {
        self.transform.offset - self.start.offset * self.relative_zoom()
    }

    pub fn is_zooming(&self) -> bool {
        self.mode == ViewMode::Zooming
    }
}

/// Receiver of view notifications. Every method defaults to doing nothing.
pub trait ViewListener {
    fn on_start_move(&mut self, _view: &ViewSnapshot) {}
    fn on_move(&mut self, _view: &ViewSnapshot) {}
    fn on_end_move(&mut self, _view: &ViewSnapshot) {}
    fn on_animate(&mut self, _view: &ViewSnapshot) {}
    fn on_hover(&mut self, _view: &ViewSnapshot) {}
}

pub type SharedListener = Rc<RefCell<dyn ViewListener>>;

type Guard = Box<dyn Fn() -> bool>;

pub struct ViewController {
    config: ViewConfig,
    transform: ViewTransform,
    start: ViewTransform,
    target: ViewTransform,
    mode: ViewMode,
    progress: f64,
    /// Press anchor, re-anchored on every pan step. `Some` while pressed.
    anchor: Option<DVec2>,
    pointer: Option<DVec2>,
    listeners: Vec<SharedListener>,
    guard: Option<Guard>,
}

impl ViewController {
    pub fn new(config: ViewConfig) -> Self {
        Self {
            config,
            transform: ViewTransform::IDENTITY,
            start: ViewTransform::IDENTITY,
            target: ViewTransform::IDENTITY,
            mode: ViewMode::Idle,
            progress: 0.0,
            anchor: None,
            pointer: None,
            listeners: Vec::new(),
            guard: None,
        }
    }

    /// Register a listener. Listeners are notified in registration order.
    pub fn add_listener(&mut self, listener: SharedListener) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Notifications other than `Hover` are suppressed while `guard` returns
    /// false. State keeps advancing either way.
    pub fn set_guard(&mut self, guard: impl Fn() -> bool + 'static) {
        self.guard = Some(Box::new(guard));
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            transform: self.transform,
            start: self.start,
            target: if self.mode == ViewMode::Zooming {
                self.target
            } else {
                self.transform
            },
            mode: self.mode,
            progress: self.progress,
            pointer: self.pointer,
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Whether the view is away from identity, i.e. unzooming would change it.
    pub fn is_zoomed(&self) -> bool {
        (self.transform.scale - 1.0).abs() > ZOOMED_TOLERANCE
            || self.transform.offset.x.abs() > ZOOMED_TOLERANCE
            || self.transform.offset.y.abs() > ZOOMED_TOLERANCE
    }

    // ── Pointer input ────────────────────────────────────────────────────

    pub fn pointer_down(&mut self, p: DVec2) {
        self.pointer = Some(p);
        self.anchor = Some(p);
        self.start = self.transform;
        self.set_mode(ViewMode::PointerDown);
        self.notify(ViewEvent::StartMove);
    }

    pub fn pointer_move(&mut self, p: DVec2) {
        self.pointer = Some(p);
        let Some(anchor) = self.anchor else {
            self.notify(ViewEvent::Hover);
            return;
        };
        let delta = p - anchor;
        let slip = delta.x.abs() + delta.y.abs();
        if slip > self.config.slip_threshold || self.mode == ViewMode::Panning {
            self.set_mode(ViewMode::Panning);
            self.transform.offset += delta;
            self.anchor = Some(p);
            self.notify(ViewEvent::Move);
        }
    }

    pub fn pointer_up(&mut self, p: DVec2) {
        self.pointer = Some(p);
        if self.anchor.take().is_none() {
            return;
        }
        if self.mode == ViewMode::Panning {
            self.set_mode(ViewMode::Idle);
            self.notify(ViewEvent::EndMove);
        } else {
            self.zoom_click(p);
        }
        self.notify(ViewEvent::Hover);
    }

    /// The pointer left the map. A pan in progress ends where it is; a press
    /// that never slipped is dropped without zooming.
    pub fn pointer_leave(&mut self) {
        self.pointer = None;
        if self.anchor.take().is_some() {
            match self.mode {
                ViewMode::Panning => {
                    self.set_mode(ViewMode::Idle);
                    self.notify(ViewEvent::EndMove);
                }
                ViewMode::PointerDown => self.set_mode(ViewMode::Idle),
                _ => {}
            }
        }
        self.notify(ViewEvent::Hover);
    }

    // ── Zooming ──────────────────────────────────────────────────────────

    /// Zoom in by the configured factor, keeping screen point `p` fixed.
    pub fn zoom_click(&mut self, p: DVec2) {
        let target = self.transform.zoom_about(p, self.config.zoom_factor);
        self.zoom_to(target);
    }

    /// Animate back to the identity transform.
    pub fn unzoom(&mut self) {
        self.zoom_to(ViewTransform::IDENTITY);
    }

    /// Start an eased transition to `target`, replacing any transition in flight.
    pub fn zoom_to(&mut self, target: ViewTransform) {
        self.set_mode(ViewMode::Zooming);
        self.progress = 0.0;
        self.start = self.transform;
        self.target = target;
        self.notify(ViewEvent::StartMove);
    }

    // ── Tick ─────────────────────────────────────────────────────────────

    /// Advance one fixed tick.
    pub fn tick(&mut self) {
        match self.mode {
            ViewMode::PointerDown | ViewMode::Panning => {}
            ViewMode::Idle => self.notify(ViewEvent::Animate),
            ViewMode::Zooming => {
                self.progress = (self.progress + self.config.zoom_step).min(1.0);
                if self.progress < 1.0 {
                    let t = self.config.easing.apply(self.progress);
                    self.transform = ViewTransform::blend(&self.start, &self.target, t);
                    self.notify(ViewEvent::Move);
                } else {
                    self.transform = self.target;
                    self.set_mode(ViewMode::Idle);
                    self.notify(ViewEvent::EndMove);
                }
            }
        }
    }

    fn set_mode(&mut self, mode: ViewMode) {
        if self.mode != mode {
            log::trace!("view {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    fn notify(&self, event: ViewEvent) {
        if event != ViewEvent::Hover {
            if let Some(guard) = &self.guard {
                if !guard() {
                    return;
                }
            }
        }
        let view = self.snapshot();
        for listener in &self.listeners {
            let Ok(mut listener) = listener.try_borrow_mut() else {
                log::warn!("view listener already borrowed, dropping {:?}", event);
                continue;
            };
            match event {
                ViewEvent::StartMove => listener.on_start_move(&view),
                ViewEvent::Move => listener.on_move(&view),
                ViewEvent::EndMove => listener.on_end_move(&view),
                ViewEvent::Animate => listener.on_animate(&view),
                ViewEvent::Hover => listener.on_hover(&view),
            }
        }
    }
}

impl Default for ViewController {
    fn default() -> Self {
        Self::new(ViewConfig::default())
    }
}
