//! The visual slots of a clock widget and the page widgets attach to.
//!
//! A face is one instantiated clock template. Every slot the widget writes
//! to is a trait method, so a face missing a slot doesn't compile.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::timezones::TimeZoneEntry;

/// Identifies a widget for the lifetime of its registry.
pub type WidgetId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Hours,
    Minutes,
    Seconds,
}

pub trait ClockFace: Send + 'static {
    /// Fills the time-zone selector. `selected` indexes into `entries`.
    fn populate_selector(&mut self, entries: &[TimeZoneEntry], selected: usize);

    /// Writes the digital display, e.g. `"09:05:00"`.
    fn set_text(&mut self, text: &str);

    /// Rotates one hand, in degrees clockwise from twelve o'clock.
    fn set_rotation(&mut self, hand: Hand, degrees: f64);
}

pub trait Page: Send + Sync {
    /// Makes a widget's face visible on the page.
    fn attach(&self, id: WidgetId);

    /// Blocking, user-visible notification.
    fn alert(&self, message: &str);
}

/// A face shared between its widget and the widget's render loop.
pub struct SharedFace<F>(Arc<Mutex<F>>);

impl<F: ClockFace> SharedFace<F> {
    pub fn new(face: F) -> Self {
        SharedFace(Arc::new(Mutex::new(face)))
    }

    /// Locks the face. Poisoning is ignored: every slot write overwrites
    /// the previous value in full.
    pub fn lock(&self) -> MutexGuard<'_, F> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<F> Clone for SharedFace<F> {
    fn clone(&self) -> Self {
        SharedFace(self.0.clone())
    }
}
