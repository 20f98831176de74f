//! Console front-end: faces that remember their slot values and a page that
//! prints the attached clocks.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};

use log::warn;

use crate::face::{ClockFace, Hand, Page, WidgetId};
use crate::registry::ClockTemplate;
use crate::timezones::TimeZoneEntry;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Everything a face currently shows.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FaceState {
    pub options: Vec<TimeZoneEntry>,
    pub selected: Option<usize>,
    pub text: String,
    pub hours_angle: f64,
    pub minutes_angle: f64,
    pub seconds_angle: f64,
    /// Number of digital display updates so far
    pub writes: u64,
}

impl FaceState {
    pub fn selected_entry(&self) -> Option<&TimeZoneEntry> {
        self.selected.and_then(|index| self.options.get(index))
    }
}

/// Clones share the same slots.
#[derive(Debug, Default, Clone)]
pub struct ConsoleFace {
    state: Arc<Mutex<FaceState>>,
}

impl ConsoleFace {
    pub fn snapshot(&self) -> FaceState {
        lock(&self.state).clone()
    }
}

impl ClockFace for ConsoleFace {
    fn populate_selector(&mut self, entries: &[TimeZoneEntry], selected: usize) {
        let mut state = lock(&self.state);
        state.options = entries.to_vec();
        state.selected = Some(selected);
    }

    fn set_text(&mut self, text: &str) {
        let mut state = lock(&self.state);
        state.text = text.to_string();
        state.writes += 1;
    }

    fn set_rotation(&mut self, hand: Hand, degrees: f64) {
        let mut state = lock(&self.state);
        match hand {
            Hand::Hours => state.hours_angle = degrees,
            Hand::Minutes => state.minutes_angle = degrees,
            Hand::Seconds => state.seconds_angle = degrees,
        }
    }
}

struct PageSlot {
    id: WidgetId,
    face: ConsoleFace,
    attached: bool,
}

/// Hands out faces and prints the ones that got attached.
#[derive(Default)]
pub struct ConsolePage {
    slots: Mutex<Vec<PageSlot>>,
    alerts: Mutex<Vec<String>>,
}

impl ConsolePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attached(&self) -> Vec<WidgetId> {
        lock(&self.slots)
            .iter()
            .filter(|slot| slot.attached)
            .map(|slot| slot.id)
            .collect()
    }

    pub fn face(&self, id: WidgetId) -> Option<ConsoleFace> {
        lock(&self.slots)
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| slot.face.clone())
    }

    pub fn alerts(&self) -> Vec<String> {
        lock(&self.alerts).clone()
    }

    /// One line per attached clock, numbered from 1.
    pub fn paint(&self) -> String {
        let mut out = String::new();
        for slot in lock(&self.slots).iter().filter(|slot| slot.attached) {
            let state = slot.face.snapshot();
            let zone = state
                .selected_entry()
                .map(|entry| entry.name.as_str())
                .unwrap_or("?");
            let _ = writeln!(
                out,
                "#{} {:<16} {:>8}  h {:>6.1}° m {:>5.1}° s {:>5.1}°",
                slot.id + 1,
                zone,
                state.text,
                state.hours_angle,
                state.minutes_angle,
                state.seconds_angle
            );
        }
        out
    }
}

impl ClockTemplate for ConsolePage {
    type Face = ConsoleFace;

    fn instantiate(&self, id: WidgetId) -> ConsoleFace {
        let face = ConsoleFace::default();
        lock(&self.slots).push(PageSlot {
            id,
            face: face.clone(),
            attached: false,
        });
        face
    }
}

impl Page for ConsolePage {
    fn attach(&self, id: WidgetId) {
        if let Some(slot) = lock(&self.slots).iter_mut().find(|slot| slot.id == id) {
            slot.attached = true;
        } else {
            warn!("attach requested for unknown clock {id}");
        }
    }

    fn alert(&self, message: &str) {
        eprintln!("{message}");
        lock(&self.alerts).push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_attached_faces_are_painted() {
        let page = ConsolePage::new();
        let mut first = page.instantiate(0);
        let _second = page.instantiate(1);

        first.populate_selector(&[TimeZoneEntry::new("Moscow", 3)], 0);
        first.set_text("19:43:39");
        page.attach(0);

        assert_eq!(page.attached(), vec![0]);
        let painted = page.paint();
        assert_eq!(painted.lines().count(), 1);
        assert!(painted.starts_with("#1 Moscow"));
        assert!(painted.contains("19:43:39"));
    }

    #[test]
    fn test_face_records_slots() {
        let mut face = ConsoleFace::default();
        face.set_rotation(Hand::Hours, 92.5);
        face.set_rotation(Hand::Seconds, 270.0);
        face.set_text("03:30:45");

        let state = face.snapshot();
        assert_eq!(state.hours_angle, 92.5);
        assert_eq!(state.minutes_angle, 0.0);
        assert_eq!(state.seconds_angle, 270.0);
        assert_eq!(state.writes, 1);
    }

    #[test]
    fn test_alerts_are_kept() {
        let page = ConsolePage::new();
        page.alert("no time zones");
        assert_eq!(page.alerts(), vec!["no time zones".to_string()]);
    }
}
