//! Clock widget lifecycle: activation and time-zone switching.

use log::{debug, info, warn};

use crate::error::ClockError;
use crate::face::{ClockFace, Page, SharedFace, WidgetId};
use crate::host::hours_behind_utc;
use crate::offset::compute_delta;
use crate::render::{LoopContext, LoopState, RenderLoop};
use crate::timezones::{TimeZoneEntry, TimeZoneSource, load_time_zones};

pub const NO_TIME_ZONES_ALERT: &str = "An error occurred while loading the list of time zones";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Attached to the page and rendering the default time zone
    Running,
    /// No time zones were available; the widget stays detached and idle
    Aborted,
}

pub struct ClockWidget<F: ClockFace> {
    id: WidgetId,
    face: SharedFace<F>,
    render_loop: RenderLoop<F>,
    /// Host offset in hours behind UTC, sampled on every (re)start
    local_offset_hours: i32,
    selected_offset_hours: Option<i32>,
}

impl<F: ClockFace> ClockWidget<F> {
    pub(crate) fn new(id: WidgetId, face: F, context: LoopContext) -> Self {
        let face = SharedFace::new(face);
        let local_offset_hours = hours_behind_utc(&context.host.now());
        ClockWidget {
            id,
            render_loop: RenderLoop::new(face.clone(), context),
            face,
            local_offset_hours,
            selected_offset_hours: None,
        }
    }

    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn face(&self) -> &SharedFace<F> {
        &self.face
    }

    pub fn local_offset_hours(&self) -> i32 {
        self.local_offset_hours
    }

    pub fn selected_offset_hours(&self) -> Option<i32> {
        self.selected_offset_hours
    }

    /// Delta of the running timer, if any.
    pub fn delta_hours(&self) -> Option<i32> {
        match self.render_loop.state() {
            LoopState::Running(handle) => Some(handle.delta_hours()),
            LoopState::Stopped => None,
        }
    }

    /// Generation of the running timer; each restart bumps it.
    pub fn generation(&self) -> Option<u64> {
        match self.render_loop.state() {
            LoopState::Running(handle) => Some(handle.generation()),
            LoopState::Stopped => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.render_loop.is_running()
    }

    /// Loads the time zones and activates the widget with them.
    pub async fn activate<P: Page + ?Sized>(
        &mut self,
        page: &P,
        source: &TimeZoneSource,
    ) -> Activation {
        let entries = load_time_zones(source).await;
        self.activate_with(page, &entries)
    }

    /// Fills the selector (first entry selected), attaches the face to the
    /// page and starts rendering the first entry. An empty list alerts the
    /// user and leaves the widget detached.
    pub fn activate_with<P: Page + ?Sized>(
        &mut self,
        page: &P,
        entries: &[TimeZoneEntry],
    ) -> Activation {
        let Some(default) = entries.first() else {
            warn!("clock {}: no time zones available, not activating", self.id);
            page.alert(NO_TIME_ZONES_ALERT);
            return Activation::Aborted;
        };

        self.face.lock().populate_selector(entries, 0);
        page.attach(self.id);
        self.on_time_zone_selected(default.offset_hours);
        info!(
            "clock {} activated with {} time zones, showing {}",
            self.id,
            entries.len(),
            default.name
        );
        Activation::Running
    }

    /// Switches to `offset_hours`: resamples the host offset, recomputes the
    /// delta and restarts the render loop before returning.
    pub fn on_time_zone_selected(&mut self, offset_hours: i32) {
        self.local_offset_hours = hours_behind_utc(&self.render_loop.host().now());
        self.selected_offset_hours = Some(offset_hours);
        let delta = compute_delta(self.local_offset_hours, offset_hours);
        let generation = self.render_loop.start(delta);
        debug!(
            "clock {}: selected UTC{offset_hours:+}, delta {delta:+}h, generation {generation}",
            self.id
        );
    }

    /// Same as [`Self::on_time_zone_selected`] for a selector's string value.
    pub fn on_selector_changed(&mut self, value: &str) -> Result<(), ClockError> {
        let offset_hours = value
            .trim()
            .parse::<i32>()
            .map_err(|_| ClockError::InvalidSelection(value.to_string()))?;
        self.on_time_zone_selected(offset_hours);
        Ok(())
    }
}
