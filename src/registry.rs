//! Bounded factory for clock widgets.
//!
//! The registry is owned by whatever composes the page. It counts every
//! widget it ever created and refuses to go past `max_instances`. The count
//! is never decremented, not even by [`Registry::shutdown`]: clocks are
//! expected to live as long as their page.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use log::info;

use crate::config::Config;
use crate::error::ClockError;
use crate::face::{ClockFace, WidgetId};
use crate::host::{HostClock, SystemClock};
use crate::render::{DEFAULT_TICK_INTERVAL, LoopContext};
use crate::widget::ClockWidget;

pub const DEFAULT_MAX_INSTANCES: usize = 3;

/// Supplies a fresh face for every widget.
pub trait ClockTemplate {
    type Face: ClockFace;

    fn instantiate(&self, id: WidgetId) -> Self::Face;
}

pub struct Registry {
    max_instances: usize,
    live: AtomicUsize,
    context: LoopContext,
}

impl Registry {
    pub fn new(max_instances: usize) -> Self {
        Self::with_host(max_instances, Arc::new(SystemClock), DEFAULT_TICK_INTERVAL)
    }

    pub fn with_host(
        max_instances: usize,
        host: Arc<dyn HostClock>,
        tick_interval: Duration,
    ) -> Self {
        Registry {
            max_instances,
            live: AtomicUsize::new(0),
            context: LoopContext::new(host, tick_interval),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_host(
            config.max_instances,
            Arc::new(SystemClock),
            Duration::from_millis(config.tick_interval_ms.max(1)),
        )
    }

    pub fn max_instances(&self) -> usize {
        self.max_instances
    }

    /// Number of widgets created so far.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn try_acquire_slot(&self) -> Result<WidgetId, ClockError> {
        self.live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| {
                (live < self.max_instances).then_some(live + 1)
            })
            .map_err(|_| ClockError::MaxInstancesExceeded {
                max: self.max_instances,
            })
    }

    /// Creates a widget, or fails without instantiating a face when the
    /// maximum is reached.
    pub fn create<T: ClockTemplate + ?Sized>(
        &self,
        template: &T,
    ) -> Result<ClockWidget<T::Face>, ClockError> {
        let id = self.try_acquire_slot()?;
        info!("creating clock {id} ({}/{})", id + 1, self.max_instances);
        Ok(ClockWidget::new(
            id,
            template.instantiate(id),
            self.context.clone(),
        ))
    }

    /// Page teardown: stops every render loop and waits for them to exit.
    pub async fn shutdown(&self) {
        info!("stopping {} clock(s)", self.live());
        self.context.shutdown_token.cancel();
        self.context.task_tracker.close();
        self.context.task_tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ConsolePage;
    use crate::host::FixedClock;
    use crate::timezones::TimeZoneEntry;
    use chrono::DateTime;

    fn registry(max_instances: usize) -> Registry {
        let host = Arc::new(FixedClock(
            DateTime::parse_from_rfc3339("2022-08-27T19:43:39+03:00").unwrap(),
        ));
        Registry::with_host(max_instances, host, DEFAULT_TICK_INTERVAL)
    }

    #[test]
    fn test_ids_are_sequential() {
        let registry = registry(3);
        let page = ConsolePage::new();
        let ids: Vec<_> = (0..3)
            .map(|_| registry.create(&page).unwrap().id())
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(registry.live(), 3);
    }

    #[test]
    fn test_limit_leaves_no_partial_widget() {
        let registry = registry(1);
        let page = ConsolePage::new();
        let _first = registry.create(&page).unwrap();

        let err = registry.create(&page).err().unwrap();
        assert!(matches!(err, ClockError::MaxInstancesExceeded { max: 1 }));
        assert_eq!(registry.live(), 1);
        // no face was handed out for the refused widget
        assert!(page.face(1).is_none());
    }

    #[test]
    fn test_dropping_widgets_does_not_release_slots() {
        let registry = registry(2);
        let page = ConsolePage::new();
        drop(registry.create(&page).unwrap());
        drop(registry.create(&page).unwrap());
        assert!(registry.create(&page).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fourth_widget_leaves_others_ticking() {
        let registry = registry(DEFAULT_MAX_INSTANCES);
        let page = ConsolePage::new();
        let zones = [TimeZoneEntry::new("A", 3)];
        let mut widgets = Vec::new();
        for _ in 0..3 {
            let mut widget = registry.create(&page).unwrap();
            widget.activate_with(&page, &zones);
            widgets.push(widget);
        }

        assert!(matches!(
            registry.create(&page),
            Err(ClockError::MaxInstancesExceeded { max: 3 })
        ));

        tokio::time::sleep(Duration::from_millis(350)).await;
        for widget in &widgets {
            assert!(widget.is_running());
            let state = page.face(widget.id()).unwrap().snapshot();
            assert_eq!(state.writes, 3);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_loops() {
        let registry = registry(1);
        let page = ConsolePage::new();
        let mut widget = registry.create(&page).unwrap();
        widget.activate_with(&page, &[TimeZoneEntry::new("A", 3)]);
        tokio::time::sleep(Duration::from_millis(150)).await;

        registry.shutdown().await;
        let writes = page.face(0).unwrap().snapshot().writes;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(page.face(0).unwrap().snapshot().writes, writes);
        assert_eq!(registry.live(), 1);
    }
}
