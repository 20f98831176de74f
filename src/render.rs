//! The per-widget render loop.
//!
//! Each running loop is a task on the registry's `TaskTracker` that samples
//! the host clock every tick, shifts it by the widget's delta and writes the
//! digital text and hand rotations to the face. A widget owns at most one
//! loop; [`RenderLoop::start`] cancels the previous one before spawning.

use std::sync::Arc;
use std::time::Duration;

use chrono::Timelike;
use log::{Level, debug, log};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::face::{ClockFace, Hand, SharedFace};
use crate::host::HostClock;
use crate::offset::{ShiftError, shifted_instant};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// What every render loop of a registry shares.
#[derive(Clone)]
pub struct LoopContext {
    pub host: Arc<dyn HostClock>,
    pub tick_interval: Duration,
    pub task_tracker: TaskTracker,
    /// Cancelled on page teardown; every loop token is a child of it.
    pub shutdown_token: CancellationToken,
}

impl LoopContext {
    pub fn new(host: Arc<dyn HostClock>, tick_interval: Duration) -> Self {
        LoopContext {
            host,
            tick_interval,
            task_tracker: TaskTracker::new(),
            shutdown_token: CancellationToken::new(),
        }
    }
}

/// Zero-pads a clock field to two digits.
pub fn pad2(value: u32) -> String {
    if value < 10 {
        format!("0{value}")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandAngles {
    pub hours: f64,
    pub minutes: f64,
    pub seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl ClockReading {
    pub fn from_time<T: Timelike>(time: &T) -> Self {
        ClockReading {
            hours: time.hour(),
            minutes: time.minute(),
            seconds: time.second(),
        }
    }

    /// `HH:MM:SS`
    pub fn digital(&self) -> String {
        format!(
            "{}:{}:{}",
            pad2(self.hours),
            pad2(self.minutes),
            pad2(self.seconds)
        )
    }

    // 360/12 degrees per hour plus minutes/12 of creep; 360/60 per minute
    // and per second.
    pub fn angles(&self) -> HandAngles {
        HandAngles {
            hours: f64::from(self.hours) * 30.0 + f64::from(self.minutes) / 12.0,
            minutes: f64::from(self.minutes) * 6.0,
            seconds: f64::from(self.seconds) * 6.0,
        }
    }

    pub fn write_to<F: ClockFace + ?Sized>(&self, face: &mut F) {
        let angles = self.angles();
        face.set_text(&self.digital());
        face.set_rotation(Hand::Hours, angles.hours);
        face.set_rotation(Hand::Minutes, angles.minutes);
        face.set_rotation(Hand::Seconds, angles.seconds);
    }
}

/// Samples the host clock and shifts it by `delta_hours`.
pub fn read_clock(host: &dyn HostClock, delta_hours: i32) -> Result<ClockReading, ShiftError> {
    let now = host.now();
    let shown = shifted_instant(&now, delta_hours)?;
    Ok(ClockReading::from_time(&shown))
}

/// Owns one running timer. Dropping it stops the timer.
#[derive(Debug)]
pub struct TimerHandle {
    generation: u64,
    delta_hours: i32,
    token: CancellationToken,
}

impl TimerHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn delta_hours(&self) -> i32 {
        self.delta_hours
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[derive(Debug)]
pub enum LoopState {
    Stopped,
    Running(TimerHandle),
}

pub struct RenderLoop<F: ClockFace> {
    face: SharedFace<F>,
    context: LoopContext,
    state: LoopState,
    generations: u64,
}

impl<F: ClockFace> RenderLoop<F> {
    pub fn new(face: SharedFace<F>, context: LoopContext) -> Self {
        RenderLoop {
            face,
            context,
            state: LoopState::Stopped,
            generations: 0,
        }
    }

    pub fn host(&self) -> &dyn HostClock {
        self.context.host.as_ref()
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running(_))
    }

    /// Replaces any running timer with a new one rendering `delta_hours`.
    /// Returns the new timer's generation.
    ///
    /// The previous timer is cancelled while holding the face lock, and
    /// ticks re-check their token under that lock, so once this returns no
    /// tick of an older generation writes to the face.
    pub fn start(&mut self, delta_hours: i32) -> u64 {
        {
            let _slots = self.face.lock();
            if let LoopState::Running(previous) = &self.state {
                previous.token.cancel();
            }
        }

        self.generations += 1;
        let generation = self.generations;
        let token = self.context.shutdown_token.child_token();
        self.state = LoopState::Running(TimerHandle {
            generation,
            delta_hours,
            token: token.clone(),
        });

        let face = self.face.clone();
        let host = self.context.host.clone();
        let period = self.context.tick_interval;
        self.context.task_tracker.spawn(async move {
            run_ticks(face, host, period, delta_hours, token).await;
            debug!("render loop generation {generation} stopped");
        });
        generation
    }
}

/// Log level for a failed tick. Only the first failure of a streak is a
/// warning; the streak ends with the next successful tick.
#[derive(Debug, Default)]
struct TickFailures {
    failing: bool,
}

impl TickFailures {
    fn level(&mut self) -> Level {
        if std::mem::replace(&mut self.failing, true) {
            Level::Debug
        } else {
            Level::Warn
        }
    }

    fn recovered(&mut self) {
        self.failing = false;
    }
}

async fn run_ticks<F: ClockFace>(
    face: SharedFace<F>,
    host: Arc<dyn HostClock>,
    period: Duration,
    delta_hours: i32,
    token: CancellationToken,
) {
    let mut failures = TickFailures::default();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let reading = match read_clock(host.as_ref(), delta_hours) {
            Ok(reading) => {
                failures.recovered();
                reading
            }
            Err(err) => {
                log!(failures.level(), "skipping clock tick: {err}");
                continue;
            }
        };
        let mut slots = face.lock();
        if token.is_cancelled() {
            break;
        }
        reading.write_to(&mut *slots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ConsoleFace;
    use crate::host::{FixedClock, hours_behind_utc};
    use crate::offset::compute_delta;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    fn fixed_host() -> Arc<dyn HostClock> {
        Arc::new(FixedClock(
            DateTime::parse_from_rfc3339("2022-08-27T19:43:39+03:00").unwrap(),
        ))
    }

    fn render_loop(face: &ConsoleFace) -> RenderLoop<ConsoleFace> {
        let context = LoopContext::new(fixed_host(), DEFAULT_TICK_INTERVAL);
        RenderLoop::new(SharedFace::new(face.clone()), context)
    }

    #[test]
    fn test_zero_padding() {
        assert_eq!(pad2(0), "00");
        assert_eq!(pad2(7), "07");
        assert_eq!(pad2(10), "10");
        assert_eq!(pad2(59), "59");
    }

    #[test]
    fn test_digital_text() {
        let reading = ClockReading {
            hours: 9,
            minutes: 5,
            seconds: 0,
        };
        assert_eq!(reading.digital(), "09:05:00");
    }

    #[test]
    fn test_hand_angles() {
        let reading = ClockReading {
            hours: 3,
            minutes: 30,
            seconds: 45,
        };
        let angles = reading.angles();
        assert_eq!(angles.hours, 92.5);
        assert_eq!(angles.minutes, 180.0);
        assert_eq!(angles.seconds, 270.0);
    }

    #[test]
    fn test_read_clock_applies_delta() {
        let host = fixed_host();
        assert_eq!(read_clock(host.as_ref(), 0).unwrap().digital(), "19:43:39");
        assert_eq!(read_clock(host.as_ref(), -8).unwrap().digital(), "11:43:39");
    }

    #[test]
    fn test_read_clock_for_extreme_offset_pairs() {
        let cases = [
            ("2022-01-10T10:00:00-08:00", 9, "03:00:00"),
            ("2022-01-10T10:00:00+14:00", -12, "08:00:00"),
            ("2022-01-10T10:00:00+12:00", 0, "22:00:00"),
            ("2022-08-27T19:43:39+05:30", 0, "14:43:39"),
        ];
        for (now, selected, expected) in cases {
            let host = FixedClock(DateTime::parse_from_rfc3339(now).unwrap());
            let delta = compute_delta(hours_behind_utc(&host.now()), selected);
            assert_eq!(read_clock(&host, delta).unwrap().digital(), expected, "{now} -> {selected}");
        }
    }

    #[test]
    fn test_failure_streak_warns_once() {
        let mut failures = TickFailures::default();
        let levels: Vec<_> = (0..10).map(|_| failures.level()).collect();
        assert_eq!(levels[0], Level::Warn);
        assert!(levels[1..].iter().all(|level| *level == Level::Debug));

        failures.recovered();
        assert_eq!(failures.level(), Level::Warn);
        assert_eq!(failures.level(), Level::Debug);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_ticks_until_superseded() {
        let face = ConsoleFace::default();
        let mut render_loop = render_loop(&face);
        assert!(!render_loop.is_running());

        assert_eq!(render_loop.start(0), 1);
        tokio::time::sleep(Duration::from_millis(350)).await;
        let state = face.snapshot();
        assert_eq!(state.writes, 3);
        assert_eq!(state.text, "19:43:39");

        assert_eq!(render_loop.start(-8), 2);
        let writes_before = face.snapshot().writes;
        tokio::time::sleep(Duration::from_millis(1020)).await;
        let state = face.snapshot();
        assert_eq!(state.text, "11:43:39");
        // exactly one loop is writing
        assert_eq!(state.writes - writes_before, 10);
        match render_loop.state() {
            LoopState::Running(handle) => {
                assert_eq!(handle.generation(), 2);
                assert_eq!(handle.delta_hours(), -8);
            }
            LoopState::Stopped => panic!("loop should be running"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_ticks_keep_loop_alive() {
        let last_hour = NaiveDate::MAX.and_hms_opt(23, 0, 0).unwrap();
        let host = Arc::new(FixedClock(Utc.from_utc_datetime(&last_hour).fixed_offset()));
        let face = ConsoleFace::default();
        let context = LoopContext::new(host, DEFAULT_TICK_INTERVAL);
        let mut render_loop = RenderLoop::new(SharedFace::new(face.clone()), context);

        // one hour past the last representable date
        render_loop.start(1);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(face.snapshot().writes, 0);
        assert!(render_loop.is_running());

        render_loop.start(-1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(face.snapshot().text, "22:00:00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_loop_stops_ticks() {
        let face = ConsoleFace::default();
        let mut render_loop = render_loop(&face);
        render_loop.start(0);
        tokio::time::sleep(Duration::from_millis(150)).await;
        drop(render_loop);

        let writes = face.snapshot().writes;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(face.snapshot().writes, writes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_token_stops_every_loop() {
        let face = ConsoleFace::default();
        let context = LoopContext::new(fixed_host(), DEFAULT_TICK_INTERVAL);
        let mut render_loop = RenderLoop::new(SharedFace::new(face.clone()), context.clone());
        render_loop.start(0);

        context.shutdown_token.cancel();
        context.task_tracker.close();
        context.task_tracker.wait().await;
        assert_eq!(face.snapshot().writes, 0);
    }
}
