use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::rc::Rc;

use chrono::{DateTime, Local, TimeZone, Utc};
use gloo_timers::callback::Interval;
use log::{debug, warn};
use wasm_bindgen_futures::spawn_local;
use web_sys::js_sys::Date;
use web_sys::{Element, VisibilityState};
use yew::AppHandle;

use crate::components::launch_card::{LaunchCard, LaunchCardProps};
use crate::config::SiteConfig;
use crate::dom;
use crate::error::PageResult;

pub const SECOND_MS: i64 = 1000;
pub const MINUTE_MS: i64 = 60 * SECOND_MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

const TICK_MS: u32 = 1000;
const FIELD_IDS: [&str; 4] = ["days", "hours", "minutes", "seconds"];
const LIVE_ID: &str = "countdown";
const CARD_ID: &str = "countdownStatic";
const HIDDEN: &str = "d-none";
/// `beforeunload` is left out: a cancelled navigation would leave the
/// countdown stopped on a page that stays open.
const STOP_EVENTS: [&str; 1] = ["pagehide"];

/// Time left until launch, split into display units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Breakdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Breakdown {
    pub const ZERO: Breakdown = Breakdown { days: 0, hours: 0, minutes: 0, seconds: 0 };

    /// `None` once nothing is left.
    pub fn from_remaining(remaining_ms: i64) -> Option<Self> {
        if remaining_ms <= 0 {
            return None;
        }
        Some(Self {
            days: remaining_ms / DAY_MS,
            hours: (remaining_ms % DAY_MS) / HOUR_MS,
            minutes: (remaining_ms % HOUR_MS) / MINUTE_MS,
            seconds: (remaining_ms % MINUTE_MS) / SECOND_MS,
        })
    }

    pub fn values(&self) -> [i64; 4] {
        [self.days, self.hours, self.minutes, self.seconds]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Counting,
    Expired,
}

/// Counts down to `target_ms`. Expiry is terminal: later ticks read zero
/// even if the wall clock moves back before the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock {
    target_ms: i64,
    phase: Phase,
}

impl Clock {
    pub fn new(target_ms: i64) -> Self {
        Self { target_ms, phase: Phase::Counting }
    }

    pub fn tick(&mut self, now_ms: i64) -> Breakdown {
        if self.phase == Phase::Expired {
            return Breakdown::ZERO;
        }
        match Breakdown::from_remaining(self.target_ms - now_ms) {
            Some(breakdown) => breakdown,
            None => {
                self.phase = Phase::Expired;
                Breakdown::ZERO
            }
        }
    }

    pub fn is_expired(&self) -> bool {
        self.phase == Phase::Expired
    }
}

pub fn pad(value: i64) -> String {
    format!("{:02}", value)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    /// Live ticking countdown.
    Full,
    /// Static launch date card.
    Compact,
}

impl DisplayMode {
    pub fn select(viewport_width: f64, user_agent: &str, breakpoint_px: f64) -> Self {
        if viewport_width < breakpoint_px || dom::is_mobile_agent(user_agent) {
            DisplayMode::Compact
        } else {
            DisplayMode::Full
        }
    }
}

/// Date and time lines of the launch card.
pub fn launch_labels<Tz>(launch_at: &DateTime<Tz>) -> (String, String)
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    (
        launch_at.format("%B %-d, %Y").to_string(),
        launch_at.format("%H:%M (UTC%:z)").to_string(),
    )
}

struct State {
    launch_at: DateTime<Utc>,
    breakpoint_px: f64,
    fields: Vec<Element>,
    live: Option<Element>,
    card: RefCell<Option<AppHandle<LaunchCard>>>,
    interval: RefCell<Option<Interval>>,
    clock: Cell<Clock>,
    mode: Cell<DisplayMode>,
}

/// Owns the single tick interval; cloning shares the same countdown.
#[derive(Clone)]
pub struct Countdown {
    state: Rc<State>,
}

impl Countdown {
    fn new(config: &SiteConfig, fields: Vec<Element>, live: Option<Element>) -> Self {
        Self {
            state: Rc::new(State {
                launch_at: config.launch_at,
                breakpoint_px: config.compact_breakpoint_px,
                fields,
                live,
                card: RefCell::new(None),
                interval: RefCell::new(None),
                clock: Cell::new(Clock::new(config.launch_at.timestamp_millis())),
                mode: Cell::new(DisplayMode::Full),
            }),
        }
    }

    /// Renders now and ticks every second. Any previous interval is dropped
    /// first, so calling this twice never leaves two ticks running.
    pub fn start(&self) {
        self.stop();
        if self.state.mode.get() == DisplayMode::Compact {
            return;
        }
        if self.state.clock.get().is_expired() {
            self.render(Breakdown::ZERO);
            return;
        }
        if !self.tick() {
            return;
        }
        let state = Rc::downgrade(&self.state);
        let interval = Interval::new(TICK_MS, move || {
            if let Some(state) = state.upgrade() {
                Countdown { state }.tick();
            }
        });
        *self.state.interval.borrow_mut() = Some(interval);
    }

    pub fn stop(&self) {
        let interval = self.state.interval.borrow_mut().take();
        drop(interval);
    }

    /// Recomputes immediately, e.g. after a background tab was throttled.
    pub fn refresh(&self) {
        if self.state.mode.get() == DisplayMode::Full {
            self.start();
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.interval.borrow().is_some()
    }

    fn tick(&self) -> bool {
        let mut clock = self.state.clock.get();
        let breakdown = clock.tick(Date::now() as i64);
        self.state.clock.set(clock);
        self.render(breakdown);
        if clock.is_expired() {
            self.expire();
            return false;
        }
        true
    }

    fn expire(&self) {
        // Called from inside the interval callback; drop the handle after it returns.
        if let Some(interval) = self.state.interval.borrow_mut().take() {
            spawn_local(async move { drop(interval) });
        }
        debug!("Countdown reached launch time");
    }

    fn render(&self, breakdown: Breakdown) {
        for (field, value) in self.state.fields.iter().zip(breakdown.values()) {
            field.set_text_content(Some(&pad(value)));
        }
    }

    fn current_mode(&self) -> DisplayMode {
        if self.state.live.is_none() {
            return DisplayMode::Full;
        }
        let Ok(window) = dom::window() else {
            return DisplayMode::Full;
        };
        let width = window
            .inner_width()
            .ok()
            .and_then(|w| w.as_f64())
            .unwrap_or(f64::MAX);
        let user_agent = window.navigator().user_agent().unwrap_or_default();
        DisplayMode::select(width, &user_agent, self.state.breakpoint_px)
    }

    fn apply_mode(&self, mode: DisplayMode) {
        self.state.mode.set(mode);
        match mode {
            DisplayMode::Full => {
                self.hide_card();
                if let Some(live) = &self.state.live {
                    let _ = live.class_list().remove_1(HIDDEN);
                }
                self.start();
            }
            DisplayMode::Compact => {
                self.stop();
                if let Some(live) = &self.state.live {
                    let _ = live.class_list().add_1(HIDDEN);
                }
                if let Err(e) = self.show_card() {
                    warn!("Could not show launch card: {}", e);
                }
            }
        }
        debug!("Countdown display mode: {:?}", mode);
    }

    fn on_resize(&self) {
        let mode = self.current_mode();
        if mode != self.state.mode.get() {
            self.apply_mode(mode);
        }
    }

    fn card_host(&self) -> PageResult<Element> {
        if let Some(host) = dom::by_id::<Element>(CARD_ID) {
            return Ok(host);
        }
        let host = dom::document()?.create_element("div")?;
        host.set_id(CARD_ID);
        if let Some(live) = &self.state.live {
            live.insert_adjacent_element("afterend", &host)?;
        }
        Ok(host)
    }

    fn show_card(&self) -> PageResult<()> {
        let host = self.card_host()?;
        if let Some(previous) = self.state.card.borrow_mut().take() {
            previous.destroy();
        }
        let (date, time) = launch_labels(&self.state.launch_at.with_timezone(&Local));
        let props = LaunchCardProps { date, time, launched: self.state.clock.get().is_expired() };
        let _ = host.class_list().remove_1(HIDDEN);
        let handle = yew::Renderer::<LaunchCard>::with_root_and_props(host, props).render();
        *self.state.card.borrow_mut() = Some(handle);
        Ok(())
    }

    fn hide_card(&self) {
        if let Some(handle) = self.state.card.borrow_mut().take() {
            handle.destroy();
        }
        if let Some(host) = dom::by_id::<Element>(CARD_ID) {
            let _ = host.class_list().add_1(HIDDEN);
        }
    }
}

pub fn init(config: &SiteConfig) -> PageResult<()> {
    let fields: Option<Vec<Element>> = FIELD_IDS.iter().map(|id| dom::by_id::<Element>(id)).collect();
    let Some(fields) = fields else {
        warn!("Countdown elements missing, countdown disabled");
        return Ok(());
    };

    let countdown = Countdown::new(config, fields, dom::by_id::<Element>(LIVE_ID));
    countdown.apply_mode(countdown.current_mode());

    let window = dom::window()?;
    for event in ["resize", "orientationchange"] {
        let countdown = countdown.clone();
        dom::listen(&window, event, move |_| countdown.on_resize())?;
    }
    for event in ["focus", "pageshow"] {
        let countdown = countdown.clone();
        dom::listen(&window, event, move |_| countdown.refresh())?;
    }
    {
        let countdown = countdown.clone();
        let document = dom::document()?;
        let target = document.clone();
        dom::listen(&target, "visibilitychange", move |_| {
            if document.visibility_state() == VisibilityState::Visible {
                countdown.refresh();
            }
        })?;
    }
    for event in STOP_EVENTS {
        let countdown = countdown.clone();
        dom::listen(&window, event, move |_| countdown.stop())?;
    }

    debug!("Countdown running: {}", countdown.is_running());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recompose(b: Breakdown) -> i64 {
        b.days * DAY_MS + b.hours * HOUR_MS + b.minutes * MINUTE_MS + b.seconds * SECOND_MS
    }

    #[test]
    fn breakdown_recomposes_to_remaining_time() {
        for remaining in [1, 999, 1000, 59_999, 3_600_000, 86_399_999, 86_400_000, 3_456_789_012] {
            let b = Breakdown::from_remaining(remaining).unwrap();
            let rest = remaining - recompose(b);
            assert!((0..1000).contains(&rest), "remainder {} for {}", rest, remaining);
            assert!((0..24).contains(&b.hours));
            assert!((0..60).contains(&b.minutes));
            assert!((0..60).contains(&b.seconds));
            assert!(b.days >= 0);
        }
    }

    #[test]
    fn breakdown_of_a_known_duration() {
        let remaining = 3 * DAY_MS + 4 * HOUR_MS + 5 * MINUTE_MS + 6 * SECOND_MS + 789;
        assert_eq!(
            Breakdown::from_remaining(remaining),
            Some(Breakdown { days: 3, hours: 4, minutes: 5, seconds: 6 })
        );
    }

    #[test]
    fn nothing_left_is_expired() {
        assert_eq!(Breakdown::from_remaining(0), None);
        assert_eq!(Breakdown::from_remaining(-1), None);
        assert_eq!(Breakdown::from_remaining(-DAY_MS), None);
    }

    #[test]
    fn clock_counts_down_until_the_target() {
        let mut clock = Clock::new(10 * SECOND_MS);
        assert_eq!(clock.tick(0), Breakdown { days: 0, hours: 0, minutes: 0, seconds: 10 });
        assert_eq!(clock.tick(9_500), Breakdown::ZERO);
        assert!(!clock.is_expired());
        assert_eq!(clock.tick(10 * SECOND_MS), Breakdown::ZERO);
        assert!(clock.is_expired());
    }

    #[test]
    fn expiry_is_terminal() {
        let mut clock = Clock::new(DAY_MS);
        clock.tick(DAY_MS + 1);
        assert!(clock.is_expired());
        for now in [DAY_MS + 2, DAY_MS, 0, -DAY_MS] {
            assert_eq!(clock.tick(now), Breakdown::ZERO);
            assert!(clock.is_expired());
        }
    }

    #[test]
    fn only_pagehide_stops_the_countdown() {
        assert_eq!(STOP_EVENTS, ["pagehide"]);
    }

    #[test]
    fn expired_fields_render_as_double_zero() {
        assert!(Breakdown::ZERO.values().iter().all(|v| pad(*v) == "00"));
    }

    #[test]
    fn values_are_padded_to_two_digits() {
        assert_eq!(pad(0), "00");
        assert_eq!(pad(7), "07");
        assert_eq!(pad(42), "42");
        assert_eq!(pad(365), "365");
    }

    #[test]
    fn small_or_mobile_viewports_are_compact() {
        let desktop = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/126.0";
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X)";
        assert_eq!(DisplayMode::select(1280.0, desktop, 768.0), DisplayMode::Full);
        assert_eq!(DisplayMode::select(768.0, desktop, 768.0), DisplayMode::Full);
        assert_eq!(DisplayMode::select(767.0, desktop, 768.0), DisplayMode::Compact);
        assert_eq!(DisplayMode::select(1024.0, iphone, 768.0), DisplayMode::Compact);
    }

    #[test]
    fn launch_card_labels() {
        let launch = Utc.with_ymd_and_hms(2025, 11, 22, 10, 0, 0).unwrap();
        let (date, time) = launch_labels(&launch);
        assert_eq!(date, "November 22, 2025");
        assert_eq!(time, "10:00 (UTC+00:00)");
    }
}
