//! Cooperative scheduling of the periodic activities that drive a board.
//!
//! Nothing here sleeps or reads the clock by itself; the caller passes `now`
//! in, which keeps the schedule deterministic under test.

use std::time::{Duration, Instant};

use crate::emulator::config::{check_frequency, Frequencies};
use crate::emulator::error::Result;

/// A schedule that fell further behind than this skips ahead instead of catching up.
const MAX_LAG: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Cycle,
    DelayTick,
    SoundTick,
    Render,
}

impl Activity {
    pub fn name(self) -> &'static str {
        match self {
            Activity::Cycle => "cpu",
            Activity::DelayTick => "delay timer",
            Activity::SoundTick => "sound timer",
            Activity::Render => "render",
        }
    }
}

/// One activity repeating at a fixed frequency.
#[derive(Debug, Clone)]
pub struct Periodic {
    activity: Activity,
    frequency: f64,
    period: Duration,
    next_due: Option<Instant>,
}

impl Periodic {
    pub fn new(activity: Activity, frequency: f64) -> Result<Periodic> {
        let period = check_frequency(activity.name(), frequency)?;
        Ok(Periodic { activity, frequency, period, next_due: None })
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// First run one period from `now`. Does nothing if already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        self.next_due = Some(now + self.period);
        true
    }

    /// Returns whether it was running.
    pub fn stop(&mut self) -> bool {
        self.next_due.take().is_some()
    }

    /// Change the rate, keeping the time of the last run as the phase.
    pub fn set_frequency(&mut self, frequency: f64) -> Result<()> {
        let period = check_frequency(self.activity.name(), frequency)?;
        if let Some(next_due) = self.next_due {
            self.next_due = Some(next_due.checked_sub(self.period).unwrap_or(next_due) + period);
        }
        log::debug!("{} frequency {} Hz -> {} Hz", self.activity.name(), self.frequency, frequency);
        self.frequency = frequency;
        self.period = period;
        Ok(())
    }

    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.next_due, Some(next_due) if next_due <= now)
    }

    /// Move on to the next period after a run.
    fn advance(&mut self, now: Instant) {
        if let Some(next_due) = self.next_due {
            let next_due = next_due + self.period;
            if now.saturating_duration_since(next_due) > MAX_LAG {
                log::debug!("{} schedule fell behind, skipping ahead", self.activity.name());
                self.next_due = Some(now + self.period);
            } else {
                self.next_due = Some(next_due);
            }
        }
    }
}

/// All the activities of one board.
#[derive(Debug, Clone)]
pub struct Scheduler {
    schedules: Vec<Periodic>,
}

impl Scheduler {
    /// Schedules for every configured frequency. Render is left out when it has none.
    pub fn new(frequencies: &Frequencies) -> Result<Scheduler> {
        let mut schedules = vec![
            Periodic::new(Activity::Cycle, frequencies.cpu)?,
            Periodic::new(Activity::DelayTick, frequencies.delay)?,
            Periodic::new(Activity::SoundTick, frequencies.sound)?,
        ];
        if let Some(render) = frequencies.render {
            schedules.push(Periodic::new(Activity::Render, render)?);
        }
        Ok(Scheduler { schedules })
    }

    fn schedule(&self, activity: Activity) -> Option<&Periodic> {
        self.schedules.iter().find(|schedule| schedule.activity == activity)
    }

    fn schedule_mut(&mut self, activity: Activity) -> Option<&mut Periodic> {
        self.schedules.iter_mut().find(|schedule| schedule.activity == activity)
    }

    pub fn frequency(&self, activity: Activity) -> Option<f64> {
        self.schedule(activity).map(Periodic::frequency)
    }

    /// Change the rate of an activity, adding it if it had none.
    pub fn set_frequency(&mut self, activity: Activity, frequency: f64, now: Instant) -> Result<()> {
        match self.schedule_mut(activity) {
            Some(schedule) => schedule.set_frequency(frequency),
            None => {
                let mut schedule = Periodic::new(activity, frequency)?;
                schedule.start(now);
                self.schedules.push(schedule);
                Ok(())
            }
        }
    }

    pub fn start(&mut self, now: Instant) {
        for schedule in self.schedules.iter_mut() {
            schedule.start(now);
        }
    }

    pub fn stop(&mut self) {
        for schedule in self.schedules.iter_mut() {
            schedule.stop();
        }
    }

    /// When the next activity accepted by `filter` is due.
    pub fn next_due<F: Fn(Activity) -> bool>(&self, filter: F) -> Option<Instant> {
        self.schedules
            .iter()
            .filter(|schedule| filter(schedule.activity))
            .filter_map(Periodic::next_due)
            .min()
    }

    /// Take the most overdue activity accepted by `filter`, if any is due at `now`.
    pub fn pop_due<F: Fn(Activity) -> bool>(&mut self, now: Instant, filter: F) -> Option<Activity> {
        let schedule = self
            .schedules
            .iter_mut()
            .filter(|schedule| filter(schedule.activity) && schedule.is_due(now))
            .min_by_key(|schedule| schedule.next_due)?;
        schedule.advance(now);
        Some(schedule.activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::config::MAX_FREQUENCY;
    use crate::emulator::error::Error;
    use test_case::test_case;

    fn frequencies(render: Option<f64>) -> Frequencies {
        Frequencies { cpu: 500.0, delay: 60.0, sound: 60.0, render }
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(-1.0 ; "negative")]
    #[test_case(1e12 ; "too fast to have a period")]
    #[test_case(1e-30 ; "too slow to have a period")]
    fn rejects_bad_frequencies(frequency: f64) {
        assert!(matches!(Periodic::new(Activity::Cycle, frequency), Err(Error::InvalidFrequency { .. })));
        let mut schedule = Periodic::new(Activity::Cycle, 10.0).unwrap();
        assert!(schedule.set_frequency(frequency).is_err());
        assert_eq!(10.0, schedule.frequency());
        assert!(Scheduler::new(&Frequencies { cpu: frequency, ..frequencies(None) }).is_err());
    }

    #[test]
    fn fastest_schedule_drains() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new(&Frequencies { cpu: MAX_FREQUENCY, ..frequencies(None) }).unwrap();
        scheduler.start(now);
        let later = now + ms(1);
        let mut runs = 0;
        while scheduler.pop_due(later, |_| true).is_some() {
            runs += 1;
            assert!(runs <= 2000, "schedule never drains");
        }
        assert!(runs >= 999);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let now = Instant::now();
        let mut schedule = Periodic::new(Activity::DelayTick, 100.0).unwrap();
        assert!(schedule.start(now));
        assert!(!schedule.start(now + ms(5)));
        assert_eq!(Some(now + ms(10)), schedule.next_due());
        assert!(schedule.stop());
        assert!(!schedule.stop());
        assert!(!schedule.is_due(now + ms(50)));
    }

    #[test]
    fn live_frequency_change_keeps_phase() {
        let now = Instant::now();
        let mut schedule = Periodic::new(Activity::Cycle, 100.0).unwrap();
        schedule.start(now);
        schedule.set_frequency(50.0).unwrap();
        assert_eq!(Some(now + ms(20)), schedule.next_due());
        assert!(schedule.is_running());
    }

    #[test]
    fn interleaves_by_due_time() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new(&frequencies(None)).unwrap();
        scheduler.start(now);

        let mut ran = Vec::new();
        let later = now + ms(20);
        while let Some(activity) = scheduler.pop_due(later, |_| true) {
            ran.push(activity);
        }

        let cycles = ran.iter().filter(|&&activity| activity == Activity::Cycle).count();
        let delays = ran.iter().filter(|&&activity| activity == Activity::DelayTick).count();
        assert_eq!(10, cycles);
        assert_eq!(1, delays);
        assert!(!ran.contains(&Activity::Render));
    }

    #[test]
    fn filtered_activities_do_not_run() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new(&frequencies(Some(30.0))).unwrap();
        scheduler.start(now);
        let later = now + ms(40);
        assert_eq!(None, scheduler.pop_due(later, |_| false));
        assert_eq!(Some(now + ms(2)), scheduler.next_due(|activity| activity == Activity::Cycle));
        assert_eq!(
            Some(Activity::Render),
            scheduler.pop_due(later, |activity| activity == Activity::Render)
        );
    }

    #[test]
    fn render_can_be_added_later() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new(&frequencies(None)).unwrap();
        assert_eq!(None, scheduler.frequency(Activity::Render));
        scheduler.set_frequency(Activity::Render, 60.0, now).unwrap();
        assert_eq!(Some(60.0), scheduler.frequency(Activity::Render));
        assert!(scheduler.next_due(|activity| activity == Activity::Render).is_some());
    }

    #[test]
    fn far_behind_schedule_skips_ahead() {
        let now = Instant::now();
        let mut schedule = Periodic::new(Activity::Cycle, 1000.0).unwrap();
        schedule.start(now);
        let late = now + Duration::from_secs(1);
        schedule.advance(late);
        assert_eq!(Some(late + ms(1)), schedule.next_due());
    }
}
