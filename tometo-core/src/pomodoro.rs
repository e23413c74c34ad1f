//! Pomodoro focus timer as a finite state machine.
//!
//! State is `{Work, ShortBreak, LongBreak} x {running, paused}` plus the
//! seconds left in the current phase. The timer is driven by one `tick()` per
//! second; it never reads a clock itself.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        !matches!(self, Phase::Work)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Work => "Work",
            Phase::ShortBreak => "Short break",
            Phase::LongBreak => "Long break",
        };
        f.pad(s)
    }
}

/// Phase lengths in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    pub work_secs: u32,
    pub short_break_secs: u32,
    pub long_break_secs: u32,
    /// A long break follows every Nth completed work session.
    pub long_break_every: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
            long_break_every: 4,
        }
    }
}

impl TimerSettings {
    pub fn from_minutes(work: u32, short_break: u32, long_break: u32, long_break_every: u32) -> Self {
        Self {
            work_secs: work.saturating_mul(60),
            short_break_secs: short_break.saturating_mul(60),
            long_break_secs: long_break.saturating_mul(60),
            long_break_every: long_break_every.max(1),
        }
    }

    pub fn length(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_secs,
            Phase::ShortBreak => self.short_break_secs,
            Phase::LongBreak => self.long_break_secs,
        }
    }
}

/// Emitted when a phase runs out (or is skipped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseComplete {
    pub finished: Phase,
    pub next: Phase,
    pub session_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomodoroTimer {
    settings: TimerSettings,
    phase: Phase,
    remaining_secs: u32,
    running: bool,
    session_count: u32,
}

impl Default for PomodoroTimer {
    fn default() -> Self {
        Self::new(TimerSettings::default())
    }
}

impl PomodoroTimer {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            settings,
            phase: Phase::Work,
            remaining_secs: settings.work_secs,
            running: false,
            session_count: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn session_count(&self) -> u32 {
        self.session_count
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) {
        self.running = !self.running;
    }

    /// Back to a paused, full-length work phase. Completed sessions are kept.
    pub fn reset(&mut self) {
        self.running = false;
        self.phase = Phase::Work;
        self.remaining_secs = self.settings.work_secs;
    }

    /// Advance one second. Paused timers do not move.
    pub fn tick(&mut self) -> Option<PhaseComplete> {
        if !self.running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            Some(self.complete_phase())
        } else {
            None
        }
    }

    /// Finish the current phase now and move to the next one, paused.
    pub fn complete_phase(&mut self) -> PhaseComplete {
        let finished = self.phase;
        self.running = false;

        let next = match finished {
            Phase::Work => {
                self.session_count += 1;
                if self.session_count % self.settings.long_break_every.max(1) == 0 {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Phase::Work,
        };

        self.phase = next;
        self.remaining_secs = self.settings.length(next);

        PhaseComplete {
            finished,
            next,
            session_count: self.session_count,
        }
    }

    /// Percent of the current phase elapsed, 0.0..=100.0.
    pub fn progress(&self) -> f64 {
        let total = self.settings.length(self.phase);
        if total == 0 {
            return 100.0;
        }
        let elapsed = total.saturating_sub(self.remaining_secs);
        f64::from(elapsed) / f64::from(total) * 100.0
    }

    pub fn format_remaining(&self) -> String {
        format_clock(self.remaining_secs)
    }

    /// Total focus time from completed work sessions.
    pub fn focus_minutes(&self) -> u32 {
        self.session_count.saturating_mul(self.settings.work_secs) / 60
    }
}

/// `MM:SS`, minutes not capped at 59.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short() -> TimerSettings {
        TimerSettings {
            work_secs: 3,
            short_break_secs: 2,
            long_break_secs: 4,
            long_break_every: 2,
        }
    }

    fn run_out(t: &mut PomodoroTimer) -> PhaseComplete {
        t.start();
        loop {
            if let Some(done) = t.tick() {
                return done;
            }
        }
    }

    #[test]
    fn test_paused_timer_does_not_tick() {
        let mut t = PomodoroTimer::default();
        assert_eq!(t.tick(), None);
        assert_eq!(t.remaining_secs(), 25 * 60);
        assert_eq!(t.format_remaining(), "25:00");
    }

    #[test]
    fn test_work_then_short_then_long_break() {
        let mut t = PomodoroTimer::new(short());

        let done = run_out(&mut t);
        assert_eq!(done, PhaseComplete { finished: Phase::Work, next: Phase::ShortBreak, session_count: 1 });
        assert!(!t.is_running());
        assert_eq!(t.remaining_secs(), 2);

        let done = run_out(&mut t);
        assert_eq!(done.next, Phase::Work);
        assert_eq!(done.session_count, 1);

        let done = run_out(&mut t);
        assert_eq!(done.next, Phase::LongBreak);
        assert_eq!(t.remaining_secs(), 4);
        assert_eq!(t.focus_minutes(), 0);
    }

    #[test]
    fn test_pause_freezes_and_start_resumes() {
        let mut t = PomodoroTimer::new(short());
        t.start();
        assert_eq!(t.tick(), None);
        t.pause();
        assert!(!t.is_running());
        assert_eq!(t.tick(), None);
        assert_eq!(t.tick(), None);
        assert_eq!(t.remaining_secs(), 2);

        t.start();
        assert_eq!(t.tick(), None);
        let done = t.tick().unwrap();
        assert_eq!(done.finished, Phase::Work);
        assert_eq!(t.session_count(), 1);
    }

    #[test]
    fn test_huge_settings_saturate() {
        let settings = TimerSettings::from_minutes(u32::MAX, u32::MAX, u32::MAX, 0);
        assert_eq!(settings.work_secs, u32::MAX);
        assert_eq!(settings.long_break_every, 1);
        let mut t = PomodoroTimer::new(settings);
        t.complete_phase();
        t.complete_phase();
        t.complete_phase();
        assert_eq!(t.session_count(), 2);
        assert_eq!(t.focus_minutes(), u32::MAX / 60);
    }

    #[test]
    fn test_reset_keeps_sessions() {
        let mut t = PomodoroTimer::new(short());
        run_out(&mut t);
        t.start();
        t.tick();
        t.reset();
        assert_eq!(t.phase(), Phase::Work);
        assert_eq!(t.remaining_secs(), 3);
        assert!(!t.is_running());
        assert_eq!(t.session_count(), 1);
    }

    #[test]
    fn test_progress_and_format() {
        let mut t = PomodoroTimer::default();
        t.start();
        for _ in 0..(5 * 60) {
            t.tick();
        }
        assert!((t.progress() - 20.0).abs() < 1e-9);
        assert_eq!(t.format_remaining(), "20:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(100 * 60), "100:00");
    }

    #[test]
    fn test_skipping_work_counts_a_session() {
        let mut t = PomodoroTimer::default();
        t.toggle();
        let done = t.complete_phase();
        assert_eq!(done.finished, Phase::Work);
        assert_eq!(t.session_count(), 1);
        assert_eq!(t.focus_minutes(), 25);
        assert!(t.phase().is_break());
    }
}
