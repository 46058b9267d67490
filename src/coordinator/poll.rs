//! Bounded backoff schedule for callers that lost the lock race.

use crate::config::PollSettings;
use std::time::Duration;

/// `max_rounds` delays starting at `initial_delay`, each multiplied by
/// `multiplier` and capped at `max_delay`
#[derive(Debug, Clone, PartialEq)]
pub struct PollSchedule {
    max_rounds: u32,
    initial_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
}

impl PollSchedule {
    pub fn new(max_rounds: u32, initial_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            max_rounds,
            initial_delay,
            multiplier: multiplier.max(1.0),
            max_delay: max_delay.max(initial_delay),
        }
    }

    /// Same delay every round
    pub fn fixed(max_rounds: u32, delay: Duration) -> Self {
        Self::new(max_rounds, delay, 1.0, delay)
    }

    pub fn from_settings(settings: &PollSettings) -> Self {
        Self::new(
            settings.max_rounds,
            settings.initial_delay(),
            settings.multiplier,
            settings.max_delay(),
        )
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Delay before the lookup of `round` (zero-based)
    pub fn delay_for(&self, round: u32) -> Duration {
        let factor = self.multiplier.powi(i32::try_from(round).unwrap_or(i32::MAX));
        let millis = self.initial_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_rounds).map(move |round| self.delay_for(round))
    }

    /// Total time spent sleeping when every round comes up empty
    pub fn total_delay(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::from_settings(&PollSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_fixed_half_second_five_rounds() {
        let schedule = PollSchedule::default();
        assert_eq!(schedule.max_rounds(), 5);
        assert!(schedule.delays().all(|d| d == Duration::from_millis(500)));
        assert_eq!(schedule.total_delay(), Duration::from_millis(2_500));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let schedule = PollSchedule::new(
            6,
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(1_000),
        );
        let delays: Vec<u64> = schedule.delays().map(|d| d.as_millis() as u64).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
    }

    #[test]
    fn test_multiplier_below_one_is_treated_as_fixed() {
        let schedule = PollSchedule::new(3, Duration::from_millis(50), 0.5, Duration::from_millis(10));
        assert!(schedule.delays().all(|d| d == Duration::from_millis(50)));
    }

    #[test]
    fn test_zero_rounds_never_sleeps() {
        let schedule = PollSchedule::fixed(0, Duration::from_secs(1));
        assert_eq!(schedule.delays().count(), 0);
        assert_eq!(schedule.total_delay(), Duration::ZERO);
    }
}
