//! Session statistics calculator
//!
//! Pure aggregation over a session's spins. Calling it twice on the same
//! slice yields identical results.

use statrs::statistics::Statistics;

use super::models::{SessionStats, SpinEvent, StreakStats, StreakType};

/// Aggregate RTP for a run of spins (0 when nothing was wagered)
pub fn rtp_for_spins(spins: &[SpinEvent]) -> f64 {
    let wagered: f64 = spins.iter().map(|s| s.bet).sum();
    let paid: f64 = spins.iter().map(|s| s.payout).sum();
    if wagered > 0.0 {
        paid / wagered
    } else {
        0.0
    }
}

/// Population variance of per-spin relative returns. Empty input yields 0.
pub fn return_variance(spins: &[SpinEvent]) -> f64 {
    if spins.is_empty() {
        return 0.0;
    }
    spins
        .iter()
        .map(SpinEvent::relative_return)
        .collect::<Vec<f64>>()
        .population_variance()
}

pub fn calculate_session_stats(session_id: &str, spins: &[SpinEvent]) -> Option<SessionStats> {
    let first = spins.first()?;
    let last = spins.last()?;

    let total_wagered: f64 = spins.iter().map(|s| s.bet).sum();
    let total_payout: f64 = spins.iter().map(|s| s.payout).sum();
    let actual_rtp = if total_wagered > 0.0 {
        total_payout / total_wagered
    } else {
        0.0
    };

    let mut biggest_win = 0.0_f64;
    let mut biggest_loss = 0.0_f64;
    let mut current_streak = 0u32;
    let mut current_type = StreakType::None;
    let mut longest_win = 0u32;
    let mut longest_loss = 0u32;

    for spin in spins {
        let net = spin.net();
        biggest_win = biggest_win.max(net);
        biggest_loss = biggest_loss.max(-net);

        if net > 0.0 {
            if current_type == StreakType::Win {
                current_streak += 1;
            } else {
                current_type = StreakType::Win;
                current_streak = 1;
            }
            longest_win = longest_win.max(current_streak);
        } else if net < 0.0 {
            if current_type == StreakType::Loss {
                current_streak += 1;
            } else {
                current_type = StreakType::Loss;
                current_streak = 1;
            }
            longest_loss = longest_loss.max(current_streak);
        } else {
            // a push breaks any streak
            current_streak = 0;
            current_type = StreakType::None;
        }
    }

    Some(SessionStats {
        session_id: session_id.to_string(),
        user_id: first.user_id.clone(),
        casino_id: first.casino_id.clone(),
        game_id: first.game_id.clone(),
        start_time: first.timestamp,
        end_time: last.timestamp,
        total_spins: spins.len(),
        total_wagered,
        total_payout,
        actual_rtp,
        biggest_win,
        biggest_loss,
        streaks: StreakStats {
            longest_win_streak: longest_win,
            longest_loss_streak: longest_loss,
            current_streak,
            current_streak_type: current_type,
        },
        volatility: return_variance(spins).sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spin(bet: f64, payout: f64) -> SpinEvent {
        SpinEvent {
            timestamp: 0,
            session_id: "s1".to_string(),
            casino_id: "acme".to_string(),
            game_id: "default".to_string(),
            user_id: "u1".to_string(),
            bet,
            payout,
            symbols: None,
            bonus_round: None,
            free_spins: None,
            multiplier: None,
        }
    }

    #[test]
    fn test_empty_session_has_no_stats() {
        assert!(calculate_session_stats("s1", &[]).is_none());
    }

    #[test]
    fn test_totals_and_rtp() {
        let spins = vec![spin(1.0, 0.0), spin(1.0, 3.0), spin(2.0, 1.0)];
        let stats = calculate_session_stats("s1", &spins).unwrap();

        assert_eq!(stats.total_spins, 3);
        assert!((stats.total_wagered - 4.0).abs() < 1e-9);
        assert!((stats.total_payout - 4.0).abs() < 1e-9);
        assert!((stats.actual_rtp - 1.0).abs() < 1e-9);
        assert!((stats.biggest_win - 2.0).abs() < 1e-9);
        assert!((stats.biggest_loss - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_streak_tracking() {
        let spins = vec![
            spin(1.0, 0.0),
            spin(1.0, 0.0),
            spin(1.0, 0.0),
            spin(1.0, 2.0),
            spin(1.0, 2.0),
            spin(1.0, 0.0),
        ];
        let stats = calculate_session_stats("s1", &spins).unwrap();

        assert_eq!(stats.streaks.longest_loss_streak, 3);
        assert_eq!(stats.streaks.longest_win_streak, 2);
        assert_eq!(stats.streaks.current_streak, 1);
        assert_eq!(stats.streaks.current_streak_type, StreakType::Loss);
    }

    #[test]
    fn test_push_resets_streak() {
        let spins = vec![spin(1.0, 2.0), spin(1.0, 1.0)];
        let stats = calculate_session_stats("s1", &spins).unwrap();
        assert_eq!(stats.streaks.current_streak, 0);
        assert_eq!(stats.streaks.current_streak_type, StreakType::None);
    }

    #[test]
    fn test_volatility_of_constant_returns_is_zero() {
        let spins = vec![spin(1.0, 0.5); 10];
        let stats = calculate_session_stats("s1", &spins).unwrap();
        assert!(stats.volatility.abs() < 1e-12);
    }

    #[test]
    fn test_rtp_for_spins_without_wager() {
        assert_eq!(rtp_for_spins(&[]), 0.0);
    }
}
