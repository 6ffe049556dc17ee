//! Statistics over a retrieved history window.

use serde::Serialize;

use crate::db::{ServerStatus, StatusObservation};

/// Aggregated statistics for one server over a time window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub online_count: usize,
    pub offline_count: usize,
    /// Percentage of observations that found the server online, 0-100.
    pub uptime_rate: f64,
    pub avg_players: f64,
    pub max_players: i64,
    pub min_players: i64,
    pub avg_response_ms: f64,
    pub max_response_ms: f64,
    pub min_response_ms: f64,
}

/// Summarize a history window. Pure and deterministic; an empty window
/// yields an all-zero summary.
pub fn summarize(history: &[StatusObservation]) -> Summary {
    let total = history.len();
    let online_count = history
        .iter()
        .filter(|o| o.status == ServerStatus::Online)
        .count();
    let offline_count = total - online_count;
    let uptime_rate = if total > 0 {
        online_count as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    // Player stats only make sense for observations that saw the server up.
    let players: Vec<i64> = history
        .iter()
        .filter(|o| o.status == ServerStatus::Online)
        .filter_map(|o| o.online_players)
        .collect();
    let (avg_players, max_players, min_players) = if players.is_empty() {
        (0.0, 0, 0)
    } else {
        (
            players.iter().sum::<i64>() as f64 / players.len() as f64,
            players.iter().copied().max().unwrap_or(0),
            players.iter().copied().min().unwrap_or(0),
        )
    };

    // Response times count whenever one was measured, regardless of status.
    let responses: Vec<f64> = history.iter().filter_map(|o| o.response_time_ms).collect();
    let (avg_response_ms, max_response_ms, min_response_ms) = if responses.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        (
            responses.iter().sum::<f64>() / responses.len() as f64,
            responses.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            responses.iter().cloned().fold(f64::INFINITY, f64::min),
        )
    };

    Summary {
        total,
        online_count,
        offline_count,
        uptime_rate,
        avg_players,
        max_players,
        min_players,
        avg_response_ms,
        max_response_ms,
        min_response_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::ServerAddress;
    use chrono::{Duration, Utc};

    fn addr() -> ServerAddress {
        ServerAddress::new("mc.example.com", 25565)
    }

    fn history(player_counts: &[i64], offline: usize) -> Vec<StatusObservation> {
        let base = Utc::now();
        let mut rows = Vec::new();
        for (i, players) in player_counts.iter().enumerate() {
            rows.push(StatusObservation::online(
                &addr(),
                base + Duration::minutes(i as i64),
                *players,
                50.0 + i as f64,
            ));
        }
        for i in 0..offline {
            rows.push(StatusObservation::offline(
                &addr(),
                base + Duration::minutes((player_counts.len() + i) as i64),
                "timed out",
            ));
        }
        rows
    }

    #[test]
    fn mixed_history() {
        let summary = summarize(&history(&[4, 6, 8, 5, 7, 9], 4));
        assert_eq!(summary.total, 10);
        assert_eq!(summary.online_count, 6);
        assert_eq!(summary.offline_count, 4);
        assert_eq!(summary.uptime_rate, 60.0);
        assert_eq!(summary.avg_players, 6.5);
        assert_eq!(summary.max_players, 9);
        assert_eq!(summary.min_players, 4);
        assert_eq!(summary.min_response_ms, 50.0);
        assert_eq!(summary.max_response_ms, 55.0);
    }

    #[test]
    fn all_offline_history_defaults_to_zero() {
        let summary = summarize(&history(&[], 5));
        assert_eq!(summary.total, 5);
        assert_eq!(summary.uptime_rate, 0.0);
        assert_eq!(summary.avg_players, 0.0);
        assert_eq!(summary.max_players, 0);
        assert_eq!(summary.min_players, 0);
        assert_eq!(summary.avg_response_ms, 0.0);
    }

    #[test]
    fn empty_history_is_all_zero() {
        assert_eq!(summarize(&[]), Summary::default());
    }

    #[test]
    fn player_stats_skip_rows_without_counts() {
        let base = Utc::now();
        let mut rows = history(&[10], 0);
        // An online row that failed before player data was parsed.
        let mut partial = StatusObservation::online(&addr(), base, 0, 12.0);
        partial.online_players = None;
        rows.push(partial);

        let summary = summarize(&rows);
        assert_eq!(summary.avg_players, 10.0);
        assert_eq!(summary.max_players, 10);
        // Both response times still count.
        assert_eq!(summary.min_response_ms, 12.0);
    }
}
