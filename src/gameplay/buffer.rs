//! Per-session spin storage
//!
//! Each session owns an append-only list of spins in arrival order. Appends to
//! one session take that session's shard lock, so they are never reordered;
//! unrelated sessions proceed independently.

use dashmap::DashMap;

use super::models::SpinEvent;

#[derive(Debug, Default)]
pub struct SpinBuffer {
    sessions: DashMap<String, Vec<SpinEvent>>,
}

impl SpinBuffer {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Append a spin to its session, creating the session on first spin
    pub fn push(&self, event: SpinEvent) {
        self.sessions
            .entry(event.session_id.clone())
            .or_default()
            .push(event);
    }

    /// Run `f` over the session's spins without copying them.
    /// Returns `None` when the session is unknown or empty.
    pub fn with_spins<R>(&self, session_id: &str, f: impl FnOnce(&[SpinEvent]) -> R) -> Option<R> {
        let spins = self.sessions.get(session_id)?;
        if spins.is_empty() {
            return None;
        }
        Some(f(spins.as_slice()))
    }

    /// Drop a finished session. Returns the number of spins released.
    pub fn clear(&self, session_id: &str) -> usize {
        self.sessions
            .remove(session_id)
            .map(|(_, spins)| spins.len())
            .unwrap_or(0)
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spin(session: &str, ts: i64) -> SpinEvent {
        SpinEvent {
            timestamp: ts,
            session_id: session.to_string(),
            casino_id: "acme".to_string(),
            game_id: "default".to_string(),
            user_id: "u1".to_string(),
            bet: 1.0,
            payout: 0.0,
            symbols: None,
            bonus_round: None,
            free_spins: None,
            multiplier: None,
        }
    }

    #[test]
    fn test_push_preserves_arrival_order() {
        let buffer = SpinBuffer::new();
        for ts in [3, 1, 2] {
            buffer.push(spin("s1", ts));
        }
        let order = buffer.with_spins("s1", |spins| {
            spins.iter().map(|s| s.timestamp).collect::<Vec<_>>()
        });
        assert_eq!(order, Some(vec![3, 1, 2]));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let buffer = SpinBuffer::new();
        buffer.push(spin("s1", 1));
        buffer.push(spin("s2", 1));
        buffer.push(spin("s2", 2));

        assert_eq!(buffer.with_spins("s1", |spins| spins.len()), Some(1));
        assert_eq!(buffer.with_spins("s2", |spins| spins.len()), Some(2));
        assert_eq!(buffer.clear("s2"), 2);
        assert!(buffer.with_spins("s2", |spins| spins.len()).is_none());
        assert_eq!(buffer.session_ids(), vec!["s1".to_string()]);
    }

    #[test]
    fn test_with_spins_on_unknown_session() {
        let buffer = SpinBuffer::new();
        assert!(buffer.with_spins("missing", |spins| spins.len()).is_none());
    }
}
