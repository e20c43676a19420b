//! Transport lifecycle handlers: open, close, backoff, liveness

use tracing::{debug, warn};

use elmlink_client::socket::ConnectionId;

use crate::model::{Model, Status};

use super::{Cmd, UpdateResult};

/// Reconnect backoff: `min(1000 + 10·attempt², 60000)` milliseconds.
///
/// Front-loaded (the first retries are fast) and capped at one minute.
pub fn backoff_millis(attempt: u32) -> u64 {
    let attempt = u64::from(attempt);
    (1000 + 10 * attempt * attempt).min(60_000)
}

/// Transport finished its handshake
pub(crate) fn handle_socket_opened(model: &mut Model, id: ConnectionId) -> UpdateResult {
    if id != model.connection {
        debug!("ignoring open from stale {id}");
        return UpdateResult::none();
    }

    // Carry the overlay across the reconnect so compile errors stay
    // visible while the server re-reports status.
    let overlay = model.status.overlay().cloned();
    model.status = Status::busy(overlay);
    UpdateResult::command(Cmd::Render)
}

/// Transport closed or errored; always recoverable, never fatal
pub(crate) fn handle_socket_closed(model: &mut Model, id: ConnectionId) -> UpdateResult {
    if id != model.connection {
        debug!("ignoring close from stale {id}");
        return UpdateResult::none();
    }

    let attempt = match model.status {
        Status::Connecting { attempt } | Status::SleepingBeforeReconnect { attempt, .. } => {
            attempt + 1
        }
        _ => 1,
    };
    model.status = Status::sleeping(attempt);

    UpdateResult::commands(vec![
        Cmd::StopLivenessTimer,
        Cmd::SleepBeforeReconnect {
            attempt,
            millis: backoff_millis(attempt),
        },
        Cmd::Render,
    ])
}

/// The reconnect sleep finished, or the user forced a retry.
///
/// The backoff timer is never cancelled; instead the elapsed time is
/// re-checked here, so a manual "reconnect now" and a naturally firing
/// timer converge on the same code path.
pub(crate) fn handle_reconnect_attempt(model: &mut Model) -> UpdateResult {
    let &Status::SleepingBeforeReconnect { attempt, slept_at } = &model.status else {
        return UpdateResult::none();
    };

    let wait = backoff_millis(attempt);
    let elapsed = slept_at.elapsed().as_millis() as u64;
    if elapsed < wait {
        // Fired early (forced retry, or a sleep from an older attempt):
        // go back to sleep for the remainder.
        return UpdateResult::command(Cmd::SleepBeforeReconnect {
            attempt,
            millis: wait - elapsed,
        });
    }

    model.connection = model.connection.next();
    model.status = Status::Connecting { attempt };
    UpdateResult::commands(vec![
        Cmd::OpenConnection {
            id: model.connection,
            attempt,
        },
        Cmd::Render,
    ])
}

/// The focus probe went unacknowledged: the connection is silently dead.
/// Force-close and reopen with a fresh connection identity.
pub(crate) fn handle_liveness_timeout(model: &mut Model) -> UpdateResult {
    if model.send_key().is_none() {
        // Not in a connected state; a reconnect cycle is already underway.
        return UpdateResult::none();
    }

    warn!(
        target_name = %model.target_name,
        "liveness probe unacknowledged, reopening {}",
        model.connection
    );
    model.connection = model.connection.next();
    model.status = Status::Connecting { attempt: 1 };
    UpdateResult::commands(vec![
        Cmd::OpenConnection {
            id: model.connection,
            attempt: 1,
        },
        Cmd::Render,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_floor_and_cap() {
        assert_eq!(backoff_millis(1), 1010);
        assert_eq!(backoff_millis(2), 1040);
        assert_eq!(backoff_millis(10), 2000);
        assert_eq!(backoff_millis(76), 58760);
        assert_eq!(backoff_millis(77), 60000);
        assert_eq!(backoff_millis(10_000), 60000);
    }

    #[test]
    fn test_backoff_bounds_and_monotonicity() {
        let mut previous = 0;
        for attempt in 1..=200 {
            let wait = backoff_millis(attempt);
            assert!((1000..=60000).contains(&wait), "attempt {attempt}: {wait}");
            assert!(wait >= previous, "backoff must be non-decreasing");
            previous = wait;
        }
    }

    #[test]
    fn test_backoff_does_not_overflow() {
        assert_eq!(backoff_millis(u32::MAX), 60000);
    }
}
