//! Generic dispatch runtime
//!
//! A single-consumer, cooperative message loop:
//! `(state, message) → (state, commands)`, with every command executed in
//! order before the next message is processed. Domain-agnostic: the
//! session instantiates it with its own model/message/command types, but
//! nothing here knows about sessions.
//!
//! Guarantees:
//! - messages are processed strictly in dispatch order, one `update` call
//!   at a time, with no interleaving;
//! - a `dispatch` made from inside a running command only enqueues; it
//!   never re-enters the loop;
//! - the loop ends only when a command produces the terminal value.
//!
//! Commands that are intrinsically asynchronous (network, timers, code
//! evaluation) must spawn their work and re-enter the loop by dispatching a
//! follow-up message when it completes; they never block the loop, so no
//! async completion can observe a stale state.

use std::ops::ControlFlow;

use tokio::sync::mpsc;

/// Handle for feeding messages into a running loop.
///
/// Cheap to clone; clones can be moved into spawned tasks.
#[derive(Debug)]
pub struct Dispatcher<M> {
    tx: mpsc::UnboundedSender<M>,
}

impl<M> Clone for Dispatcher<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<M> Dispatcher<M> {
    /// Enqueue a message. Silently a no-op once the loop has terminated.
    pub fn dispatch(&self, message: M) {
        let _ = self.tx.send(message);
    }
}

/// Run a dispatch loop to its terminal value.
///
/// - `init` sets up mutable resources (spawning event pumps, etc.) and
///   returns the initial commands;
/// - `update` consumes one message and returns the commands it caused;
/// - `run_command` executes one command; returning
///   [`ControlFlow::Break`] ends the loop with that value.
pub async fn run<S, M, C, T>(
    mut state: S,
    init: impl FnOnce(&Dispatcher<M>, &mut S) -> Vec<C>,
    mut update: impl FnMut(&mut S, M) -> Vec<C>,
    mut run_command: impl FnMut(&mut S, C, &Dispatcher<M>) -> ControlFlow<T>,
) -> T {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher { tx };

    let initial = init(&dispatcher, &mut state);
    for command in initial {
        if let ControlFlow::Break(result) = run_command(&mut state, command, &dispatcher) {
            return result;
        }
    }

    loop {
        let Some(message) = rx.recv().await else {
            // `dispatcher` holds a sender for the life of the loop, so the
            // channel cannot close while we are still receiving.
            unreachable!("dispatch channel closed while the runtime is running");
        };
        let commands = update(&mut state, message);
        for command in commands {
            if let ControlFlow::Break(result) = run_command(&mut state, command, &dispatcher) {
                return result;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestCmd {
        Echo(u32),
        Stop,
    }

    #[tokio::test]
    async fn test_messages_processed_in_dispatch_order() {
        // update records the messages it sees; Echo commands dispatch a
        // follow-up from inside run_command (re-entrant dispatch), which
        // must be processed strictly after everything already queued.
        let result = run(
            Vec::new(),
            |dispatcher, _state| {
                dispatcher.dispatch(1u32);
                dispatcher.dispatch(2u32);
                vec![]
            },
            |state: &mut Vec<u32>, message: u32| {
                state.push(message);
                match message {
                    1 => vec![TestCmd::Echo(10)],
                    10 => vec![TestCmd::Stop],
                    _ => vec![],
                }
            },
            |state, command, dispatcher| match command {
                TestCmd::Echo(n) => {
                    dispatcher.dispatch(n);
                    ControlFlow::Continue(())
                }
                TestCmd::Stop => ControlFlow::Break(state.clone()),
            },
        )
        .await;

        // The echo of 1 (→ 10) lands after the already-queued 2.
        assert_eq!(result, vec![1, 2, 10]);
    }

    #[tokio::test]
    async fn test_initial_commands_run_before_any_message() {
        let result = run(
            Vec::new(),
            |dispatcher, _state| {
                dispatcher.dispatch(5u32);
                vec![TestCmd::Echo(99)]
            },
            |state: &mut Vec<u32>, message: u32| {
                state.push(message);
                if state.len() == 2 {
                    vec![TestCmd::Stop]
                } else {
                    vec![]
                }
            },
            |state, command, dispatcher| match command {
                TestCmd::Echo(n) => {
                    dispatcher.dispatch(n);
                    ControlFlow::Continue(())
                }
                TestCmd::Stop => ControlFlow::Break(state.clone()),
            },
        )
        .await;

        // 5 was dispatched during init, before the Echo command ran.
        assert_eq!(result, vec![5, 99]);
    }

    #[tokio::test]
    async fn test_async_task_reenters_via_dispatch() {
        let result = run(
            0u32,
            |dispatcher, _state| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    dispatcher.dispatch(7u32);
                });
                vec![]
            },
            |_state, message: u32| {
                vec![TestCmd::Echo(message), TestCmd::Stop]
            },
            |state, command, _dispatcher| match command {
                TestCmd::Echo(n) => {
                    *state = n;
                    ControlFlow::Continue(())
                }
                TestCmd::Stop => ControlFlow::Break(*state),
            },
        )
        .await;

        assert_eq!(result, 7);
    }
}
