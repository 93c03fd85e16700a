use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::state::AuthFlowState;
use crate::utils::StateCell;

const TICK: Duration = Duration::from_secs(1);

/// Resend cooldown ticker. At most one runs per flow; starting a new one
/// aborts the previous task.
#[derive(Default)]
pub struct CooldownTimer {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CooldownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, state: Arc<StateCell<AuthFlowState>>) {
        let mut slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        *slot = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !tick(&state) {
                    break;
                }
            }
        }));
    }

    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for CooldownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Decrement once. Returns whether the timer should keep running.
fn tick(state: &StateCell<AuthFlowState>) -> bool {
    let mut keep_running = false;
    state.update(|current| {
        let mut next = current.clone();
        let challenge = match &mut next {
            AuthFlowState::ChallengeSent { challenge, .. }
            | AuthFlowState::VerifyingOtp { challenge, .. } => challenge,
            _ => return None,
        };
        if challenge.cooldown_remaining == 0 {
            return None;
        }
        challenge.cooldown_remaining -= 1;
        keep_running = challenge.cooldown_remaining > 0;
        Some(next)
    });
    keep_running
}
