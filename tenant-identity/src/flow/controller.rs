//! Passwordless authentication state machine.
//!
//! Every event is checked against the current state inside the same state
//! update that performs the transition, so two events can never both leave
//! the same state. Responses are applied only if the flow is still in the
//! state that issued the request and has not been reset since.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::cooldown::CooldownTimer;
use super::mask::mask_identifier;
use super::state::{AuthEvent, AuthFlowState, Challenge};
use crate::config::AuthFlowSettings;
use crate::error::ApiError;
use crate::models::auth::{
    ChallengeRequest, MfaVerifyRequest, ResendRequest, VerifyOtpRequest, VerifyResponse,
};
use crate::models::ChallengeChannel;
use crate::routing::return_url::{sanitize_or, sanitize_return_url};
use crate::routing::Navigator;
use crate::services::api_client::IdentityApi;
use crate::services::session_manager::SessionManager;
use crate::utils::{StateCell, Transition};

const EMPTY_IDENTIFIER: &str = "Enter your email address or phone number.";
const EMPTY_CODE: &str = "Enter the code we sent you.";
const LOCKED_OUT: &str = "Too many attempts. Please try again later.";

type InFlight = fn(&AuthFlowState) -> bool;

fn verifying_otp(state: &AuthFlowState) -> bool {
    matches!(state, AuthFlowState::VerifyingOtp { .. })
}

fn verifying_mfa(state: &AuthFlowState) -> bool {
    matches!(state, AuthFlowState::VerifyingMfa { .. })
}

fn sent_message(identifier: &str) -> String {
    format!("We sent a code to {}.", mask_identifier(identifier))
}

/// Marks a resend as in flight for one epoch. Released on drop, so a
/// cancelled dispatch cannot leave the slot taken.
struct ResendSlot<'a> {
    slot: &'a AtomicU64,
    tag: u64,
}

impl<'a> ResendSlot<'a> {
    fn acquire(slot: &'a AtomicU64, epoch: u64) -> Option<Self> {
        let tag = epoch + 1;
        slot.compare_exchange(0, tag, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { slot, tag })
    }
}

impl Drop for ResendSlot<'_> {
    fn drop(&mut self) {
        // A reset may already have freed the slot for a newer resend.
        let _ = self
            .slot
            .compare_exchange(self.tag, 0, Ordering::SeqCst, Ordering::SeqCst);
    }
}

pub struct AuthFlowController {
    api: Arc<dyn IdentityApi>,
    session: Arc<SessionManager>,
    navigator: Arc<dyn Navigator>,
    settings: AuthFlowSettings,
    state: Arc<StateCell<AuthFlowState>>,
    cooldown: CooldownTimer,
    epoch: AtomicU64,
    // Epoch + 1 of the resend in flight, 0 when idle.
    resending: AtomicU64,
    return_url: RwLock<Option<String>>,
    reset_task: Mutex<Option<JoinHandle<()>>>,
}

impl AuthFlowController {
    pub fn new(
        api: Arc<dyn IdentityApi>,
        session: Arc<SessionManager>,
        navigator: Arc<dyn Navigator>,
        settings: AuthFlowSettings,
    ) -> Self {
        Self {
            api,
            session,
            navigator,
            settings,
            state: Arc::new(StateCell::new(AuthFlowState::Init)),
            cooldown: CooldownTimer::new(),
            epoch: AtomicU64::new(0),
            resending: AtomicU64::new(0),
            return_url: RwLock::new(None),
            reset_task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> AuthFlowState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Transition<AuthFlowState>> {
        self.state.subscribe()
    }

    /// Where to go after authenticating, unless the server says otherwise.
    pub fn set_return_url(&self, url: Option<String>) {
        *self.return_url.write().unwrap_or_else(|e| e.into_inner()) = url;
    }

    pub async fn dispatch(&self, event: AuthEvent) {
        tracing::debug!(event = event.name(), state = self.state.get().name(), "Dispatching auth event");
        match event {
            AuthEvent::Reset | AuthEvent::Cancel => self.reset(),
            AuthEvent::ChooseChannel(channel) => self.choose_channel(channel),
            AuthEvent::SubmitIdentifier { identifier } => self.submit_identifier(identifier).await,
            AuthEvent::Resend => self.resend().await,
            AuthEvent::SubmitOtp { code } => self.submit_otp(code).await,
            AuthEvent::SubmitMfa { code, provider } => self.submit_mfa(code, provider).await,
        }
    }

    fn collect_identifier(&self) -> AuthFlowState {
        AuthFlowState::CollectIdentifier {
            channel: self.settings.initial_channel(),
            identifier: String::new(),
            error: None,
        }
    }

    fn ignore(&self, event: &'static str) {
        tracing::debug!(event, state = self.state.get().name(), "Event not valid in current state, ignoring");
    }

    fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.resending.store(0, Ordering::SeqCst);
        self.cooldown.stop();
        self.state.set(self.collect_identifier());
    }

    fn choose_channel(&self, channel: ChallengeChannel) {
        if !self.settings.available_channels.contains(&channel) {
            tracing::debug!(channel = %channel, "Channel not available, ignoring");
            return;
        }
        let changed = self.state.update(|current| match current {
            AuthFlowState::CollectIdentifier { identifier, .. } => Some(AuthFlowState::CollectIdentifier {
                channel,
                identifier: identifier.clone(),
                error: None,
            }),
            _ => None,
        });
        if !changed {
            self.ignore("CHOOSE_CHANNEL");
        }
    }

    async fn submit_identifier(&self, identifier: String) {
        let identifier = identifier.trim().to_string();
        if identifier.is_empty() {
            let shown = self.state.update(|current| match current {
                AuthFlowState::CollectIdentifier { channel, .. } => Some(AuthFlowState::CollectIdentifier {
                    channel: *channel,
                    identifier: String::new(),
                    error: Some(EMPTY_IDENTIFIER.to_string()),
                }),
                _ => None,
            });
            if !shown {
                self.ignore("SUBMIT_IDENTIFIER");
            }
            return;
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let mut started = None;
        self.state.update(|current| match current {
            AuthFlowState::CollectIdentifier { channel, .. } => {
                started = Some(*channel);
                Some(AuthFlowState::RequestingChallenge {
                    identifier: identifier.clone(),
                    channel: *channel,
                })
            }
            _ => None,
        });
        let Some(channel) = started else {
            self.ignore("SUBMIT_IDENTIFIER");
            return;
        };

        let request = ChallengeRequest {
            identifier: identifier.clone(),
            channel,
        };
        let result = self.api.request_challenge(&request).await;
        let now = Utc::now();
        let requesting = |s: &AuthFlowState| matches!(s, AuthFlowState::RequestingChallenge { .. });

        match result {
            Ok(response) => {
                let challenge = Challenge::issued(
                    &response,
                    channel,
                    self.settings.default_resend_cooldown_secs,
                    now,
                );
                tracing::info!(channel = %channel, challenge_id = %challenge.challenge_id, "Challenge issued");
                let message = response
                    .message
                    .clone()
                    .unwrap_or_else(|| sent_message(&identifier));
                let next = AuthFlowState::ChallengeSent {
                    identifier,
                    challenge,
                    message: Some(message),
                };
                if self.apply(epoch, |s| requesting(s).then_some(next)) {
                    self.cooldown.start(Arc::clone(&self.state));
                }
            }
            Err(e) => {
                let error = ApiError::from_error(&e, now);
                tracing::warn!(code = ?error.code, retryable = error.retryable, "Challenge request failed");
                let next = challenge_failure(error, identifier, channel);
                self.apply(epoch, |s| requesting(s).then_some(next));
            }
        }
    }

    async fn resend(&self) {
        let (identifier, challenge) = match self.state.get() {
            AuthFlowState::ChallengeSent {
                identifier,
                challenge,
                ..
            } if challenge.can_resend() => (identifier, challenge),
            AuthFlowState::ChallengeSent { challenge, .. } => {
                tracing::debug!(remaining = challenge.cooldown_remaining, "Resend while cooling down, ignoring");
                return;
            }
            _ => {
                self.ignore("RESEND");
                return;
            }
        };
        let epoch = self.epoch.load(Ordering::SeqCst);
        let Some(slot) = ResendSlot::acquire(&self.resending, epoch) else {
            tracing::debug!("Resend already in flight, ignoring");
            return;
        };

        let request = ResendRequest {
            identifier: identifier.clone(),
            channel: challenge.channel,
            challenge_id: challenge.challenge_id.clone(),
        };
        let result = self.api.resend_challenge(&request).await;
        drop(slot);
        let now = Utc::now();
        let still_sent = |s: &AuthFlowState| matches!(s, AuthFlowState::ChallengeSent { .. });

        match result {
            Ok(response) => {
                let next_challenge =
                    challenge.resent(&response, self.settings.default_resend_cooldown_secs, now);
                tracing::info!(challenge_id = %next_challenge.challenge_id, "Challenge resent");
                let message = response
                    .message
                    .clone()
                    .unwrap_or_else(|| sent_message(&identifier));
                let next = AuthFlowState::ChallengeSent {
                    identifier,
                    challenge: next_challenge,
                    message: Some(message),
                };
                if self.apply(epoch, |s| still_sent(s).then_some(next)) {
                    self.cooldown.start(Arc::clone(&self.state));
                }
            }
            Err(e) => {
                let error = ApiError::from_error(&e, now);
                tracing::warn!(code = ?error.code, "Resend failed");
                let next = challenge_failure(error, identifier, challenge.channel);
                if self.apply(epoch, |s| still_sent(s).then_some(next)) {
                    self.cooldown.stop();
                }
            }
        }
    }

    async fn submit_otp(&self, code: String) {
        let code = code.trim().to_string();
        if code.is_empty() {
            let shown = self.state.update(|current| match current {
                AuthFlowState::ChallengeSent {
                    identifier,
                    challenge,
                    ..
                } => Some(AuthFlowState::ChallengeSent {
                    identifier: identifier.clone(),
                    challenge: challenge.clone(),
                    message: Some(EMPTY_CODE.to_string()),
                }),
                _ => None,
            });
            if !shown {
                self.ignore("SUBMIT_OTP");
            }
            return;
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let mut started = None;
        self.state.update(|current| match current {
            AuthFlowState::ChallengeSent {
                identifier,
                challenge,
                ..
            } => {
                started = Some((identifier.clone(), challenge.clone()));
                Some(AuthFlowState::VerifyingOtp {
                    identifier: identifier.clone(),
                    challenge: challenge.clone(),
                })
            }
            _ => None,
        });
        let Some((identifier, challenge)) = started else {
            self.ignore("SUBMIT_OTP");
            return;
        };

        let request = VerifyOtpRequest {
            identifier,
            channel: challenge.channel,
            challenge_id: challenge.challenge_id,
            code,
        };
        match self.api.verify_otp(&request).await {
            Ok(response) => self.handle_verified(epoch, response, verifying_otp).await,
            Err(e) => {
                let error = ApiError::from_error(&e, Utc::now());
                tracing::warn!(code = ?error.code, "OTP verification failed");
                // Build from the live state so the cooldown keeps its progress.
                self.apply(epoch, |current| match current {
                    AuthFlowState::VerifyingOtp {
                        identifier,
                        challenge,
                    } => Some(otp_failure(error, identifier.clone(), challenge.clone())),
                    _ => None,
                });
            }
        }
    }

    async fn submit_mfa(&self, code: String, provider: Option<String>) {
        let code = code.trim().to_string();
        if code.is_empty() {
            let shown = self.state.update(|current| match current {
                AuthFlowState::MfaRequired {
                    identifier,
                    challenge,
                    providers,
                    ..
                } => Some(AuthFlowState::MfaRequired {
                    identifier: identifier.clone(),
                    challenge: challenge.clone(),
                    providers: providers.clone(),
                    message: Some(EMPTY_CODE.to_string()),
                }),
                _ => None,
            });
            if !shown {
                self.ignore("SUBMIT_MFA");
            }
            return;
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let mut started = None;
        self.state.update(|current| match current {
            AuthFlowState::MfaRequired {
                identifier,
                challenge,
                providers,
                ..
            } => {
                let provider = provider
                    .clone()
                    .filter(|p| !p.is_empty())
                    .or_else(|| providers.first().cloned())
                    .unwrap_or_else(|| self.settings.default_mfa_provider.clone());
                started = Some((identifier.clone(), challenge.challenge_id.clone(), provider.clone()));
                Some(AuthFlowState::VerifyingMfa {
                    identifier: identifier.clone(),
                    challenge: challenge.clone(),
                    providers: providers.clone(),
                    provider,
                })
            }
            _ => None,
        });
        let Some((identifier, challenge_id, provider)) = started else {
            self.ignore("SUBMIT_MFA");
            return;
        };

        let request = MfaVerifyRequest {
            identifier,
            challenge_id,
            provider,
            code,
        };
        match self.api.verify_mfa(&request).await {
            Ok(response) => self.handle_verified(epoch, response, verifying_mfa).await,
            Err(e) => {
                let error = ApiError::from_error(&e, Utc::now());
                tracing::warn!(code = ?error.code, "MFA verification failed");
                self.apply(epoch, |current| match current {
                    AuthFlowState::VerifyingMfa {
                        identifier,
                        challenge,
                        providers,
                        ..
                    } => Some(mfa_failure(error, identifier.clone(), challenge.clone(), providers.clone())),
                    _ => None,
                });
            }
        }
    }

    async fn handle_verified(&self, epoch: u64, response: VerifyResponse, in_flight: InFlight) {
        if let Some(until) = response.lockout_until {
            tracing::warn!(until = %until, "Verification locked out");
            let next = AuthFlowState::LockedOut {
                until,
                message: LOCKED_OUT.to_string(),
            };
            if self.apply(epoch, |s| in_flight(s).then_some(next)) {
                self.cooldown.stop();
            }
            return;
        }

        if response.mfa_required == Some(true) && self.settings.mfa_enabled {
            let providers = response
                .mfa_providers
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| vec![self.settings.default_mfa_provider.clone()]);
            let entered = self.apply(epoch, |current| match current {
                AuthFlowState::VerifyingOtp {
                    identifier,
                    challenge,
                }
                | AuthFlowState::VerifyingMfa {
                    identifier,
                    challenge,
                    ..
                } => Some(AuthFlowState::MfaRequired {
                    identifier: identifier.clone(),
                    challenge: challenge.clone(),
                    providers,
                    message: None,
                }),
                _ => None,
            });
            if entered {
                tracing::info!("Second factor required");
                self.cooldown.stop();
            }
            return;
        }

        match response.session {
            Some(raw) => self.complete(epoch, raw, response.redirect_url, in_flight),
            None => {
                tracing::warn!("Verification response carried neither a session nor an MFA request");
                let next = AuthFlowState::Error {
                    error: ApiError::unknown(),
                };
                self.apply(epoch, |s| in_flight(s).then_some(next));
            }
        }
    }

    fn complete(
        &self,
        epoch: u64,
        raw: serde_json::Value,
        server_redirect: Option<String>,
        in_flight: InFlight,
    ) {
        if self.epoch.load(Ordering::SeqCst) != epoch || !in_flight(&self.state.get()) {
            tracing::debug!("Flow reset during verification, discarding session");
            return;
        }
        self.cooldown.stop();

        let session = match self.session.establish(raw) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "Verification returned an unusable session");
                let next = AuthFlowState::Error {
                    error: ApiError::unknown(),
                };
                self.apply(epoch, |s| in_flight(s).then_some(next));
                return;
            }
        };

        let caller_target = self
            .return_url
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let login_route = self.session.login_route();
        let redirect_url = server_redirect
            .as_deref()
            .and_then(|url| sanitize_return_url(url, login_route))
            .unwrap_or_else(|| {
                sanitize_or(caller_target.as_deref(), &self.settings.default_redirect, login_route)
            });

        tracing::info!(user_id = %session.user.id, redirect = %redirect_url, "Authentication complete");
        self.state.set(AuthFlowState::Authenticated {
            redirect_url: redirect_url.clone(),
        });
        self.navigator.navigate(&redirect_url);
        self.schedule_reset();
    }

    /// Return to identifier entry shortly after the post-login redirect.
    fn schedule_reset(&self) {
        let state = Arc::clone(&self.state);
        let delay = std::time::Duration::from_millis(self.settings.reset_delay_ms);
        let fresh = self.collect_identifier();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            state.update(|current| {
                matches!(current, AuthFlowState::Authenticated { .. }).then_some(fresh)
            });
        });

        if let Some(previous) = self
            .reset_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(task)
        {
            previous.abort();
        }
    }

    /// Apply a response-driven transition unless the flow was reset since
    /// `epoch` or `next` declines the current state.
    fn apply<F>(&self, epoch: u64, next: F) -> bool
    where
        F: FnOnce(&AuthFlowState) -> Option<AuthFlowState>,
    {
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!("Flow reset while request was in flight, discarding response");
            return false;
        }
        let applied = self.state.update(next);
        if !applied {
            tracing::debug!(state = self.state.get().name(), "Flow moved on, discarding response");
        }
        applied
    }
}

impl Drop for AuthFlowController {
    fn drop(&mut self) {
        if let Some(task) = self
            .reset_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            task.abort();
        }
    }
}

fn challenge_failure(
    error: ApiError,
    identifier: String,
    channel: ChallengeChannel,
) -> AuthFlowState {
    if let Some(until) = error.lockout_until {
        AuthFlowState::LockedOut {
            until,
            message: error.message,
        }
    } else if error.retryable {
        AuthFlowState::CollectIdentifier {
            channel,
            identifier,
            error: Some(error.message),
        }
    } else {
        AuthFlowState::Error { error }
    }
}

// The attempt counter moves on every rejected code, whatever the server's
// retryable flag says.
fn otp_failure(error: ApiError, identifier: String, challenge: Challenge) -> AuthFlowState {
    if let Some(until) = error.lockout_until {
        AuthFlowState::LockedOut {
            until,
            message: error.message,
        }
    } else if error.code.is_otp_rejection() {
        AuthFlowState::ChallengeSent {
            identifier,
            challenge: challenge.with_failed_attempt(),
            message: Some(error.message),
        }
    } else if error.retryable {
        AuthFlowState::ChallengeSent {
            identifier,
            challenge,
            message: Some(error.message),
        }
    } else {
        AuthFlowState::Error { error }
    }
}

fn mfa_failure(
    error: ApiError,
    identifier: String,
    challenge: Challenge,
    providers: Vec<String>,
) -> AuthFlowState {
    if let Some(until) = error.lockout_until {
        AuthFlowState::LockedOut {
            until,
            message: error.message,
        }
    } else if error.code.is_otp_rejection() {
        AuthFlowState::MfaRequired {
            identifier,
            challenge: challenge.with_failed_attempt(),
            providers,
            message: Some(error.message),
        }
    } else if error.retryable {
        AuthFlowState::MfaRequired {
            identifier,
            challenge,
            providers,
            message: Some(error.message),
        }
    } else {
        AuthFlowState::Error { error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionSettings;
    use crate::error::ErrorCode;
    use crate::models::auth::ChallengeResponse;
    use crate::services::session_storage::SessionStorage;
    use crate::storage::MemoryStore;
    use crate::testing::{http_error, MockIdentityApi, RecordingNavigator};

    fn controller(api: Arc<MockIdentityApi>) -> AuthFlowController {
        let navigator = Arc::new(RecordingNavigator::new());
        let session = Arc::new(SessionManager::new(
            api.clone(),
            SessionStorage::new(Arc::new(MemoryStore::new())),
            navigator.clone(),
            SessionSettings::default(),
            "/login",
        ));
        AuthFlowController::new(api, session, navigator, AuthFlowSettings::default())
    }

    #[tokio::test]
    async fn test_starts_in_init_and_reset_collects_identifier() {
        let flow = controller(Arc::new(MockIdentityApi::new()));
        assert_eq!(flow.state(), AuthFlowState::Init);

        flow.dispatch(AuthEvent::Reset).await;
        assert!(matches!(
            flow.state(),
            AuthFlowState::CollectIdentifier {
                channel: ChallengeChannel::EmailOtp,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_identifier_never_hits_network() {
        let api = Arc::new(MockIdentityApi::new());
        let flow = controller(api.clone());
        flow.dispatch(AuthEvent::Reset).await;

        flow.dispatch(AuthEvent::SubmitIdentifier {
            identifier: "   ".to_string(),
        })
        .await;
        assert_eq!(flow.state().message(), Some(EMPTY_IDENTIFIER));
        assert_eq!(api.calls("challenge"), 0);
    }

    #[tokio::test]
    async fn test_unavailable_channel_is_ignored() {
        let flow = controller(Arc::new(MockIdentityApi::new()));
        flow.dispatch(AuthEvent::Reset).await;

        flow.dispatch(AuthEvent::ChooseChannel(ChallengeChannel::MagicLink)).await;
        assert!(matches!(
            flow.state(),
            AuthFlowState::CollectIdentifier {
                channel: ChallengeChannel::EmailOtp,
                ..
            }
        ));

        flow.dispatch(AuthEvent::ChooseChannel(ChallengeChannel::SmsOtp)).await;
        assert!(matches!(
            flow.state(),
            AuthFlowState::CollectIdentifier {
                channel: ChallengeChannel::SmsOtp,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_retryable_challenge_error_stays_collecting() {
        let api = Arc::new(MockIdentityApi::new());
        api.push_challenge(Err(http_error(400, "INVALID_IDENTIFIER")));
        let flow = controller(api);
        flow.dispatch(AuthEvent::Reset).await;

        flow.dispatch(AuthEvent::SubmitIdentifier {
            identifier: "nobody".to_string(),
        })
        .await;
        match flow.state() {
            AuthFlowState::CollectIdentifier {
                identifier, error, ..
            } => {
                assert_eq!(identifier, "nobody");
                assert!(error.is_some());
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_challenge_error_is_terminal() {
        let api = Arc::new(MockIdentityApi::new());
        api.push_challenge(Err(http_error(429, "TOO_MANY_ATTEMPTS")));
        let flow = controller(api);
        flow.dispatch(AuthEvent::Reset).await;

        flow.dispatch(AuthEvent::SubmitIdentifier {
            identifier: "user@example.com".to_string(),
        })
        .await;
        match flow.state() {
            AuthFlowState::Error { error } => assert_eq!(error.code, ErrorCode::TooManyAttempts),
            other => panic!("unexpected state {other:?}"),
        }
        assert!(flow.state().is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_after_cancel_is_discarded() {
        let api = Arc::new(MockIdentityApi::new());
        api.set_latency(std::time::Duration::from_millis(500));
        api.push_challenge(Ok(ChallengeResponse {
            challenge_id: "c1".to_string(),
            ..Default::default()
        }));
        let flow = Arc::new(controller(api));
        flow.dispatch(AuthEvent::Reset).await;

        let submitting = {
            let flow = flow.clone();
            tokio::spawn(async move {
                flow.dispatch(AuthEvent::SubmitIdentifier {
                    identifier: "user@example.com".to_string(),
                })
                .await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(flow.state().name(), "REQUESTING_CHALLENGE");

        flow.dispatch(AuthEvent::Cancel).await;
        submitting.await.unwrap();
        assert_eq!(flow.state().name(), "COLLECT_IDENTIFIER");
    }
}
