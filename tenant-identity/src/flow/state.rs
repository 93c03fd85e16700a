use chrono::{DateTime, Utc};

use crate::error::ApiError;
use crate::models::auth::ChallengeResponse;
use crate::models::ChallengeChannel;

/// An issued passwordless challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub challenge_id: String,
    pub channel: ChallengeChannel,
    /// Failed verifications against this challenge id.
    pub attempt_count: u32,
    pub max_attempts: Option<u32>,
    /// Seconds until RESEND is allowed.
    pub cooldown_remaining: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_sent_at: DateTime<Utc>,
}

impl Challenge {
    pub fn issued(
        response: &ChallengeResponse,
        channel: ChallengeChannel,
        default_cooldown: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            challenge_id: response.challenge_id.clone(),
            channel,
            attempt_count: response.attempt_count.unwrap_or(0),
            max_attempts: response.max_attempts,
            cooldown_remaining: response.resend_cooldown.unwrap_or(default_cooldown),
            expires_at: response.expires_at,
            last_sent_at: now,
        }
    }

    /// The challenge after a resend. Same id keeps counting; a new id starts over.
    pub fn resent(&self, response: &ChallengeResponse, default_cooldown: u32, now: DateTime<Utc>) -> Self {
        let mut next = Self::issued(response, self.channel, default_cooldown, now);
        if next.challenge_id == self.challenge_id {
            next.attempt_count = next.attempt_count.max(self.attempt_count);
        }
        next
    }

    pub fn with_failed_attempt(&self) -> Self {
        Self {
            attempt_count: self.attempt_count + 1,
            ..self.clone()
        }
    }

    pub fn can_resend(&self) -> bool {
        self.cooldown_remaining == 0
    }
}

/// The passwordless flow. Exactly one variant is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFlowState {
    Init,
    CollectIdentifier {
        channel: ChallengeChannel,
        identifier: String,
        error: Option<String>,
    },
    RequestingChallenge {
        identifier: String,
        channel: ChallengeChannel,
    },
    ChallengeSent {
        identifier: String,
        challenge: Challenge,
        message: Option<String>,
    },
    VerifyingOtp {
        identifier: String,
        challenge: Challenge,
    },
    MfaRequired {
        identifier: String,
        challenge: Challenge,
        providers: Vec<String>,
        message: Option<String>,
    },
    VerifyingMfa {
        identifier: String,
        challenge: Challenge,
        providers: Vec<String>,
        provider: String,
    },
    Authenticated {
        redirect_url: String,
    },
    LockedOut {
        until: DateTime<Utc>,
        message: String,
    },
    Error {
        error: ApiError,
    },
}

impl AuthFlowState {
    pub fn name(&self) -> &'static str {
        match self {
            AuthFlowState::Init => "INIT",
            AuthFlowState::CollectIdentifier { .. } => "COLLECT_IDENTIFIER",
            AuthFlowState::RequestingChallenge { .. } => "REQUESTING_CHALLENGE",
            AuthFlowState::ChallengeSent { .. } => "CHALLENGE_SENT",
            AuthFlowState::VerifyingOtp { .. } => "VERIFYING_OTP",
            AuthFlowState::MfaRequired { .. } => "MFA_REQUIRED",
            AuthFlowState::VerifyingMfa { .. } => "VERIFYING_MFA",
            AuthFlowState::Authenticated { .. } => "AUTHENTICATED",
            AuthFlowState::LockedOut { .. } => "LOCKED_OUT",
            AuthFlowState::Error { .. } => "ERROR",
        }
    }

    pub fn challenge(&self) -> Option<&Challenge> {
        match self {
            AuthFlowState::ChallengeSent { challenge, .. }
            | AuthFlowState::VerifyingOtp { challenge, .. }
            | AuthFlowState::MfaRequired { challenge, .. }
            | AuthFlowState::VerifyingMfa { challenge, .. } => Some(challenge),
            _ => None,
        }
    }

    /// Inline message shown with the current state, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            AuthFlowState::CollectIdentifier { error, .. } => error.as_deref(),
            AuthFlowState::ChallengeSent { message, .. }
            | AuthFlowState::MfaRequired { message, .. } => message.as_deref(),
            AuthFlowState::LockedOut { message, .. } => Some(message),
            AuthFlowState::Error { error } => Some(&error.message),
            _ => None,
        }
    }

    /// Terminal until RESET.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthFlowState::LockedOut { .. } | AuthFlowState::Error { .. }
        )
    }
}

/// Input to [`super::AuthFlowController::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    Reset,
    Cancel,
    ChooseChannel(ChallengeChannel),
    SubmitIdentifier { identifier: String },
    Resend,
    SubmitOtp { code: String },
    SubmitMfa { code: String, provider: Option<String> },
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::Reset => "RESET",
            AuthEvent::Cancel => "CANCEL",
            AuthEvent::ChooseChannel(_) => "CHOOSE_CHANNEL",
            AuthEvent::SubmitIdentifier { .. } => "SUBMIT_IDENTIFIER",
            AuthEvent::Resend => "RESEND",
            AuthEvent::SubmitOtp { .. } => "SUBMIT_OTP",
            AuthEvent::SubmitMfa { .. } => "SUBMIT_MFA",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(id: &str, attempts: Option<u32>) -> ChallengeResponse {
        ChallengeResponse {
            challenge_id: id.to_string(),
            attempt_count: attempts,
            ..Default::default()
        }
    }

    #[test]
    fn test_issued_uses_default_cooldown() {
        let challenge = Challenge::issued(&response("c1", None), ChallengeChannel::EmailOtp, 30, Utc::now());
        assert_eq!(challenge.cooldown_remaining, 30);
        assert_eq!(challenge.attempt_count, 0);
        assert!(!challenge.can_resend());
    }

    #[test]
    fn test_resend_keeps_count_for_same_id() {
        let first = Challenge::issued(&response("c1", None), ChallengeChannel::SmsOtp, 30, Utc::now())
            .with_failed_attempt()
            .with_failed_attempt();

        let same = first.resent(&response("c1", None), 30, Utc::now());
        assert_eq!(same.attempt_count, 2);
        assert_eq!(same.channel, ChallengeChannel::SmsOtp);

        let fresh = first.resent(&response("c2", None), 30, Utc::now());
        assert_eq!(fresh.attempt_count, 0);
    }
}
