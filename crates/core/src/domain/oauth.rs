use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long an issued OAuth state token stays redeemable.
pub const OAUTH_STATE_TTL_MINUTES: i64 = 10;

/// Single-use token tying an `/authenticate` redirect to its `/validate` callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthState {
    pub state_token: String,
    pub redirect_uri: String,
    pub scope: String,
    pub requested_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl OAuthState {
    pub fn new(
        state_token: impl Into<String>,
        redirect_uri: impl Into<String>,
        scope: impl Into<String>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            state_token: state_token.into(),
            redirect_uri: redirect_uri.into(),
            scope: scope.into(),
            requested_at,
            expires_at: requested_at + Duration::minutes(OAUTH_STATE_TTL_MINUTES),
            used: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::OAuthState;

    #[test]
    fn fresh_state_is_redeemable_until_expiry() {
        let now = Utc::now();
        let state = OAuthState::new("abc", "https://dice.example.com/validate", "commands", now);

        assert!(state.is_redeemable(now + Duration::minutes(9)));
        assert!(!state.is_redeemable(now + Duration::minutes(10)));
    }

    #[test]
    fn used_state_is_not_redeemable() {
        let now = Utc::now();
        let mut state = OAuthState::new("abc", "https://dice.example.com/validate", "commands", now);
        state.used = true;

        assert!(!state.is_redeemable(now));
    }
}
