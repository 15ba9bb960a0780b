//! The persisted engagement record and the pure transitions applied to it.

use serde::{Deserialize, Serialize};

/// Storage key for the serialized [`EngagementState`].
pub const STATE_KEY: &str = "onboarding_state";

/// Milliseconds in a day.
pub const MS_PER_DAY: i64 = 86_400_000;

/// Identity provider that completed a sign-in.
///
/// Unrecognized tags are kept verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignInMethod {
    Apple,
    Google,
    Email,
    EmailPassword,
    Other(String),
}

impl From<&str> for SignInMethod {
    fn from(tag: &str) -> Self {
        match tag {
            "apple" => Self::Apple,
            "google" => Self::Google,
            "email" => Self::Email,
            "email-password" => Self::EmailPassword,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for SignInMethod {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<SignInMethod> for String {
    fn from(method: SignInMethod) -> Self {
        method.to_string()
    }
}

impl std::fmt::Display for SignInMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Apple => "apple",
            Self::Google => "google",
            Self::Email => "email",
            Self::EmailPassword => "email-password",
            Self::Other(tag) => tag.as_str(),
        };
        write!(f, "{s}")
    }
}

/// Onboarding and account status for one installation.
///
/// Serialized as camelCase JSON under [`STATE_KEY`]. Missing fields fall back
/// to their defaults, so records written before a field existed still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngagementState {
    pub is_first_launch: bool,
    pub has_completed_onboarding: bool,
    pub has_account: bool,
    /// Cold boots seen so far.
    pub session_count: u32,
    /// Prompts counted toward the ceiling.
    pub prompt_count: u32,
    /// Likes, saves and follows made as a guest.
    pub high_intent_actions: u32,
    /// Epoch milliseconds of the most recently counted prompt.
    pub last_prompt_timestamp: Option<i64>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub sign_in_method: Option<SignInMethod>,
    /// UTC epoch day that `prompts_today` refers to.
    pub prompt_day: i64,
    pub prompts_today: u32,
}

impl Default for EngagementState {
    fn default() -> Self {
        Self {
            is_first_launch: true,
            has_completed_onboarding: false,
            has_account: false,
            session_count: 0,
            prompt_count: 0,
            high_intent_actions: 0,
            last_prompt_timestamp: None,
            display_name: None,
            email: None,
            sign_in_method: None,
            prompt_day: 0,
            prompts_today: 0,
        }
    }
}

impl EngagementState {
    /// Parse a persisted record. Anything unparsable is treated as absent.
    pub fn from_persisted(raw: &str) -> Option<Self> {
        match serde_json::from_str::<Self>(raw) {
            Ok(mut state) => {
                state.is_first_launch = state.session_count == 0;
                Some(state)
            }
            Err(e) => {
                tracing::warn!("Discarding malformed engagement record: {}", e);
                None
            }
        }
    }

    /// Count a cold boot. `is_first_launch` reflects the count before it.
    pub fn begin_session(&mut self) {
        self.is_first_launch = self.session_count == 0;
        self.session_count = self.session_count.saturating_add(1);
    }

    pub fn complete_onboarding(&mut self) {
        self.has_completed_onboarding = true;
    }

    /// Mark the installation as signed in. Empty identity fields keep
    /// whatever was known before.
    pub fn sign_in(
        &mut self,
        method: SignInMethod,
        display_name: Option<&str>,
        email: Option<&str>,
    ) {
        self.has_account = true;
        self.sign_in_method = Some(method);
        if let Some(name) = display_name.filter(|s| !s.is_empty()) {
            self.display_name = Some(name.to_string());
        }
        if let Some(email) = email.filter(|s| !s.is_empty()) {
            self.email = Some(email.to_string());
        }
    }

    /// Drop the account and identity fields. Counters are left alone.
    pub fn sign_out(&mut self) {
        self.has_account = false;
        self.display_name = None;
        self.email = None;
        self.sign_in_method = None;
    }

    /// Returns whether the action was counted.
    pub fn record_high_intent_action(&mut self) -> bool {
        if self.has_account {
            return false;
        }
        self.high_intent_actions = self.high_intent_actions.saturating_add(1);
        true
    }

    /// Count one prompt at `now_ms`.
    pub fn count_prompt(&mut self, now_ms: i64) {
        self.prompt_count = self.prompt_count.saturating_add(1);
        self.last_prompt_timestamp = Some(now_ms);

        let day = epoch_day(now_ms);
        if self.prompt_day == day {
            self.prompts_today = self.prompts_today.saturating_add(1);
        } else {
            self.prompt_day = day;
            self.prompts_today = 1;
        }
    }

    /// Prompts counted on the UTC day containing `now_ms`.
    pub fn prompts_on_day_of(&self, now_ms: i64) -> u32 {
        if self.prompts_today > 0 && self.prompt_day == epoch_day(now_ms) {
            self.prompts_today
        } else {
            0
        }
    }
}

/// UTC day number for an epoch-millisecond timestamp.
pub fn epoch_day(ms: i64) -> i64 {
    ms.div_euclid(MS_PER_DAY)
}
