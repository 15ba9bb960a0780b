//! EngagementStore — the single writer of the engagement record.
//!
//! Every transition mutates the in-memory record and then writes the whole
//! record through to the persistence adapter. Storage failures are logged
//! and never undo the in-memory change.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::auth::AuthResult;
use super::clock::{Clock, SystemClock};
use super::policy::{
    GuestStage, LaunchRoute, PromptVariant, guest_stage, launch_route, prompt_variant,
    should_show_prompt,
};
use super::state::{EngagementState, STATE_KEY, SignInMethod};
use crate::config::GatingConfig;
use crate::persistence::PersistenceAdapter;

/// Policy answer for the current moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PromptDecision {
    pub show: bool,
    pub variant: PromptVariant,
}

/// Snapshot of the record plus every derived decision.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStatus {
    pub state: EngagementState,
    pub stage: GuestStage,
    pub route: LaunchRoute,
    pub prompt: PromptDecision,
}

struct Live {
    state: EngagementState,
    /// A shown prompt was counted and has not been answered yet.
    prompt_outstanding: bool,
}

pub struct EngagementStore {
    adapter: Arc<dyn PersistenceAdapter>,
    clock: Arc<dyn Clock>,
    live: RwLock<Live>,
    /// Serializes writes so the persisted copy always ends on the newest record.
    write_gate: Mutex<()>,
}

impl EngagementStore {
    /// Load the persisted record, or start from defaults.
    pub async fn load(adapter: Arc<dyn PersistenceAdapter>) -> Self {
        Self::load_with_clock(adapter, Arc::new(SystemClock)).await
    }

    pub async fn load_with_clock(
        adapter: Arc<dyn PersistenceAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = match adapter.get(STATE_KEY).await {
            Ok(Some(raw)) => EngagementState::from_persisted(&raw).unwrap_or_default(),
            Ok(None) => EngagementState::default(),
            Err(e) => {
                warn!("Failed to load engagement state, using defaults: {}", e);
                EngagementState::default()
            }
        };
        debug!(
            session_count = state.session_count,
            prompt_count = state.prompt_count,
            has_account = state.has_account,
            "Engagement state loaded"
        );

        Self {
            adapter,
            clock,
            live: RwLock::new(Live {
                state,
                prompt_outstanding: false,
            }),
            write_gate: Mutex::new(()),
        }
    }

    /// Copy of the current record.
    pub async fn snapshot(&self) -> EngagementState {
        self.live.read().await.state.clone()
    }

    /// Count this cold boot. Call once per process.
    pub async fn init_session(&self) {
        let (session_count, first) = self
            .mutate(|live| {
                live.state.begin_session();
                (live.state.session_count, live.state.is_first_launch)
            })
            .await;
        info!(session_count, first_launch = first, "Session started");
    }

    pub async fn complete_onboarding(&self) {
        self.mutate(|live| live.state.complete_onboarding()).await;
        debug!("Onboarding completed");
    }

    /// Record a successful sign-in. Empty identity fields keep prior values.
    pub async fn sign_in(
        &self,
        method: impl Into<SignInMethod>,
        display_name: Option<&str>,
        email: Option<&str>,
    ) {
        let method = method.into();
        debug!(%method, "Signed in");
        self.mutate(|live| {
            live.state.sign_in(method, display_name, email);
            live.prompt_outstanding = false;
        })
        .await;
    }

    /// Sign in from a provider result. Returns whether the result was a success.
    pub async fn apply_auth_result(&self, result: &AuthResult) -> bool {
        match result.signed_in_user() {
            Some(user) => {
                self.sign_in(
                    user.provider.clone(),
                    user.display_name.as_deref(),
                    user.email.as_deref(),
                )
                .await;
                true
            }
            None => {
                warn!(
                    "Sign-in did not complete: {}",
                    result.error.as_deref().unwrap_or("no user returned")
                );
                false
            }
        }
    }

    /// Dismiss the prompt without signing in.
    ///
    /// A prompt already counted by [`EngagementStore::record_prompt_shown`]
    /// is not counted a second time.
    pub async fn continue_as_guest(&self) {
        let now = self.clock.now_ms();
        let counted = self
            .mutate(|live| {
                if live.prompt_outstanding {
                    live.prompt_outstanding = false;
                    false
                } else {
                    live.state.count_prompt(now);
                    true
                }
            })
            .await;
        debug!(counted, "Continued as guest");
    }

    pub async fn sign_out(&self) {
        self.mutate(|live| live.state.sign_out()).await;
        debug!("Signed out");
    }

    /// Count a like, save or follow. Ignored once an account exists.
    pub async fn track_high_intent_action(&self) {
        let counted = {
            let mut live = self.live.write().await;
            live.state.record_high_intent_action()
        };
        if counted {
            self.persist().await;
        }
    }

    /// Count a prompt at the moment it is displayed.
    pub async fn record_prompt_shown(&self) {
        let now = self.clock.now_ms();
        let prompt_count = self
            .mutate(|live| {
                live.state.count_prompt(now);
                live.prompt_outstanding = true;
                live.state.prompt_count
            })
            .await;
        debug!(prompt_count, "Prompt shown");
    }

    /// Wipe the record and its persisted copy.
    pub async fn reset_onboarding(&self) {
        {
            let mut live = self.live.write().await;
            live.state = EngagementState::default();
            live.prompt_outstanding = false;
        }

        let _gate = self.write_gate.lock().await;
        if let Err(e) = self.adapter.remove(STATE_KEY).await {
            warn!("Failed to remove persisted engagement state: {}", e);
        }
        info!("Engagement state reset");
    }

    /// Whether to prompt now, and how.
    pub async fn decision(&self, config: &GatingConfig) -> PromptDecision {
        let now = self.clock.now_ms();
        let live = self.live.read().await;
        PromptDecision {
            show: should_show_prompt(&live.state, config, now),
            variant: prompt_variant(&live.state, config),
        }
    }

    pub async fn status(&self, config: &GatingConfig) -> GateStatus {
        let now = self.clock.now_ms();
        let live = self.live.read().await;
        let state = &live.state;
        GateStatus {
            stage: guest_stage(state, config),
            route: launch_route(state, config),
            prompt: PromptDecision {
                show: should_show_prompt(state, config, now),
                variant: prompt_variant(state, config),
            },
            state: state.clone(),
        }
    }

    async fn mutate<R>(&self, op: impl FnOnce(&mut Live) -> R) -> R {
        let out = {
            let mut live = self.live.write().await;
            op(&mut *live)
        };
        self.persist().await;
        out
    }

    /// Write the newest record through to storage.
    async fn persist(&self) {
        let _gate = self.write_gate.lock().await;
        let body = {
            let live = self.live.read().await;
            serde_json::to_string(&live.state)
        };
        let body = match body {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to serialize engagement state: {}", e);
                return;
            }
        };
        if let Err(e) = self.adapter.set(STATE_KEY, &body).await {
            warn!("Failed to persist engagement state: {}", e);
        }
    }
}
