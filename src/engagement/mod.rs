//! Engagement gating — decides when a guest is asked to create an account.
//!
//! `EngagementStore` owns the persisted record and is its only writer.
//! The `policy` functions read a record and never mutate it.

pub mod auth;
pub mod clock;
pub mod policy;
pub mod state;
pub mod store;

pub use auth::{AuthResult, AuthUser};
pub use clock::{Clock, ManualClock, SystemClock};
pub use policy::{
    GuestStage, LaunchRoute, PromptVariant, guest_stage, launch_route, prompt_variant,
    should_show_account_banner, should_show_prompt,
};
pub use state::{EngagementState, SignInMethod, STATE_KEY};
pub use store::{EngagementStore, GateStatus, PromptDecision};
