//! Sign-up prompt policy — pure decisions over an [`EngagementState`].
//!
//! Nothing here reads a clock or touches storage; callers pass `now_ms` in.

use serde::Serialize;

use super::state::{EngagementState, MS_PER_DAY};
use crate::config::GatingConfig;

/// Visual register of the sign-up prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptVariant {
    HalfSheet,
    FullScreen,
}

/// Dismissals after which the prompt escalates to full screen.
pub const FULL_SCREEN_AFTER: u32 = 2;

/// Coarse position of an installation in the prompting lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestStage {
    NeverPrompted,
    PromptedBelowCeiling,
    /// Terminal while a guest: no prompt is ever authorized again.
    PromptedAtCeiling,
    HasAccount,
}

/// Where a cold boot should land once the session is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchRoute {
    /// First-run carousel.
    Onboarding,
    /// Interstitial sign-up screen for returning guests.
    ReturningPrompt,
    Feed,
}

/// Whether a sign-up prompt may be shown at `now_ms`.
///
/// Rules are evaluated in order and the first one that matches decides.
pub fn should_show_prompt(state: &EngagementState, config: &GatingConfig, now_ms: i64) -> bool {
    if state.has_account {
        return false;
    }
    if state.prompt_count >= config.max_prompt_count {
        return false;
    }

    // Post-carousel screen on the very first launch
    if state.is_first_launch && state.has_completed_onboarding {
        return true;
    }

    // Early stage: every cold open
    if (2..=config.early_stage_sessions).contains(&state.session_count) {
        return true;
    }

    if state.session_count >= config.reduced_frequency_session_start {
        if state.high_intent_actions < config.high_intent_actions_threshold {
            return false;
        }
        if state.prompts_on_day_of(now_ms) >= config.max_prompts_per_day {
            return false;
        }
        return match state.last_prompt_timestamp {
            None => true,
            Some(last) => days_between(last, now_ms) >= config.reduced_frequency_days,
        };
    }

    false
}

/// Half-sheet until the user has dismissed it twice, full screen after.
pub fn prompt_variant(state: &EngagementState, _config: &GatingConfig) -> PromptVariant {
    if state.prompt_count >= FULL_SCREEN_AFTER {
        PromptVariant::FullScreen
    } else {
        PromptVariant::HalfSheet
    }
}

pub fn guest_stage(state: &EngagementState, config: &GatingConfig) -> GuestStage {
    if state.has_account {
        GuestStage::HasAccount
    } else if state.prompt_count >= config.max_prompt_count {
        GuestStage::PromptedAtCeiling
    } else if state.prompt_count == 0 {
        GuestStage::NeverPrompted
    } else {
        GuestStage::PromptedBelowCeiling
    }
}

/// Route for a cold boot. Expects `state` to already reflect this session.
pub fn launch_route(state: &EngagementState, config: &GatingConfig) -> LaunchRoute {
    if state.is_first_launch || !state.has_completed_onboarding {
        return LaunchRoute::Onboarding;
    }
    if !state.has_account
        && state.session_count <= config.early_stage_sessions
        && state.prompt_count < config.max_prompt_count
    {
        return LaunchRoute::ReturningPrompt;
    }
    LaunchRoute::Feed
}

/// Inline tab-bar banner for guests past the carousel.
pub fn should_show_account_banner(state: &EngagementState, ui_hidden: bool) -> bool {
    state.has_completed_onboarding && !state.has_account && !ui_hidden
}

/// Fractional days from `from_ms` to `to_ms`. Saturates on extreme timestamps.
fn days_between(from_ms: i64, to_ms: i64) -> f64 {
    to_ms.saturating_sub(from_ms) as f64 / MS_PER_DAY as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::state::epoch_day;

    const NOW: i64 = 1_760_000_000_000;
    const HOUR: i64 = 3_600_000;

    fn config() -> GatingConfig {
        GatingConfig::default()
    }

    fn guest(session_count: u32) -> EngagementState {
        EngagementState {
            is_first_launch: session_count == 1,
            has_completed_onboarding: true,
            session_count,
            ..Default::default()
        }
    }

    /// A reduced-stage guest that has crossed the high-intent threshold.
    fn engaged_guest() -> EngagementState {
        EngagementState {
            high_intent_actions: config().high_intent_actions_threshold,
            ..guest(config().reduced_frequency_session_start)
        }
    }

    #[test]
    fn account_suppresses_every_rule() {
        let cfg = config();
        let candidates = [
            guest(1),
            guest(2),
            guest(4),
            engaged_guest(),
            EngagementState {
                last_prompt_timestamp: Some(0),
                ..engaged_guest()
            },
        ];
        for mut state in candidates {
            assert!(should_show_prompt(&state, &cfg, NOW), "{state:?}");
            state.has_account = true;
            assert!(!should_show_prompt(&state, &cfg, NOW), "{state:?}");
        }
    }

    #[test]
    fn ceiling_suppresses_every_rule() {
        let cfg = config();
        for session in [1, 2, 3, 4, 5, 50] {
            let state = EngagementState {
                prompt_count: cfg.max_prompt_count,
                high_intent_actions: 100,
                ..guest(session)
            };
            assert!(!should_show_prompt(&state, &cfg, NOW), "session {session}");

            let past = EngagementState {
                prompt_count: cfg.max_prompt_count + 3,
                ..state
            };
            assert!(!should_show_prompt(&past, &cfg, NOW));
        }
    }

    #[test]
    fn first_launch_waits_for_carousel() {
        let cfg = config();
        let mut state = EngagementState {
            is_first_launch: true,
            session_count: 1,
            ..Default::default()
        };
        assert!(!should_show_prompt(&state, &cfg, NOW));

        state.complete_onboarding();
        assert!(should_show_prompt(&state, &cfg, NOW));
    }

    #[test]
    fn session_one_after_reload_does_not_prompt() {
        // Same counters, but not the launch that completed the carousel
        let state = EngagementState {
            is_first_launch: false,
            ..guest(1)
        };
        assert!(!should_show_prompt(&state, &config(), NOW));
    }

    #[test]
    fn early_stage_ignores_timestamp() {
        let cfg = config();
        for session in 2..=cfg.early_stage_sessions {
            for last in [None, Some(NOW), Some(NOW - HOUR), Some(NOW + HOUR)] {
                let state = EngagementState {
                    last_prompt_timestamp: last,
                    prompt_count: 1,
                    prompts_today: 5,
                    prompt_day: epoch_day(NOW),
                    ..guest(session)
                };
                assert!(should_show_prompt(&state, &cfg, NOW), "session {session}");
            }
        }
    }

    #[test]
    fn early_stage_does_not_require_carousel() {
        let state = EngagementState {
            has_completed_onboarding: false,
            ..guest(3)
        };
        assert!(should_show_prompt(&state, &config(), NOW));
    }

    #[test]
    fn gap_between_stages_never_prompts() {
        let cfg = GatingConfig {
            early_stage_sessions: 3,
            reduced_frequency_session_start: 6,
            ..config()
        };
        for session in [4, 5] {
            let state = EngagementState {
                high_intent_actions: 100,
                ..guest(session)
            };
            assert!(!should_show_prompt(&state, &cfg, NOW));
        }
    }

    #[test]
    fn high_intent_threshold_flips_eligibility() {
        let cfg = config();
        let mut state = EngagementState {
            high_intent_actions: cfg.high_intent_actions_threshold - 1,
            ..guest(cfg.reduced_frequency_session_start)
        };
        assert!(!should_show_prompt(&state, &cfg, NOW));

        state.record_high_intent_action();
        assert!(should_show_prompt(&state, &cfg, NOW));

        state.last_prompt_timestamp = Some(NOW - HOUR);
        assert!(!should_show_prompt(&state, &cfg, NOW));
    }

    #[test]
    fn reduced_stage_uses_fractional_days() {
        let cfg = GatingConfig {
            reduced_frequency_days: 1.0,
            ..config()
        };
        let state = EngagementState {
            last_prompt_timestamp: Some(NOW - 36 * HOUR),
            ..engaged_guest()
        };
        assert!(should_show_prompt(&state, &cfg, NOW));

        let recent = EngagementState {
            last_prompt_timestamp: Some(NOW - 23 * HOUR),
            ..engaged_guest()
        };
        assert!(!should_show_prompt(&recent, &cfg, NOW));

        let fractional = GatingConfig {
            reduced_frequency_days: 1.5,
            ..config()
        };
        let just_short = EngagementState {
            last_prompt_timestamp: Some(NOW - 35 * HOUR),
            ..engaged_guest()
        };
        assert!(!should_show_prompt(&just_short, &fractional, NOW));
        assert!(should_show_prompt(&state, &fractional, NOW));
    }

    #[test]
    fn reduced_stage_boundary_is_inclusive() {
        let cfg = config();
        let state = EngagementState {
            last_prompt_timestamp: Some(NOW - 2 * MS_PER_DAY),
            ..engaged_guest()
        };
        assert!(should_show_prompt(&state, &cfg, NOW));

        let one_ms_short = EngagementState {
            last_prompt_timestamp: Some(NOW - 2 * MS_PER_DAY + 1),
            ..engaged_guest()
        };
        assert!(!should_show_prompt(&one_ms_short, &cfg, NOW));
    }

    #[test]
    fn future_timestamp_blocks_reduced_stage() {
        let state = EngagementState {
            last_prompt_timestamp: Some(NOW + MS_PER_DAY),
            ..engaged_guest()
        };
        assert!(!should_show_prompt(&state, &config(), NOW));
    }

    #[test]
    fn extreme_timestamps_do_not_overflow() {
        let cfg = config();
        let ancient = EngagementState {
            last_prompt_timestamp: Some(i64::MIN),
            ..engaged_guest()
        };
        assert!(should_show_prompt(&ancient, &cfg, NOW));
        assert!(should_show_prompt(&ancient, &cfg, i64::MAX));

        let far_future = EngagementState {
            last_prompt_timestamp: Some(i64::MAX),
            ..engaged_guest()
        };
        assert!(!should_show_prompt(&far_future, &cfg, NOW));
        assert!(!should_show_prompt(&far_future, &cfg, i64::MIN));
    }

    #[test]
    fn daily_cap_limits_reduced_stage() {
        let cfg = GatingConfig {
            reduced_frequency_days: 0.0,
            max_prompts_per_day: 2,
            ..config()
        };
        let mut state = engaged_guest();
        state.count_prompt(NOW - 2 * HOUR);
        assert!(should_show_prompt(&state, &cfg, NOW));

        state.count_prompt(NOW - HOUR);
        assert!(!should_show_prompt(&state, &cfg, NOW));

        // Next UTC day resets the window
        assert!(should_show_prompt(&state, &cfg, NOW + MS_PER_DAY));
    }

    #[test]
    fn variant_depends_only_on_prompt_count() {
        let cfg = config();
        let shapes = [
            guest(1),
            guest(3),
            engaged_guest(),
            EngagementState {
                has_account: true,
                ..guest(9)
            },
            EngagementState::default(),
        ];
        for shape in shapes {
            for (count, expected) in [
                (0, PromptVariant::HalfSheet),
                (1, PromptVariant::HalfSheet),
                (2, PromptVariant::FullScreen),
                (3, PromptVariant::FullScreen),
                (cfg.max_prompt_count, PromptVariant::FullScreen),
            ] {
                let state = EngagementState {
                    prompt_count: count,
                    ..shape.clone()
                };
                assert_eq!(prompt_variant(&state, &cfg), expected, "count {count}");
            }
        }
    }

    #[test]
    fn guest_stages() {
        let cfg = config();
        let mut state = guest(2);
        assert_eq!(guest_stage(&state, &cfg), GuestStage::NeverPrompted);

        state.count_prompt(NOW);
        assert_eq!(guest_stage(&state, &cfg), GuestStage::PromptedBelowCeiling);

        state.prompt_count = cfg.max_prompt_count;
        assert_eq!(guest_stage(&state, &cfg), GuestStage::PromptedAtCeiling);

        state.sign_in("apple".into(), None, None);
        assert_eq!(guest_stage(&state, &cfg), GuestStage::HasAccount);

        // Counters survive sign-out, so the ceiling still applies
        state.sign_out();
        assert_eq!(guest_stage(&state, &cfg), GuestStage::PromptedAtCeiling);
    }

    #[test]
    fn launch_routes() {
        let cfg = config();

        let mut first = EngagementState::default();
        first.begin_session();
        assert_eq!(launch_route(&first, &cfg), LaunchRoute::Onboarding);

        let unfinished = EngagementState {
            has_completed_onboarding: false,
            ..guest(3)
        };
        assert_eq!(launch_route(&unfinished, &cfg), LaunchRoute::Onboarding);

        assert_eq!(launch_route(&guest(2), &cfg), LaunchRoute::ReturningPrompt);
        assert_eq!(launch_route(&guest(4), &cfg), LaunchRoute::ReturningPrompt);
        assert_eq!(launch_route(&guest(5), &cfg), LaunchRoute::Feed);

        let capped = EngagementState {
            prompt_count: cfg.max_prompt_count,
            ..guest(3)
        };
        assert_eq!(launch_route(&capped, &cfg), LaunchRoute::Feed);

        let member = EngagementState {
            has_account: true,
            ..guest(2)
        };
        assert_eq!(launch_route(&member, &cfg), LaunchRoute::Feed);
    }

    #[test]
    fn account_banner() {
        let state = guest(3);
        assert!(should_show_account_banner(&state, false));
        assert!(!should_show_account_banner(&state, true));

        let member = EngagementState {
            has_account: true,
            ..guest(3)
        };
        assert!(!should_show_account_banner(&member, false));

        let fresh = EngagementState::default();
        assert!(!should_show_account_banner(&fresh, false));
    }

    /// Plain serde round trip. The load path is covered separately below.
    #[test]
    fn serialized_state_keeps_decisions() {
        let cfg = config();
        let states = [
            guest(1),
            guest(3),
            EngagementState {
                last_prompt_timestamp: Some(NOW - 3 * MS_PER_DAY),
                prompt_count: 4,
                ..engaged_guest()
            },
            EngagementState {
                has_account: true,
                display_name: Some("Ada".to_string()),
                ..guest(6)
            },
        ];
        for state in states {
            let json = serde_json::to_string(&state).unwrap();
            let back: EngagementState = serde_json::from_str(&json).unwrap();
            assert_eq!(
                should_show_prompt(&state, &cfg, NOW),
                should_show_prompt(&back, &cfg, NOW)
            );
            assert_eq!(prompt_variant(&state, &cfg), prompt_variant(&back, &cfg));
        }
    }

    #[test]
    fn reload_ends_the_post_carousel_window() {
        let cfg = config();
        let state = guest(1);
        assert!(should_show_prompt(&state, &cfg, NOW));

        // is_first_launch is re-derived from session_count on load, so the
        // post-carousel prompt belongs to the launch that finished the carousel
        let json = serde_json::to_string(&state).unwrap();
        let reloaded = EngagementState::from_persisted(&json).unwrap();
        assert!(!reloaded.is_first_launch);
        assert!(!should_show_prompt(&reloaded, &cfg, NOW));
        assert_eq!(prompt_variant(&state, &cfg), prompt_variant(&reloaded, &cfg));

        for state in [guest(3), engaged_guest()] {
            let json = serde_json::to_string(&state).unwrap();
            let reloaded = EngagementState::from_persisted(&json).unwrap();
            assert_eq!(reloaded, state);
            assert_eq!(
                should_show_prompt(&state, &cfg, NOW),
                should_show_prompt(&reloaded, &cfg, NOW)
            );
        }
    }
}
