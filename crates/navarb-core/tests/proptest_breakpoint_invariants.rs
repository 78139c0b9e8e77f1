//! Property-based invariant tests for breakpoint state and resize debouncing.
//!
//! 1. Mode is a pure function of width with an inclusive desktop threshold
//! 2. `mode()` always agrees with the policy after any update sequence
//! 3. Any burst inside the debounce window yields exactly one authoritative
//!    sample carrying the last dimensions
//! 4. A busy transition request never changes mode or releases the guard

use navarb_core::{
    BreakpointPolicy, BreakpointState, DebounceConfig, NavigationMode, PreservedUiState,
    ResizeDebouncer, TransitionRequest, ViewportSample,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn mode_is_inclusive_threshold(threshold in 1u32..4000, width in 0u32..8000) {
        let policy = BreakpointPolicy::with_threshold(threshold);
        let expected = if width >= threshold {
            NavigationMode::Desktop
        } else {
            NavigationMode::Mobile
        };
        prop_assert_eq!(policy.mode_for(width), expected);
        prop_assert_eq!(policy.mode_for(threshold), NavigationMode::Desktop);
    }

    #[test]
    fn state_mode_tracks_policy(widths in proptest::collection::vec(200u32..2400, 1..60)) {
        let policy = BreakpointPolicy::default();
        let mut state = BreakpointState::new(policy, ViewportSample::new(1200, 800, 0));
        for (i, w) in widths.iter().enumerate() {
            state.update_dimensions(ViewportSample::new(*w, 800, i as u64), PreservedUiState::default);
            prop_assert_eq!(state.mode(), policy.mode_for(state.current_width()));
        }
    }

    #[test]
    fn burst_yields_single_update(
        widths in proptest::collection::vec(300u32..2000, 1..40),
        start in 0u64..10_000,
    ) {
        let config = DebounceConfig::default();
        let mut debouncer = ResizeDebouncer::new(config);
        // Spread the burst over strictly less than the debounce window.
        let step = config.debounce_ms / widths.len() as u64;
        let mut last_t = start;
        let mut fired = Vec::new();
        for (i, w) in widths.iter().enumerate() {
            last_t = start + step * i as u64;
            if let Some(s) = debouncer.poll(last_t) {
                fired.push(s);
            }
            debouncer.push(ViewportSample::new(*w, 700, last_t));
        }
        for t in last_t..=last_t + config.debounce_ms * 3 {
            if let Some(s) = debouncer.poll(t) {
                fired.push(s);
            }
        }
        prop_assert_eq!(fired.len(), 1);
        prop_assert_eq!(fired[0].width, *widths.last().unwrap());
    }

    #[test]
    fn busy_request_leaves_state_untouched(width in 200u32..2400, extra in 1usize..8) {
        let mut state = BreakpointState::new(BreakpointPolicy::default(), ViewportSample::new(width, 800, 0));
        let started = state.request_transition("first", 0, 50);
        prop_assert!(matches!(started, TransitionRequest::Started { .. }), "first request must start");
        let mode = state.mode();
        for _ in 0..extra {
            prop_assert_eq!(state.request_transition("again", 10, 50), TransitionRequest::Busy);
            prop_assert!(state.is_transitioning());
            prop_assert_eq!(state.mode(), mode);
        }
        prop_assert_eq!(state.transition_reason(), Some("first"));
    }
}
