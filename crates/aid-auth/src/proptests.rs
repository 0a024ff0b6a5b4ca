//! Property-based tests for aid-auth.
//!
//! # Properties Tested
//!
//! - Validity: a session is valid iff it has a token, a non-zero issue time
//!   and `now <= issued_at + ttl`
//! - Eviction: once a check returns false it keeps returning false and the
//!   stored token is empty

use std::sync::Arc;

use aid_core::harness::StaticTransport;
use aid_core::{ManualClock, MemorySettings, Settings, SettingsStore};
use proptest::prelude::*;

use crate::config::AuthConfig;
use crate::session::{SessionRecord, TokenSession};

fn arb_settings() -> impl Strategy<Value = Settings> {
    (
        prop_oneof![Just(String::new()), "[A-Za-z0-9]{1,16}"],
        0i64..2_000_000_000,
        1i64..1_000_000,
    )
        .prop_map(|(token, issued_at, ttl)| Settings {
            user_token: token,
            user_id: "W1".to_string(),
            last_login_time: issued_at,
            token_expiration: ttl,
            ..Settings::default()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_validity_formula(settings in arb_settings(), now in 0i64..2_100_000_000) {
        let record = SessionRecord::from_settings(&settings, 86_400);
        let expected = !settings.user_token.is_empty()
            && settings.last_login_time != 0
            && now <= settings.last_login_time + settings.token_expiration;
        prop_assert_eq!(record.is_valid_at(now), expected);
    }

    #[test]
    fn prop_invalid_stays_invalid(
        settings in arb_settings(),
        now in 0i64..2_100_000_000,
        later in prop::collection::vec(0i64..1_000_000, 1..5),
    ) {
        let store = Arc::new(MemorySettings::new(settings));
        let clock = Arc::new(ManualClock::new(now));
        let mut session = TokenSession::with_clock(
            AuthConfig::default(),
            Arc::new(StaticTransport::new()),
            store.clone(),
            clock.clone(),
        );

        if !session.is_valid() {
            prop_assert!(store.get().user_token.is_empty());
            prop_assert_eq!(store.get().last_login_time, 0);
            for step in later {
                clock.advance(step);
                prop_assert!(!session.is_valid());
                prop_assert!(store.get().user_token.is_empty());
            }
        }
    }
}
