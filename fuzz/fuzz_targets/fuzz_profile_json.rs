//! Fuzz target: profile JSON import
//!
//! Arbitrary bytes through `Profile::from_json` and `validate`.  Anything
//! parsed must fit the phase table; a re-imported copy gets the same
//! verdict.  Out-of-range floats become infinite and export as `null`,
//! so re-import itself may fail.
//!
//! cargo fuzz run fuzz_profile_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use reflowstation::profile::{Profile, MAX_PHASES};

fuzz_target!(|data: &[u8]| {
    let Ok(profile) = Profile::from_json(data) else {
        return;
    };

    assert!(profile.phases.len() <= MAX_PHASES);
    let verdict = profile.validate();

    let Ok(json) = profile.to_json() else {
        return;
    };
    if let Ok(again) = Profile::from_json(json.as_bytes()) {
        assert_eq!(again.phases.len(), profile.phases.len());
        assert_eq!(again.validate().is_ok(), verdict.is_ok());
    }
});
