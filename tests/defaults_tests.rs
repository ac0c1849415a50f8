//! # Process-Wide Defaults
//!
//! Kept in its own test binary: `set_defaults` mutates global state.

use qflow::settings::MAX_SIZE_KEY;
use qflow::{create_flow_limit, current_defaults, set_defaults, FlowDefaults, QueueDescriptor, QueueSettings, ThresholdSet};

/// Startup sequence: no defaults, bad defaults rejected, good defaults applied.
#[test]
fn test_set_defaults_lifecycle() {
    assert_eq!(current_defaults(), FlowDefaults::DISABLED);
    assert!(create_flow_limit(&QueueDescriptor::new("q0"), &QueueSettings::new())
        .unwrap()
        .is_none());

    set_defaults(1000, 80, 50).unwrap();
    assert_eq!(current_defaults(), FlowDefaults::new(1000, 80, 50).unwrap());

    // Rejected updates leave the installed defaults alone.
    assert!(set_defaults(1000, 101, 50).unwrap_err().is_invalid_configuration());
    assert!(set_defaults(1000, 40, 50).unwrap_err().is_invalid_configuration());
    assert_eq!(current_defaults().flow_stop_ratio, 80);

    let limit = create_flow_limit(&QueueDescriptor::new("q1"), &QueueSettings::new()).unwrap().unwrap();
    assert_eq!(limit.thresholds(), ThresholdSet::new(0, 0, 800, 500));

    let settings = QueueSettings::new().with(MAX_SIZE_KEY, "10000");
    let limit = create_flow_limit(&QueueDescriptor::new("q2"), &settings).unwrap().unwrap();
    assert_eq!(limit.thresholds(), ThresholdSet::new(0, 0, 8000, 5000));

    // A zero stop ratio turns default flow control back off.
    set_defaults(1000, 0, 0).unwrap();
    assert!(create_flow_limit(&QueueDescriptor::new("q3"), &QueueSettings::new())
        .unwrap()
        .is_none());
}
