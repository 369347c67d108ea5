#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Only the exact `state,1:2,<0|1>` forms may parse as a level.
    if let Ok(level) = powerd_bridge::source::parse_sensor_reply("1:2", data) {
        let expected = if level { "state,1:2,1" } else { "state,1:2,0" };
        assert_eq!(data.trim(), expected);
    }
});
