#![no_main]
use libfuzzer_sys::fuzz_target;
use netsim_core::factory::Factory;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must never panic the snapshot decoder.
    if let Ok(mut factory) = Factory::deserialize(data) {
        // Decoding validates the state, so whatever decodes must survive a
        // consistency check and a tick.
        let _ = factory.is_consistent();
        let _ = factory.tick(1);
    }
});
