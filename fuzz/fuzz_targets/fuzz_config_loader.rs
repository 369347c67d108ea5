#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject input but must never panic.
    if let Ok(cfg) = toml::from_str::<powerd_config::Config>(data) {
        if cfg.validate().is_ok() {
            // Every accepted command address must qualify cleanly.
            for cmd in cfg.commands.values() {
                if let powerd_config::CommandCfg::Ir { address, .. }
                | powerd_config::CommandCfg::RelayPulse { address, .. } = cmd
                {
                    let _ = cfg.bridge.qualify(address);
                }
            }
        }
    }
});
