#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject input but must never panic.
    let Ok(cfg) = shooter_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        // A validated config carries tables that are either empty or usable.
        for rows in [&cfg.tables.speed, &cfg.tables.angle] {
            if !rows.is_empty() {
                assert!(shooter_config::check_rows(rows).is_ok());
            }
        }
    }
});
