#![no_main]

use electrify::cleaning::clean;
use electrify::config::CleaningConfig;
use electrify::table::Table;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Loading and cleaning must return an error, never panic
    if let Ok(table) = Table::from_reader(data, "fuzz") {
        let _ = clean(table, &CleaningConfig::default());
    }
});
