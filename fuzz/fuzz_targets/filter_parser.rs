#![no_main]

use covscope::filter::FilterBuilder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Neither entry point may panic, and a built filter must answer queries
        let builder = FilterBuilder::new();
        let _ = builder.add_wildcard_coverage_filter(input);
        let _ = builder.add_regex_coverage_filter(input);
        let _ = builder.add_wildcard_file_exclusion(input);

        let filter = builder.build();
        let _ = filter.should_cover(input, input);
        let _ = filter.should_exclude_by_file_name(input);
    }
});
