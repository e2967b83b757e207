#![no_main]

use iovista::config::AnalysisConfig;
use iovista::report::Analyzer;
use iovista::trace::JsonTrace;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing must never panic; any trace that parses must analyze cleanly
        if let Ok(trace) = JsonTrace::from_json_str(input) {
            if let Ok(analyzer) = Analyzer::new(AnalysisConfig::default()) {
                let _ = analyzer.run(&trace);
            }
        }
    }
});
