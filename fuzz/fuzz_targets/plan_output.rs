#![no_main]

use libfuzzer_sys::fuzz_target;
use terraprobe_engine::parse_plan;

fuzz_target!(|data: &[u8]| {
    // 플랜 파서는 &str을 받으므로 UTF-8 변환 필요
    if let Ok(output) = std::str::from_utf8(data) {
        // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
        let _ = parse_plan(output);
    }
});
