#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use terraprobe_harness::bundle::matches_pattern;

/// 퍼저용 (패턴, 경로) 쌍
#[derive(Arbitrary, Debug)]
struct FuzzMatch {
    pattern: String,
    path: String,
}

/// 세그먼트 수 제한 (`**` 역추적은 세그먼트 수에 지수적)
fn cap_segments(s: &str, max: usize) -> String {
    s.split('/').take(max).collect::<Vec<_>>().join("/")
}

fuzz_target!(|input: FuzzMatch| {
    let pattern = cap_segments(&input.pattern, 4);
    let path = cap_segments(&input.path, 16);

    // 어떤 입력에서도 패닉 없이 판정을 내려야 한다
    let _ = matches_pattern(&pattern, &path);
});
