#![no_main]

use libfuzzer_sys::fuzz_target;

use terraprobe_core::vars::{VarValue, VariableSet};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    if let Some(value) = VarValue::from_json(json.clone()) {
        // 변환된 값은 다시 유효한 JSON으로 직렬화되어야 한다
        let _ = serde_json::to_string(&value).expect("VarValue must serialize");
    }

    if let Ok(set) = serde_json::from_value::<VariableSet>(json) {
        // 평탄화는 변수를 잃지 않는다
        let flat = set.flatten(&[]);
        assert_eq!(flat.len(), set.len());
    }
});
