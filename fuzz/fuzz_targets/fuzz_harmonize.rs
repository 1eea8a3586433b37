#![no_main]

use libfuzzer_sys::fuzz_target;
use kirill::{AllelePair, EffectType, ReferenceIndex, SumstatsColumns, TracingReporter};

fuzz_target!(|data: &[u8]| {
    let index: ReferenceIndex = [
        ("rs1".to_string(), AllelePair::new("A", "G")),
        ("rs2".to_string(), AllelePair::new("T", "C")),
    ]
    .into_iter()
    .collect();

    for effect_type in [EffectType::Additive, EffectType::Multiplicative] {
        let mut out = Vec::new();
        // Errors are expected for random input; panics are not.
        let _ = kirill::harmonize(
            data,
            &mut out,
            &SumstatsColumns::default(),
            effect_type,
            &index,
            &mut TracingReporter,
        );
    }
});
