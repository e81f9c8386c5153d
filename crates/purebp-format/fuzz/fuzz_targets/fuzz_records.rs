#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = purebp_format::record::VariableRecord::parse(data, 0);
    let _ = purebp_format::record::AttributeRecord::parse(data, 0);
});
