#![no_main]
use libfuzzer_sys::fuzz_target;

use purebp_format::dtype::Dtype;

fuzz_target!(|data: &[u8]| {
    for dtype in [
        Dtype::I8,
        Dtype::I16,
        Dtype::I32,
        Dtype::I64,
        Dtype::U8,
        Dtype::U16,
        Dtype::U32,
        Dtype::U64,
        Dtype::F32,
        Dtype::F64,
        Dtype::String,
    ] {
        let _ = purebp_format::values::decode_values(dtype, data);
        let _ = purebp_format::values::minmax(dtype, data);
    }
});
