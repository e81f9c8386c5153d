#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(container) = purebp_format::reader::Container::parse(data) {
        for record in &container.variables {
            if let Ok(raw) = container.payload(data, record) {
                let _ = purebp_format::values::decode_values(record.dtype, raw);
            }
        }
    }
});
