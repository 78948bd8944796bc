#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = jbig2_decode::decode(data);

    // Split the input so that the embedded path with globals is covered too.
    let split = data.first().map_or(0, |b| *b as usize).min(data.len());
    let (globals, stream) = data.split_at(split);
    let _ = jbig2_decode::decode_embedded_document(stream, Some(globals));
});
