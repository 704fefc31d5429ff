#![no_main]

use libfuzzer_sys::fuzz_target;

// Decoding stored bytes never panics, whatever is on disk.
fuzz_target!(|data: &[u8]| {
    let _ = bincode::deserialize::<txindex_types::TxResult>(data);
    let _ = bincode::deserialize::<txindex_types::TxHash>(data);
    let _ = bincode::deserialize::<txindex_store::HyperLogLog>(data);
});
