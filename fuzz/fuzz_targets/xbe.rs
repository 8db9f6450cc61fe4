#![no_main]
#[macro_use] extern crate libfuzzer_sys;
extern crate xbe_relink;

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = xbe_relink::xbe::Xbe::load(data);
});
