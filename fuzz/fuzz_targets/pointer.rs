#![no_main]

use libfuzzer_sys::fuzz_target;
use nativemem::prelude::*;

// Interprets the input as a sequence of accesses against a small heap allocation and one of
// its views; any access may fail, none may panic.
fuzz_target!(|data: &[u8]| {
    let runtime = Runtime::new(Platform::linux_x86_64());
    let memory = runtime.allocate(64);
    let view = memory.slice(7);

    for op in data.chunks(4) {
        let [kind, offset, length, value] = match op {
            [a, b, c, d] => [*a, *b, *c, *d],
            _ => return,
        };
        let offset = i64::from(offset as i8);
        let length = i64::from(length);
        let target = if kind & 0x80 == 0 { &memory } else { &view };

        let _ = match kind & 0x0F {
            0 => target.put_i8(offset, value as i8),
            1 => target.get_i16(offset).map(|_| ()),
            2 => target.put_i32(offset, i32::from(value)),
            3 => target.get_i64(offset).map(|_| ()),
            4 => target.put_address(offset, u64::from(value)),
            5 => target.fill(offset, length, value),
            6 => target.index_of(offset, value, length).map(|_| ()),
            7 => memory.transfer_to(offset, &view, i64::from(value), length),
            8 => target.slice_bounded(offset, length).and_then(|slice| slice.put_i8(0, 1)),
            9 => target.get_string(offset, length, Charset::Utf8).map(|_| ()),
            10 => target.put_string(offset, "fuzz", length, Charset::Utf16),
            11 => target.get_pointer(offset).and_then(|pointer| pointer.get_i8(0)).map(|_| ()),
            _ => target.check_bounds(offset, length),
        };
    }
});
