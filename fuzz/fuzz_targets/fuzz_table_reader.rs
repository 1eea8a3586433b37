#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut reader = kirill::table::Reader::new(Cursor::new(data));

    let Ok(header) = reader.read_header() else {
        return;
    };
    let _ = header.resolve("SNP");

    // Iterate all rows - should never panic
    for result in reader.take(1000) {
        if let Ok(row) = result {
            let _ = row.field(3);
            let _ = row.to_line();
        }
    }
});
