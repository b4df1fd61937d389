#![no_main]

use libfuzzer_sys::fuzz_target;

use stackvm::parser::InstructionIterator;

fuzz_target!(|data: &[u8]| {
    // Walking never panics and the decoded sizes never pass the end
    let mut end = 0;
    for instruction in InstructionIterator::new(data, 0) {
        match instruction {
            Ok(i) => {
                assert_eq!(i.position, end);
                end = i.next_position();
            }
            Err(_) => break,
        }
    }
    assert!(end <= data.len());
});
