#![no_main]

use libfuzzer_sys::fuzz_target;

use stackvm::parser::Script;
use stackvm::runtime::Engine;

fuzz_target!(|data: &[u8]| {
    let script = match Script::new(data) {
        Ok(s) => s,
        Err(_) => return, // Malformed bytecode, nothing to execute
    };

    // Every run must end in HALT or FAULT without panicking
    let mut engine = Engine::new(script).with_instruction_budget(10_000);
    assert!(engine.run().is_terminal());
});
