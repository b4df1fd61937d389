use num_bigint::BigInt;
use rstest::rstest;
use stackvm::builder::ScriptBuilder;
use stackvm::parser::opcode::OpCode;
use stackvm::parser::Script;
use stackvm::runtime::value::Integer;
use stackvm::runtime::{Array, Engine, Map, Struct, Value, VmState};

fn run_single(builder: ScriptBuilder) -> Value {
    let mut engine = Engine::load(builder.build()).expect("script decodes");
    assert_eq!(engine.run(), VmState::Halt, "{:?}", engine.error());
    assert_eq!(engine.stack().depth(), 1);
    engine.stack().values()[0].clone()
}

#[rstest]
#[case(0)]
#[case(-1)]
#[case(16)]
#[case(17)]
#[case(-128)]
#[case(255)]
#[case(-32769)]
#[case(i64::MIN)]
#[case(i64::MAX)]
fn pushed_integers_run_back_out(#[case] value: i64) {
    assert_eq!(run_single(ScriptBuilder::new().push_int(value)), Value::from_int(value));
}

#[test]
fn widest_integers_run_back_out() {
    let max = (BigInt::from(1) << 255) - 1;
    let min = -(BigInt::from(1) << 255usize);
    for value in [max, min] {
        let integer = Integer::new(value.clone()).unwrap();
        let bytes = ScriptBuilder::new().push_integer(&integer).build();
        assert_eq!(bytes.len(), 33);
        assert_eq!(run_single(ScriptBuilder::new().push_integer(&integer)), Value::try_from_bigint(value).unwrap());
    }
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(254)]
#[case(255)]
#[case(70_000)]
fn pushed_bytes_run_back_out(#[case] len: usize) {
    let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
    assert_eq!(run_single(ScriptBuilder::new().push_bytes(&data)), Value::from_bytes(data));
}

#[test]
fn strings_and_booleans() {
    assert_eq!(run_single(ScriptBuilder::new().push_string("héllo")), Value::from_string("héllo"));
    assert_eq!(run_single(ScriptBuilder::new().push_bool(true)), Value::from_bool(true));
    assert_eq!(run_single(ScriptBuilder::new().push_bool(false)), Value::from_bool(false));
    assert_eq!(run_single(ScriptBuilder::new().push_null()), Value::Null);
}

#[test]
fn nested_values_run_back_out() {
    let map = Map::new();
    map.set(Value::from_string("k"), Value::from_int(300)).unwrap();
    let value = Value::from_array(Array::new(vec![
        Value::from_struct(Struct::new(vec![Value::from_int(1), Value::Null])),
        Value::from_map(map),
        Value::from_array(Array::new(Vec::new())),
    ]));
    assert_eq!(run_single(ScriptBuilder::new().push_value(&value)), value);
}

#[test]
fn every_builder_script_decodes() {
    let bytes = ScriptBuilder::new()
        .push_int(1_000_000)
        .push_string("x")
        .call(200)
        .jump(OpCode::JmpEq, -300)
        .syscall(0xdeadbeef)
        .create_map(&[(Value::from_int(1), Value::from_int(2))])
        .build();
    let script = Script::new(bytes.clone()).unwrap();
    let opcodes: Vec<OpCode> = script.instructions().iter().map(|i| i.opcode).collect();
    assert_eq!(
        opcodes,
        vec![
            OpCode::PushInt32,
            OpCode::PushData1,
            OpCode::CallL,
            OpCode::JmpEqL,
            OpCode::Syscall,
            OpCode::NewMap,
            OpCode::Dup,
            OpCode::Push1,
            OpCode::Push2,
            OpCode::SetItem,
        ]
    );
    let total: usize = script.instructions().iter().map(|i| i.size).sum();
    assert_eq!(total, bytes.len());
}

#[test]
fn far_jumps_use_long_forms() {
    // 0: JMP_L +135  5: 128 x NOP  133: PUSH1  134: RET  135: PUSH5
    let mut builder = ScriptBuilder::new().jump(OpCode::Jmp, 135);
    for _ in 0..128 {
        builder = builder.emit(OpCode::Nop);
    }
    builder = builder.push_int(1).emit(OpCode::Ret).push_int(5);
    assert_eq!(builder.len(), 136);
    assert_eq!(run_single(builder), Value::from_int(5));
}
