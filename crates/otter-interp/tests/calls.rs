//! Call protocol: native calls, construction, arguments, `this` and eval

use otter_interp::bytecode::{CodeUnit, ConstantIndex, FunctionIndex, Instruction, Register};
use otter_interp::{
    CompiledCode, Interpreter, InterpreterConfig, PropertyKey, ScriptCompiler, Value, VmError, VmResult,
};
use std::sync::{Arc, Mutex};

fn r(n: u16) -> Register {
    Register(n)
}

fn script_function(interp: &Interpreter, unit: CodeUnit) -> Value {
    let _ = otter_interp::initialize();
    let code = CompiledCode::new(Arc::new(unit));
    Value::Object(interp.realm().new_script_function(code, interp.realm().global_scope()))
}

fn run(interp: &mut Interpreter, unit: CodeUnit) -> VmResult<Value> {
    let _ = otter_interp::initialize();
    interp.run_script(Arc::new(unit))
}

/// Eval compiler that treats the source text as a single identifier
fn identifier_compiler() -> Arc<dyn ScriptCompiler> {
    Arc::new(|source: &str, _strict: bool| -> VmResult<Arc<CodeUnit>> {
        let mut builder = CodeUnit::builder();
        let name = ConstantIndex(builder.constants_mut().add_string(source));
        let unit = builder
            .instruction(Instruction::LoadName { dst: r(0), name })
            .instruction(Instruction::End)
            .build()?;
        Ok(Arc::new(unit))
    })
}

#[test]
fn test_native_sees_padded_arguments() {
    let mut interp = Interpreter::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let count_args = interp.realm().new_native_function("count_args", 3, move |_, call| {
        log.lock().unwrap().push((call.args().to_vec(), call.argc()));
        Ok(Value::Undefined)
    });
    interp.realm().define_global("count_args", Value::Object(count_args));

    let mut builder = CodeUnit::builder();
    let name = ConstantIndex(builder.constants_mut().add_string("count_args"));
    let unit = builder
        .instruction(Instruction::LoadUndefined { dst: r(1) })
        .instruction(Instruction::LoadGlobal { dst: r(2), name, ic_index: 0 })
        .instruction(Instruction::LoadInt32 { dst: r(3), value: 7 })
        .instruction(Instruction::Call { base: r(1), argc: 1 })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    run(&mut interp, unit).unwrap();

    let seen = seen.lock().unwrap();
    let (args, argc) = &seen[0];
    assert_eq!(*argc, 1);
    assert_eq!(args.len(), 3);
    assert_eq!(args[0].as_int32(), Some(7));
    assert!(args[1].is_undefined() && args[2].is_undefined());
}

#[test]
fn test_new_on_non_constructor() {
    let mut interp = Interpreter::new();
    let plain = interp.realm().new_native_function("plain", 0, |_, _| Ok(Value::Undefined));
    interp.realm().define_global("plain", Value::Object(plain));

    let mut builder = CodeUnit::builder();
    let name = ConstantIndex(builder.constants_mut().add_string("plain"));
    let unit = builder
        .instruction(Instruction::LoadGlobal { dst: r(1), name, ic_index: 0 })
        .instruction(Instruction::New { base: r(1), argc: 0 })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    let err = run(&mut interp, unit).unwrap_err();
    assert!(matches!(err, VmError::TypeError(ref m) if m.contains("not a constructor")));

    let err = interp.construct(&Value::int32(1), &[]).unwrap_err();
    assert!(err.is_type_error());
}

/// `function F() { this.v = 7; return <result> }`
fn constructor(interp: &Interpreter, return_object: bool) -> Value {
    let mut builder = CodeUnit::builder().is_constructor(true);
    let v = ConstantIndex(builder.constants_mut().add_string("v"));
    let result = if return_object {
        Instruction::NewObject { dst: r(3) }
    } else {
        Instruction::LoadInt32 { dst: r(3), value: 1 }
    };
    let unit = builder
        .instruction(Instruction::LoadThis { dst: r(1) })
        .instruction(Instruction::LoadInt32 { dst: r(2), value: 7 })
        .instruction(Instruction::SetProp { obj: r(1), name: v, val: r(2), ic_index: 0 })
        .instruction(result)
        .instruction(Instruction::Return { src: r(3) })
        .build()
        .unwrap();
    script_function(interp, unit)
}

#[test]
fn test_constructor_primitive_result_yields_receiver() {
    let mut interp = Interpreter::new();
    let f = constructor(&interp, false);
    let result = interp.construct(&f, &[]).unwrap();
    let obj = result.as_object().unwrap();
    assert_eq!(obj.get(&PropertyKey::from("v")).as_int32(), Some(7));

    let prototype = f.as_object().unwrap().get(&PropertyKey::from("prototype"));
    let expected = prototype.as_object().unwrap();
    assert!(Arc::ptr_eq(&obj.prototype().unwrap(), expected));
}

#[test]
fn test_constructor_object_result_replaces_receiver() {
    let mut interp = Interpreter::new();
    let f = constructor(&interp, true);
    let result = interp.construct(&f, &[]).unwrap();
    assert!(result.as_object().unwrap().get(&PropertyKey::from("v")).is_undefined());
}

#[test]
fn test_script_function_without_constructor_flag() {
    let mut interp = Interpreter::new();
    let unit = CodeUnit::builder()
        .instruction(Instruction::ReturnUndefined)
        .build()
        .unwrap();
    let f = script_function(&interp, unit);
    assert!(interp.construct(&f, &[]).unwrap_err().is_type_error());
    assert!(interp.call(&f, Value::Undefined, &[]).unwrap().is_undefined());
}

#[test]
fn test_native_allocation_hook() {
    let mut interp = Interpreter::new();
    let ctor = interp.realm().new_native_constructor(
        "Pair",
        0,
        |_, call| {
            let this = call.this.as_object().unwrap();
            this.set(PropertyKey::Index(0), Value::boolean(call.is_construct));
            Ok(Value::Undefined)
        },
        |realm| realm.new_array(2),
    );
    let result = interp.construct(&Value::Object(Arc::clone(&ctor)), &[]).unwrap();
    let obj = result.as_object().unwrap();
    assert!(obj.is_array());
    assert_eq!(obj.array_length(), 2);
    assert_eq!(obj.get(&PropertyKey::Index(0)).as_boolean(), Some(true));

    let prototype = ctor.get(&PropertyKey::from("prototype"));
    assert!(Arc::ptr_eq(&obj.prototype().unwrap(), prototype.as_object().unwrap()));
}

#[test]
fn test_arguments_beyond_parameters() {
    let mut interp = Interpreter::new();
    let unit = CodeUnit::builder()
        .param_count(1)
        .instruction(Instruction::ArgumentCount { dst: r(1) })
        .instruction(Instruction::LoadArgument { dst: r(2), idx: 2 })
        .instruction(Instruction::LoadArgument { dst: r(3), idx: 9 })
        .instruction(Instruction::Add { dst: r(1), lhs: r(1), rhs: r(2) })
        .instruction(Instruction::Add { dst: r(1), lhs: r(1), rhs: r(3) })
        .instruction(Instruction::Return { src: r(1) })
        .build()
        .unwrap();
    let f = script_function(&interp, unit);
    let args = [Value::int32(1), Value::int32(2), Value::int32(30)];
    let v = interp.call(&f, Value::Undefined, &args).unwrap();
    // 3 + 30 + undefined
    assert!(v.as_number().is_some_and(f64::is_nan));

    let v = interp.call(&f, Value::Undefined, &[]).unwrap();
    assert!(v.as_number().is_some_and(f64::is_nan));
}

fn this_reader(interp: &Interpreter, strict: bool) -> Value {
    let unit = CodeUnit::builder()
        .is_strict(strict)
        .instruction(Instruction::LoadThis { dst: r(1) })
        .instruction(Instruction::Return { src: r(1) })
        .build()
        .unwrap();
    script_function(interp, unit)
}

#[test]
fn test_this_binding_by_strictness() {
    let mut interp = Interpreter::new();
    let global = Value::Object(Arc::clone(interp.realm().global_object()));

    let sloppy = this_reader(&interp, false);
    assert!(interp.call(&sloppy, Value::Undefined, &[]).unwrap().strict_equals(&global));
    assert!(interp.call(&sloppy, Value::int32(3), &[]).unwrap().strict_equals(&Value::int32(3)));

    let strict = this_reader(&interp, true);
    assert!(interp.call(&strict, Value::Undefined, &[]).unwrap().is_undefined());
}

#[test]
fn test_arrow_inherits_this() {
    let mut interp = Interpreter::new();
    let arrow = CodeUnit::builder()
        .is_arrow(true)
        .instruction(Instruction::LoadThis { dst: r(1) })
        .instruction(Instruction::Return { src: r(1) })
        .build()
        .unwrap();
    let outer = CodeUnit::builder()
        .function(arrow)
        .instruction(Instruction::LoadUndefined { dst: r(1) })
        .instruction(Instruction::CreateClosure { dst: r(2), func: FunctionIndex(0) })
        .instruction(Instruction::Call { base: r(1), argc: 0 })
        .instruction(Instruction::Return { src: r(1) })
        .build()
        .unwrap();
    let f = script_function(&interp, outer);
    let receiver = Value::Object(interp.realm().new_object());
    let v = interp.call(&f, receiver.clone(), &[]).unwrap();
    assert!(v.strict_equals(&receiver));
}

#[test]
fn test_runaway_recursion_overflows() {
    let config = InterpreterConfig::default().with_max_call_depth(32);
    let mut interp = Interpreter::with_config(config);

    let mut builder = CodeUnit::builder();
    let name = ConstantIndex(builder.constants_mut().add_string("recurse"));
    let unit = builder
        .instruction(Instruction::LoadUndefined { dst: r(1) })
        .instruction(Instruction::LoadGlobal { dst: r(2), name, ic_index: 0 })
        .instruction(Instruction::Call { base: r(1), argc: 0 })
        .instruction(Instruction::Return { src: r(1) })
        .build()
        .unwrap();
    let f = script_function(&interp, unit);
    interp.realm().define_global("recurse", f.clone());

    let err = interp.call(&f, Value::Undefined, &[]).unwrap_err();
    assert!(matches!(err, VmError::StackOverflow));
    assert_eq!(err.to_string(), "RangeError: Maximum call stack size exceeded");
    assert_eq!(interp.call_depth(), 0);
}

/// `function () { var x = 5; [var eval = fake;] return eval("x") }`
fn eval_caller(shadow_eval: bool) -> CodeUnit {
    let mut builder = CodeUnit::builder().heap_name("x").heap_name("eval");
    let x = ConstantIndex(builder.constants_mut().add_string("x"));
    let fake = ConstantIndex(builder.constants_mut().add_string("fake"));
    builder = builder
        .instruction(Instruction::LoadInt32 { dst: r(1), value: 5 })
        .instruction(Instruction::StoreHeap { hops: 0, idx: 0, src: r(1) });
    builder = if shadow_eval {
        builder
            .instruction(Instruction::LoadGlobal { dst: r(1), name: fake, ic_index: 0 })
            .instruction(Instruction::StoreHeap { hops: 0, idx: 1, src: r(1) })
    } else {
        // leave the local `eval` unbound so lookup reaches the global
        builder.instruction(Instruction::Nop)
    };
    builder
        .instruction(Instruction::LoadConst { dst: r(2), idx: x })
        .instruction(Instruction::CallEval { base: r(2), argc: 1 })
        .instruction(Instruction::Return { src: r(2) })
        .build()
        .unwrap()
}

#[test]
fn test_direct_eval_sees_caller_scope() {
    let mut interp = Interpreter::new();
    interp.set_compiler(identifier_compiler());
    interp.realm().define_global("x", Value::int32(1));

    // a function scope without an `eval` binding
    let mut builder = CodeUnit::builder().heap_name("x");
    let x = ConstantIndex(builder.constants_mut().add_string("x"));
    let unit = builder
        .instruction(Instruction::LoadInt32 { dst: r(1), value: 5 })
        .instruction(Instruction::StoreHeap { hops: 0, idx: 0, src: r(1) })
        .instruction(Instruction::LoadConst { dst: r(2), idx: x })
        .instruction(Instruction::CallEval { base: r(2), argc: 1 })
        .instruction(Instruction::Return { src: r(2) })
        .build()
        .unwrap();
    let f = script_function(&interp, unit);
    assert_eq!(interp.call(&f, Value::Undefined, &[]).unwrap().as_int32(), Some(5));
}

#[test]
fn test_shadowed_eval_is_ordinary_call() {
    let mut interp = Interpreter::new();
    interp.set_compiler(identifier_compiler());
    let fake = interp.realm().new_native_function("fake", 1, |interp, call| {
        let text = interp.to_string(&call.arg(0))?;
        Ok(Value::string(&format!("fake:{}", text.as_str())))
    });
    interp.realm().define_global("fake", Value::Object(fake));

    let f = script_function(&interp, eval_caller(true));
    let v = interp.call(&f, Value::Undefined, &[]).unwrap();
    assert_eq!(v.as_string().unwrap().as_str(), "fake:x");

    // an unassigned local `eval` is undefined, not the intrinsic
    let f = script_function(&interp, eval_caller(false));
    assert!(interp.call(&f, Value::Undefined, &[]).unwrap_err().is_type_error());
}

#[test]
fn test_indirect_eval_uses_global_scope() {
    let mut interp = Interpreter::new();
    interp.set_compiler(identifier_compiler());
    interp.realm().define_global("x", Value::int32(1));

    let eval = Value::Object(Arc::clone(interp.realm().intrinsic_eval()));
    let v = interp.call(&eval, Value::Undefined, &[Value::string("x")]).unwrap();
    assert_eq!(v.as_int32(), Some(1));

    let err = interp
        .call(&eval, Value::Undefined, &[Value::string("nowhere")])
        .unwrap_err();
    assert!(err.is_reference_error());
}

#[test]
fn test_eval_of_non_string_returns_argument() {
    let mut interp = Interpreter::new();
    let unit = CodeUnit::builder()
        .instruction(Instruction::LoadInt32 { dst: r(1), value: 3 })
        .instruction(Instruction::CallEval { base: r(1), argc: 1 })
        .instruction(Instruction::CallEval { base: r(2), argc: 0 })
        .instruction(Instruction::Move { dst: r(0), src: r(1) })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    assert_eq!(run(&mut interp, unit).unwrap().as_int32(), Some(3));
}

#[test]
fn test_eval_without_compiler() {
    let mut interp = Interpreter::new();
    let eval = Value::Object(Arc::clone(interp.realm().intrinsic_eval()));
    let err = interp.call(&eval, Value::Undefined, &[Value::string("x")]).unwrap_err();
    assert!(matches!(err, VmError::InternalError(_)));
}

#[test]
fn test_throw_carries_value() {
    let mut interp = Interpreter::new();
    let unit = CodeUnit::builder()
        .instruction(Instruction::LoadInt32 { dst: r(1), value: 9 })
        .instruction(Instruction::Throw { src: r(1) })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    let err = run(&mut interp, unit).unwrap_err();
    assert_eq!(err.thrown_value().and_then(Value::as_int32), Some(9));
}
