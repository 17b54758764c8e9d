//! Scope chain resolution: names, heap slots, block scopes, globals

use otter_interp::bytecode::{
    BlockScope, CodeUnit, CodeUnitBuilder, ConstantIndex, FunctionIndex, Instruction, JumpTarget, Register,
    StackIndex,
};
use otter_interp::{Interpreter, InterpreterConfig, PropertyKey, Value, VmError, VmResult};
use std::sync::Arc;

fn r(n: u16) -> Register {
    Register(n)
}

fn name(builder: &mut CodeUnitBuilder, s: &str) -> ConstantIndex {
    ConstantIndex(builder.constants_mut().add_string(s))
}

fn run_with(interp: &mut Interpreter, unit: CodeUnit) -> VmResult<Value> {
    let _ = otter_interp::initialize();
    interp.run_script(Arc::new(unit))
}

fn run(unit: CodeUnit) -> VmResult<Value> {
    run_with(&mut Interpreter::new(), unit)
}

#[test]
fn test_inner_binding_shadows_global() {
    // function f() { let x = 2; return x; } with a global x = 1
    let mut inner = CodeUnit::builder().heap_name("x");
    let x = name(&mut inner, "x");
    let inner = inner
        .instruction(Instruction::LoadInt32 { dst: r(0), value: 2 })
        .instruction(Instruction::StoreName { name: x, src: r(0) })
        .instruction(Instruction::LoadName { dst: r(1), name: x })
        .instruction(Instruction::Return { src: r(1) })
        .build()
        .unwrap();

    let mut outer = CodeUnit::builder();
    let x = name(&mut outer, "x");
    let outer = outer
        .function(inner)
        .instruction(Instruction::DeclareVar { name: x })
        .instruction(Instruction::LoadInt32 { dst: r(1), value: 1 })
        .instruction(Instruction::StoreName { name: x, src: r(1) })
        .instruction(Instruction::CreateClosure { dst: r(3), func: FunctionIndex(0) })
        .instruction(Instruction::LoadUndefined { dst: r(2) })
        .instruction(Instruction::Call { base: r(2), argc: 0 })
        .instruction(Instruction::LoadName { dst: r(4), name: x })
        // r0 = inner result * 10 + outer x
        .instruction(Instruction::LoadInt32 { dst: r(5), value: 10 })
        .instruction(Instruction::Mul { dst: r(2), lhs: r(2), rhs: r(5) })
        .instruction(Instruction::Add { dst: r(0), lhs: r(2), rhs: r(4) })
        .instruction(Instruction::End)
        .build()
        .unwrap();

    assert_eq!(run(outer).unwrap().as_int32(), Some(21));
}

#[test]
fn test_undeclared_name_is_reference_error() {
    let mut builder = CodeUnit::builder();
    let missing = name(&mut builder, "missing");
    let unit = builder
        .instruction(Instruction::LoadName { dst: r(0), name: missing })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    let err = run(unit).unwrap_err();
    assert!(matches!(err, VmError::ReferenceError(ref m) if m == "missing is not defined"));
}

#[test]
fn test_store_to_undeclared_name_never_creates() {
    let mut builder = CodeUnit::builder();
    let ghost = name(&mut builder, "ghost");
    let unit = builder
        .instruction(Instruction::LoadInt32 { dst: r(0), value: 1 })
        .instruction(Instruction::StoreName { name: ghost, src: r(0) })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    let mut interp = Interpreter::new();
    assert!(run_with(&mut interp, unit).unwrap_err().is_reference_error());
    assert!(!interp.realm().global_object().has_property(&PropertyKey::from("ghost")));
}

#[test]
fn test_const_binding_rejects_store() {
    let mut builder = CodeUnit::builder().block_scope(BlockScope::default().with_const("c"));
    let c = name(&mut builder, "c");
    let unit = builder
        .instruction(Instruction::EnterScope { layout: 0 })
        .instruction(Instruction::LoadInt32 { dst: r(0), value: 1 })
        .instruction(Instruction::StoreName { name: c, src: r(0) })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    assert!(run(unit).unwrap_err().is_type_error());
}

#[test]
fn test_heap_slots_walk_exact_hops() {
    // outer function captures `a` in heap slot 0; inner reads it one hop out
    let inner = CodeUnit::builder()
        .instruction(Instruction::LoadHeap { dst: r(0), hops: 1, idx: 0 })
        .instruction(Instruction::Return { src: r(0) })
        .build()
        .unwrap();
    let outer = CodeUnit::builder()
        .heap_name("a")
        .function(inner)
        .instruction(Instruction::LoadInt32 { dst: r(0), value: 7 })
        .instruction(Instruction::StoreHeap { hops: 0, idx: 0, src: r(0) })
        .instruction(Instruction::CreateClosure { dst: r(2), func: FunctionIndex(0) })
        .instruction(Instruction::LoadUndefined { dst: r(1) })
        .instruction(Instruction::Call { base: r(1), argc: 0 })
        .instruction(Instruction::Return { src: r(1) })
        .build()
        .unwrap();
    let global = CodeUnit::builder()
        .function(outer)
        .instruction(Instruction::CreateClosure { dst: r(2), func: FunctionIndex(0) })
        .instruction(Instruction::LoadUndefined { dst: r(1) })
        .instruction(Instruction::Call { base: r(1), argc: 0 })
        .instruction(Instruction::Move { dst: r(0), src: r(1) })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    assert_eq!(run(global).unwrap().as_int32(), Some(7));
}

#[test]
fn test_heap_parameters() {
    // function (p) { return p + p } with the parameter captured on the heap
    let func = CodeUnit::builder()
        .param_count(1)
        .params_on_heap(true)
        .heap_name("p")
        .instruction(Instruction::LoadHeap { dst: r(0), hops: 0, idx: 0 })
        .instruction(Instruction::Add { dst: r(0), lhs: r(0), rhs: r(0) })
        .instruction(Instruction::Return { src: r(0) })
        .build()
        .unwrap();
    let global = CodeUnit::builder()
        .function(func)
        .instruction(Instruction::LoadUndefined { dst: r(1) })
        .instruction(Instruction::CreateClosure { dst: r(2), func: FunctionIndex(0) })
        .instruction(Instruction::LoadInt32 { dst: r(3), value: 21 })
        .instruction(Instruction::Call { base: r(1), argc: 1 })
        .instruction(Instruction::Move { dst: r(0), src: r(1) })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    assert_eq!(run(global).unwrap().as_int32(), Some(42));
}

#[test]
fn test_block_scope_shadows_and_exits() {
    let mut builder = CodeUnit::builder().block_scope(BlockScope::new(["v"]));
    let v = name(&mut builder, "v");
    let unit = builder
        .instruction(Instruction::DeclareVar { name: v })
        .instruction(Instruction::LoadInt32 { dst: r(1), value: 1 })
        .instruction(Instruction::StoreName { name: v, src: r(1) })
        .instruction(Instruction::EnterScope { layout: 0 })
        .instruction(Instruction::LoadInt32 { dst: r(1), value: 2 })
        .instruction(Instruction::StoreName { name: v, src: r(1) })
        .instruction(Instruction::ExitScope)
        .instruction(Instruction::LoadName { dst: r(0), name: v })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    assert_eq!(run(unit).unwrap().as_int32(), Some(1));
}

#[test]
fn test_jump_unwind_pops_block_scopes() {
    // two nested blocks each shadow `v`; a break jumps out of both
    let mut builder = CodeUnit::builder()
        .block_scope(BlockScope::new(["v"]))
        .block_scope(BlockScope::new(["v"]));
    let v = name(&mut builder, "v");
    let unit = builder
        .instruction(Instruction::DeclareVar { name: v })
        .instruction(Instruction::LoadInt32 { dst: r(1), value: 1 })
        .instruction(Instruction::StoreName { name: v, src: r(1) })
        .instruction(Instruction::EnterScope { layout: 0 })
        .instruction(Instruction::EnterScope { layout: 1 })
        .instruction(Instruction::LoadInt32 { dst: r(1), value: 3 })
        .instruction(Instruction::StoreName { name: v, src: r(1) })
        .instruction(Instruction::JumpUnwind { target: JumpTarget(10), depth: 2 })
        .instruction(Instruction::ExitScope)
        .instruction(Instruction::ExitScope)
        .instruction(Instruction::LoadName { dst: r(0), name: v })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    assert_eq!(run(unit).unwrap().as_int32(), Some(1));
}

#[test]
fn test_unwind_past_open_scopes_is_internal_error() {
    let unit = CodeUnit::builder()
        .instruction(Instruction::JumpUnwind { target: JumpTarget(1), depth: 1 })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    assert!(matches!(run(unit).unwrap_err(), VmError::InternalError(_)));
}

#[test]
fn test_with_scope_resolves_object_properties() {
    let mut builder = CodeUnit::builder();
    let p = name(&mut builder, "p");
    let unit = builder
        .instruction(Instruction::NewObject { dst: r(1) })
        .instruction(Instruction::LoadInt32 { dst: r(2), value: 5 })
        .instruction(Instruction::SetProp { obj: r(1), name: p, val: r(2), ic_index: 0 })
        .instruction(Instruction::EnterWith { obj: r(1) })
        .instruction(Instruction::LoadName { dst: r(0), name: p })
        .instruction(Instruction::ExitScope)
        .instruction(Instruction::End)
        .build()
        .unwrap();
    assert_eq!(run(unit).unwrap().as_int32(), Some(5));
}

#[test]
fn test_with_on_primitive_is_type_error() {
    let unit = CodeUnit::builder()
        .instruction(Instruction::LoadInt32 { dst: r(0), value: 1 })
        .instruction(Instruction::EnterWith { obj: r(0) })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    assert!(run(unit).unwrap_err().is_type_error());
}

#[test]
fn test_stack_bindings() {
    let unit = CodeUnit::builder()
        .stack_size(2)
        .instruction(Instruction::LoadInt32 { dst: r(1), value: 9 })
        .instruction(Instruction::StoreStack { idx: StackIndex(1), src: r(1) })
        .instruction(Instruction::LoadStack { dst: r(0), idx: StackIndex(1) })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    assert_eq!(run(unit).unwrap().as_int32(), Some(9));
}

fn global_store_unit(strict: bool) -> CodeUnit {
    let mut builder = CodeUnit::builder().is_strict(strict);
    let g = name(&mut builder, "fresh");
    builder
        .instruction(Instruction::LoadInt32 { dst: r(1), value: 4 })
        .instruction(Instruction::StoreGlobal { name: g, src: r(1), ic_index: 0 })
        .instruction(Instruction::LoadGlobal { dst: r(0), name: g, ic_index: 1 })
        .instruction(Instruction::End)
        .build()
        .unwrap()
}

#[test]
fn test_sloppy_global_store_creates_property() {
    let mut interp = Interpreter::new();
    assert_eq!(run_with(&mut interp, global_store_unit(false)).unwrap().as_int32(), Some(4));
    let global = interp.realm().global_object();
    assert_eq!(global.get(&PropertyKey::from("fresh")).as_int32(), Some(4));
}

#[test]
fn test_strict_global_store_to_missing_name() {
    assert!(run(global_store_unit(true)).unwrap_err().is_reference_error());

    let mut interp = Interpreter::with_config(InterpreterConfig::default().with_strict_by_default(true));
    assert!(run_with(&mut interp, global_store_unit(false)).unwrap_err().is_reference_error());
}

#[test]
fn test_missing_global_load() {
    let mut builder = CodeUnit::builder();
    let g = name(&mut builder, "nowhere");
    let unit = builder
        .instruction(Instruction::LoadGlobal { dst: r(0), name: g, ic_index: 0 })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    assert!(run(unit).unwrap_err().is_reference_error());
}

#[test]
fn test_read_only_global_store() {
    let mut builder = CodeUnit::builder().is_strict(true);
    let nan = name(&mut builder, "NaN");
    let unit = builder
        .instruction(Instruction::LoadInt32 { dst: r(1), value: 1 })
        .instruction(Instruction::StoreGlobal { name: nan, src: r(1), ic_index: 0 })
        .instruction(Instruction::End)
        .build()
        .unwrap();
    assert!(run(unit).unwrap_err().is_type_error());
}

#[test]
fn test_dropping_interpreter_frees_global_closures() {
    // var f = function () { g = () => this; return this; }; f(); return g();
    let arrow = CodeUnit::builder()
        .is_arrow(true)
        .instruction(Instruction::LoadThis { dst: r(0) })
        .instruction(Instruction::Return { src: r(0) })
        .build()
        .unwrap();
    let mut f = CodeUnit::builder();
    let g = name(&mut f, "g");
    let f = f
        .function(arrow)
        .instruction(Instruction::CreateClosure { dst: r(0), func: FunctionIndex(0) })
        .instruction(Instruction::StoreGlobal { name: g, src: r(0), ic_index: 0 })
        .instruction(Instruction::LoadThis { dst: r(1) })
        .instruction(Instruction::Return { src: r(1) })
        .build()
        .unwrap();

    let mut outer = CodeUnit::builder();
    let f_name = name(&mut outer, "f");
    let g_name = name(&mut outer, "g");
    let outer = outer
        .function(f)
        .instruction(Instruction::CreateClosure { dst: r(3), func: FunctionIndex(0) })
        .instruction(Instruction::StoreGlobal { name: f_name, src: r(3), ic_index: 0 })
        .instruction(Instruction::LoadUndefined { dst: r(2) })
        .instruction(Instruction::Call { base: r(2), argc: 0 })
        .instruction(Instruction::LoadGlobal { dst: r(5), name: g_name, ic_index: 1 })
        .instruction(Instruction::LoadUndefined { dst: r(4) })
        .instruction(Instruction::Call { base: r(4), argc: 0 })
        .instruction(Instruction::Move { dst: r(0), src: r(4) })
        .instruction(Instruction::End)
        .build()
        .unwrap();

    let mut interp = Interpreter::new();
    let this = run_with(&mut interp, outer).unwrap();
    let global = interp.realm().global_object();
    assert!(Arc::ptr_eq(this.as_object().unwrap(), global));
    drop(this);

    let f = global.get(&PropertyKey::from("f"));
    let realm = Arc::downgrade(interp.realm());
    let global = Arc::downgrade(global);
    let global_scope = Arc::downgrade(interp.realm().global_scope());
    drop(interp);
    assert!(realm.upgrade().is_none());
    assert!(global.upgrade().is_none());
    assert!(global_scope.upgrade().is_none());

    // a closure held past its realm fails instead of resolving names
    let err = Interpreter::new().call(&f, Value::Undefined, &[]).unwrap_err();
    assert!(matches!(err, VmError::InternalError(ref m) if m.contains("realm")));
}
