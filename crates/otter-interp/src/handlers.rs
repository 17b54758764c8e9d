//! Instruction handlers
//!
//! One function per opcode. A handler reads its operands from the frame,
//! consults the other components and reports an [`InstructionResult`].

use crate::code::CompiledCode;
use crate::dispatch::{Handler, InstructionResult};
use crate::error::{VmError, VmResult};
use crate::frame::ExecutionFrame;
use crate::ic::{self, GlobalStore};
use crate::interpreter::Interpreter;
use crate::object::{JsObject, PropertyAttributes, PropertyKey};
use crate::scope::{DeclarativeRecord, Scope};
use crate::value::Value;
use otter_interp_bytecode::{Constant, ConstantIndex, Instruction, Opcode};
use smallvec::SmallVec;
use std::sync::Arc;

use InstructionResult::{Continue, Jump, Return};

/// Largest length accepted by `NewArray`
const MAX_ARRAY_PREALLOC: u32 = 1 << 24;

type Outcome = VmResult<InstructionResult>;

#[cold]
#[inline(never)]
fn mismatch(opcode: Opcode, insn: &Instruction) -> ! {
    panic!("{} handler invoked with {insn:?}", opcode.name())
}

fn constant_name(code: &CompiledCode, idx: ConstantIndex) -> VmResult<&str> {
    code.unit()
        .constants
        .get_str(idx.0)
        .ok_or_else(|| VmError::internal(format!("constant {} is not a name", idx.0)))
}

macro_rules! binary_handler {
    ($handler:ident, $variant:ident, $op:expr) => {
        fn $handler(interp: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
            let &Instruction::$variant { dst, lhs, rhs } = insn else {
                mismatch(Opcode::$variant, insn)
            };
            let op: fn(&mut Interpreter, &Value, &Value) -> VmResult<Value> = $op;
            let lhs = frame.reg(lhs).clone();
            let rhs = frame.reg(rhs).clone();
            let result = op(interp, &lhs, &rhs)?;
            frame.set_reg(dst, result);
            Ok(Continue)
        }
    };
}

macro_rules! unary_handler {
    ($handler:ident, $variant:ident, $op:expr) => {
        fn $handler(interp: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
            let &Instruction::$variant { dst, src } = insn else {
                mismatch(Opcode::$variant, insn)
            };
            let op: fn(&mut Interpreter, &Value) -> VmResult<Value> = $op;
            let src = frame.reg(src).clone();
            let result = op(interp, &src)?;
            frame.set_reg(dst, result);
            Ok(Continue)
        }
    };
}

macro_rules! load_handler {
    ($handler:ident, $variant:ident, $value:expr) => {
        fn $handler(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
            let &Instruction::$variant { dst } = insn else {
                mismatch(Opcode::$variant, insn)
            };
            frame.set_reg(dst, $value);
            Ok(Continue)
        }
    };
}

// ---- constants ----

load_handler!(load_undefined, LoadUndefined, Value::Undefined);
load_handler!(load_null, LoadNull, Value::Null);
load_handler!(load_true, LoadTrue, Value::Boolean(true));
load_handler!(load_false, LoadFalse, Value::Boolean(false));

fn load_int32(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::LoadInt32 { dst, value } = insn else {
        mismatch(Opcode::LoadInt32, insn)
    };
    frame.set_reg(dst, Value::Int32(value));
    Ok(Continue)
}

fn load_const(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::LoadConst { dst, idx } = insn else {
        mismatch(Opcode::LoadConst, insn)
    };
    let value = match frame.code.unit().constants.get(idx.0) {
        Some(Constant::Number(n)) => Value::number(*n),
        Some(Constant::String(s)) => Value::string(s),
        None => return Err(VmError::internal(format!("constant {} out of range", idx.0))),
    };
    frame.set_reg(dst, value);
    Ok(Continue)
}

// ---- variables ----

fn load_stack(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::LoadStack { dst, idx } = insn else {
        mismatch(Opcode::LoadStack, insn)
    };
    let value = frame.stack_slot(idx).clone();
    frame.set_reg(dst, value);
    Ok(Continue)
}

fn store_stack(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::StoreStack { idx, src } = insn else {
        mismatch(Opcode::StoreStack, insn)
    };
    let value = frame.reg(src).clone();
    frame.set_stack_slot(idx, value);
    Ok(Continue)
}

fn heap_record(frame: &ExecutionFrame, hops: u16) -> VmResult<&DeclarativeRecord> {
    frame
        .scope()
        .heap_record(hops)
        .ok_or_else(|| VmError::internal(format!("no declarative scope {hops} hops out")))
}

fn load_heap(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::LoadHeap { dst, hops, idx } = insn else {
        mismatch(Opcode::LoadHeap, insn)
    };
    let value = heap_record(frame, hops)?
        .get(idx as usize)
        .ok_or_else(|| VmError::internal(format!("heap slot {idx} out of range")))?;
    frame.set_reg(dst, value);
    Ok(Continue)
}

fn store_heap(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::StoreHeap { hops, idx, src } = insn else {
        mismatch(Opcode::StoreHeap, insn)
    };
    let value = frame.reg(src).clone();
    if !heap_record(frame, hops)?.set(idx as usize, value) {
        return Err(VmError::internal(format!("heap slot {idx} out of range")));
    }
    Ok(Continue)
}

fn load_name(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::LoadName { dst, name } = insn else {
        mismatch(Opcode::LoadName, insn)
    };
    let code = Arc::clone(&frame.code);
    let value = frame.scope().get_binding(constant_name(&code, name)?)?;
    frame.set_reg(dst, value);
    Ok(Continue)
}

fn store_name(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::StoreName { name, src } = insn else {
        mismatch(Opcode::StoreName, insn)
    };
    let code = Arc::clone(&frame.code);
    let value = frame.reg(src).clone();
    frame
        .scope()
        .set_binding(constant_name(&code, name)?, value, frame.strict)?;
    Ok(Continue)
}

fn declare_var(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::DeclareVar { name } = insn else {
        mismatch(Opcode::DeclareVar, insn)
    };
    let code = Arc::clone(&frame.code);
    frame.scope().declare_binding(constant_name(&code, name)?);
    Ok(Continue)
}

fn load_global(interp: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::LoadGlobal { dst, name, ic_index } = insn else {
        mismatch(Opcode::LoadGlobal, insn)
    };
    let code = Arc::clone(&frame.code);
    let name = constant_name(&code, name)?;
    let key = PropertyKey::from(name);
    let global = Arc::clone(interp.realm().global_object());
    let found = {
        let mut slot = code.feedback().lock(ic_index)?;
        ic::cached_global_get(&mut slot, &global, &key)
    };
    let value = found.ok_or_else(|| VmError::reference_error(format!("{name} is not defined")))?;
    frame.set_reg(dst, value);
    Ok(Continue)
}

fn store_global(interp: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::StoreGlobal { name, src, ic_index } = insn else {
        mismatch(Opcode::StoreGlobal, insn)
    };
    let code = Arc::clone(&frame.code);
    let name = constant_name(&code, name)?;
    let key = PropertyKey::from(name);
    let global = Arc::clone(interp.realm().global_object());
    let value = frame.reg(src).clone();

    let mut slot = code.feedback().lock(ic_index)?;
    match ic::cached_global_set(&mut slot, &global, &key, value.clone()) {
        GlobalStore::Done => {}
        GlobalStore::ReadOnly if frame.strict => {
            return Err(VmError::type_error(format!(
                "Cannot assign to read only property '{name}' of object"
            )));
        }
        GlobalStore::ReadOnly => {}
        GlobalStore::Missing if frame.strict => {
            return Err(VmError::reference_error(format!("{name} is not defined")));
        }
        GlobalStore::Missing => {
            global.add_property(key.clone(), Value::Undefined, PropertyAttributes::data());
            ic::cached_global_set(&mut slot, &global, &key, value);
        }
    }
    Ok(Continue)
}

fn load_this(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::LoadThis { dst } = insn else {
        mismatch(Opcode::LoadThis, insn)
    };
    let value = frame.this_value();
    frame.set_reg(dst, value);
    Ok(Continue)
}

fn load_argument(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::LoadArgument { dst, idx } = insn else {
        mismatch(Opcode::LoadArgument, insn)
    };
    let value = frame.arguments().get(idx as usize).cloned().unwrap_or_default();
    frame.set_reg(dst, value);
    Ok(Continue)
}

fn argument_count(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::ArgumentCount { dst } = insn else {
        mismatch(Opcode::ArgumentCount, insn)
    };
    let count = Value::number(frame.arguments().len() as f64);
    frame.set_reg(dst, count);
    Ok(Continue)
}

// ---- arithmetic, bitwise, comparison ----

binary_handler!(add, Add, Interpreter::add);
binary_handler!(sub, Sub, Interpreter::sub);
binary_handler!(mul, Mul, Interpreter::multiply);
binary_handler!(div, Div, Interpreter::divide);
binary_handler!(modulo, Mod, Interpreter::modulo);
binary_handler!(bit_and, BitAnd, Interpreter::bit_and);
binary_handler!(bit_or, BitOr, Interpreter::bit_or);
binary_handler!(bit_xor, BitXor, Interpreter::bit_xor);
binary_handler!(shl, Shl, Interpreter::shl);
binary_handler!(shr, Shr, Interpreter::shr);
binary_handler!(ushr, Ushr, Interpreter::ushr);

binary_handler!(eq, Eq, |i, l, r| i.loose_equals(l, r).map(Value::Boolean));
binary_handler!(ne, Ne, |i, l, r| i.loose_equals(l, r).map(|b| Value::Boolean(!b)));
binary_handler!(strict_eq, StrictEq, |_, l, r| Ok(Value::Boolean(l.strict_equals(r))));
binary_handler!(strict_ne, StrictNe, |_, l, r| Ok(Value::Boolean(!l.strict_equals(r))));
binary_handler!(lt, Lt, |i, l, r| i.less_than(l, r, true).map(Value::Boolean));
binary_handler!(le, Le, |i, l, r| i.less_than_or_equal(l, r, true).map(Value::Boolean));
// `a > b` is `b < a` with the left operand still converted first
binary_handler!(gt, Gt, |i, l, r| i.less_than(r, l, false).map(Value::Boolean));
binary_handler!(ge, Ge, |i, l, r| i.less_than_or_equal(r, l, false).map(Value::Boolean));

unary_handler!(neg, Neg, Interpreter::negate);
unary_handler!(plus, Plus, Interpreter::unary_plus);
unary_handler!(inc, Inc, Interpreter::increment);
unary_handler!(dec, Dec, Interpreter::decrement);
unary_handler!(bit_not, BitNot, Interpreter::bit_not);
unary_handler!(not, Not, |_, v| Ok(Value::Boolean(!v.to_boolean())));
unary_handler!(type_of, TypeOf, |_, v| Ok(Value::string(v.type_of())));
unary_handler!(move_value, Move, |_, v| Ok(v.clone()));

// ---- property access ----

fn primitive_get(interp: &Interpreter, receiver: &Value, key: &PropertyKey) -> VmResult<Value> {
    match receiver {
        Value::Undefined | Value::Null => Err(VmError::type_error(format!(
            "Cannot read properties of {} (reading '{key}')",
            receiver.describe()
        ))),
        Value::String(s) if key.is_named("length") => Ok(Value::number(s.len_utf16() as f64)),
        Value::String(s) if key.as_index().is_some() => Ok(key
            .as_index()
            .and_then(|i| s.code_unit_at(i as usize))
            .map(Value::String)
            .unwrap_or_default()),
        _ => Ok(interp
            .realm()
            .prototype_for_primitive(receiver)
            .map(|proto| proto.get(key))
            .unwrap_or_default()),
    }
}

/// Failed write on a primitive receiver: nullish always throws, other
/// primitives only in strict code
fn primitive_set(receiver: &Value, key: &PropertyKey, strict: bool) -> VmResult<()> {
    if receiver.is_nullish() {
        return Err(VmError::type_error(format!(
            "Cannot set properties of {} (setting '{key}')",
            receiver.describe()
        )));
    }
    if strict {
        return Err(VmError::type_error(format!(
            "Cannot create property '{key}' on {} '{}'",
            receiver.type_of(),
            receiver.describe()
        )));
    }
    Ok(())
}

fn rejected_write(obj: &JsObject, key: &PropertyKey) -> VmError {
    VmError::type_error(format!(
        "Cannot assign to read only property '{key}' of {}",
        obj.describe()
    ))
}

fn get_prop(interp: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::GetProp { dst, obj, name, ic_index } = insn else {
        mismatch(Opcode::GetProp, insn)
    };
    let code = Arc::clone(&frame.code);
    let key = PropertyKey::from(constant_name(&code, name)?);
    let value = match frame.reg(obj) {
        Value::Object(receiver) => {
            let mut slot = code.feedback().lock(ic_index)?;
            ic::cached_get(&mut slot, receiver, &key, interp.config())
        }
        primitive => primitive_get(interp, primitive, &key)?,
    };
    frame.set_reg(dst, value);
    Ok(Continue)
}

fn set_prop(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::SetProp { obj, name, val, ic_index } = insn else {
        mismatch(Opcode::SetProp, insn)
    };
    let code = Arc::clone(&frame.code);
    let key = PropertyKey::from(constant_name(&code, name)?);
    let value = frame.reg(val).clone();
    match frame.reg(obj) {
        Value::Object(receiver) => {
            let written = {
                let mut slot = code.feedback().lock(ic_index)?;
                ic::cached_set(&mut slot, receiver, &key, value)
            };
            if !written && frame.strict {
                return Err(rejected_write(receiver, &key));
            }
        }
        primitive => primitive_set(primitive, &key, frame.strict)?,
    }
    Ok(Continue)
}

fn get_elem(interp: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::GetElem { dst, obj, key } = insn else {
        mismatch(Opcode::GetElem, insn)
    };
    let receiver = frame.reg(obj).clone();
    let key = frame.reg(key).clone();

    if let (Value::Object(array), Value::Int32(index)) = (&receiver, &key)
        && *index >= 0
        && let Some(value) = array.get_element(*index as u32)
    {
        frame.set_reg(dst, value);
        return Ok(Continue);
    }

    if receiver.is_nullish() {
        return Err(VmError::type_error(format!(
            "Cannot read properties of {} (reading '{}')",
            receiver.describe(),
            key.describe()
        )));
    }
    let key = interp.to_property_key(&key)?;
    let value = match &receiver {
        Value::Object(obj) => obj.get(&key),
        primitive => primitive_get(interp, primitive, &key)?,
    };
    frame.set_reg(dst, value);
    Ok(Continue)
}

fn set_elem(interp: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::SetElem { obj, key, val } = insn else {
        mismatch(Opcode::SetElem, insn)
    };
    let receiver = frame.reg(obj).clone();
    let key = frame.reg(key).clone();
    let value = frame.reg(val).clone();

    if let (Value::Object(array), Value::Int32(index)) = (&receiver, &key)
        && *index >= 0
        && array.set_element(*index as u32, value.clone())
    {
        return Ok(Continue);
    }

    if receiver.is_nullish() {
        return Err(VmError::type_error(format!(
            "Cannot set properties of {} (setting '{}')",
            receiver.describe(),
            key.describe()
        )));
    }
    let key = interp.to_property_key(&key)?;
    match &receiver {
        Value::Object(obj) => {
            if !obj.set(key.clone(), value) && frame.strict {
                return Err(rejected_write(obj, &key));
            }
        }
        primitive => primitive_set(primitive, &key, frame.strict)?,
    }
    Ok(Continue)
}

fn new_object(interp: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::NewObject { dst } = insn else {
        mismatch(Opcode::NewObject, insn)
    };
    frame.set_reg(dst, Value::Object(interp.realm().new_object()));
    Ok(Continue)
}

fn new_array(interp: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::NewArray { dst, len } = insn else {
        mismatch(Opcode::NewArray, insn)
    };
    if len > MAX_ARRAY_PREALLOC {
        return Err(VmError::range_error("Invalid array length"));
    }
    frame.set_reg(dst, Value::Object(interp.realm().new_array(len)));
    Ok(Continue)
}

// ---- functions ----

fn create_closure(interp: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::CreateClosure { dst, func } = insn else {
        mismatch(Opcode::CreateClosure, insn)
    };
    let code = frame
        .code
        .child(func)
        .cloned()
        .ok_or_else(|| VmError::internal(format!("function {} out of range", func.0)))?;
    let closure = interp
        .realm()
        .new_script_function(code, frame.scope());
    frame.set_reg(dst, Value::Object(closure));
    Ok(Continue)
}

fn call(interp: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::Call { base, argc } = insn else {
        mismatch(Opcode::Call, insn)
    };
    let this = frame.reg(base).clone();
    let callee = frame.reg(base.offset(1)).clone();
    let args: SmallVec<[Value; 8]> = frame.reg_window(base.offset(2), argc).iter().cloned().collect();
    let result = interp.call(&callee, this, &args)?;
    frame.set_reg(base, result);
    Ok(Continue)
}

fn construct(interp: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::New { base, argc } = insn else {
        mismatch(Opcode::New, insn)
    };
    let callee = frame.reg(base).clone();
    let args: SmallVec<[Value; 8]> = frame.reg_window(base.offset(1), argc).iter().cloned().collect();
    let result = interp.construct(&callee, &args)?;
    frame.set_reg(base, result);
    Ok(Continue)
}

fn call_eval(interp: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::CallEval { base, argc } = insn else {
        mismatch(Opcode::CallEval, insn)
    };
    let args: SmallVec<[Value; 8]> = frame.reg_window(base, argc).iter().cloned().collect();
    let result = interp.call_eval(frame, &args)?;
    frame.set_reg(base, result);
    Ok(Continue)
}

fn return_value(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::Return { src } = insn else {
        mismatch(Opcode::Return, insn)
    };
    Ok(Return(frame.reg(src).clone()))
}

fn return_undefined(_: &mut Interpreter, _: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let Instruction::ReturnUndefined = insn else {
        mismatch(Opcode::ReturnUndefined, insn)
    };
    Ok(Return(Value::Undefined))
}

fn end(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let Instruction::End = insn else {
        mismatch(Opcode::End, insn)
    };
    Ok(Return(frame.completion()))
}

// ---- control flow ----

fn jump(_: &mut Interpreter, _: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::Jump { target } = insn else {
        mismatch(Opcode::Jump, insn)
    };
    Ok(Jump(target.index()))
}

fn jump_if_true(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::JumpIfTrue { cond, target } = insn else {
        mismatch(Opcode::JumpIfTrue, insn)
    };
    Ok(if frame.reg(cond).to_boolean() {
        Jump(target.index())
    } else {
        Continue
    })
}

fn jump_if_false(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::JumpIfFalse { cond, target } = insn else {
        mismatch(Opcode::JumpIfFalse, insn)
    };
    Ok(if frame.reg(cond).to_boolean() {
        Continue
    } else {
        Jump(target.index())
    })
}

fn jump_unwind(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::JumpUnwind { target, depth } = insn else {
        mismatch(Opcode::JumpUnwind, insn)
    };
    if depth as usize > frame.block_depth() {
        return Err(VmError::internal(format!(
            "cannot unwind {depth} scopes from depth {}",
            frame.block_depth()
        )));
    }
    for _ in 0..depth {
        frame.pop_scope();
    }
    Ok(Jump(target.index()))
}

// ---- scopes ----

fn enter_scope(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::EnterScope { layout } = insn else {
        mismatch(Opcode::EnterScope, insn)
    };
    let code = Arc::clone(&frame.code);
    let layout = code
        .unit()
        .block_scopes
        .get(layout as usize)
        .ok_or_else(|| VmError::internal(format!("block scope {layout} out of range")))?;
    let scope = Scope::declarative(
        Arc::clone(frame.scope()),
        &layout.bindings,
        layout.bindings.len(),
        None,
    );
    frame.push_scope(scope);
    Ok(Continue)
}

fn enter_with(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::EnterWith { obj } = insn else {
        mismatch(Opcode::EnterWith, insn)
    };
    let Value::Object(target) = frame.reg(obj).clone() else {
        return Err(VmError::type_error(format!(
            "Cannot use {} as a with scope",
            frame.reg(obj).describe()
        )));
    };
    let scope = Scope::object(Arc::clone(frame.scope()), target);
    frame.push_scope(scope);
    Ok(Continue)
}

fn exit_scope(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let Instruction::ExitScope = insn else {
        mismatch(Opcode::ExitScope, insn)
    };
    if !frame.pop_scope() {
        return Err(VmError::internal("ExitScope without an open block scope"));
    }
    Ok(Continue)
}

fn throw(_: &mut Interpreter, frame: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let &Instruction::Throw { src } = insn else {
        mismatch(Opcode::Throw, insn)
    };
    Err(VmError::exception(frame.reg(src).clone()))
}

fn nop(_: &mut Interpreter, _: &mut ExecutionFrame, insn: &Instruction) -> Outcome {
    let Instruction::Nop = insn else {
        mismatch(Opcode::Nop, insn)
    };
    Ok(Continue)
}

/// Every opcode with its handler
pub(crate) const HANDLERS: &[(Opcode, Handler)] = &[
    (Opcode::LoadUndefined, load_undefined),
    (Opcode::LoadNull, load_null),
    (Opcode::LoadTrue, load_true),
    (Opcode::LoadFalse, load_false),
    (Opcode::LoadInt32, load_int32),
    (Opcode::LoadConst, load_const),
    (Opcode::LoadStack, load_stack),
    (Opcode::StoreStack, store_stack),
    (Opcode::LoadHeap, load_heap),
    (Opcode::StoreHeap, store_heap),
    (Opcode::LoadName, load_name),
    (Opcode::StoreName, store_name),
    (Opcode::DeclareVar, declare_var),
    (Opcode::LoadGlobal, load_global),
    (Opcode::StoreGlobal, store_global),
    (Opcode::LoadThis, load_this),
    (Opcode::LoadArgument, load_argument),
    (Opcode::ArgumentCount, argument_count),
    (Opcode::Add, add),
    (Opcode::Sub, sub),
    (Opcode::Mul, mul),
    (Opcode::Div, div),
    (Opcode::Mod, modulo),
    (Opcode::Neg, neg),
    (Opcode::Plus, plus),
    (Opcode::Inc, inc),
    (Opcode::Dec, dec),
    (Opcode::BitAnd, bit_and),
    (Opcode::BitOr, bit_or),
    (Opcode::BitXor, bit_xor),
    (Opcode::BitNot, bit_not),
    (Opcode::Shl, shl),
    (Opcode::Shr, shr),
    (Opcode::Ushr, ushr),
    (Opcode::Eq, eq),
    (Opcode::StrictEq, strict_eq),
    (Opcode::Ne, ne),
    (Opcode::StrictNe, strict_ne),
    (Opcode::Lt, lt),
    (Opcode::Le, le),
    (Opcode::Gt, gt),
    (Opcode::Ge, ge),
    (Opcode::Not, not),
    (Opcode::TypeOf, type_of),
    (Opcode::GetProp, get_prop),
    (Opcode::SetProp, set_prop),
    (Opcode::GetElem, get_elem),
    (Opcode::SetElem, set_elem),
    (Opcode::NewObject, new_object),
    (Opcode::NewArray, new_array),
    (Opcode::CreateClosure, create_closure),
    (Opcode::Call, call),
    (Opcode::New, construct),
    (Opcode::CallEval, call_eval),
    (Opcode::Return, return_value),
    (Opcode::ReturnUndefined, return_undefined),
    (Opcode::End, end),
    (Opcode::Jump, jump),
    (Opcode::JumpIfTrue, jump_if_true),
    (Opcode::JumpIfFalse, jump_if_false),
    (Opcode::JumpUnwind, jump_unwind),
    (Opcode::EnterScope, enter_scope),
    (Opcode::EnterWith, enter_with),
    (Opcode::ExitScope, exit_scope),
    (Opcode::Throw, throw),
    (Opcode::Move, move_value),
    (Opcode::Nop, nop),
];
