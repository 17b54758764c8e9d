//! Call protocol: ordinary calls, construction and `eval`

use crate::code::CompiledCode;
use crate::error::{VmError, VmResult};
use crate::frame::{ExecutionFrame, FrameSeed};
use crate::interpreter::Interpreter;
use crate::object::{FunctionKind, JsObject, NativeFunction, PropertyKey, ScriptFunction};
use crate::scope::{Scope, ThisBinding};
use crate::value::Value;
use otter_interp_bytecode::CodeUnit;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

/// Arguments handed to a native function
///
/// `args` is padded with undefined up to the function's declared parameter
/// count and never truncated; [`NativeCall::argc`] keeps the actual count.
#[derive(Debug)]
pub struct NativeCall {
    /// Receiver
    pub this: Value,
    args: SmallVec<[Value; 8]>,
    argc: usize,
    /// Invoked through `new`
    pub is_construct: bool,
    /// The function object being called
    pub callee: Arc<JsObject>,
}

impl NativeCall {
    fn new(callee: Arc<JsObject>, param_count: u16, this: Value, args: &[Value], is_construct: bool) -> Self {
        let mut padded: SmallVec<[Value; 8]> = args.iter().cloned().collect();
        if padded.len() < param_count as usize {
            padded.resize(param_count as usize, Value::Undefined);
        }
        Self {
            this,
            args: padded,
            argc: args.len(),
            is_construct,
            callee,
        }
    }

    /// Arguments, padded to the declared parameter count
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Only the arguments actually passed
    pub fn actual_args(&self) -> &[Value] {
        &self.args[..self.argc]
    }

    /// Argument `i`, undefined when absent
    pub fn arg(&self, i: usize) -> Value {
        self.args.get(i).cloned().unwrap_or_default()
    }

    /// Number of arguments actually passed
    pub fn argc(&self) -> usize {
        self.argc
    }
}

/// Compiles source text for direct `eval`
pub trait ScriptCompiler: Send + Sync {
    /// Compile eval code; `strict` is the caller's strictness
    fn compile_eval(&self, source: &str, strict: bool) -> VmResult<Arc<CodeUnit>>;
}

impl<F> ScriptCompiler for F
where
    F: Fn(&str, bool) -> VmResult<Arc<CodeUnit>> + Send + Sync,
{
    fn compile_eval(&self, source: &str, strict: bool) -> VmResult<Arc<CodeUnit>> {
        self(source, strict)
    }
}

impl Interpreter {
    /// Call `callee` with an explicit receiver
    pub fn call(&mut self, callee: &Value, this: Value, args: &[Value]) -> VmResult<Value> {
        let Some(func) = callee.as_object().filter(|o| o.is_callable()) else {
            return Err(VmError::type_error(format!("{} is not a function", callee.describe())));
        };
        self.invoke(func, this, args, false)
    }

    /// `new callee(...args)`
    pub fn construct(&mut self, callee: &Value, args: &[Value]) -> VmResult<Value> {
        let Some(func) = callee.as_object().filter(|o| o.is_callable()) else {
            return Err(VmError::type_error(format!("{} is not a function", callee.describe())));
        };
        let Some(kind) = func.as_function().filter(|f| f.is_constructor()) else {
            return Err(VmError::type_error(format!("{} is not a constructor", callee.describe())));
        };

        let prototype = match func.get(&PropertyKey::from("prototype")) {
            Value::Object(proto) => proto,
            _ => self.realm().new_object(),
        };
        let receiver = match kind {
            FunctionKind::Native(native) => {
                let obj = match &native.alloc {
                    Some(alloc) => alloc(self.realm()),
                    None => self.realm().new_object(),
                };
                obj.set_prototype(Some(prototype));
                obj
            }
            FunctionKind::Script(_) => self.realm().new_object_with_proto(Some(prototype)),
        };

        let receiver = Value::Object(receiver);
        let result = self.invoke(func, receiver.clone(), args, true)?;
        Ok(if result.is_object() { result } else { receiver })
    }

    fn invoke(&mut self, func: &Arc<JsObject>, this: Value, args: &[Value], is_construct: bool) -> VmResult<Value> {
        match func.as_function() {
            Some(FunctionKind::Native(native)) => self.call_native(func, native, this, args, is_construct),
            Some(FunctionKind::Script(script)) => self.call_script(script, this, args, is_construct),
            None => Err(VmError::type_error(format!("{} is not a function", func.describe()))),
        }
    }

    fn call_native(
        &mut self,
        func: &Arc<JsObject>,
        native: &NativeFunction,
        this: Value,
        args: &[Value],
        is_construct: bool,
    ) -> VmResult<Value> {
        let call = NativeCall::new(Arc::clone(func), native.param_count, this, args, is_construct);
        let body = Arc::clone(&native.func);
        self.enter_call()?;
        let result = body(self, &call);
        self.leave_call();
        result
    }

    fn call_script(
        &mut self,
        script: &ScriptFunction,
        this: Value,
        args: &[Value],
        is_construct: bool,
    ) -> VmResult<Value> {
        let unit = script.code.unit();
        let global = self.realm().global_object();
        let this_value = if unit.flags.is_arrow {
            None
        } else if !unit.is_strict() && this.is_nullish() {
            Some(Value::Object(Arc::clone(global)))
        } else {
            Some(this)
        };
        // the scope refers to the global object by marker only
        let this_binding = this_value.as_ref().map(|value| match value.as_object() {
            Some(obj) if Arc::ptr_eq(obj, global) => ThisBinding::Global,
            _ => ThisBinding::Value(value.clone()),
        });

        let outer = script
            .scope
            .upgrade()
            .ok_or_else(|| VmError::internal("closure called after its realm was dropped"))?;
        let scope = Scope::declarative(outer, &unit.heap_bindings, unit.heap_size(), this_binding);
        if unit.params_on_heap
            && let Some(record) = scope.declarative_record()
        {
            for (index, arg) in args.iter().take(unit.param_count as usize).enumerate() {
                record.set(index, arg.clone());
            }
        }

        let mut seed = FrameSeed::new(scope)
            .with_arguments(args.to_vec())
            .constructing(is_construct);
        seed.this_value = this_value;
        self.execute(&script.code, seed)
    }

    /// `CallEval`: direct eval when `eval` resolves to the intrinsic
    pub(crate) fn call_eval(&mut self, frame: &mut ExecutionFrame, args: &[Value]) -> VmResult<Value> {
        let callee = frame.scope().get_binding("eval")?;
        let is_intrinsic = callee
            .as_object()
            .is_some_and(|f| Arc::ptr_eq(f, self.realm().intrinsic_eval()));
        if !is_intrinsic {
            debug!("eval binding shadowed, ordinary call");
            return self.call(&callee, Value::Undefined, args);
        }

        debug!(strict = frame.strict, "direct eval");
        let this_value = frame.this_value();
        let scope = Arc::clone(frame.scope());
        self.eval_code(args.first(), scope, this_value, frame.strict)
    }

    /// Indirect call of the intrinsic eval: global scope, non-strict
    pub(crate) fn indirect_eval(&mut self, source: Option<&Value>) -> VmResult<Value> {
        debug!("indirect eval");
        let scope = Arc::clone(self.realm().global_scope());
        let this_value = Value::Object(Arc::clone(self.realm().global_object()));
        self.eval_code(source, scope, this_value, false)
    }

    fn eval_code(
        &mut self,
        source: Option<&Value>,
        scope: Arc<Scope>,
        this_value: Value,
        strict: bool,
    ) -> VmResult<Value> {
        let Some(source) = source else {
            return Ok(Value::Undefined);
        };
        let Value::String(text) = source else {
            return Ok(source.clone());
        };
        let Some(compiler) = self.compiler().cloned() else {
            return Err(VmError::internal("eval requires a script compiler"));
        };
        let unit = compiler.compile_eval(text.as_str(), strict)?;
        let strict = strict || unit.is_strict();
        // strict eval code gets its own variable environment
        let scope = if strict {
            Scope::declarative(scope, &[], 0, None)
        } else {
            scope
        };
        let code = CompiledCode::new(unit);
        let seed = FrameSeed::new(scope).with_this(this_value).with_strict(strict);
        self.execute(&code, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realm::Realm;

    fn native(realm: &Realm, param_count: u16) -> Arc<JsObject> {
        realm.new_native_function("count_args", param_count, |_, call| {
            Ok(Value::number(call.args().len() as f64 * 10.0 + call.argc() as f64))
        })
    }

    #[test]
    fn test_native_args_padded() {
        let mut interp = Interpreter::new();
        let f = Value::Object(native(interp.realm(), 3));
        let r = interp.call(&f, Value::Undefined, &[Value::int32(1)]).unwrap();
        assert_eq!(r.as_int32(), Some(31));
        let many = [Value::Null, Value::Null, Value::Null, Value::Null];
        let r = interp.call(&f, Value::Undefined, &many).unwrap();
        assert_eq!(r.as_int32(), Some(44));
    }

    #[test]
    fn test_call_non_callable() {
        let mut interp = Interpreter::new();
        let err = interp.call(&Value::int32(3), Value::Undefined, &[]).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_construct_non_constructor() {
        let mut interp = Interpreter::new();
        let f = Value::Object(native(interp.realm(), 0));
        let err = interp.construct(&f, &[]).unwrap_err();
        assert!(matches!(err, VmError::TypeError(ref m) if m.contains("not a constructor")));
    }
}
