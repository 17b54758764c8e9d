//! Realm: global object, global scope and intrinsics
//!
//! Only the intrinsics the interpreter itself depends on are installed:
//! the prototypes primitive receivers resolve through, the `valueOf` /
//! `toString` pairs used by ToPrimitive, and the intrinsic `eval` that
//! `CallEval` compares against.

use crate::call::NativeCall;
use crate::code::CompiledCode;
use crate::convert::number_to_string;
use crate::error::VmResult;
use crate::interpreter::Interpreter;
use crate::object::{
    FunctionKind, JsObject, NativeFn, NativeFunction, ObjectKind, PropertyAttributes, PropertyKey, ScriptFunction,
};
use crate::scope::{Scope, ScopeLink};
use crate::shape::Shape;
use crate::value::Value;
use std::sync::Arc;
use tracing::debug;

/// Global state shared by every frame of one interpreter
pub struct Realm {
    root_shape: Arc<Shape>,
    object_prototype: Arc<JsObject>,
    function_prototype: Arc<JsObject>,
    array_prototype: Arc<JsObject>,
    string_prototype: Arc<JsObject>,
    number_prototype: Arc<JsObject>,
    boolean_prototype: Arc<JsObject>,
    date_prototype: Arc<JsObject>,
    global_object: Arc<JsObject>,
    global_scope: Arc<Scope>,
    intrinsic_eval: Arc<JsObject>,
}

fn plain(root: &Arc<Shape>, proto: Option<&Arc<JsObject>>) -> Arc<JsObject> {
    Arc::new(JsObject::new(ObjectKind::Ordinary, proto.cloned(), Arc::clone(root)))
}

fn native(
    root: &Arc<Shape>,
    function_proto: &Arc<JsObject>,
    name: &str,
    param_count: u16,
    func: NativeFn,
) -> Arc<JsObject> {
    let kind = FunctionKind::Native(NativeFunction {
        name: name.to_string(),
        param_count,
        func,
        alloc: None,
    });
    Arc::new(JsObject::new(
        ObjectKind::Function(kind),
        Some(Arc::clone(function_proto)),
        Arc::clone(root),
    ))
}

fn native_fn<F>(func: F) -> NativeFn
where
    F: Fn(&mut Interpreter, &NativeCall) -> VmResult<Value> + Send + Sync + 'static,
{
    Arc::new(func)
}

fn install(target: &JsObject, root: &Arc<Shape>, function_proto: &Arc<JsObject>, name: &str, func: NativeFn) {
    let method = native(root, function_proto, name, 0, func);
    target.define_value(PropertyKey::from(name), Value::Object(method), PropertyAttributes::builtin());
}

fn object_to_string(_: &mut Interpreter, call: &NativeCall) -> VmResult<Value> {
    let tag = match &call.this {
        Value::Undefined => "Undefined",
        Value::Null => "Null",
        Value::Object(obj) => obj.class_name(),
        Value::Boolean(_) => "Boolean",
        Value::Int32(_) | Value::Double(_) => "Number",
        Value::String(_) => "String",
    };
    Ok(Value::string(&format!("[object {tag}]")))
}

fn array_to_string(interp: &mut Interpreter, call: &NativeCall) -> VmResult<Value> {
    let Some(array) = call.this.as_object().filter(|o| o.is_array()) else {
        return object_to_string(interp, call);
    };
    let mut parts = Vec::with_capacity(array.array_length() as usize);
    for index in 0..array.array_length() {
        let element = array.get(&PropertyKey::Index(index));
        if element.is_nullish() {
            parts.push(String::new());
        } else {
            parts.push(interp.to_string(&element)?.as_str().to_string());
        }
    }
    Ok(Value::computed_string(parts.join(",")))
}

fn date_value_of(_: &mut Interpreter, call: &NativeCall) -> VmResult<Value> {
    Ok(match call.this.as_object().map(|o| o.kind()) {
        Some(ObjectKind::Date(time)) => Value::number(*time),
        _ => Value::double(f64::NAN),
    })
}

fn date_to_string(_: &mut Interpreter, call: &NativeCall) -> VmResult<Value> {
    // calendar formatting belongs to the standard library
    Ok(match call.this.as_object().map(|o| o.kind()) {
        Some(ObjectKind::Date(time)) if time.is_finite() => {
            Value::computed_string(format!("Date({})", number_to_string(*time)))
        }
        _ => Value::string("Invalid Date"),
    })
}

impl Realm {
    /// Build a realm with its intrinsics and global object
    pub fn new() -> Arc<Self> {
        let root = Shape::root();
        let object_prototype = plain(&root, None);
        let function_prototype = plain(&root, Some(&object_prototype));
        let array_prototype = Arc::new(JsObject::array(
            0,
            Some(Arc::clone(&object_prototype)),
            Arc::clone(&root),
        ));
        let string_prototype = plain(&root, Some(&object_prototype));
        let number_prototype = plain(&root, Some(&object_prototype));
        let boolean_prototype = plain(&root, Some(&object_prototype));
        let date_prototype = plain(&root, Some(&object_prototype));

        let methods = [
            (&object_prototype, "valueOf", native_fn(|_, call| Ok(call.this.clone()))),
            (&object_prototype, "toString", native_fn(object_to_string)),
            (&array_prototype, "toString", native_fn(array_to_string)),
            (&date_prototype, "valueOf", native_fn(date_value_of)),
            (&date_prototype, "toString", native_fn(date_to_string)),
        ];
        for (target, name, func) in methods {
            install(target, &root, &function_prototype, name, func);
        }

        let global_object = plain(&root, Some(&object_prototype));
        for (name, value) in [
            ("undefined", Value::Undefined),
            ("NaN", Value::double(f64::NAN)),
            ("Infinity", Value::double(f64::INFINITY)),
        ] {
            global_object.add_property(PropertyKey::from(name), value, PropertyAttributes::frozen());
        }

        let intrinsic_eval = native(
            &root,
            &function_prototype,
            "eval",
            1,
            native_fn(|interp, call| interp.indirect_eval(call.actual_args().first())),
        );
        global_object.add_property(
            PropertyKey::from("eval"),
            Value::Object(Arc::clone(&intrinsic_eval)),
            PropertyAttributes::builtin(),
        );

        let global_scope = Scope::global(Arc::clone(&global_object));
        debug!(globals = global_object.shape().property_count(), "realm created");

        Arc::new(Self {
            root_shape: root,
            object_prototype,
            function_prototype,
            array_prototype,
            string_prototype,
            number_prototype,
            boolean_prototype,
            date_prototype,
            global_object,
            global_scope,
            intrinsic_eval,
        })
    }

    /// Empty shape every object starts from
    pub fn root_shape(&self) -> &Arc<Shape> {
        &self.root_shape
    }

    /// The global object
    pub fn global_object(&self) -> &Arc<JsObject> {
        &self.global_object
    }

    /// The global scope over the global object
    pub fn global_scope(&self) -> &Arc<Scope> {
        &self.global_scope
    }

    /// The `eval` function `CallEval` treats as direct eval
    pub fn intrinsic_eval(&self) -> &Arc<JsObject> {
        &self.intrinsic_eval
    }

    /// `Object.prototype`
    pub fn object_prototype(&self) -> &Arc<JsObject> {
        &self.object_prototype
    }

    /// `Function.prototype`
    pub fn function_prototype(&self) -> &Arc<JsObject> {
        &self.function_prototype
    }

    /// `Array.prototype`
    pub fn array_prototype(&self) -> &Arc<JsObject> {
        &self.array_prototype
    }

    /// Prototype a primitive receiver resolves properties through
    pub fn prototype_for_primitive(&self, value: &Value) -> Option<&Arc<JsObject>> {
        match value {
            Value::Boolean(_) => Some(&self.boolean_prototype),
            Value::Int32(_) | Value::Double(_) => Some(&self.number_prototype),
            Value::String(_) => Some(&self.string_prototype),
            Value::Undefined | Value::Null | Value::Object(_) => None,
        }
    }

    /// A plain object inheriting from `Object.prototype`
    pub fn new_object(&self) -> Arc<JsObject> {
        plain(&self.root_shape, Some(&self.object_prototype))
    }

    /// A plain object with an explicit prototype
    pub fn new_object_with_proto(&self, prototype: Option<Arc<JsObject>>) -> Arc<JsObject> {
        Arc::new(JsObject::new(ObjectKind::Ordinary, prototype, Arc::clone(&self.root_shape)))
    }

    /// An array of `len` holes
    pub fn new_array(&self, len: u32) -> Arc<JsObject> {
        Arc::new(JsObject::array(
            len,
            Some(Arc::clone(&self.array_prototype)),
            Arc::clone(&self.root_shape),
        ))
    }

    /// A date object holding a time value
    pub fn new_date(&self, time: f64) -> Arc<JsObject> {
        Arc::new(JsObject::new(
            ObjectKind::Date(time),
            Some(Arc::clone(&self.date_prototype)),
            Arc::clone(&self.root_shape),
        ))
    }

    /// A native function that cannot be used with `new`
    pub fn new_native_function<F>(&self, name: &str, param_count: u16, func: F) -> Arc<JsObject>
    where
        F: Fn(&mut Interpreter, &NativeCall) -> VmResult<Value> + Send + Sync + 'static,
    {
        native(&self.root_shape, &self.function_prototype, name, param_count, Arc::new(func))
    }

    /// A native constructor; `alloc` creates the receiver for `new`
    pub fn new_native_constructor<F, A>(&self, name: &str, param_count: u16, func: F, alloc: A) -> Arc<JsObject>
    where
        F: Fn(&mut Interpreter, &NativeCall) -> VmResult<Value> + Send + Sync + 'static,
        A: Fn(&Realm) -> Arc<JsObject> + Send + Sync + 'static,
    {
        let kind = FunctionKind::Native(NativeFunction {
            name: name.to_string(),
            param_count,
            func: Arc::new(func),
            alloc: Some(Arc::new(alloc)),
        });
        self.function_object(kind)
    }

    /// A closure over `code` capturing `scope`
    pub fn new_script_function(&self, code: Arc<CompiledCode>, scope: &Arc<Scope>) -> Arc<JsObject> {
        let scope = ScopeLink::new(scope);
        self.function_object(FunctionKind::Script(ScriptFunction { code, scope }))
    }

    fn function_object(&self, kind: FunctionKind) -> Arc<JsObject> {
        let is_constructor = kind.is_constructor();
        let func = Arc::new(JsObject::new(
            ObjectKind::Function(kind),
            Some(Arc::clone(&self.function_prototype)),
            Arc::clone(&self.root_shape),
        ));
        if is_constructor {
            func.add_property(
                PropertyKey::from("prototype"),
                Value::Object(self.new_object()),
                PropertyAttributes {
                    enumerable: false,
                    configurable: false,
                    writable: true,
                },
            );
        }
        func
    }

    /// Define or overwrite a global binding
    pub fn define_global(&self, name: &str, value: Value) {
        self.global_object
            .define_value(PropertyKey::from(name), value, PropertyAttributes::builtin());
    }
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realm")
            .field("globals", &self.global_object.shape().property_count())
            .finish()
    }
}
