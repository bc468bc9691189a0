//! Dynamic values carried by props.
//!
//! Props are an untyped string-keyed bag at the boundary with the output
//! medium; the component author decides their shape per host tag. Values that
//! wrap shared handles (callbacks, refs, opaque payloads) compare by identity,
//! everything else compares structurally.

use std::any::Any;
use std::cell::{Ref as CellRef, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::spec::Spec;
use crate::NodeId;

pub type StyleMap = IndexMap<String, Value>;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Style(StyleMap),
    Callback(Callback),
    Ref(ErasedRef),
    Node(Spec),
    Any(Rc<dyn Any>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Value::Callback(callback) => Some(callback),
            _ => None,
        }
    }

    pub fn as_style(&self) -> Option<&StyleMap> {
        match self {
            Value::Style(style) => Some(style),
            _ => None,
        }
    }

    /// Downcasts an opaque payload.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Any(payload) => payload.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// String coercion used for text specs and attribute writes. Handles,
    /// style maps and nested specs have no textual form.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(value) => Some(value.to_string()),
            Value::Int(value) => Some(value.to_string()),
            Value::Float(value) => Some(value.to_string()),
            Value::Str(value) => Some(value.clone()),
            Value::Style(_)
            | Value::Callback(_)
            | Value::Ref(_)
            | Value::Node(_)
            | Value::Any(_) => None,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Style(_) => "style map",
            Value::Callback(_) => "callback",
            Value::Ref(_) => "ref",
            Value::Node(_) => "spec",
            Value::Any(_) => "opaque value",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Style(a), Value::Style(b)) => a == b,
            (Value::Callback(a), Value::Callback(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::Any(a), Value::Any(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(value) => write!(f, "Bool({value})"),
            Value::Int(value) => write!(f, "Int({value})"),
            Value::Float(value) => write!(f, "Float({value})"),
            Value::Str(value) => write!(f, "Str({value:?})"),
            Value::Style(style) => f.debug_tuple("Style").field(style).finish(),
            Value::Callback(callback) => callback.fmt(f),
            Value::Ref(handle) => handle.fmt(f),
            Value::Node(spec) => f.debug_tuple("Node").field(spec).finish(),
            Value::Any(_) => f.write_str("Any(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Str(value.clone())
    }
}

impl From<StyleMap> for Value {
    fn from(value: StyleMap) -> Self {
        Value::Style(value)
    }
}

impl From<Callback> for Value {
    fn from(value: Callback) -> Self {
        Value::Callback(value)
    }
}

impl From<ErasedRef> for Value {
    fn from(value: ErasedRef) -> Self {
        Value::Ref(value)
    }
}

impl<T: 'static> From<Ref<T>> for Value {
    fn from(value: Ref<T>) -> Self {
        Value::Ref(value.erase())
    }
}

impl From<Spec> for Value {
    fn from(value: Spec) -> Self {
        Value::Node(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Event delivered to a listener registered through an `on*` prop.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
    pub detail: Value,
}

impl Event {
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            detail: Value::Null,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// Event handler with pointer identity.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&Event)>);

impl Callback {
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Shared mutable cell whose identity is stable for its owner's lifetime.
pub struct Ref<T> {
    cell: Rc<RefCell<T>>,
}

/// Ref bound to an output-medium node through the `ref` prop.
pub type NodeRef = Ref<Option<NodeId>>;

impl<T> Ref<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(value)),
        }
    }

    pub fn borrow(&self) -> CellRef<'_, T> {
        self.cell.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.cell.borrow_mut()
    }

    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T: Clone> Ref<T> {
    pub fn current(&self) -> T {
        self.cell.borrow().clone()
    }
}

impl<T: 'static> Ref<T> {
    pub fn erase(&self) -> ErasedRef {
        ErasedRef(self.cell.clone())
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.try_borrow() {
            Ok(value) => f.debug_tuple("Ref").field(&*value).finish(),
            Err(_) => f.write_str("Ref(<borrowed>)"),
        }
    }
}

/// Type-erased [`Ref`] as stored in props.
#[derive(Clone)]
pub struct ErasedRef(Rc<dyn Any>);

impl ErasedRef {
    pub fn downcast<T: 'static>(&self) -> Option<Ref<T>> {
        self.0
            .clone()
            .downcast::<RefCell<T>>()
            .ok()
            .map(|cell| Ref { cell })
    }
}

impl PartialEq for ErasedRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ErasedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}
