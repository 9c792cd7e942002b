// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! The live object graph.
//!
//! A [`Value`][] is either a literal (an integer, a float, or a string), or a handle to a shared
//! allocation: a list, tuple, dict, class, class instance, or opaque host value.  Cloning a
//! composite value clones the handle, not the object, so the same object can appear at many
//! places in a graph, including inside itself.
//!
//! Two kinds of comparison are available:
//!
//! - [`Value::same_object`][] asks whether two values are the _same_ object (identity).
//! - `==` compares structure.  It terminates on cyclic graphs: a pair of containers that is
//!   already being compared further up the recursion is assumed to be equal.
//!
//! Graphs with cycles are never freed by reference counting alone.  That is fine for the
//! short-lived graphs this crate is meant for; break the cycle by hand (for instance by clearing
//! a list) if a long-running process builds many of them.

use std::any::Any;
use std::cell::Ref;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::node::TypePath;

/// The identity of a composite value: the address of its shared allocation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Identity(usize);

#[derive(Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<[Value]>),
    Dict(Rc<RefCell<Dict>>),
    Type(Rc<Class>),
    Object(Rc<Object>),
    Opaque(Rc<Opaque>),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::from(items))
    }

    pub fn dict<I>(entries: I) -> Value
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        Value::Dict(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    /// Wraps a host value that has no field mapping.  Such values live happily in a graph but
    /// cannot be saved.
    pub fn opaque<T: Any>(value: T) -> Value {
        Value::Opaque(Rc::new(Opaque {
            type_name: std::any::type_name::<T>(),
            value: Box::new(value),
        }))
    }

    /// Returns whether this value is written by value rather than by identity.
    pub fn is_literal(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Str(_))
    }

    /// Returns the identity of a composite value, or `None` for literals.
    pub fn identity(&self) -> Option<Identity> {
        let ptr: *const () = match self {
            Value::Int(_) | Value::Float(_) | Value::Str(_) => return None,
            Value::List(list) => Rc::as_ptr(list).cast(),
            Value::Tuple(tuple) => Rc::as_ptr(tuple).cast(),
            Value::Dict(dict) => Rc::as_ptr(dict).cast(),
            Value::Type(class) => Rc::as_ptr(class).cast(),
            Value::Object(object) => Rc::as_ptr(object).cast(),
            Value::Opaque(opaque) => Rc::as_ptr(opaque).cast(),
        };
        Some(Identity(ptr as usize))
    }

    /// Returns whether both values are the same composite object.  Literals are never the same
    /// object as anything.
    pub fn same_object(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// A short name for the runtime kind of this value, for error messages.
    pub fn kind_name(&self) -> &str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Type(_) => "type",
            Value::Object(_) => "object",
            Value::Opaque(opaque) => opaque.type_name(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Rc<RefCell<Vec<Value>>>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&Rc<[Value]>> {
        match self {
            Value::Tuple(tuple) => Some(tuple),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Rc<RefCell<Dict>>> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&Rc<Class>> {
        match self {
            Value::Type(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Rc<Object>> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::Str(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::Str(Rc::from(value))
    }
}

impl From<Rc<Class>> for Value {
    fn from(class: Rc<Class>) -> Value {
        Value::Type(class)
    }
}

impl From<Rc<Object>> for Value {
    fn from(object: Rc<Object>) -> Value {
        Value::Object(object)
    }
}

//-------------------------------------------------------------------------------------------------
// Dicts

/// An insertion-ordered mapping whose keys may be any value.
///
/// Keys are compared structurally.  Lookups are linear, which is fine for the field-sized maps
/// that object graphs usually carry.
#[derive(Clone, Default)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
}

impl Dict {
    pub fn new() -> Dict {
        Dict::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Inserts a key/value pair.  An existing key keeps its position and has its value replaced;
    /// the old value is returned.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> + '_ {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> + '_ {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl std::iter::FromIterator<(Value, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Dict {
        let mut dict = Dict::new();
        for (key, value) in iter {
            dict.insert(key, value);
        }
        dict
    }
}

impl fmt::Debug for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_entries(self.iter(), f, &mut Vec::new())
    }
}

//-------------------------------------------------------------------------------------------------
// Classes and objects

/// A user-supplied initializer, run by [`Class::instantiate`][] and never by the loader.
pub type Initializer = Box<dyn Fn(&Object, &[Value])>;

/// A class: something with a name that instances can be allocated from.
pub struct Class {
    path: TypePath,
    initializer: Option<Initializer>,
}

impl Class {
    pub fn new(path: TypePath) -> Rc<Class> {
        Rc::new(Class {
            path,
            initializer: None,
        })
    }

    pub fn with_initializer<F>(path: TypePath, initializer: F) -> Rc<Class>
    where
        F: Fn(&Object, &[Value]) + 'static,
    {
        Rc::new(Class {
            path,
            initializer: Some(Box::new(initializer)),
        })
    }

    pub fn path(&self) -> &TypePath {
        &self.path
    }

    /// Allocates an instance with no fields, without running the initializer.
    pub fn allocate(self: &Rc<Self>) -> Rc<Object> {
        Rc::new(Object {
            class: self.clone(),
            fields: RefCell::new(Fields::default()),
        })
    }

    /// Allocates an instance and runs the initializer on it.
    pub fn instantiate(self: &Rc<Self>, args: &[Value]) -> Rc<Object> {
        let object = self.allocate();
        if let Some(initializer) = &self.initializer {
            initializer(&object, args);
        }
        object
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.path)
    }
}

/// An instance of a [`Class`][], holding an ordered mapping of named fields.
pub struct Object {
    class: Rc<Class>,
    fields: RefCell<Fields>,
}

impl Object {
    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    /// Assigns a field, returning its previous value.
    pub fn set<N: Into<Rc<str>>>(&self, name: N, value: Value) -> Option<Value> {
        self.fields.borrow_mut().insert(name.into(), value)
    }

    pub fn fields(&self) -> Ref<'_, Fields> {
        self.fields.borrow()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_object(self, f, &mut Vec::new())
    }
}

/// The named-field mapping of an [`Object`][], in first-assignment order.
#[derive(Clone, Default)]
pub struct Fields {
    entries: Vec<(Rc<str>, Value)>,
}

impl Fields {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, v)| v)
    }

    pub fn insert(&mut self, name: Rc<str>, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.entries.iter().map(|(n, v)| (&**n, v))
    }
}

/// A host value with no field mapping.
pub struct Opaque {
    type_name: &'static str,
    value: Box<dyn Any>,
}

impl Opaque {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

//-------------------------------------------------------------------------------------------------
// Structural equality

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        values_equal(self, other, &mut Vec::new())
    }
}

fn values_equal(a: &Value, b: &Value, active: &mut Vec<(Identity, Identity)>) -> bool {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => return a == b,
        (Value::Float(a), Value::Float(b)) => return a == b,
        (Value::Str(a), Value::Str(b)) => return a == b,
        (Value::Type(a), Value::Type(b)) => return Rc::ptr_eq(a, b) || a.path == b.path,
        (Value::Opaque(a), Value::Opaque(b)) => return Rc::ptr_eq(a, b),
        _ => {}
    }
    let pair = match (a.identity(), b.identity()) {
        (Some(ia), Some(ib)) if ia == ib => return true,
        (Some(ia), Some(ib)) => (ia, ib),
        _ => return false,
    };
    // A pair that is already being compared is assumed equal; any difference will be found on
    // the outer comparison.
    if active.contains(&pair) {
        return true;
    }
    active.push(pair);
    let result = match (a, b) {
        (Value::List(a), Value::List(b)) => sequences_equal(&a.borrow(), &b.borrow(), active),
        (Value::Tuple(a), Value::Tuple(b)) => sequences_equal(a, b, active),
        (Value::Dict(a), Value::Dict(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            a.len() == b.len()
                && a.iter().all(|(key, value)| {
                    b.iter().any(|(other_key, other_value)| {
                        values_equal(key, other_key, active)
                            && values_equal(value, other_value, active)
                    })
                })
        }
        (Value::Object(a), Value::Object(b)) => {
            let (fa, fb) = (a.fields(), b.fields());
            a.class.path == b.class.path
                && fa.len() == fb.len()
                && fa.iter().all(|(name, value)| match fb.get(name) {
                    Some(other) => values_equal(value, other, active),
                    None => false,
                })
        }
        _ => false,
    };
    active.pop();
    result
}

fn sequences_equal(a: &[Value], b: &[Value], active: &mut Vec<(Identity, Identity)>) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| values_equal(a, b, active))
}

//-------------------------------------------------------------------------------------------------
// Debug output

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(self, f, &mut Vec::new())
    }
}

fn write_value(value: &Value, f: &mut fmt::Formatter<'_>, active: &mut Vec<Identity>) -> fmt::Result {
    let identity = match value {
        Value::Int(value) => return write!(f, "{}", value),
        Value::Float(value) => return write!(f, "{:?}", value),
        Value::Str(value) => return write!(f, "{:?}", value),
        Value::Type(class) => return write!(f, "{:?}", class),
        Value::Opaque(opaque) => return write!(f, "<opaque {}>", opaque.type_name),
        _ => value.identity(),
    };
    let identity = match identity {
        Some(identity) => identity,
        None => return Ok(()),
    };
    if active.contains(&identity) {
        return match value {
            Value::List(_) => f.write_str("[...]"),
            Value::Tuple(_) => f.write_str("(...)"),
            Value::Dict(_) => f.write_str("{...}"),
            Value::Object(object) => write!(f, "<{} ...>", object.class.path),
            _ => Ok(()),
        };
    }
    active.push(identity);
    let result = match value {
        Value::List(list) => write_sequence("[", &list.borrow(), "]", f, active),
        Value::Tuple(tuple) if tuple.len() == 1 => write_sequence("(", tuple, ",)", f, active),
        Value::Tuple(tuple) => write_sequence("(", tuple, ")", f, active),
        Value::Dict(dict) => write_entries(dict.borrow().iter(), f, active),
        Value::Object(object) => write_object(object, f, active),
        _ => Ok(()),
    };
    active.pop();
    result
}

fn write_sequence(
    open: &str,
    items: &[Value],
    close: &str,
    f: &mut fmt::Formatter<'_>,
    active: &mut Vec<Identity>,
) -> fmt::Result {
    f.write_str(open)?;
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write_value(item, f, active)?;
    }
    f.write_str(close)
}

fn write_entries<'a, I>(entries: I, f: &mut fmt::Formatter<'_>, active: &mut Vec<Identity>) -> fmt::Result
where
    I: Iterator<Item = (&'a Value, &'a Value)>,
{
    f.write_str("{")?;
    for (index, (key, value)) in entries.enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write_value(key, f, active)?;
        f.write_str(": ")?;
        write_value(value, f, active)?;
    }
    f.write_str("}")
}

fn write_object(object: &Object, f: &mut fmt::Formatter<'_>, active: &mut Vec<Identity>) -> fmt::Result {
    write!(f, "{}(", object.class.path)?;
    for (index, (name, value)) in object.fields().iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}=", name)?;
        write_value(value, f, active)?;
    }
    f.write_str(")")
}
