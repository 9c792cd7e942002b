// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, fablab authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Resolving class names while loading.
//!
//! A saved tree names classes by [`TypePath`][]; it cannot carry the classes themselves.  The
//! [`Builder`][crate::builder::Builder] asks a [`Registry`][] to turn each name back into a
//! [`Class`][] it can allocate instances from.
//!
//! ## Built-in registries
//!
//! - [`ClassRegistry`][] is a table you fill in up front.
//! - [`NoRegistry`][] resolves nothing.  It is enough for graphs made only of literals, lists,
//!   tuples, and dicts.
//! - Any function `Fn(&TypePath) -> Option<Rc<Class>>` is a registry too:
//!
//! ```
//! use std::rc::Rc;
//! use fablab::node::TypePath;
//! use fablab::registry::Registry;
//! use fablab::value::Class;
//!
//! let point = Class::new(TypePath::new("geometry", "Point"));
//! let registry = |path: &TypePath| {
//!     if path == point.path() {
//!         Some(point.clone())
//!     } else {
//!         None
//!     }
//! };
//! assert!(registry.resolve(&TypePath::new("geometry", "Point")).is_ok());
//! assert!(registry.resolve(&TypePath::new("geometry", "Line")).is_err());
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::node::TypePath;
use crate::value::Class;

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RegistryError {
    #[error("cannot resolve type {0}")]
    UnknownType(TypePath),
    #[error("type {0} is already registered")]
    DuplicateType(TypePath),
}

/// Turns class names back into classes.
pub trait Registry {
    fn resolve(&self, path: &TypePath) -> Result<Rc<Class>, RegistryError>;
}

impl<F> Registry for F
where
    F: Fn(&TypePath) -> Option<Rc<Class>>,
{
    fn resolve(&self, path: &TypePath) -> Result<Rc<Class>, RegistryError> {
        self(path).ok_or_else(|| RegistryError::UnknownType(path.clone()))
    }
}

/// A registry that resolves nothing.
pub struct NoRegistry;

impl Registry for NoRegistry {
    fn resolve(&self, path: &TypePath) -> Result<Rc<Class>, RegistryError> {
        Err(RegistryError::UnknownType(path.clone()))
    }
}

/// A table of classes keyed by their paths.
#[derive(Default)]
pub struct ClassRegistry {
    classes: HashMap<TypePath, Rc<Class>>,
}

impl ClassRegistry {
    pub fn new() -> ClassRegistry {
        ClassRegistry::default()
    }

    /// Adds a class under its own path.
    pub fn register(&mut self, class: Rc<Class>) -> Result<(), RegistryError> {
        match self.classes.entry(class.path().clone()) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateType(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(class);
                Ok(())
            }
        }
    }

    /// Creates a class without an initializer, registers it, and returns it.
    pub fn define<M, N>(&mut self, module: M, name: N) -> Result<Rc<Class>, RegistryError>
    where
        M: Into<String>,
        N: Into<String>,
    {
        let class = Class::new(TypePath::new(module, name));
        self.register(class.clone())?;
        Ok(class)
    }

    pub fn get(&self, path: &TypePath) -> Option<&Rc<Class>> {
        self.classes.get(path)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Registry for ClassRegistry {
    fn resolve(&self, path: &TypePath) -> Result<Rc<Class>, RegistryError> {
        self.classes
            .get(path)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownType(path.clone()))
    }
}
