//! Native functions callable from conditions, together with the type
//! signatures the checker uses to validate calls to them.

use std::{collections::HashMap, fmt, sync::Arc};

use miette::Diagnostic;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::{eval::RuntimeError, object::Object, object::ObjectType};

pub type NativeFn = Arc<dyn Fn(&[Object]) -> Object + Send + Sync>;

/// One overload of a builtin: positional argument types and the result type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub arguments: Vec<ObjectType>,
    pub returns: ObjectType,
}

impl Signature {
    pub fn new(arguments: impl Into<Vec<ObjectType>>, returns: ObjectType) -> Self {
        Signature {
            arguments: arguments.into(),
            returns,
        }
    }
}

#[derive(Clone)]
pub struct Builtin {
    name: Arc<str>,
    signatures: Arc<[Signature]>,
    func: NativeFn,
}

impl Builtin {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overloads in the order the checker tries them.
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn call(&self, arguments: &[Object]) -> Object {
        (self.func)(arguments)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("signatures", &self.signatures)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.func, &other.func)
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum RegistryError {
    #[error("builtin `{0}` is already registered")]
    #[diagnostic(help("builtin names are write-once; pick another name"))]
    Duplicate(String),

    #[error("builtin `{0}` must declare at least one signature")]
    NoSignature(String),
}

/// Name to function table consulted by the checker and the evaluator.
#[derive(Debug, Clone, Default)]
pub struct Builtins {
    functions: HashMap<String, Builtin>,
}

static GLOBAL: Lazy<Builtins> = Lazy::new(Builtins::standard);

impl Builtins {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the standard library (`len`).
    pub fn standard() -> Self {
        let mut builtins = Self::new();
        builtins.insert(
            "len".to_string(),
            vec![
                Signature::new([ObjectType::String], ObjectType::Integer),
                Signature::new([ObjectType::ArrayString], ObjectType::Integer),
                Signature::new([ObjectType::ArrayInteger], ObjectType::Integer),
            ],
            Arc::new(len),
        );
        builtins
    }

    /// The process-wide standard registry, built on first use and never mutated.
    pub fn global() -> &'static Builtins {
        &GLOBAL
    }

    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        signatures: impl Into<Vec<Signature>>,
        func: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&[Object]) -> Object + Send + Sync + 'static,
    {
        let name = name.into();
        if self.functions.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        let signatures: Vec<Signature> = signatures.into();
        if signatures.is_empty() {
            return Err(RegistryError::NoSignature(name));
        }
        self.insert(name, signatures, Arc::new(func));
        Ok(())
    }

    fn insert(&mut self, name: String, signatures: Vec<Signature>, func: NativeFn) {
        log::debug!("registering builtin `{name}` with {} overload(s)", signatures.len());
        let builtin = Builtin {
            name: Arc::from(name.as_str()),
            signatures: signatures.into(),
            func,
        };
        self.functions.insert(name, builtin);
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

pub fn len(arguments: &[Object]) -> Object {
    let [argument] = arguments else {
        return RuntimeError::WrongArgumentCount {
            function: "len".to_string(),
            expected: 1,
            got: arguments.len(),
        }
        .into();
    };
    let count = match argument {
        Object::String(s) => s.len(),
        Object::ArrayString(values) => values.len(),
        Object::ArrayInteger(values) => values.len(),
        other => {
            return RuntimeError::UnsupportedArgument {
                function: "len".to_string(),
                found: other.object_type(),
            }
            .into();
        }
    };
    Object::Integer(i64::try_from(count).unwrap_or(i64::MAX))
}
