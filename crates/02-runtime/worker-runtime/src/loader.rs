//! Turning a function definition into an executable entry point.
//!
//! Definitions are identifiers resolved against a [`StaticRegistry`] of
//! precompiled async functions. Other loaders (an embedded interpreter, say)
//! plug in through [`FunctionLoader`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{FutureExt, LocalBoxFuture};
use thiserror::Error;

use crate::{RemoteError, Value};

/// Future produced by one call of an entry point.
pub type EntryFuture = LocalBoxFuture<'static, Result<Value, RemoteError>>;

/// A loaded, callable remote function.
pub type EntryPoint = Arc<dyn Fn(Vec<Value>) -> EntryFuture + Send + Sync>;

/// Reasons a definition could not be loaded.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The definition was blank.
    #[error("empty function definition")]
    EmptyDefinition,
    /// Nothing is registered under the requested identifier.
    #[error("unknown function: {0}")]
    UnknownFunction(String),
}

/// Produces entry points from textual definitions on the worker thread.
pub trait FunctionLoader: Send + 'static {
    /// Resolves `definition` into an entry point.
    fn load(&self, definition: &str) -> Result<EntryPoint, LoadError>;
}

/// Identifier → precompiled entry point table.
#[derive(Clone, Default)]
pub struct StaticRegistry {
    functions: HashMap<String, EntryPoint>,
}

impl StaticRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `f` under `name`, replacing any previous entry.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RemoteError>> + 'static,
    {
        let entry: EntryPoint = Arc::new(move |args| f(args).boxed_local());
        self.functions.insert(name.into(), entry);
        self
    }

    /// Builder form of [`Self::register`].
    pub fn with<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RemoteError>> + 'static,
    {
        self.register(name, f);
        self
    }

    /// Whether `name` resolves.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl FunctionLoader for StaticRegistry {
    fn load(&self, definition: &str) -> Result<EntryPoint, LoadError> {
        let name = definition.trim();
        if name.is_empty() {
            return Err(LoadError::EmptyDefinition);
        }
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::UnknownFunction(name.to_owned()))
    }
}

impl fmt::Debug for StaticRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("StaticRegistry")
            .field("functions", &names)
            .finish()
    }
}
