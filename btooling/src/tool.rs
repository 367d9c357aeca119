//! Tool registration: callback contract, trigger conditions, descriptor.
//!
//! ```rust
//! use bdispatch::{FunctionParameters, FunctionSpec};
//! use btooling::{FunctionCallback, ToolRegistration};
//!
//! let registration = ToolRegistration::new(
//!     FunctionSpec {
//!         name: "echo".to_string(),
//!         description: "Echoes its arguments".to_string(),
//!         parameters: FunctionParameters::object(),
//!     },
//!     FunctionCallback::new(|args| async move { Ok(args) }),
//! )
//! .with_keywords(["echo"]);
//!
//! assert_eq!(registration.name(), "echo");
//! ```

use std::future::Future;
use std::sync::Arc;

use bcommon::BoxFuture;
use bdispatch::{FunctionSpec, ToolDescriptor};

use crate::ToolError;

pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

/// An externally supplied callback: JSON arguments in, JSON result out.
pub trait ToolCallback: Send + Sync {
    fn call<'a>(&'a self, args_json: &'a str) -> ToolFuture<'a, Result<String, ToolError>>;
}

/// Adapter turning an async closure into a [`ToolCallback`].
pub struct FunctionCallback<F> {
    handler: F,
}

impl<F, Fut> FunctionCallback<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F, Fut> ToolCallback for FunctionCallback<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
{
    fn call<'a>(&'a self, args_json: &'a str) -> ToolFuture<'a, Result<String, ToolError>> {
        Box::pin((self.handler)(args_json.to_string()))
    }
}

pub type TriggerPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// When a tool becomes a candidate for a user message: any keyword appearing
/// as a substring of the content, or a custom predicate returning true.
#[derive(Clone, Default)]
pub struct ToolTrigger {
    pub keywords: Vec<String>,
    pub predicate: Option<TriggerPredicate>,
}

impl std::fmt::Debug for ToolTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolTrigger")
            .field("keywords", &self.keywords)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// One registered tool: its wire descriptor, its callback, and its trigger.
#[derive(Clone)]
pub struct ToolRegistration {
    descriptor: ToolDescriptor,
    callback: Arc<dyn ToolCallback>,
    trigger: ToolTrigger,
}

impl ToolRegistration {
    pub fn new<C>(spec: FunctionSpec, callback: C) -> Self
    where
        C: ToolCallback + 'static,
    {
        Self {
            descriptor: ToolDescriptor::function(spec),
            callback: Arc::new(callback),
            trigger: ToolTrigger::default(),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger
            .keywords
            .extend(keywords.into_iter().map(Into::into));
        self
    }

    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.trigger.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn name(&self) -> &str {
        &self.descriptor.function.name
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    pub fn trigger(&self) -> &ToolTrigger {
        &self.trigger
    }

    pub(crate) fn callback(&self) -> Arc<dyn ToolCallback> {
        Arc::clone(&self.callback)
    }
}

impl std::fmt::Debug for ToolRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistration")
            .field("descriptor", &self.descriptor)
            .field("trigger", &self.trigger)
            .finish()
    }
}
