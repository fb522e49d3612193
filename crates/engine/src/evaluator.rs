//! Expression evaluator seam
//!
//! Computed accessors are evaluated by an external collaborator: the engine
//! never interprets expression text itself. This module defines the injected
//! capability:
//! - ExpressionHandle: opaque expression text attached to a computed accessor
//! - EvalContext: the bindings the engine threads through (`target`, `args`)
//! - ExpressionEvaluator: the trait the collaborator implements
//! - FnEvaluator: closure adapter, mainly for tests and small hosts
//! - UnsupportedEvaluator: default that fails every call
//!
//! The engine treats evaluation as an opaque synchronous call. Any timeout or
//! cancellation belongs to the collaborator and surfaces here as an ordinary
//! [`EvalError`].

use prism_core::{Record, Value};
use std::fmt;
use thiserror::Error;

/// Opaque expression text handed through to the external evaluator
///
/// The engine stores the handle on the accessor at descriptor build time and
/// passes it verbatim at each invocation. It assigns no meaning to the text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpressionHandle {
    expression: String,
}

impl ExpressionHandle {
    /// Create a handle from expression text
    pub fn new(expression: impl Into<String>) -> Self {
        ExpressionHandle {
            expression: expression.into(),
        }
    }

    /// The expression text
    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl fmt::Display for ExpressionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

impl From<&str> for ExpressionHandle {
    fn from(s: &str) -> Self {
        ExpressionHandle::new(s)
    }
}

impl From<String> for ExpressionHandle {
    fn from(s: String) -> Self {
        ExpressionHandle::new(s)
    }
}

/// Bindings available to an expression evaluation
///
/// The source record is exposed under the fixed name `target`; the caller's
/// invocation arguments are exposed as the ordered, indexable `args` list.
/// Both are read-only views: evaluation must not mutate the record.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// The source record the accessor is being resolved against
    pub target: &'a Record,
    /// Ordered invocation arguments, positionally indexable
    pub args: &'a [Value],
}

impl<'a> EvalContext<'a> {
    /// Create a context over a record and argument list
    pub fn new(target: &'a Record, args: &'a [Value]) -> Self {
        EvalContext { target, args }
    }
}

/// Failure reported by the external evaluator
///
/// An opaque message carrier: the engine attributes it to a shape and
/// accessor but never inspects or retries it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct EvalError(String);

impl EvalError {
    /// Create an error from a message
    pub fn new(message: impl Into<String>) -> Self {
        EvalError(message.into())
    }

    /// The evaluator's message
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// The injected computed-accessor capability
///
/// Implementations must be deterministic for the engine's idempotence
/// guarantee to hold: invoking the same accessor on the same view twice is
/// specified to return equal values, which the engine can only promise if
/// `evaluate` is a pure function of the handle and context.
///
/// Thread safety: evaluators are shared across views and threads
/// (requires Send + Sync).
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluate an expression against the context, returning a single value
    fn evaluate(&self, handle: &ExpressionHandle, ctx: EvalContext<'_>) -> Result<Value, EvalError>;
}

/// Closure adapter for supplying an evaluator without a named type
///
/// # Examples
///
/// ```
/// use prism_engine::{EvalContext, FnEvaluator, ExpressionEvaluator, ExpressionHandle};
/// use prism_core::{Record, Value};
///
/// let upper = FnEvaluator::new(|handle: &ExpressionHandle, ctx: EvalContext<'_>| {
///     let field = ctx.target.get(handle.expression());
///     match field {
///         Some(Value::String(s)) => Ok(Value::String(s.to_uppercase())),
///         _ => Err(prism_engine::EvalError::new("not a string field")),
///     }
/// });
///
/// let record = Record::new().with("name", "ada");
/// let out = upper
///     .evaluate(&ExpressionHandle::new("name"), EvalContext::new(&record, &[]))
///     .unwrap();
/// assert_eq!(out, Value::String("ADA".into()));
/// ```
pub struct FnEvaluator<F> {
    f: F,
}

impl<F> FnEvaluator<F>
where
    F: Fn(&ExpressionHandle, EvalContext<'_>) -> Result<Value, EvalError> + Send + Sync,
{
    /// Wrap a closure as an evaluator
    pub fn new(f: F) -> Self {
        FnEvaluator { f }
    }
}

impl<F> ExpressionEvaluator for FnEvaluator<F>
where
    F: Fn(&ExpressionHandle, EvalContext<'_>) -> Result<Value, EvalError> + Send + Sync,
{
    fn evaluate(&self, handle: &ExpressionHandle, ctx: EvalContext<'_>) -> Result<Value, EvalError> {
        (self.f)(handle, ctx)
    }
}

/// Default evaluator wired in when none is supplied
///
/// Every call fails. Closed shapes never reach it; open shapes materialized
/// without a configured evaluator fail at the computed accessor, not before.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedEvaluator;

impl ExpressionEvaluator for UnsupportedEvaluator {
    fn evaluate(
        &self,
        handle: &ExpressionHandle,
        _ctx: EvalContext<'_>,
    ) -> Result<Value, EvalError> {
        Err(EvalError::new(format!(
            "no expression evaluator configured (expression '{}')",
            handle.expression()
        )))
    }
}
