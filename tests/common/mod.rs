//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's
//! main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

pub use prism::{
    materialize, select, split_shape_arg, AccessorKind, AggregateSchema, EvalContext, EvalError,
    ExpressionEvaluator, ExpressionHandle, FetchHint, FieldPath, FnEvaluator, LazyView,
    MaterializedView, Materializer, NullWrapper, ProjectionError, ProjectionResult, Projector,
    QueryArg, Record, ResolvedPlan, ShapeArg, ShapeBuilder, ShapeDescriptor, ShapeName,
    ShapeRegistry, UnsupportedEvaluator, Value, ValueView, WrapperRegistry, MAX_EVAL_ARGS,
    MAX_SHAPE_DEPTH, OPTION_CONVENTION,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Install a stderr subscriber when PRISM_TEST_LOG is set in the environment.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        if std::env::var("PRISM_TEST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
                .with_test_writer()
                .init();
        }
    });
}

// ============================================================================
// Records
// ============================================================================

/// The address sub-record `person()` carries under "address".
pub fn address() -> Record {
    Record::new()
        .with("street", "12 Rose Lane")
        .with("city", "Norwich")
        .with("zipcode", "NR1 4HJ")
}

/// A person record with names, a salary, a nested address, and emails.
pub fn person() -> Record {
    Record::new()
        .with("firstname", "Oliver")
        .with("lastname", "Matthews")
        .with("salary", 90_000i64)
        .with("address", address())
        .with(
            "emails",
            vec![
                Value::from("oliver@example.org"),
                Value::from("o.matthews@example.org"),
            ],
        )
}

/// The aggregate schema matching `person()`.
pub fn person_schema() -> AggregateSchema {
    AggregateSchema::new(
        "Person",
        ["firstname", "lastname", "salary", "address", "emails"],
    )
}

// ============================================================================
// Expression evaluation
// ============================================================================

/// Evaluator understanding the expression handles the test shapes use:
///
/// - `fullname`: firstname and lastname joined with a space
/// - `greeting`: args[0] (default "Hello") prepended to firstname
/// - `paygrade`: salary divided by 10_000
/// - `fail`: always errors
pub fn test_evaluator() -> Arc<dyn ExpressionEvaluator> {
    Arc::new(FnEvaluator::new(|handle, ctx: EvalContext<'_>| {
        match handle.expression() {
            "fullname" => {
                let first = ctx.target.get("firstname").and_then(Value::as_str);
                let last = ctx.target.get("lastname").and_then(Value::as_str);
                match (first, last) {
                    (Some(first), Some(last)) => Ok(Value::from(format!("{first} {last}"))),
                    _ => Err(EvalError::new("name fields missing")),
                }
            }
            "greeting" => {
                let salutation = ctx.args.first().and_then(Value::as_str).unwrap_or("Hello");
                let first = ctx
                    .target
                    .get("firstname")
                    .and_then(Value::as_str)
                    .unwrap_or("?");
                Ok(Value::from(format!("{salutation} {first}")))
            }
            "paygrade" => match ctx.target.get("salary").and_then(Value::as_int) {
                Some(salary) => Ok(Value::Int(salary / 10_000)),
                None => Err(EvalError::new("salary missing or not an integer")),
            },
            "fail" => Err(EvalError::new("boom")),
            other => Err(EvalError::new(format!("unknown expression '{other}'"))),
        }
    }))
}

/// Wrapper counting evaluator invocations, for memoization assertions.
pub struct CountingEvaluator {
    inner: Arc<dyn ExpressionEvaluator>,
    calls: AtomicUsize,
}

impl CountingEvaluator {
    /// Wrap an evaluator; keep one Arc for assertions, hand the other to the
    /// materializer.
    pub fn new(inner: Arc<dyn ExpressionEvaluator>) -> Arc<CountingEvaluator> {
        Arc::new(CountingEvaluator {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of evaluate calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExpressionEvaluator for CountingEvaluator {
    fn evaluate(
        &self,
        handle: &ExpressionHandle,
        ctx: EvalContext<'_>,
    ) -> Result<Value, EvalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.evaluate(handle, ctx)
    }
}

// ============================================================================
// Projectors
// ============================================================================

/// Projector over a fresh registry with the shared test evaluator installed.
pub fn projector() -> Projector {
    Projector::new().with_evaluator(test_evaluator())
}
