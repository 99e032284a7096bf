//! Common test utilities for integration tests.

use bailout::eval::{Interpreter, Value};
use bailout::tree::{Builder, ExprRef, StmtRef, TypeRef, Unit};
use bailout::{
    CompileError, ContainerDescriptor, DesugarConfig, DesugarOutcome, Diagnostic, compile,
};
use tracing_subscriber::EnvFilter;

/// Route pass logs to the test harness. Set `RUST_LOG=bailout_passes=trace`
/// to see every rewrite.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A builder with the types most tests need already interned.
#[allow(dead_code)]
pub struct Fixture {
    pub b: Builder,
    pub int: TypeRef,
    pub string: TypeRef,
    pub boolean: TypeRef,
    pub void: TypeRef,
    /// `Result<int, String>`
    pub result: TypeRef,
    /// `Option<int>`
    pub option: TypeRef,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new(name: &str) -> Self {
        let mut b = Builder::new(name);
        let int = b.ty("int");
        let string = b.ty("String");
        let boolean = b.ty("boolean");
        let void = b.ty("void");
        let result = b.generic("Result", [int, string]);
        let option = b.generic("Option", [int]);
        Self {
            b,
            int,
            string,
            boolean,
            void,
            result,
            option,
        }
    }

    /// Declare a zero-argument host function returning `ret`.
    pub fn host(&mut self, name: &str, ret: TypeRef) {
        self.b.extern_fn(name, &[], ret);
    }

    /// `callee().unwrap()`
    pub fn unwrap_call(&mut self, callee: &str) -> ExprRef {
        let call = self.b.call(callee, []);
        self.b.unwrap(call)
    }

    /// `Result.ok(value)`
    pub fn ok(&mut self, value: ExprRef) -> ExprRef {
        self.b.static_call("Result", "ok", [value])
    }

    /// `return Result.ok(n);`
    pub fn ret_ok(&mut self, n: i64) -> StmtRef {
        let value = self.b.int(n);
        let ok = self.ok(value);
        self.b.ret(ok)
    }

    /// `Result<int, String> main() { body }`
    pub fn main(mut self, body: Vec<StmtRef>) -> Unit {
        let ret = self.result;
        self.b.func("main", &[], ret, body);
        self.b.finish()
    }
}

/// Outcome of running the pipeline on one unit.
#[allow(dead_code)]
pub struct Compiled {
    pub unit: Unit,
    pub outcome: Result<DesugarOutcome, CompileError>,
    pub diagnostics: Vec<Diagnostic>,
}

#[allow(dead_code)]
pub fn desugar(unit: Unit) -> Compiled {
    desugar_with(unit, &DesugarConfig::default())
}

#[allow(dead_code)]
pub fn desugar_with(mut unit: Unit, config: &DesugarConfig) -> Compiled {
    init_tracing();
    let mut diagnostics = Vec::new();
    let outcome = compile(&mut unit, config, &mut diagnostics);
    Compiled {
        unit,
        outcome,
        diagnostics,
    }
}

#[allow(dead_code)]
pub fn ok(n: i64) -> Value {
    Value::success(&ContainerDescriptor::result(), Value::Int(n))
}

#[allow(dead_code)]
pub fn err(message: &str) -> Value {
    Value::failure(&ContainerDescriptor::result(), Some(Value::str(message)))
}

/// Run `main` with each named host function returning a fixed value.
#[allow(dead_code)]
pub fn run_main(unit: &Unit, hosts: &[(&str, Value)]) -> (Value, Vec<String>) {
    let config = DesugarConfig::default();
    let mut interp = Interpreter::new(unit, &config);
    for (name, value) in hosts {
        let value = value.clone();
        interp.register(name, move |_| value.clone());
    }
    let result = match interp.call("main", Vec::new()) {
        Ok(value) => value,
        Err(e) => panic!("main failed: {e}"),
    };
    let calls = interp.calls().iter().map(|c| c.to_string()).collect();
    (result, calls)
}
