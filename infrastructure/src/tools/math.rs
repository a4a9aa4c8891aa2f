//! Math tools: add, subtract, multiply, divide
//!
//! All four run on the `math_queue`. Integer inputs give integer results for
//! add/subtract/multiply (overflow is an error); `divide` always returns a
//! float.

use relay_domain::{ArgType, ToolDescriptor, ToolError, ToolImplementation};
use serde_json::{Map, Number, Value, json};

/// Tool name constants
pub const ADD: &str = "add";
pub const SUBTRACT: &str = "subtract";
pub const MULTIPLY: &str = "multiply";
pub const DIVIDE: &str = "divide";

/// Queue served by the math workers
pub const MATH_QUEUE: &str = "math_queue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl MathOp {
    pub fn name(&self) -> &'static str {
        match self {
            MathOp::Add => ADD,
            MathOp::Subtract => SUBTRACT,
            MathOp::Multiply => MULTIPLY,
            MathOp::Divide => DIVIDE,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            MathOp::Add => "Add two numbers",
            MathOp::Subtract => "Subtract the second number from the first",
            MathOp::Multiply => "Multiply two numbers",
            MathOp::Divide => "Divide the first number by the second",
        }
    }
}

/// One arithmetic tool over arguments `a` and `b`
#[derive(Debug, Clone, Copy)]
pub struct MathTool {
    op: MathOp,
}

impl MathTool {
    pub fn new(op: MathOp) -> Self {
        Self { op }
    }

    /// All four math tools
    pub fn all() -> [MathTool; 4] {
        [
            MathTool::new(MathOp::Add),
            MathTool::new(MathOp::Subtract),
            MathTool::new(MathOp::Multiply),
            MathTool::new(MathOp::Divide),
        ]
    }
}

fn operand<'a>(args: &'a Map<String, Value>, name: &str) -> Result<&'a Number, ToolError> {
    match args.get(name) {
        Some(Value::Number(n)) => Ok(n),
        Some(other) => Err(ToolError::invalid_argument(format!(
            "Argument '{}' must be a number, got {}",
            name, other
        ))),
        None => Err(ToolError::invalid_argument(format!(
            "Missing required argument '{}'",
            name
        ))),
    }
}

fn float(n: &Number) -> f64 {
    n.as_f64().unwrap_or(f64::NAN)
}

fn float_result(value: f64) -> Result<Value, ToolError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| ToolError::execution_failed("result is not a finite number"))
}

impl ToolImplementation for MathTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(self.op.name(), self.op.description())
            .with_queue(MATH_QUEUE)
            .with_arg("a", ArgType::Number, true)
            .with_arg("b", ArgType::Number, true)
    }

    fn invoke(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let a = operand(args, "a")?;
        let b = operand(args, "b")?;

        if self.op == MathOp::Divide {
            if float(b) == 0.0 {
                return Err(ToolError::execution_failed("division by zero"));
            }
            return float_result(float(a) / float(b));
        }

        if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
            let exact = match self.op {
                MathOp::Add => x.checked_add(y),
                MathOp::Subtract => x.checked_sub(y),
                MathOp::Multiply => x.checked_mul(y),
                MathOp::Divide => None,
            };
            return exact.map(|v| json!(v)).ok_or_else(|| {
                ToolError::execution_failed(format!("integer overflow in {}", self.op.name()))
            });
        }

        let (x, y) = (float(a), float(b));
        float_result(match self.op {
            MathOp::Add => x + y,
            MathOp::Subtract => x - y,
            MathOp::Multiply => x * y,
            MathOp::Divide => x / y,
        })
    }
}
