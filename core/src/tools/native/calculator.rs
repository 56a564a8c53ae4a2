use crate::tools::{ParamSpec, ParamType, Tool, ToolContext, ToolError, ToolResult};
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulus,
    Power,
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl Operation {
    fn parse(s: &str) -> Option<Self> {
        let op = match s.trim().to_lowercase().as_str() {
            "add" | "+" | "plus" => Operation::Add,
            "subtract" | "-" | "minus" => Operation::Subtract,
            "multiply" | "*" | "x" | "times" => Operation::Multiply,
            "divide" | "/" => Operation::Divide,
            "floor_divide" | "//" => Operation::FloorDivide,
            "modulus" | "%" | "mod" => Operation::Modulus,
            "power" | "**" | "^" | "pow" => Operation::Power,
            "lt" | "<" => Operation::Lt,
            "le" | "<=" => Operation::Le,
            "eq" | "==" => Operation::Eq,
            "ne" | "!=" => Operation::Ne,
            "ge" | ">=" => Operation::Ge,
            "gt" | ">" => Operation::Gt,
            _ => return None,
        };
        Some(op)
    }

    fn name(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
            Operation::FloorDivide => "floor_divide",
            Operation::Modulus => "modulus",
            Operation::Power => "power",
            Operation::Lt => "lt",
            Operation::Le => "le",
            Operation::Eq => "eq",
            Operation::Ne => "ne",
            Operation::Ge => "ge",
            Operation::Gt => "gt",
        }
    }
}

/// Evaluate `a <op> b`. Comparisons yield booleans, arithmetic yields numbers.
fn evaluate(a: f64, b: f64, op: Operation) -> ToolResult<Value> {
    let zero_check = |what: &str| {
        if b == 0.0 {
            Err(ToolError::ExecutionFailed(format!("{} by zero", what)))
        } else {
            Ok(())
        }
    };
    let n = match op {
        Operation::Add => a + b,
        Operation::Subtract => a - b,
        Operation::Multiply => a * b,
        Operation::Divide => {
            zero_check("Division")?;
            a / b
        }
        Operation::FloorDivide => {
            zero_check("Division")?;
            (a / b).floor()
        }
        Operation::Modulus => {
            zero_check("Modulus")?;
            // sign follows the divisor
            a - b * (a / b).floor()
        }
        Operation::Power => a.powf(b),
        Operation::Lt => return Ok(json!(a < b)),
        Operation::Le => return Ok(json!(a <= b)),
        Operation::Eq => return Ok(json!(a == b)),
        Operation::Ne => return Ok(json!(a != b)),
        Operation::Ge => return Ok(json!(a >= b)),
        Operation::Gt => return Ok(json!(a > b)),
    };
    if !n.is_finite() {
        return Err(ToolError::ExecutionFailed(format!(
            "Result of {} is not a finite number",
            op.name()
        )));
    }
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Ok(json!(n as i64))
    } else {
        Ok(json!(n))
    }
}

/// Two-operand arithmetic and comparison
#[derive(Debug, Default, Clone)]
pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> String {
        "calculator".to_string()
    }

    fn description(&self) -> String {
        "Perform a basic arithmetic operation or comparison on two numbers \
         (add, subtract, multiply, divide, floor_divide, modulus, power, lt, le, eq, ne, ge, gt)"
            .to_string()
    }

    fn input_schema(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("num1", ParamType::Number, "First operand"),
            ParamSpec::required("num2", ParamType::Number, "Second operand"),
            ParamSpec::required("operation", ParamType::String, "Operation name, e.g. 'add' or '+'"),
        ]
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolResult<Value> {
        let num1 = arguments["num1"]
            .as_f64()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'num1'".to_string()))?;
        let num2 = arguments["num2"]
            .as_f64()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'num2'".to_string()))?;
        let op_name = arguments["operation"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'operation'".to_string()))?;
        let op = Operation::parse(op_name).ok_or_else(|| {
            ToolError::InvalidArguments(format!("Unsupported operation '{}'", op_name))
        })?;

        let result = evaluate(num1, num2, op)?;

        Ok(json!({
            "num1": num1,
            "num2": num2,
            "operation": op.name(),
            "result": result
        }))
    }
}
