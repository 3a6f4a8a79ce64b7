//! Script interpreter.
//!
//! The interpreter walks the AST depth first against a [`Model`]. Every
//! number is a [`RandomVariable`], so the same walk evaluates all Monte Carlo
//! paths at once on the eager backends and records a computation graph on
//! [`pricer_models::models::GraphModel`].
//!
//! Conditionals whose condition is known without simulation take a single
//! branch. Path-dependent conditionals run both branches under an active
//! [`Filter`]; an assignment executed under a filter stores
//! `select(filter, new, old)`, so every path ends up with the value of the
//! branch it took.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pricer_core::market_data::CurveEnum;
//! use pricer_core::types::{Currency, Date};
//! use pricer_models::config::McParams;
//! use pricer_models::market::Market;
//! use pricer_models::models::{ModelKind, ScriptModel};
//! use pricer_script::{evaluate, Script, TradeData};
//!
//! let today = Date::from_ymd(2024, 1, 2).unwrap();
//! let market = Market::builder(today, Currency::USD)
//!     .discount_curve(Currency::USD, CurveEnum::flat(0.0))
//!     .build()
//!     .unwrap();
//! let params = McParams::builder().samples(4).build().unwrap();
//! let mut model = ScriptModel::build(ModelKind::BlackScholes, Arc::new(market), params).unwrap();
//!
//! let script = Script::parse("NUMBER x; FOR i IN (1, 3, 1) DO x = x + i; END; Option = x;").unwrap();
//! let mut ctx = TradeData::new().to_context(4);
//! let result = evaluate(&script, &mut ctx, &mut model).unwrap();
//! assert_eq!(result.value.deterministic_value(), Some(6.0));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use pricer_core::graph::{BinaryFn, UnaryFn};
use pricer_core::math::black_formula;
use pricer_core::types::{Currency, Date, DayCountConvention};
use pricer_core::vectorized::{Comparison, Filter, PathVector, RandomVariable, VectorError};
use pricer_models::models::{Model, PathSet, PaymentConvention, RegressionRequest};
use pricer_models::regression::RegressionSlot;
use tracing::{debug, trace};

use crate::ast::{
    AssignTarget, BinaryOp, Block, Builtin, CallTarget, DeclVar, Expr, ExprKind, Location,
    Statement, StatementKind, UnaryOp,
};
use crate::context::Context;
use crate::error::ScriptError;
use crate::script::Script;
use crate::value::Value;

// ============================================================================
// Results
// ============================================================================

/// One payment recorded by `LOGPAY`.
#[derive(Debug, Clone, PartialEq)]
pub struct CashflowRecord {
    /// Leg number, if given
    pub leg: Option<i64>,
    /// Cashflow type label, if given
    pub kind: Option<String>,
    /// Observation date
    pub obs: Date,
    /// Payment date
    pub pay: Date,
    /// Payment currency
    pub currency: Currency,
    /// Undiscounted amount, zero on paths where the payment was inactive
    pub amount: RandomVariable,
    /// Deflated value in base currency, zero on inactive paths
    pub value: RandomVariable,
}

/// Outcome of one script evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    /// Value of the result variable
    pub value: RandomVariable,
    /// Additional results by name
    pub additional_results: BTreeMap<String, RandomVariable>,
    /// Payments logged by `LOGPAY`, in execution order
    pub cashflows: Vec<CashflowRecord>,
}

impl EvaluationResult {
    /// Cross-path mean of the result.
    ///
    /// # Errors
    ///
    /// `NotReducible` for a graph result.
    pub fn npv(&self) -> Result<f64, ScriptError> {
        Ok(self.value.expectation()?)
    }
}

/// Life cycle of a [`ScriptEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not run yet
    Ready,
    /// Evaluation in progress
    Running,
    /// Evaluation succeeded
    Completed,
    /// Evaluation failed
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Ready => "ready",
            EngineState::Running => "running",
            EngineState::Completed => "completed",
            EngineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Interpreter
// ============================================================================

/// Result of evaluating an expression: a value or a condition.
enum Operand {
    Value(Value),
    Condition(Filter),
}

impl Operand {
    fn shape(&self) -> String {
        match self {
            Operand::Value(v) => v.shape(),
            Operand::Condition(_) => "condition".to_string(),
        }
    }
}

fn builtin_error(builtin: Builtin) -> ScriptError {
    ScriptError::BuiltinArgumentError {
        builtin: builtin.name().to_string(),
        expected: builtin.signature().to_string(),
    }
}

fn comparison(op: BinaryOp) -> Option<Comparison> {
    Some(match op {
        BinaryOp::Eq => Comparison::Eq,
        BinaryOp::Ne => Comparison::Ne,
        BinaryOp::Lt => Comparison::Lt,
        BinaryOp::Le => Comparison::Le,
        BinaryOp::Gt => Comparison::Gt,
        BinaryOp::Ge => Comparison::Ge,
        _ => return None,
    })
}

/// Largest magnitude up to which every integer is exactly representable.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Largest length of a declared array.
pub const MAX_ARRAY_SIZE: i64 = 1_000_000;

/// Deterministic integer value of `value`, if it has one within
/// `±MAX_EXACT_INTEGER`.
fn as_integer(value: &RandomVariable) -> Option<i64> {
    let v = value.deterministic_value()?;
    (v.fract() == 0.0 && v.abs() <= MAX_EXACT_INTEGER).then_some(v as i64)
}

/// Evaluation state of one pass over a script.
pub(crate) struct Interpreter<'m, M: Model> {
    model: &'m mut M,
    active: Filter,
    cashflows: Vec<CashflowRecord>,
    enforce_require: bool,
}

impl<'m, M: Model> Interpreter<'m, M> {
    pub(crate) fn new(model: &'m mut M, enforce_require: bool) -> Self {
        let active = Filter::constant(model.size(), true);
        Self {
            model,
            active,
            cashflows: Vec::new(),
            enforce_require,
        }
    }

    /// Runs every statement and collects the results.
    pub(crate) fn run(
        mut self,
        script: &Script,
        ctx: &mut Context,
    ) -> Result<EvaluationResult, ScriptError> {
        self.declare_result(script, ctx)?;
        self.exec_block(script.statements(), ctx)?;
        self.finish(script, ctx)
    }

    /// Binds the result variable to zero unless the context already has it.
    pub(crate) fn declare_result(
        &self,
        script: &Script,
        ctx: &mut Context,
    ) -> Result<(), ScriptError> {
        if ctx.contains(script.result()) {
            return Ok(());
        }
        ctx.declare(script.result(), Value::Number(self.model.constant(0.0)))
    }

    fn finish(mut self, script: &Script, ctx: &Context) -> Result<EvaluationResult, ScriptError> {
        let value = match ctx.get(script.result())? {
            Value::Number(n) => n.clone(),
            other => {
                return Err(ScriptError::mismatch(
                    script.result(),
                    "number",
                    other.shape(),
                ))
            }
        };
        let mut additional_results = BTreeMap::new();
        for (name, expr) in script.additional_results() {
            let n = self
                .number(expr, ctx, name)
                .map_err(|e| e.at(expr.location))?;
            additional_results.insert(name.clone(), n);
        }
        Ok(EvaluationResult {
            value,
            additional_results,
            cashflows: self.cashflows,
        })
    }

    fn exec_block(&mut self, block: &Block, ctx: &mut Context) -> Result<(), ScriptError> {
        for statement in block {
            self.exec_statement(statement, ctx)?;
        }
        Ok(())
    }

    pub(crate) fn exec_statement(
        &mut self,
        statement: &Statement,
        ctx: &mut Context,
    ) -> Result<(), ScriptError> {
        trace!(
            line = statement.location.line,
            column = statement.location.column,
            "executing statement"
        );
        let outcome = match &statement.kind {
            StatementKind::Declaration(vars) => self.declare(vars, ctx),
            StatementKind::Assignment { target, value } => self.assign(target, value, ctx),
            StatementKind::If {
                condition,
                then_block,
                else_block,
            } => self.exec_if(condition, then_block, else_block.as_ref(), ctx),
            StatementKind::For {
                var,
                start,
                end,
                step,
                body,
            } => self.exec_for(var, [start, end, step], body, ctx),
            StatementKind::Require(condition) => self.require(condition, ctx),
            StatementKind::Sort {
                source,
                target,
                positions,
            } => self.sort(source, target.as_deref(), positions.as_deref(), ctx),
            StatementKind::Permute {
                source,
                target,
                positions,
            } => self.permute(source, target.as_deref(), positions, ctx),
        };
        outcome.map_err(|e| e.at(statement.location))
    }

    fn declare(&mut self, vars: &[DeclVar], ctx: &mut Context) -> Result<(), ScriptError> {
        for var in vars {
            let zero = Value::Number(self.model.constant(0.0));
            let value = match &var.size {
                None => zero,
                Some(size) => {
                    let n = self.number(size, ctx, &var.name)?;
                    let len = as_integer(&n).filter(|len| *len >= 0).ok_or_else(|| {
                        ScriptError::mismatch(
                            &var.name,
                            "deterministic non-negative integer size",
                            "path-dependent or fractional number",
                        )
                    })?;
                    if len > MAX_ARRAY_SIZE {
                        return Err(ScriptError::mismatch(
                            &var.name,
                            format!("array size of at most {MAX_ARRAY_SIZE}"),
                            format!("size {len}"),
                        ));
                    }
                    Value::Array(vec![zero; len as usize])
                }
            };
            ctx.declare(&var.name, value)?;
        }
        Ok(())
    }

    /// `select(active, new, old)` for numbers, `new` when every path is active.
    fn blend(&self, name: &str, old: &Value, new: Value) -> Result<Value, ScriptError> {
        if self.active.deterministic_value() == Some(true) {
            return Ok(new);
        }
        match (old, new) {
            (Value::Number(old), Value::Number(new)) => Ok(Value::Number(RandomVariable::select(
                &self.active,
                &new,
                old,
            )?)),
            (_, new) => Err(ScriptError::mismatch(
                name,
                "number under a path-dependent condition",
                new.shape(),
            )),
        }
    }

    fn assign(
        &mut self,
        target: &AssignTarget,
        value: &Expr,
        ctx: &mut Context,
    ) -> Result<(), ScriptError> {
        let new = self.value(value, ctx, &target.name)?;
        match &target.index {
            None => {
                let blended = self.blend(&target.name, ctx.get(&target.name)?, new)?;
                ctx.set(&target.name, blended)
            }
            Some(index) => {
                let i = self.subscript(&target.name, index, ctx)?;
                let blended = self.blend(&target.name, ctx.get_element(&target.name, i)?, new)?;
                ctx.set_element(&target.name, i, blended)
            }
        }
    }

    fn exec_if(
        &mut self,
        condition: &Expr,
        then_block: &Block,
        else_block: Option<&Block>,
        ctx: &mut Context,
    ) -> Result<(), ScriptError> {
        let cond = self.condition(condition, ctx, "IF")?;
        if let Some(flag) = cond.deterministic_value() {
            return match (flag, else_block) {
                (true, _) => self.exec_block(then_block, ctx),
                (false, Some(block)) => self.exec_block(block, ctx),
                (false, None) => Ok(()),
            };
        }

        let then_filter = self.active.and(&cond)?;
        let else_filter = match else_block {
            Some(_) => Some(self.active.and(&cond.not()?)?),
            None => None,
        };
        let saved = std::mem::replace(&mut self.active, then_filter);
        let mut outcome = self.exec_block(then_block, ctx);
        if let (Ok(()), Some(block), Some(filter)) = (&outcome, else_block, else_filter) {
            self.active = filter;
            outcome = self.exec_block(block, ctx);
        }
        self.active = saved;
        outcome
    }

    fn exec_for(
        &mut self,
        var: &str,
        bounds: [&Expr; 3],
        body: &Block,
        ctx: &mut Context,
    ) -> Result<(), ScriptError> {
        let mut values = [0i64; 3];
        for (slot, expr) in values.iter_mut().zip(bounds) {
            let n = self.number(expr, ctx, var)?;
            *slot = as_integer(&n).ok_or_else(|| {
                ScriptError::InvalidLoopBounds(format!(
                    "{expr} is not a deterministic integer of magnitude at most 2^53"
                ))
            })?;
        }
        let [start, end, step] = values;
        if step == 0 {
            return Err(ScriptError::InvalidLoopBounds(format!(
                "zero step in loop over '{var}'"
            )));
        }

        let mut i = start;
        while (step > 0 && i <= end) || (step < 0 && i >= end) {
            let mut scope = ctx.enter_scope();
            scope.declare_constant(var, Value::Number(self.model.constant(i as f64)))?;
            self.exec_block(body, &mut scope)?;
            let Some(next) = i.checked_add(step) else {
                break;
            };
            i = next;
        }
        Ok(())
    }

    fn require(&mut self, condition: &Expr, ctx: &mut Context) -> Result<(), ScriptError> {
        let cond = self.condition(condition, ctx, "REQUIRE")?;
        if !self.enforce_require {
            return Ok(());
        }
        let (Filter::Paths(active), Filter::Paths(holds)) = (&self.active, &cond) else {
            return Ok(());
        };
        if active.and(&holds.not())?.any() {
            return Err(ScriptError::RequireFailed(condition.to_string()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Array reordering

    /// Per-path values of every element of the number array `name`.
    fn array_lanes(&self, name: &str, ctx: &Context) -> Result<Vec<Vec<f64>>, ScriptError> {
        let items = match ctx.get(name)? {
            Value::Array(items) if !items.is_empty() => items,
            other => {
                return Err(ScriptError::mismatch(
                    name,
                    "non-empty number array",
                    other.shape(),
                ))
            }
        };
        let size = self.model.size();
        let mut lanes = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let found = match item {
                Value::Number(RandomVariable::Paths(p)) => {
                    check_size(size, p)?;
                    lanes.push(p.values().into_owned());
                    continue;
                }
                Value::Number(RandomVariable::Node(_)) => "graph node".to_string(),
                other => other.shape(),
            };
            return Err(ScriptError::mismatch(
                format!("{name}[{}]", i + 1),
                "simulated number",
                found,
            ));
        }
        Ok(lanes)
    }

    fn check_length(&self, name: &str, len: usize, ctx: &Context) -> Result<(), ScriptError> {
        match ctx.get(name)? {
            Value::Array(items) if items.len() == len => Ok(()),
            other => Err(ScriptError::mismatch(
                name,
                format!("array[{len}] of number"),
                other.shape(),
            )),
        }
    }

    fn active_lanes(&self, what: &str) -> Result<Vec<bool>, ScriptError> {
        match &self.active {
            Filter::Paths(flags) => Ok(flags.values().into_owned()),
            Filter::Node(_) => Err(ScriptError::mismatch(
                what,
                "condition known per path",
                "graph node",
            )),
        }
    }

    /// Stores `lanes[i]` into element `i + 1` of `name` on the active paths.
    fn write_lanes(
        &mut self,
        name: &str,
        lanes: Vec<Vec<f64>>,
        ctx: &mut Context,
    ) -> Result<(), ScriptError> {
        for (i, values) in lanes.into_iter().enumerate() {
            let index = i as i64 + 1;
            let new = Value::Number(PathVector::from_paths(values).into());
            let blended = self.blend(name, ctx.get_element(name, index)?, new)?;
            ctx.set_element(name, index, blended)?;
        }
        Ok(())
    }

    fn sort(
        &mut self,
        source: &str,
        target: Option<&str>,
        positions: Option<&str>,
        ctx: &mut Context,
    ) -> Result<(), ScriptError> {
        let x = self.array_lanes(source, ctx)?;
        let target = target.unwrap_or(source);
        self.check_length(target, x.len(), ctx)?;
        if let Some(p) = positions {
            self.check_length(p, x.len(), ctx)?;
        }
        let active = self.active_lanes("SORT")?;

        let mut sorted = vec![vec![0.0; active.len()]; x.len()];
        let mut order = sorted.clone();
        let mut entries = Vec::with_capacity(x.len());
        for path in (0..active.len()).filter(|k| active[*k]) {
            entries.clear();
            entries.extend(x.iter().enumerate().map(|(c, lanes)| (lanes[path], c)));
            entries.sort_by(|a, b| a.0.total_cmp(&b.0));
            for (c, (value, from)) in entries.iter().enumerate() {
                sorted[c][path] = *value;
                order[c][path] = (from + 1) as f64;
            }
        }
        debug!(from = source, to = target, elements = x.len(), "sorted array");
        self.write_lanes(target, sorted, ctx)?;
        if let Some(p) = positions {
            self.write_lanes(p, order, ctx)?;
        }
        Ok(())
    }

    fn permute(
        &mut self,
        source: &str,
        target: Option<&str>,
        positions: &str,
        ctx: &mut Context,
    ) -> Result<(), ScriptError> {
        let x = self.array_lanes(source, ctx)?;
        let n = x.len();
        let target = target.unwrap_or(source);
        self.check_length(positions, n, ctx)?;
        self.check_length(target, n, ctx)?;
        let p = self.array_lanes(positions, ctx)?;
        let active = self.active_lanes("PERMUTE")?;

        let mut permuted = vec![vec![0.0; active.len()]; n];
        for path in (0..active.len()).filter(|k| active[*k]) {
            for (c, lanes) in p.iter().enumerate() {
                let position = lanes[path].round();
                if !(1.0..=n as f64).contains(&position) {
                    return Err(ScriptError::IndexOutOfRange {
                        name: positions.to_string(),
                        index: position as i64,
                        size: n,
                    });
                }
                permuted[c][path] = x[position as usize - 1][path];
            }
        }
        debug!(from = source, to = target, elements = n, "permuted array");
        self.write_lanes(target, permuted, ctx)
    }

    // ------------------------------------------------------------------
    // Expressions

    fn subscript(&mut self, name: &str, index: &Expr, ctx: &Context) -> Result<i64, ScriptError> {
        let n = self.number(index, ctx, name)?;
        as_integer(&n).ok_or_else(|| {
            ScriptError::mismatch(
                format!("{name}[{index}]"),
                "deterministic integer subscript",
                "path-dependent or fractional number",
            )
        })
    }

    fn value(&mut self, expr: &Expr, ctx: &Context, what: &str) -> Result<Value, ScriptError> {
        match self.eval(expr, ctx)? {
            Operand::Value(v) => Ok(v),
            Operand::Condition(_) => Err(ScriptError::mismatch(what, "value", "condition")),
        }
    }

    fn number(
        &mut self,
        expr: &Expr,
        ctx: &Context,
        what: &str,
    ) -> Result<RandomVariable, ScriptError> {
        match self.eval(expr, ctx)? {
            Operand::Value(Value::Number(n)) => Ok(n),
            other => Err(ScriptError::mismatch(what, "number", other.shape())),
        }
    }

    fn condition(&mut self, expr: &Expr, ctx: &Context, what: &str) -> Result<Filter, ScriptError> {
        match self.eval(expr, ctx)? {
            Operand::Condition(f) => Ok(f),
            other => Err(ScriptError::mismatch(what, "condition", other.shape())),
        }
    }

    fn event(&mut self, expr: &Expr, ctx: &Context, what: &str) -> Result<Date, ScriptError> {
        match self.eval(expr, ctx)? {
            Operand::Value(Value::Event(d)) => Ok(d),
            other => Err(ScriptError::mismatch(what, "event", other.shape())),
        }
    }

    fn eval(&mut self, expr: &Expr, ctx: &Context) -> Result<Operand, ScriptError> {
        match &expr.kind {
            ExprKind::Number(v) => Ok(Operand::Value(Value::Number(self.model.constant(*v)))),
            ExprKind::String(s) => Err(ScriptError::mismatch(
                format!("\"{s}\""),
                "number, event or condition",
                "string",
            )),
            ExprKind::Identifier(name) => Ok(Operand::Value(ctx.get(name)?.clone())),
            ExprKind::ArrayAccess { name, index } => {
                let i = self.subscript(name, index, ctx)?;
                Ok(Operand::Value(ctx.get_element(name, i)?.clone()))
            }
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Neg => {
                    let n = self.number(operand, ctx, "-")?;
                    Ok(Operand::Value(Value::Number(n.neg()?)))
                }
                UnaryOp::Not => {
                    let f = self.condition(operand, ctx, "NOT")?;
                    Ok(Operand::Condition(f.not()?))
                }
            },
            ExprKind::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs, ctx),
            ExprKind::Call { target, args } => match target {
                CallTarget::Index(name) => self.index_fixing(name, args, ctx),
                CallTarget::Builtin(b) => self.builtin(*b, expr, args, ctx),
            },
        }
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        ctx: &Context,
    ) -> Result<Operand, ScriptError> {
        let symbol = op.symbol();
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let a = self.condition(lhs, ctx, symbol)?;
            let b = self.condition(rhs, ctx, symbol)?;
            let f = if op == BinaryOp::And { a.and(&b)? } else { a.or(&b)? };
            return Ok(Operand::Condition(f));
        }

        let a = self.value(lhs, ctx, symbol)?;
        let b = self.value(rhs, ctx, symbol)?;
        if let Some(cmp) = comparison(op) {
            return self.compare(cmp, symbol, &a, &b).map(Operand::Condition);
        }
        let (Value::Number(x), Value::Number(y)) = (&a, &b) else {
            return Err(ScriptError::mismatch(
                symbol,
                "number operands",
                format!("{} and {}", a.shape(), b.shape()),
            ));
        };
        let n = match op {
            BinaryOp::Add => x.add(y)?,
            BinaryOp::Sub => x.sub(y)?,
            BinaryOp::Mul => x.mul(y)?,
            _ => x.div(y)?,
        };
        Ok(Operand::Value(Value::Number(n)))
    }

    fn compare(
        &self,
        cmp: Comparison,
        symbol: &str,
        a: &Value,
        b: &Value,
    ) -> Result<Filter, ScriptError> {
        let size = self.model.size();
        let equality = |eq: bool| match cmp {
            Comparison::Eq => Ok(Filter::constant(size, eq)),
            Comparison::Ne => Ok(Filter::constant(size, !eq)),
            _ => Err(ScriptError::mismatch(symbol, "== or != operator", a.kind())),
        };
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => Ok(x.compare(y, cmp)?),
            (Value::Event(x), Value::Event(y)) => {
                let holds = match cmp {
                    Comparison::Eq => x == y,
                    Comparison::Ne => x != y,
                    Comparison::Lt => x < y,
                    Comparison::Le => x <= y,
                    Comparison::Gt => x > y,
                    Comparison::Ge => x >= y,
                };
                Ok(Filter::constant(size, holds))
            }
            (Value::Currency(x), Value::Currency(y)) => equality(x == y),
            (Value::Index(x), Value::Index(y)) => equality(x == y),
            (Value::DayCounter(x), Value::DayCounter(y)) => equality(x == y),
            _ => Err(ScriptError::mismatch(
                symbol,
                "operands of the same kind",
                format!("{} and {}", a.shape(), b.shape()),
            )),
        }
    }

    fn index_fixing(
        &mut self,
        name: &str,
        args: &[Expr],
        ctx: &Context,
    ) -> Result<Operand, ScriptError> {
        let index = match ctx.get(name)? {
            Value::Index(index) => index.clone(),
            other => return Err(ScriptError::mismatch(name, "index", other.shape())),
        };
        let obs = self.event(&args[0], ctx, name)?;
        let fwd = match args.get(1) {
            Some(arg) => Some(self.event(arg, ctx, name)?),
            None => None,
        };
        let fixing = self.model.fixing(&index, obs, fwd)?;
        Ok(Operand::Value(Value::Number(fixing)))
    }

    // ------------------------------------------------------------------
    // Built-ins

    fn builtin(
        &mut self,
        builtin: Builtin,
        call: &Expr,
        args: &[Expr],
        ctx: &Context,
    ) -> Result<Operand, ScriptError> {
        let n = match builtin {
            Builtin::Abs => self.unary_fn(builtin, UnaryFn::Abs, args, ctx)?,
            Builtin::Exp => self.unary_fn(builtin, UnaryFn::Exp, args, ctx)?,
            Builtin::Ln => self.unary_fn(builtin, UnaryFn::Log, args, ctx)?,
            Builtin::Sqrt => self.unary_fn(builtin, UnaryFn::Sqrt, args, ctx)?,
            Builtin::NormalCdf => self.unary_fn(builtin, UnaryFn::NormalCdf, args, ctx)?,
            Builtin::NormalPdf => self.unary_fn(builtin, UnaryFn::NormalPdf, args, ctx)?,
            Builtin::Min => self.binary_fn(builtin, BinaryFn::Min, args, ctx)?,
            Builtin::Max => self.binary_fn(builtin, BinaryFn::Max, args, ctx)?,
            Builtin::Pow => self.binary_fn(builtin, BinaryFn::Pow, args, ctx)?,
            Builtin::Black => self.black(args, ctx)?,
            Builtin::Dcf | Builtin::Days => {
                let dc = self.day_counter(builtin, &args[0], ctx)?;
                let d1 = self.arg_event(builtin, &args[1], ctx)?;
                let d2 = self.arg_event(builtin, &args[2], ctx)?;
                let v = if builtin == Builtin::Dcf {
                    dc.year_fraction_dates(d1, d2)
                } else {
                    dc.day_count(d1, d2) as f64
                };
                self.model.constant(v)
            }
            Builtin::Pay | Builtin::LogPay => self.pay(builtin, args, ctx)?,
            Builtin::Discount => {
                let obs = self.arg_event(builtin, &args[0], ctx)?;
                let pay = self.arg_event(builtin, &args[1], ctx)?;
                let ccy = self.currency(builtin, &args[2], ctx)?;
                self.model.discount(obs, pay, ccy)?
            }
            Builtin::Npv | Builtin::NpvMem => self.npv(builtin, call, args, ctx)?,
            Builtin::Size => match self.eval(&args[0], ctx)? {
                Operand::Value(Value::Array(items)) => self.model.constant(items.len() as f64),
                _ => return Err(builtin_error(builtin)),
            },
            Builtin::HistFixing => {
                let index = match self.eval(&args[0], ctx)? {
                    Operand::Value(Value::Index(index)) => index,
                    _ => return Err(builtin_error(builtin)),
                };
                let date = self.arg_event(builtin, &args[1], ctx)?;
                let known = self.model.historical_fixing_known(&index, date);
                self.model.constant(if known { 1.0 } else { 0.0 })
            }
            Builtin::DateIndex => self.date_index(args, ctx)?,
            Builtin::AboveProb | Builtin::BelowProb => {
                let index = match self.eval(&args[0], ctx)? {
                    Operand::Value(Value::Index(index)) => index,
                    _ => return Err(builtin_error(builtin)),
                };
                let from = self.arg_event(builtin, &args[1], ctx)?;
                let to = self.arg_event(builtin, &args[2], ctx)?;
                let barrier = self.arg_number(builtin, &args[3], ctx)?;
                let above = builtin == Builtin::AboveProb;
                self.model
                    .barrier_probability(&index, from, to, &barrier, above)?
            }
        };
        Ok(Operand::Value(Value::Number(n)))
    }

    fn arg_number(
        &mut self,
        builtin: Builtin,
        arg: &Expr,
        ctx: &Context,
    ) -> Result<RandomVariable, ScriptError> {
        match self.eval(arg, ctx)? {
            Operand::Value(Value::Number(n)) => Ok(n),
            _ => Err(builtin_error(builtin)),
        }
    }

    fn arg_event(&mut self, builtin: Builtin, arg: &Expr, ctx: &Context) -> Result<Date, ScriptError> {
        match self.eval(arg, ctx)? {
            Operand::Value(Value::Event(d)) => Ok(d),
            _ => Err(builtin_error(builtin)),
        }
    }

    fn currency(
        &mut self,
        builtin: Builtin,
        arg: &Expr,
        ctx: &Context,
    ) -> Result<Currency, ScriptError> {
        match self.eval(arg, ctx)? {
            Operand::Value(Value::Currency(c)) => Ok(c),
            _ => Err(builtin_error(builtin)),
        }
    }

    fn day_counter(
        &mut self,
        builtin: Builtin,
        arg: &Expr,
        ctx: &Context,
    ) -> Result<DayCountConvention, ScriptError> {
        match self.eval(arg, ctx)? {
            Operand::Value(Value::DayCounter(dc)) => Ok(dc),
            _ => Err(builtin_error(builtin)),
        }
    }

    fn unary_fn(
        &mut self,
        builtin: Builtin,
        f: UnaryFn,
        args: &[Expr],
        ctx: &Context,
    ) -> Result<RandomVariable, ScriptError> {
        let x = self.arg_number(builtin, &args[0], ctx)?;
        Ok(x.unary(f)?)
    }

    fn binary_fn(
        &mut self,
        builtin: Builtin,
        f: BinaryFn,
        args: &[Expr],
        ctx: &Context,
    ) -> Result<RandomVariable, ScriptError> {
        let x = self.arg_number(builtin, &args[0], ctx)?;
        let y = self.arg_number(builtin, &args[1], ctx)?;
        Ok(x.binary(f, &y)?)
    }

    fn black(&mut self, args: &[Expr], ctx: &Context) -> Result<RandomVariable, ScriptError> {
        let b = Builtin::Black;
        let omega = self.arg_number(b, &args[0], ctx)?;
        let obs = self.arg_event(b, &args[1], ctx)?;
        let expiry = self.arg_event(b, &args[2], ctx)?;
        let strike = self.arg_number(b, &args[3], ctx)?;
        let forward = self.arg_number(b, &args[4], ctx)?;
        let vol = self.arg_number(b, &args[5], ctx)?;
        let t = DayCountConvention::ActualActual365.year_fraction_dates(obs, expiry);
        black_price(&omega, &strike, &forward, &vol, t)
    }

    fn pay(
        &mut self,
        builtin: Builtin,
        args: &[Expr],
        ctx: &Context,
    ) -> Result<RandomVariable, ScriptError> {
        let amount = self.arg_number(builtin, &args[0], ctx)?;
        let obs = self.arg_event(builtin, &args[1], ctx)?;
        let pay = self.arg_event(builtin, &args[2], ctx)?;
        let ccy = self.currency(builtin, &args[3], ctx)?;
        if builtin == Builtin::Pay {
            return Ok(self
                .model
                .pay(&amount, obs, pay, ccy, PaymentConvention::Deterministic)?);
        }

        let (leg, kind) = match args.get(4..6) {
            Some([leg, kind]) => {
                let leg = self.arg_number(builtin, leg, ctx)?;
                let leg = as_integer(&leg).ok_or_else(|| builtin_error(builtin))?;
                let ExprKind::String(kind) = &kind.kind else {
                    return Err(builtin_error(builtin));
                };
                (Some(leg), Some(kind.clone()))
            }
            _ => (None, None),
        };
        let value = self
            .model
            .pay(&amount, obs, pay, ccy, PaymentConvention::NumeraireRelative)?;

        let zero = self.model.constant(0.0);
        self.cashflows.push(CashflowRecord {
            leg,
            kind,
            obs,
            pay,
            currency: ccy,
            amount: RandomVariable::select(&self.active, &amount, &zero)?,
            value: RandomVariable::select(&self.active, &value, &zero)?,
        });
        Ok(value)
    }

    fn npv(
        &mut self,
        builtin: Builtin,
        call: &Expr,
        args: &[Expr],
        ctx: &Context,
    ) -> Result<RandomVariable, ScriptError> {
        let amount = self.arg_number(builtin, &args[0], ctx)?;
        let obs = self.arg_event(builtin, &args[1], ctx)?;
        let (slot, rest) = if builtin == Builtin::NpvMem {
            let mem = self.arg_number(builtin, &args[2], ctx)?;
            let mem = as_integer(&mem).ok_or_else(|| builtin_error(builtin))?;
            (RegressionSlot::Memory(mem), &args[3..])
        } else {
            (RegressionSlot::Site(call.id.0), &args[2..])
        };

        let filter = match rest.first() {
            Some(arg) => match self.eval(arg, ctx)? {
                Operand::Condition(f) => Some(f),
                _ => return Err(builtin_error(builtin)),
            },
            None => None,
        };
        let mut regressors = Vec::new();
        for arg in rest.iter().skip(1) {
            regressors.push(self.arg_number(builtin, arg, ctx)?);
        }

        let request = RegressionRequest {
            slot,
            filter: filter.as_ref(),
            regressors: &regressors,
        };
        Ok(self.model.npv(&amount, obs, &request)?)
    }

    fn date_index(&mut self, args: &[Expr], ctx: &Context) -> Result<RandomVariable, ScriptError> {
        let b = Builtin::DateIndex;
        let date = self.arg_event(b, &args[0], ctx)?;
        let (ExprKind::Identifier(array), ExprKind::Identifier(op)) = (&args[1].kind, &args[2].kind)
        else {
            return Err(builtin_error(b));
        };
        let dates = match ctx.get(array)? {
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_event().ok_or_else(|| builtin_error(b)))
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(builtin_error(b)),
        };
        let position = match op.as_str() {
            "EQ" => dates.iter().position(|d| *d == date).map_or(0, |p| p + 1),
            "GEQ" => dates.iter().filter(|d| **d < date).count() + 1,
            "GT" => dates.iter().filter(|d| **d <= date).count() + 1,
            _ => return Err(builtin_error(b)),
        };
        Ok(self.model.constant(position as f64))
    }
}

fn check_size(expected: usize, p: &PathVector) -> Result<(), VectorError> {
    if p.size() != expected {
        return Err(VectorError::SizeMismatch {
            left: expected,
            right: p.size(),
        });
    }
    Ok(())
}

/// Black price `omega * (F N(omega d1) - K N(omega d2))` with total standard
/// deviation `vol * sqrt(t)`; intrinsic value for `t <= 0`.
fn black_price(
    omega: &RandomVariable,
    strike: &RandomVariable,
    forward: &RandomVariable,
    vol: &RandomVariable,
    t: f64,
) -> Result<RandomVariable, ScriptError> {
    let t = t.max(0.0);
    if let (
        RandomVariable::Paths(w),
        RandomVariable::Paths(k),
        RandomVariable::Paths(f),
        RandomVariable::Paths(v),
    ) = (omega, strike, forward, vol)
    {
        let size = w.size();
        for p in [k, f, v] {
            check_size(size, p)?;
        }
        let lane = |i: usize| black_formula(w.at(i), k.at(i), f.at(i), v.at(i) * t.sqrt());
        let all_deterministic = [w, k, f, v].iter().all(|p| p.is_deterministic());
        let result = if all_deterministic {
            PathVector::deterministic(size, lane(0))
        } else {
            PathVector::from_paths((0..size).map(lane).collect())
        };
        return Ok(result.into());
    }

    // Recorded from elementary operations so the graph can differentiate it.
    let intrinsic = omega
        .mul(&forward.sub(strike)?)?
        .binary(BinaryFn::Max, &RandomVariable::constant(1, 0.0))?;
    if t <= 0.0 || vol.deterministic_value().is_some_and(|v| v <= 0.0) {
        return Ok(intrinsic);
    }
    let half = RandomVariable::constant(1, 0.5);
    let std_dev = vol.mul(&RandomVariable::constant(1, t.sqrt()))?;
    let d1 = forward
        .div(strike)?
        .unary(UnaryFn::Log)?
        .add(&half.mul(&std_dev)?.mul(&std_dev)?)?
        .div(&std_dev)?;
    let d2 = d1.sub(&std_dev)?;
    let n1 = omega.mul(&d1)?.unary(UnaryFn::NormalCdf)?;
    let n2 = omega.mul(&d2)?.unary(UnaryFn::NormalCdf)?;
    Ok(omega.mul(&forward.mul(&n1)?.sub(&strike.mul(&n2)?)?)?)
}

// ============================================================================
// Engine
// ============================================================================

/// Runs a parsed script once against a context and a model.
///
/// If the model simulates a training path set, the script first runs on a
/// copy of the context against the training paths so every regression is
/// fitted there; the model is switched back to the pricing paths whatever
/// the outcome.
pub struct ScriptEngine<'a, M: Model> {
    script: &'a Script,
    context: &'a mut Context,
    model: &'a mut M,
    state: EngineState,
}

impl<'a, M: Model> ScriptEngine<'a, M> {
    /// Engine in state [`EngineState::Ready`].
    pub fn new(script: &'a Script, context: &'a mut Context, model: &'a mut M) -> Self {
        Self {
            script,
            context,
            model,
            state: EngineState::Ready,
        }
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Evaluates the script.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the engine is ready; otherwise the first error
    /// raised by the evaluation, located at its statement.
    pub fn run(&mut self) -> Result<EvaluationResult, ScriptError> {
        if self.state != EngineState::Ready {
            return Err(ScriptError::InvalidState(format!(
                "engine is {}, expected ready",
                self.state
            )));
        }
        self.state = EngineState::Running;
        debug!(
            product = self.script.product().unwrap_or("-"),
            paths = self.model.size(),
            "starting script evaluation"
        );
        let outcome = self.evaluate();
        self.state = match &outcome {
            Ok(_) => EngineState::Completed,
            Err(err) => {
                debug!(error = %err, "script evaluation failed");
                EngineState::Failed
            }
        };
        if let Ok(result) = &outcome {
            debug!(cashflows = result.cashflows.len(), "script evaluation completed");
        }
        outcome
    }

    fn evaluate(&mut self) -> Result<EvaluationResult, ScriptError> {
        if self.model.has_training_paths() {
            self.model.select_path_set(PathSet::Training)?;
            debug!(paths = self.model.size(), "training pass");
            let trained = self
                .context
                .resized(self.model.size())
                .and_then(|mut training| {
                    Interpreter::new(&mut *self.model, true).run(self.script, &mut training)
                });
            let restored = self.model.select_path_set(PathSet::Pricing);
            trained?;
            restored?;
        }
        Interpreter::new(&mut *self.model, true).run(self.script, self.context)
    }
}

/// Evaluates `script` against `context` and `model`.
///
/// # Errors
///
/// The first parse-independent error of the evaluation; see [`ScriptError`].
pub fn evaluate<M: Model>(
    script: &Script,
    context: &mut Context,
    model: &mut M,
) -> Result<EvaluationResult, ScriptError> {
    ScriptEngine::new(script, context, model).run()
}

// ============================================================================
// Stepper
// ============================================================================

/// Interactive execution, one top-level statement per [`Stepper::step`].
///
/// No training pass is run; regressions fit on the pricing paths.
pub struct Stepper<'a, M: Model> {
    script: &'a Script,
    context: &'a mut Context,
    interpreter: Interpreter<'a, M>,
    next: usize,
    started: bool,
}

impl<'a, M: Model> Stepper<'a, M> {
    /// Stepper positioned before the first statement.
    pub fn new(script: &'a Script, context: &'a mut Context, model: &'a mut M) -> Self {
        Self {
            script,
            context,
            interpreter: Interpreter::new(model, true),
            next: 0,
            started: false,
        }
    }

    /// Executes the next top-level statement and returns its location, or
    /// `None` once every statement has run.
    pub fn step(&mut self) -> Result<Option<Location>, ScriptError> {
        let script = self.script;
        if !self.started {
            self.interpreter.declare_result(script, self.context)?;
            self.started = true;
        }
        let Some(statement) = script.statements().get(self.next) else {
            return Ok(None);
        };
        self.interpreter.exec_statement(statement, self.context)?;
        self.next += 1;
        Ok(Some(statement.location))
    }

    /// Whether statements remain.
    pub fn is_done(&self) -> bool {
        self.next >= self.script.statements().len()
    }

    /// Context as left by the statements run so far.
    pub fn context(&self) -> &Context {
        self.context
    }

    /// Runs the remaining statements and collects the results.
    pub fn finish(mut self) -> Result<EvaluationResult, ScriptError> {
        while self.step()?.is_some() {}
        self.interpreter.finish(self.script, self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_price_matches_formula_lane_wise() {
        let omega = RandomVariable::constant(2, 1.0);
        let strike = RandomVariable::from(PathVector::from_paths(vec![90.0, 110.0]));
        let forward = RandomVariable::constant(2, 100.0);
        let vol = RandomVariable::constant(2, 0.2);
        let price = black_price(&omega, &strike, &forward, &vol, 1.0).unwrap();
        let lanes = price.as_paths().unwrap();
        assert_eq!(lanes.at(0), black_formula(1.0, 90.0, 100.0, 0.2));
        assert_eq!(lanes.at(1), black_formula(1.0, 110.0, 100.0, 0.2));
    }

    #[test]
    fn test_black_price_expired_is_intrinsic() {
        let c = |v| RandomVariable::constant(1, v);
        let put = black_price(&c(-1.0), &c(100.0), &c(90.0), &c(0.3), -0.5).unwrap();
        assert_eq!(put.deterministic_value(), Some(10.0));
    }

    #[test]
    fn test_as_integer() {
        assert_eq!(as_integer(&RandomVariable::constant(3, 4.0)), Some(4));
        assert_eq!(as_integer(&RandomVariable::constant(3, 4.5)), None);
        let paths: RandomVariable = PathVector::from_paths(vec![1.0, 2.0]).into();
        assert_eq!(as_integer(&paths), None);
        assert_eq!(
            as_integer(&RandomVariable::constant(1, -MAX_EXACT_INTEGER)),
            Some(-(1_i64 << 53))
        );
        assert_eq!(as_integer(&RandomVariable::constant(1, 2f64.powi(60))), None);
        assert_eq!(as_integer(&RandomVariable::constant(1, f64::INFINITY)), None);
    }

    #[test]
    fn test_engine_state_display() {
        assert_eq!(EngineState::Ready.to_string(), "ready");
        assert_eq!(EngineState::Failed.to_string(), "failed");
    }
}
