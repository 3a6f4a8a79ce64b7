//! Abstract syntax tree of the payoff language.
//!
//! A script is a [`Block`] of [`Statement`]s. Every node records the
//! [`Location`] of its first token, and every expression carries an
//! [`ExprId`] unique within its script, which identifies `NPV` call sites
//! for regression caching.

use std::fmt;

// ============================================================================
// Locations and ids
// ============================================================================

/// 1-based line and column of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Location {
    /// Line number
    pub line: usize,
    /// Column number
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Expression id, unique within one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub usize);

// ============================================================================
// Expressions
// ============================================================================

/// Binary operators, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `OR`
    Or,
    /// `AND`
    And,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl BinaryOp {
    /// Source symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "OR",
            BinaryOp::And => "AND",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation
    Neg,
    /// Logical negation of a condition
    Not,
}

/// Built-in functions of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Builtin {
    Abs,
    Exp,
    Ln,
    Sqrt,
    NormalCdf,
    NormalPdf,
    Min,
    Max,
    Pow,
    Black,
    Dcf,
    Days,
    Pay,
    LogPay,
    Discount,
    Npv,
    NpvMem,
    Size,
    HistFixing,
    DateIndex,
    AboveProb,
    BelowProb,
}

impl Builtin {
    /// Every built-in, in catalogue order.
    pub const ALL: [Builtin; 22] = [
        Builtin::Abs,
        Builtin::Exp,
        Builtin::Ln,
        Builtin::Sqrt,
        Builtin::NormalCdf,
        Builtin::NormalPdf,
        Builtin::Min,
        Builtin::Max,
        Builtin::Pow,
        Builtin::Black,
        Builtin::Dcf,
        Builtin::Days,
        Builtin::Pay,
        Builtin::LogPay,
        Builtin::Discount,
        Builtin::Npv,
        Builtin::NpvMem,
        Builtin::Size,
        Builtin::HistFixing,
        Builtin::DateIndex,
        Builtin::AboveProb,
        Builtin::BelowProb,
    ];

    /// Name as written in scripts.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Abs => "abs",
            Builtin::Exp => "exp",
            Builtin::Ln => "ln",
            Builtin::Sqrt => "sqrt",
            Builtin::NormalCdf => "normalCdf",
            Builtin::NormalPdf => "normalPdf",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Pow => "pow",
            Builtin::Black => "black",
            Builtin::Dcf => "dcf",
            Builtin::Days => "days",
            Builtin::Pay => "PAY",
            Builtin::LogPay => "LOGPAY",
            Builtin::Discount => "DISCOUNT",
            Builtin::Npv => "NPV",
            Builtin::NpvMem => "NPVMEM",
            Builtin::Size => "SIZE",
            Builtin::HistFixing => "HISTFIXING",
            Builtin::DateIndex => "DATEINDEX",
            Builtin::AboveProb => "ABOVEPROB",
            Builtin::BelowProb => "BELOWPROB",
        }
    }

    /// Built-in called `name`, if any.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Whether `n` arguments are accepted.
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Builtin::Abs
            | Builtin::Exp
            | Builtin::Ln
            | Builtin::Sqrt
            | Builtin::NormalCdf
            | Builtin::NormalPdf
            | Builtin::Size => n == 1,
            Builtin::Min | Builtin::Max | Builtin::Pow | Builtin::HistFixing => n == 2,
            Builtin::Dcf | Builtin::Days | Builtin::Discount | Builtin::DateIndex => n == 3,
            Builtin::Pay | Builtin::AboveProb | Builtin::BelowProb => n == 4,
            Builtin::LogPay => n == 4 || n == 6,
            Builtin::Black => n == 6,
            Builtin::Npv => (2..=5).contains(&n),
            Builtin::NpvMem => (3..=6).contains(&n),
        }
    }

    /// Argument shapes, for error messages.
    pub fn signature(self) -> &'static str {
        match self {
            Builtin::Abs => "abs(number)",
            Builtin::Exp => "exp(number)",
            Builtin::Ln => "ln(number)",
            Builtin::Sqrt => "sqrt(number)",
            Builtin::NormalCdf => "normalCdf(number)",
            Builtin::NormalPdf => "normalPdf(number)",
            Builtin::Min => "min(number, number)",
            Builtin::Max => "max(number, number)",
            Builtin::Pow => "pow(number, number)",
            Builtin::Black => "black(number, event, event, number, number, number)",
            Builtin::Dcf => "dcf(daycounter, event, event)",
            Builtin::Days => "days(daycounter, event, event)",
            Builtin::Pay => "PAY(number, event, event, currency)",
            Builtin::LogPay => {
                "LOGPAY(number, event, event, currency [, number, \"type\"])"
            }
            Builtin::Discount => "DISCOUNT(event, event, currency)",
            Builtin::Npv => "NPV(number, event [, condition [, number [, number]]])",
            Builtin::NpvMem => {
                "NPVMEM(number, event, number [, condition [, number [, number]]])"
            }
            Builtin::Size => "SIZE(array)",
            Builtin::HistFixing => "HISTFIXING(index, event)",
            Builtin::DateIndex => "DATEINDEX(event, event array, EQ|GEQ|GT)",
            Builtin::AboveProb => "ABOVEPROB(index, event, event, number)",
            Builtin::BelowProb => "BELOWPROB(index, event, event, number)",
        }
    }
}

/// Target of a call expression.
#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    /// Built-in function
    Builtin(Builtin),
    /// Fixing of the index bound to this name
    Index(String),
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Id unique within the script
    pub id: ExprId,
    /// Location of the first token
    pub location: Location,
    /// Expression kind
    pub kind: ExprKind,
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Variable reference
    Identifier(String),
    /// `name[index]`
    ArrayAccess {
        /// Array name
        name: String,
        /// 1-based subscript
        index: Box<Expr>,
    },
    /// `lhs op rhs`
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// `op operand`
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Built-in call or index evaluation
    Call {
        /// Callee
        target: CallTarget,
        /// Arguments
        args: Vec<Expr>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Number(v) => write!(f, "{v}"),
            ExprKind::String(s) => write!(f, "\"{s}\""),
            ExprKind::Identifier(name) => write!(f, "{name}"),
            ExprKind::ArrayAccess { name, index } => write!(f, "{name}[{index}]"),
            ExprKind::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => write!(f, "-{operand}"),
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => write!(f, "NOT {operand}"),
            ExprKind::Call { target, args } => {
                match target {
                    CallTarget::Builtin(b) => write!(f, "{}(", b.name())?,
                    CallTarget::Index(name) => write!(f, "{name}(")?,
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

/// Ordered list of statements.
pub type Block = Vec<Statement>;

/// One variable of a `NUMBER` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclVar {
    /// Variable name
    pub name: String,
    /// Array length, for `NUMBER x[n]`
    pub size: Option<Expr>,
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignTarget {
    /// Variable name
    pub name: String,
    /// 1-based subscript for array elements
    pub index: Option<Expr>,
}

/// Statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Location of the first token
    pub location: Location,
    /// Statement kind
    pub kind: StatementKind,
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `NUMBER a, b[n]`
    Declaration(Vec<DeclVar>),
    /// `x = expr` or `x[i] = expr`
    Assignment {
        /// Assigned variable or element
        target: AssignTarget,
        /// New value
        value: Expr,
    },
    /// `IF cond THEN ... ELSE ... END`
    If {
        /// Condition
        condition: Expr,
        /// Statements run where the condition holds
        then_block: Block,
        /// Statements run elsewhere
        else_block: Option<Block>,
    },
    /// `FOR i IN (start, end, step) DO ... END`
    For {
        /// Counter name
        var: String,
        /// First counter value
        start: Expr,
        /// Last counter value, inclusive
        end: Expr,
        /// Counter increment
        step: Expr,
        /// Loop body
        body: Block,
    },
    /// `REQUIRE cond`
    Require(Expr),
    /// `SORT(x [, y [, p]])`: sorts the paths' values of `x` ascending into
    /// `y` (default `x`), writing the 1-based source positions to `p`
    Sort {
        /// Array to sort
        source: String,
        /// Array receiving the sorted values
        target: Option<String>,
        /// Array receiving the source positions
        positions: Option<String>,
    },
    /// `PERMUTE(x, p)` or `PERMUTE(x, y, p)`: `y[i] = x[p[i]]` path by path,
    /// with `y` defaulting to `x`
    Permute {
        /// Array to permute
        source: String,
        /// Array receiving the permuted values
        target: Option<String>,
        /// 1-based positions into `source`
        positions: String,
    },
}
