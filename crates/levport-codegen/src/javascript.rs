//! JavaScript writer for the lowered IR.
//!
//! Emits an ES module: a provenance header, the import block and one
//! exported entry function. Parentheses come from the precedence table
//! below, so the output carries only the ones JavaScript needs.

use crate::traits::Writer;
use levport_lower::ir::*;
use std::fmt::Write;

/// Static instance of the JavaScript writer.
pub static JAVASCRIPT_WRITER: JavaScriptWriterImpl = JavaScriptWriterImpl;

/// JavaScript writer implementing the Writer trait.
pub struct JavaScriptWriterImpl;

impl Writer for JavaScriptWriterImpl {
    fn language(&self) -> &'static str {
        "javascript"
    }

    fn extension(&self) -> &'static str {
        "js"
    }

    fn write(&self, module: &Module) -> String {
        JavaScriptWriter::emit(module)
    }
}

// Operator precedence, higher binds tighter.
const ASSIGN: u8 = 2;
const CONDITIONAL_TEST: u8 = 3;
const UNARY: u8 = 15;
const POSTFIX: u8 = 16;
const CALL: u8 = 18;
const PRIMARY: u8 = 20;

/// Emits IR as JavaScript source code.
pub struct JavaScriptWriter {
    output: String,
    indent: usize,
}

impl JavaScriptWriter {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
        }
    }

    /// Emit a whole module.
    pub fn emit(module: &Module) -> String {
        let mut writer = Self::new();
        writer.write_module(module);
        writer.output
    }

    /// Emit statements at the outermost indentation, one per line.
    pub fn emit_stmts(stmts: &[Stmt]) -> String {
        let mut writer = Self::new();
        for stmt in stmts {
            writer.write_stmt(stmt);
            writer.output.push('\n');
        }
        writer.output
    }

    /// Emit a single expression.
    pub fn emit_expr(expr: &Expr) -> String {
        let mut writer = Self::new();
        writer.write_expr(expr);
        writer.output
    }

    fn write_module(&mut self, module: &Module) {
        writeln!(
            self.output,
            "// Generated by levport from {}. Do not edit by hand.",
            module.source_name
        )
        .unwrap();
        for import in &module.imports {
            writeln!(
                self.output,
                "import {{ {} }} from \"{}\";",
                import.names.join(", "),
                escape_string(&import.from)
            )
            .unwrap();
        }
        self.output.push('\n');

        writeln!(self.output, "export function {}() {{", module.entry).unwrap();
        if !module.globals.is_empty() {
            writeln!(self.output, "  let {};", module.globals.join(", ")).unwrap();
        }
        self.write_body(&module.body);
        self.output.push_str("}\n");
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
    }

    /// Statements one level deeper than the current indent.
    fn write_body(&mut self, stmts: &[Stmt]) {
        self.indent += 1;
        for stmt in stmts {
            self.write_stmt(stmt);
            self.output.push('\n');
        }
        self.indent -= 1;
    }

    fn write_block(&mut self, stmts: &[Stmt]) {
        if stmts.is_empty() {
            self.output.push_str("{}");
            return;
        }
        self.output.push_str("{\n");
        self.write_body(stmts);
        self.write_indent();
        self.output.push('}');
    }

    fn write_stmt(&mut self, stmt: &Stmt) {
        self.write_indent();
        self.write_stmt_no_indent(stmt);
    }

    /// Statement without the leading indent (else-if chains continue on
    /// the current line).
    fn write_stmt_no_indent(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => {
                self.write_expr(expr);
                self.output.push(';');
            }

            Stmt::Let { binding, init } => {
                self.output.push_str("let ");
                self.write_binding(binding);
                if let Some(init) = init {
                    self.output.push_str(" = ");
                    self.write_expr_prec(init, ASSIGN);
                }
                self.output.push(';');
            }

            Stmt::Assign { target, value } => {
                self.write_expr(target);
                self.output.push_str(" = ");
                self.write_expr_prec(value, ASSIGN);
                self.output.push(';');
            }

            Stmt::Block(stmts) => self.write_block(stmts),

            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.output.push_str("if (");
                self.write_expr(test);
                self.output.push_str(") ");
                self.write_block(consequent);
                if let Some(alt) = alternate {
                    self.output.push_str(" else ");
                    if let [nested @ Stmt::If { .. }] = alt.as_slice() {
                        self.write_stmt_no_indent(nested);
                    } else {
                        self.write_block(alt);
                    }
                }
            }

            Stmt::While { test, body } => {
                self.output.push_str("while (");
                self.write_expr(test);
                self.output.push_str(") ");
                self.write_block(body);
            }

            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                self.output.push_str("for (let ");
                for (i, (name, value)) in init.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    write!(self.output, "{} = ", name).unwrap();
                    self.write_expr_prec(value, ASSIGN);
                }
                self.output.push_str("; ");
                self.write_expr(test);
                self.output.push_str("; ");
                self.write_expr(update);
                self.output.push_str(") ");
                self.write_block(body);
            }

            Stmt::ForOf {
                binding,
                iterable,
                body,
            } => {
                self.output.push_str("for (let ");
                self.write_binding(binding);
                self.output.push_str(" of ");
                self.write_expr_prec(iterable, ASSIGN);
                self.output.push_str(") ");
                self.write_block(body);
            }

            Stmt::Return(expr) => {
                self.output.push_str("return");
                if let Some(e) = expr {
                    self.output.push(' ');
                    self.write_expr(e);
                }
                self.output.push(';');
            }

            Stmt::Break => {
                self.output.push_str("break;");
            }

            Stmt::Function(f) => {
                self.write_function(f);
            }
        }
    }

    fn write_binding(&mut self, binding: &Binding) {
        match binding {
            Binding::Name(name) => self.output.push_str(name),
            Binding::Names(names) => self.output.push_str(&names.join(", ")),
            Binding::Array(slots) => {
                let slots: Vec<&str> = slots
                    .iter()
                    .map(|slot| slot.as_deref().unwrap_or(""))
                    .collect();
                write!(self.output, "[{}]", slots.join(", ")).unwrap();
            }
        }
    }

    fn write_params(&mut self, f: &Function) {
        self.output.push('(');
        let rest = f.rest.as_ref().map(|rest| format!("...{rest}"));
        for (i, param) in f.params.iter().chain(rest.as_ref()).enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.output.push_str(param);
        }
        self.output.push(')');
    }

    fn write_function(&mut self, f: &Function) {
        write!(self.output, "function {}", f.name).unwrap();
        self.write_params(f);
        self.output.push(' ');
        self.write_block(&f.body);
    }

    fn write_expr(&mut self, expr: &Expr) {
        self.write_expr_prec(expr, 0);
    }

    /// Write `expr`, parenthesized if it binds looser than `min`.
    fn write_expr_prec(&mut self, expr: &Expr, min: u8) {
        if precedence(expr) < min {
            self.output.push('(');
            self.write_expr_inner(expr);
            self.output.push(')');
        } else {
            self.write_expr_inner(expr);
        }
    }

    fn write_expr_inner(&mut self, expr: &Expr) {
        match expr {
            Expr::Undefined => self.output.push_str("undefined"),
            Expr::Null => self.output.push_str("null"),
            Expr::Bool(b) => write!(self.output, "{}", b).unwrap(),
            Expr::Number(n) => self.write_number(*n),
            Expr::String(s) => write!(self.output, "\"{}\"", escape_string(s)).unwrap(),
            Expr::Template(content) => self.write_template(content),

            Expr::Ident(name) => {
                self.output.push_str(name);
            }

            Expr::Member { object, property } => {
                self.write_object(object);
                if is_valid_identifier(property) {
                    self.output.push('.');
                    self.output.push_str(property);
                } else {
                    write!(self.output, "[\"{}\"]", escape_string(property)).unwrap();
                }
            }

            Expr::Index { object, index } => {
                self.write_object(object);
                self.output.push('[');
                self.write_expr(index);
                self.output.push(']');
            }

            Expr::Call { callee, args } => {
                self.write_expr_prec(callee, CALL);
                self.output.push('(');
                self.write_list(args);
                self.output.push(')');
            }

            Expr::Binary { left, op, right } => {
                let prec = binary_precedence(*op);
                let (left_min, right_min) = if *op == BinaryOp::Pow {
                    // `-a ** b` is a syntax error
                    (UNARY + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                self.write_expr_prec(left, left_min);
                write!(self.output, " {} ", binary_op(*op)).unwrap();
                self.write_expr_prec(right, right_min);
            }

            Expr::Unary { op, expr } => {
                match op {
                    UnaryOp::Neg => {
                        self.output.push('-');
                        if starts_with_minus(expr) {
                            self.output.push(' ');
                        }
                    }
                    UnaryOp::Not => self.output.push('!'),
                }
                self.write_expr_prec(expr, UNARY);
            }

            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.write_expr_prec(test, CONDITIONAL_TEST);
                self.output.push_str(" ? ");
                self.write_expr_prec(consequent, ASSIGN);
                self.output.push_str(" : ");
                self.write_expr_prec(alternate, ASSIGN);
            }

            Expr::Update { name, op } => match op {
                UpdateOp::Increment => write!(self.output, "{}++", name).unwrap(),
                UpdateOp::Decrement => write!(self.output, "{}--", name).unwrap(),
                UpdateOp::AddAssign(value) => {
                    write!(self.output, "{} += ", name).unwrap();
                    self.write_expr_prec(value, ASSIGN);
                }
                UpdateOp::SubAssign(value) => {
                    write!(self.output, "{} -= ", name).unwrap();
                    self.write_expr_prec(value, ASSIGN);
                }
            },

            Expr::Array(items) => {
                self.output.push('[');
                self.write_list(items);
                self.output.push(']');
            }

            Expr::Object(entries) => {
                if entries.is_empty() {
                    self.output.push_str("{}");
                    return;
                }
                self.output.push_str("{ ");
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    match key {
                        ObjectKey::Name(name) if is_valid_identifier(name) => {
                            self.output.push_str(name);
                        }
                        ObjectKey::Name(name) => {
                            write!(self.output, "\"{}\"", escape_string(name)).unwrap();
                        }
                        ObjectKey::Computed(key) => {
                            self.output.push('[');
                            self.write_expr(key);
                            self.output.push(']');
                        }
                    }
                    self.output.push_str(": ");
                    self.write_expr_prec(value, ASSIGN);
                }
                self.output.push_str(" }");
            }

            Expr::Function(f) => {
                if !f.name.is_empty() {
                    self.write_function(f);
                    return;
                }
                // Anonymous functions become arrow functions
                self.write_params(f);
                self.output.push_str(" => ");

                // Single return statement can be expression body
                if let [Stmt::Return(Some(expr))] = f.body.as_slice() {
                    if matches!(expr, Expr::Object(_)) {
                        self.output.push('(');
                        self.write_expr(expr);
                        self.output.push(')');
                    } else {
                        self.write_expr_prec(expr, ASSIGN);
                    }
                    return;
                }
                self.write_block(&f.body);
            }

            Expr::Spread(inner) => {
                self.output.push_str("...");
                self.write_expr_prec(inner, ASSIGN);
            }
        }
    }

    fn write_list(&mut self, items: &[Expr]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.write_expr_prec(item, ASSIGN);
        }
    }

    /// Object of a member or index access. Number literals need parens
    /// so the dot is not read as a decimal point.
    fn write_object(&mut self, object: &Expr) {
        let min = if matches!(object, Expr::Number(_)) {
            PRIMARY + 1
        } else {
            CALL
        };
        self.write_expr_prec(object, min);
    }

    fn write_number(&mut self, n: f64) {
        if n.is_infinite() {
            self.output
                .push_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
        } else if n.fract() == 0.0 && n.abs() < 1e15 {
            // Format number cleanly (no trailing .0 for integers)
            write!(self.output, "{}", n as i64).unwrap();
        } else {
            write!(self.output, "{}", n).unwrap();
        }
    }

    fn write_template(&mut self, content: &str) {
        // A newline right after the opening bracket is not part of the content
        let content = content
            .strip_prefix("\r\n")
            .or_else(|| content.strip_prefix('\n'))
            .unwrap_or(content);
        write!(self.output, "`{}`", escape_template(content)).unwrap();
    }
}

impl Default for JavaScriptWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Conditional { .. } | Expr::Function(_) | Expr::Spread(_) => ASSIGN,
        Expr::Update {
            op: UpdateOp::AddAssign(_) | UpdateOp::SubAssign(_),
            ..
        } => ASSIGN,
        Expr::Update { .. } => POSTFIX,
        Expr::Binary { op, .. } => binary_precedence(*op),
        Expr::Unary { .. } => UNARY,
        Expr::Number(n) if *n < 0.0 => UNARY,
        Expr::Call { .. } | Expr::Member { .. } | Expr::Index { .. } => CALL,
        Expr::Undefined
        | Expr::Null
        | Expr::Bool(_)
        | Expr::Number(_)
        | Expr::String(_)
        | Expr::Template(_)
        | Expr::Ident(_)
        | Expr::Array(_)
        | Expr::Object(_) => PRIMARY,
    }
}

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 4,
        BinaryOp::And => 5,
        BinaryOp::StrictEq | BinaryOp::StrictNe | BinaryOp::LooseEq | BinaryOp::LooseNe => 9,
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 10,
        BinaryOp::Add | BinaryOp::Sub => 12,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 13,
        BinaryOp::Pow => 14,
    }
}

fn binary_op(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "**",
        BinaryOp::StrictEq => "===",
        BinaryOp::StrictNe => "!==",
        BinaryOp::LooseEq => "==",
        BinaryOp::LooseNe => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

/// Whether the unparenthesized operand of a unary minus starts with `-`.
fn starts_with_minus(expr: &Expr) -> bool {
    match expr {
        Expr::Unary {
            op: UnaryOp::Neg, ..
        } => true,
        Expr::Number(n) => *n < 0.0,
        _ => false,
    }
}

fn escape_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => {
                write!(escaped, "\\u{:04x}", c as u32).unwrap();
            }
            c => escaped.push(c),
        }
    }
    escaped
}

fn escape_template(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_alphabetic() && first != '_' && first != '$' {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
