//! Lowering from the Lua syntax tree to the JavaScript-shaped IR.
//!
//! The pass is a post-order rewrite that builds a fresh [`ir`](crate::ir)
//! tree. It records every problem in the caller's [`Diagnostics`] and keeps
//! going, so one run reports all of a file's issues. The caller decides
//! what a fatal diagnostic means for the output.

use crate::ir::{
    BinaryOp, Binding, Expr, Function, ObjectKey, Stmt, UnaryOp, UpdateOp,
};
use crate::library::{self, CallRewrite};
use crate::random::{self, RandomCall};
use crate::symbols::{Helper, SymbolUsage};
use levport_syntax::ast::{self, Block, Expression, ExpressionKind, Field, FunctionBody};
use levport_syntax::{Diagnostics, Stage, StatementKind, StructureEq};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Name of the rest parameter that replaces `...`.
pub const VARARG_NAME: &str = "args";

/// Result of lowering one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Lowered {
    /// Body of the entry function, ending in `return finalize_level();`.
    pub body: Vec<Stmt>,
    /// Lua globals the body reads or writes, sorted. They are declared at
    /// the top of the entry function.
    pub globals: Vec<String>,
    pub usage: SymbolUsage,
}

/// Lower a parsed file. Problems go to `diagnostics`; the returned body is
/// only meaningful when none of them is fatal.
pub fn lower_chunk(chunk: &ast::Chunk, diagnostics: &mut Diagnostics) -> Lowered {
    let mut lowerer = Lowerer::new(diagnostics);
    lowerer.collect_block(&chunk.statements);

    let mut body = lowerer.lower_block(&chunk.statements);
    if !matches!(body.last(), Some(Stmt::Return(_))) {
        body.push(lowerer.finalize_return());
    }

    debug!(
        statements = body.len(),
        globals = lowerer.globals.len(),
        helpers = lowerer.usage.used().count(),
        "lowered chunk"
    );

    Lowered {
        body,
        globals: lowerer.globals.into_iter().collect(),
        usage: lowerer.usage,
    }
}

const JS_RESERVED: &[&str] = &[
    "arguments",
    "await",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "enum",
    "eval",
    "export",
    "extends",
    "finally",
    "implements",
    "import",
    "instanceof",
    "interface",
    "let",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "static",
    "super",
    "switch",
    "this",
    "throw",
    "try",
    "typeof",
    "undefined",
    "var",
    "void",
    "with",
    "yield",
    VARARG_NAME,
];

/// Binding name for a Lua identifier. Names that mean something else in
/// JavaScript get a `$` suffix, which no Lua identifier can contain.
pub fn js_name(name: &str) -> String {
    if JS_RESERVED.contains(&name) {
        format!("{name}$")
    } else {
        name.to_string()
    }
}

/// `a.b.c` as a member chain.
fn path_expr(path: &str) -> Expr {
    let mut segments = path.split('.');
    let root = segments.next().unwrap_or(path);
    segments.fold(Expr::ident(root), Expr::member)
}

/// One JavaScript block.
#[derive(Debug, Default)]
struct Scope {
    /// Lua local name to the JavaScript name it was bound as.
    locals: HashMap<String, String>,
    /// Names a new `let` here would clash with: the block's own bindings,
    /// and names used inside it that refer to an outer binding.
    taken: HashSet<String>,
}

struct Lowerer<'d> {
    diagnostics: &'d mut Diagnostics,
    usage: SymbolUsage,
    /// Every name the file binds anywhere. These shadow helpers and Lua
    /// globals.
    declared: HashSet<String>,
    /// Innermost last; the first is the entry function body.
    scopes: Vec<Scope>,
    globals: BTreeSet<String>,
    /// Methods declared with `function X:name()`.
    methods: HashSet<String>,
    function_depth: usize,
    /// Whether the innermost function takes `...`.
    vararg: bool,
}

impl<'d> Lowerer<'d> {
    fn new(diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            diagnostics,
            usage: SymbolUsage::new(),
            declared: HashSet::new(),
            scopes: vec![Scope::default()],
            globals: BTreeSet::new(),
            methods: HashSet::new(),
            function_depth: 0,
            vararg: false,
        }
    }

    fn fatal(&mut self, line: usize, message: impl Into<String>) {
        self.diagnostics.fatal(Stage::Lower, line, message);
    }

    fn warning(&mut self, line: usize, message: impl Into<String>) {
        self.diagnostics.warning(Stage::Lower, line, message);
    }

    fn is_local(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    /// Bind a Lua local in the innermost block. A name the block already
    /// uses gets a numbered suffix, so a redeclared `local` never repeats
    /// a `let`.
    fn declare(&mut self, name: &str) -> String {
        let base = js_name(name);
        let Some(scope) = self.scopes.last_mut() else {
            return base;
        };
        let mut bound = base.clone();
        let mut suffix = 2;
        while scope.taken.contains(&bound) {
            bound = format!("{base}${suffix}");
            suffix += 1;
        }
        scope.taken.insert(bound.clone());
        scope.locals.insert(name.to_string(), bound.clone());
        bound
    }

    /// JavaScript name a Lua identifier refers to at this point. Names with
    /// no local binding in scope are globals.
    fn resolve(&mut self, name: &str) -> String {
        let found = self
            .scopes
            .iter()
            .rposition(|scope| scope.locals.contains_key(name));
        let (bound, from) = match found {
            Some(depth) => (self.scopes[depth].locals[name].clone(), depth + 1),
            None => {
                let global = js_name(name);
                self.globals.insert(global.clone());
                (global, 0)
            }
        };
        for scope in &mut self.scopes[from..] {
            scope.taken.insert(bound.clone());
        }
        bound
    }

    fn lower_scoped(&mut self, block: &Block) -> Vec<Stmt> {
        self.scopes.push(Scope::default());
        let out = self.lower_block(block);
        self.scopes.pop();
        out
    }

    fn helper(&mut self, helper: Helper) -> Expr {
        self.usage.mark(helper);
        Expr::ident(helper.name())
    }

    fn finalize_return(&mut self) -> Stmt {
        let finalize = self.helper(Helper::FinalizeLevel);
        Stmt::return_stmt(Some(Expr::call(finalize, Vec::new())))
    }

    // Declaration pre-pass

    fn collect_block(&mut self, block: &Block) {
        for stmt in block {
            match &stmt.kind {
                StatementKind::LocalDecl {
                    names,
                    initializers,
                } => {
                    self.declared.extend(names.iter().cloned());
                    initializers.iter().for_each(|e| self.collect_expr(e));
                }
                StatementKind::Assign { targets, values } => {
                    for target in targets {
                        if let Some(name) = target.as_identifier() {
                            self.declared.insert(name.to_string());
                        }
                        self.collect_expr(target);
                    }
                    values.iter().for_each(|e| self.collect_expr(e));
                }
                StatementKind::If {
                    branches,
                    else_block,
                } => {
                    for (cond, body) in branches {
                        self.collect_expr(cond);
                        self.collect_block(body);
                    }
                    if let Some(body) = else_block {
                        self.collect_block(body);
                    }
                }
                StatementKind::NumericFor {
                    var,
                    start,
                    stop,
                    step,
                    body,
                } => {
                    self.declared.insert(var.clone());
                    self.collect_expr(start);
                    self.collect_expr(stop);
                    if let Some(step) = step {
                        self.collect_expr(step);
                    }
                    self.collect_block(body);
                }
                StatementKind::GenericFor {
                    vars,
                    iterables,
                    body,
                } => {
                    self.declared.extend(vars.iter().cloned());
                    iterables.iter().for_each(|e| self.collect_expr(e));
                    self.collect_block(body);
                }
                StatementKind::While { cond, body }
                | StatementKind::RepeatUntil { body, cond } => {
                    self.collect_expr(cond);
                    self.collect_block(body);
                }
                StatementKind::Return { values } => {
                    values.iter().for_each(|e| self.collect_expr(e));
                }
                StatementKind::FunctionDecl { name, func, .. } => {
                    match &name.method {
                        Some(method) => {
                            self.methods.insert(method.clone());
                            self.declared.insert("self".to_string());
                        }
                        None if name.path.len() == 1 => {
                            self.declared.insert(name.root().to_string());
                        }
                        None => {}
                    }
                    self.collect_function(func);
                }
                StatementKind::ExprStatement { call } => self.collect_expr(call),
                StatementKind::Do { body } => self.collect_block(body),
                StatementKind::Break => {}
            }
        }
    }

    fn collect_function(&mut self, func: &FunctionBody) {
        self.declared.extend(func.params.iter().cloned());
        self.collect_block(&func.body);
    }

    fn collect_expr(&mut self, expr: &Expression) {
        match &expr.kind {
            ExpressionKind::FunctionExpr(func) => self.collect_function(func),
            ExpressionKind::Index { base, key } => {
                self.collect_expr(base);
                self.collect_expr(key);
            }
            ExpressionKind::Call { callee, args } => {
                self.collect_expr(callee);
                args.iter().for_each(|e| self.collect_expr(e));
            }
            ExpressionKind::MethodCall { receiver, args, .. } => {
                self.collect_expr(receiver);
                args.iter().for_each(|e| self.collect_expr(e));
            }
            ExpressionKind::Binary { left, right, .. } => {
                self.collect_expr(left);
                self.collect_expr(right);
            }
            ExpressionKind::Unary { operand, .. } => self.collect_expr(operand),
            ExpressionKind::Paren(inner) => self.collect_expr(inner),
            ExpressionKind::TableCtor(fields) => {
                for field in fields {
                    match field {
                        Field::Positional(value) | Field::Named(_, value) => {
                            self.collect_expr(value)
                        }
                        Field::Computed(key, value) => {
                            self.collect_expr(key);
                            self.collect_expr(value);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    // Statements

    fn lower_block(&mut self, block: &Block) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(block.len());
        for stmt in block {
            self.lower_statement(stmt, &mut out);
        }
        out
    }

    fn lower_statement(&mut self, stmt: &ast::Statement, out: &mut Vec<Stmt>) {
        let line = stmt.line;
        match &stmt.kind {
            StatementKind::LocalDecl {
                names,
                initializers,
            } => {
                if !self.check_multi_value(names.len(), initializers, line) {
                    return;
                }
                let single = names.len() == 1 && initializers.len() <= 1;
                // Initializers see the bindings in place before this `local`.
                let init = match initializers.as_slice() {
                    [] => None,
                    [value] if single => Some(self.lower_expr(value)),
                    values => Some(Expr::Array(self.lower_args(values))),
                };
                let mut bound: Vec<String> = names.iter().map(|n| self.declare(n)).collect();
                let binding = if single {
                    Binding::Name(bound.remove(0))
                } else if init.is_none() {
                    Binding::Names(bound)
                } else {
                    Binding::Array(bound.into_iter().map(Some).collect())
                };
                out.push(Stmt::Let { binding, init });
            }

            StatementKind::Assign { targets, values } => {
                if let ([target], [value]) = (targets.as_slice(), values.as_slice()) {
                    if let Some(push) = self.lower_append(target, value) {
                        out.push(Stmt::expr(push));
                    } else {
                        let target = self.lower_expr(target);
                        let value = self.lower_expr(value);
                        out.push(Stmt::assign(target, value));
                    }
                    return;
                }
                if !self.check_multi_value(targets.len(), values, line) {
                    return;
                }
                let targets = targets.iter().map(|t| self.lower_expr(t)).collect();
                let values = self.lower_args(values);
                out.push(Stmt::assign(Expr::Array(targets), Expr::Array(values)));
            }

            StatementKind::If {
                branches,
                else_block,
            } => {
                let lowered: Vec<(Expr, Vec<Stmt>)> = branches
                    .iter()
                    .map(|(cond, body)| (self.lower_expr(cond), self.lower_scoped(body)))
                    .collect();
                let mut alternate = else_block.as_ref().map(|body| self.lower_scoped(body));
                for (test, consequent) in lowered.into_iter().rev() {
                    alternate = Some(vec![Stmt::If {
                        test,
                        consequent,
                        alternate,
                    }]);
                }
                out.extend(alternate.into_iter().flatten());
            }

            StatementKind::NumericFor {
                var,
                start,
                stop,
                step,
                body,
            } => {
                // The loop header is a block of its own around the body.
                self.scopes.push(Scope::default());
                let lowered = self.lower_numeric_for(var, start, stop, step.as_ref(), body, line);
                self.scopes.pop();
                out.extend(lowered);
            }

            StatementKind::GenericFor {
                vars,
                iterables,
                body,
            } => {
                self.scopes.push(Scope::default());
                let lowered = self.lower_generic_for(vars, iterables, body, line);
                self.scopes.pop();
                out.extend(lowered);
            }

            StatementKind::While { cond, body } => {
                let test = self.lower_expr(cond);
                let body = self.lower_scoped(body);
                out.push(Stmt::While { test, body });
            }

            StatementKind::RepeatUntil { body, cond } => {
                // `until` sees the body's locals.
                self.scopes.push(Scope::default());
                let mut body = self.lower_block(body);
                let test = self.lower_expr(cond);
                self.scopes.pop();
                body.push(Stmt::If {
                    test,
                    consequent: vec![Stmt::Break],
                    alternate: None,
                });
                out.push(Stmt::While {
                    test: Expr::Bool(true),
                    body,
                });
            }

            StatementKind::Return { values } => self.lower_return(values, line, out),

            StatementKind::FunctionDecl {
                name,
                is_local,
                func,
            } => {
                let self_param = name.method.is_some();
                if *is_local {
                    // Bound before the body so it can call itself.
                    let bound = self.declare(name.root());
                    let function = self.lower_function(bound, false, func);
                    out.push(Stmt::Function(function));
                } else {
                    let mut target = self.lower_identifier(name.root(), line);
                    for segment in name.path.iter().skip(1).chain(name.method.as_ref()) {
                        target = Expr::member(target, segment.as_str());
                    }
                    let function = self.lower_function(String::new(), self_param, func);
                    out.push(Stmt::assign(target, Expr::Function(Box::new(function))));
                }
            }

            StatementKind::ExprStatement { call } => {
                let expr = self.lower_expr(call);
                out.push(Stmt::expr(expr));
            }

            StatementKind::Break => out.push(Stmt::Break),

            StatementKind::Do { body } => {
                let body = self.lower_scoped(body);
                out.push(Stmt::Block(body));
            }
        }
    }

    /// Reject `a, b = f()`: the call would have to return several values.
    fn check_multi_value(&mut self, targets: usize, values: &[Expression], line: usize) -> bool {
        let Some(last) = values.last() else {
            return true;
        };
        if targets > values.len()
            && (last.is_call() || matches!(last.kind, ExpressionKind::Vararg))
        {
            self.fatal(
                line,
                "multiple results of a call or `...` cannot be destructured",
            );
            return false;
        }
        true
    }

    /// `t[#t + 1] = v` → `t.push(v)`
    fn lower_append(&mut self, target: &Expression, value: &Expression) -> Option<Expr> {
        let ExpressionKind::Index { base, key } = &target.kind else {
            return None;
        };
        let ExpressionKind::Binary {
            op: ast::BinaryOp::Add,
            left,
            right,
        } = &key.kind
        else {
            return None;
        };
        let ExpressionKind::Unary {
            op: ast::UnaryOp::Len,
            operand,
        } = &left.kind
        else {
            return None;
        };
        let is_one = matches!(right.kind, ExpressionKind::Number(n) if n == 1.0);
        if !is_one || !operand.structure_eq(base) || base.contains_call() {
            return None;
        }
        let base = self.lower_expr(base);
        let value = self.lower_expr(value);
        Some(Expr::method(base, "push", vec![value]))
    }

    fn lower_numeric_for(
        &mut self,
        name: &str,
        start: &Expression,
        stop: &Expression,
        step: Option<&Expression>,
        body: &Block,
        line: usize,
    ) -> Option<Stmt> {
        let bounds = [Some(start), Some(stop), step];
        let hazard = bounds
            .iter()
            .flatten()
            .any(|bound| random::draws_random(bound, &|name: &str| self.is_local(name)));
        if hazard {
            self.fatal(
                line,
                format!(
                    "random draw in the bounds of `for {name} = ...`; \
                     move it into a local before the loop"
                ),
            );
            // Still walk the body so its diagnostics are reported.
            self.declare(name);
            self.lower_scoped(body);
            return None;
        }

        // Bounds are evaluated before the loop variable exists.
        let start = self.lower_expr(start);
        let stop = self.lower_expr(stop);
        let step = step.map(|s| self.lower_expr(s));
        let var = self.declare(name);

        let mut init = vec![(var.clone(), start)];
        let stop = if random::is_numeric_literal(&stop) {
            stop
        } else {
            let name = format!("{var}$stop");
            init.push((name.clone(), stop));
            Expr::ident(name)
        };

        let index = || Expr::ident(var.clone());
        let ascending = Expr::binary(index(), BinaryOp::Le, stop.clone());
        let descending = Expr::binary(index(), BinaryOp::Ge, stop.clone());

        let (test, op) = match step.as_ref().map(|s| (s.as_number(), s)) {
            None => (ascending, UpdateOp::Increment),
            Some((Some(n), _)) if n == 0.0 => {
                self.fatal(line, format!("`for {name}` has a step of zero"));
                return None;
            }
            Some((Some(n), _)) if n == 1.0 => (ascending, UpdateOp::Increment),
            Some((Some(n), _)) if n == -1.0 => (descending, UpdateOp::Decrement),
            Some((Some(n), _)) if n > 0.0 => {
                (ascending, UpdateOp::AddAssign(Box::new(Expr::number(n))))
            }
            Some((Some(n), _)) => (
                descending,
                UpdateOp::SubAssign(Box::new(Expr::number(-n))),
            ),
            Some((None, step)) => {
                let name = format!("{var}$step");
                init.push((name.clone(), step.clone()));
                let positive = Expr::binary(Expr::ident(name.clone()), BinaryOp::Gt, Expr::number(0));
                (
                    Expr::conditional(positive, ascending, descending),
                    UpdateOp::AddAssign(Box::new(Expr::ident(name))),
                )
            }
        };

        let update = Expr::Update {
            name: var.clone(),
            op,
        };
        let body = self.lower_scoped(body);
        Some(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn lower_generic_for(
        &mut self,
        vars: &[String],
        iterables: &[Expression],
        body: &Block,
        line: usize,
    ) -> Option<Stmt> {
        let iterator = match iterables {
            [single] => match &single.kind {
                ExpressionKind::Call { callee, args } if args.len() == 1 => callee
                    .as_identifier()
                    .filter(|name| matches!(*name, "ipairs" | "pairs") && !self.is_local(name))
                    .map(|name| (name, &args[0])),
                _ => None,
            },
            _ => None,
        };
        let Some((iterator, table)) = iterator else {
            self.fatal(
                line,
                "only `ipairs(t)` and `pairs(t)` loops can be translated",
            );
            self.lower_unsupported_loop(vars, body);
            return None;
        };
        if vars.len() > 2 {
            self.fatal(
                line,
                format!("`{iterator}` yields two values, found {} loop variables", vars.len()),
            );
            self.lower_unsupported_loop(vars, body);
            return None;
        }

        // The iterable is evaluated before the loop variables exist.
        let table = self.lower_expr(table);
        let (binding, iterable) = if iterator == "ipairs" && vars.len() == 2 && vars[0] == "_" {
            (Binding::Name(self.declare(&vars[1])), table)
        } else {
            let helper = if iterator == "ipairs" {
                Helper::Ipairs
            } else {
                Helper::Pairs
            };
            let pattern = vars
                .iter()
                .map(|v| (v != "_").then(|| self.declare(v)))
                .collect();
            let callee = self.helper(helper);
            (Binding::Array(pattern), Expr::call(callee, vec![table]))
        };

        let body = self.lower_scoped(body);
        Some(Stmt::ForOf {
            binding,
            iterable,
            body,
        })
    }

    /// Walk the body of a loop that will not be emitted, for its diagnostics.
    fn lower_unsupported_loop(&mut self, vars: &[String], body: &Block) {
        for var in vars {
            self.declare(var);
        }
        self.lower_scoped(body);
    }

    fn lower_return(&mut self, values: &[Expression], line: usize, out: &mut Vec<Stmt>) {
        if values.len() > 1 {
            self.fatal(line, "multiple return values cannot be translated");
            return;
        }
        let value = values.first();

        if self.function_depth == 0 {
            // The level is finished by the entry function; keep any side
            // effects of the returned expression.
            if let Some(value) = value {
                if value.contains_call() {
                    let expr = self.lower_expr(value);
                    out.push(Stmt::expr(expr));
                }
            }
            out.push(self.finalize_return());
            return;
        }

        let value = value.map(|v| self.lower_expr(v));
        out.push(Stmt::return_stmt(value));
    }

    fn lower_function(&mut self, name: String, self_param: bool, func: &FunctionBody) -> Function {
        // Parameters share a block with the body, as in JavaScript.
        self.scopes.push(Scope::default());
        let mut params = Vec::with_capacity(func.params.len() + 1);
        if self_param {
            params.push(self.declare("self"));
        }
        for param in &func.params {
            params.push(self.declare(param));
        }
        let rest = func.is_vararg.then(|| VARARG_NAME.to_string());

        self.function_depth += 1;
        let saved_vararg = std::mem::replace(&mut self.vararg, func.is_vararg);
        let body = self.lower_block(&func.body);
        self.vararg = saved_vararg;
        self.function_depth -= 1;
        self.scopes.pop();

        Function {
            name,
            params,
            rest,
            body,
        }
    }

    // Expressions

    fn lower_expr(&mut self, expr: &Expression) -> Expr {
        let line = expr.line;
        match &expr.kind {
            ExpressionKind::Nil => Expr::Undefined,
            ExpressionKind::Bool(b) => Expr::Bool(*b),
            ExpressionKind::Number(n) => Expr::Number(*n),
            ExpressionKind::String(s) => Expr::string(s.as_str()),
            ExpressionKind::LongString(s) => Expr::Template(s.clone()),
            ExpressionKind::Vararg => {
                if self.vararg {
                    self.fatal(
                        line,
                        "`...` can only be spread as the last argument of a call \
                         or the last element of a sequence",
                    );
                } else {
                    self.fatal(line, "`...` used outside a vararg function");
                }
                Expr::Undefined
            }
            ExpressionKind::Identifier(name) => self.lower_identifier(name, line),
            ExpressionKind::Index { base, key } => self.lower_index(expr, base, key),
            ExpressionKind::Call { callee, args } => self.lower_call(callee, args, line),
            ExpressionKind::MethodCall {
                receiver,
                method,
                args,
            } => self.lower_method_call(receiver, method, args, line),
            ExpressionKind::Binary { op, left, right } => self.lower_binary(*op, left, right),
            ExpressionKind::Unary { op, operand } => {
                let operand = self.lower_expr(operand);
                match op {
                    ast::UnaryOp::Not => Expr::unary(UnaryOp::Not, operand),
                    ast::UnaryOp::Neg => Expr::unary(UnaryOp::Neg, operand),
                    ast::UnaryOp::Len => Expr::member(operand, "length"),
                }
            }
            ExpressionKind::TableCtor(fields) => self.lower_table(fields, line),
            ExpressionKind::FunctionExpr(func) => {
                Expr::Function(Box::new(self.lower_function(String::new(), false, func)))
            }
            ExpressionKind::Paren(inner) => self.lower_expr(inner),
        }
    }

    fn lower_identifier(&mut self, name: &str, line: usize) -> Expr {
        if self.is_local(name) {
            return Expr::ident(self.resolve(name));
        }
        if let Some(helper) = Helper::from_name(name) {
            return self.helper(helper);
        }
        if library::is_lua_global(name) {
            // Only plain renames survive being used as a value.
            return match library::lookup_call(name) {
                Some(CallRewrite::Rename(js)) => path_expr(js),
                _ => {
                    self.fatal(line, format!("`{name}` has no JavaScript translation"));
                    Expr::Undefined
                }
            };
        }
        self.warning(
            line,
            format!("`{name}` is never assigned in this file and reads as `undefined`"),
        );
        Expr::ident(self.resolve(name))
    }

    fn lower_args(&mut self, args: &[Expression]) -> Vec<Expr> {
        let last = args.len().saturating_sub(1);
        args.iter()
            .enumerate()
            .map(|(i, arg)| match arg.kind {
                ExpressionKind::Vararg if i == last && self.vararg => {
                    Expr::Spread(Box::new(Expr::ident(VARARG_NAME)))
                }
                _ => self.lower_expr(arg),
            })
            .collect()
    }

    /// Dotted path rooted in a Lua library table (`math.floor`), unless the
    /// file shadows the root.
    fn library_path(&self, expr: &Expression) -> Option<String> {
        let path = expr.dotted_path()?;
        let root = path.split('.').next().unwrap_or(&path);
        (library::is_lua_global(root) && !self.is_local(root)).then_some(path)
    }

    fn lower_index(&mut self, expr: &Expression, base: &Expression, key: &Expression) -> Expr {
        let line = expr.line;

        if let Some(path) = self.library_path(expr) {
            return match library::lookup_constant(&path) {
                Some(js) => path_expr(js),
                None => {
                    self.fatal(line, format!("`{path}` has no JavaScript translation"));
                    Expr::Undefined
                }
            };
        }

        if self.is_random_index(base, key) {
            let table = self.lower_expr(base);
            let rn2 = self.helper(Helper::Rn2);
            let draw = Expr::call(rn2, vec![Expr::member(table.clone(), "length")]);
            return Expr::index(table, draw);
        }

        let object = self.lower_expr(base);
        match &key.kind {
            ExpressionKind::String(name) => Expr::member(object, name.as_str()),
            ExpressionKind::Number(n) if *n >= 1.0 && n.fract() == 0.0 => {
                Expr::index(object, Expr::number(n - 1.0))
            }
            ExpressionKind::Number(n) => {
                self.warning(
                    line,
                    format!("index `{n}` is not a positive integer; left unchanged"),
                );
                Expr::index(object, Expr::number(*n))
            }
            _ => {
                self.warning(
                    line,
                    "dynamic index left unchanged; Lua sequences are 1-based",
                );
                let index = self.lower_expr(key);
                Expr::index(object, index)
            }
        }
    }

    /// `t[math.random(1, #t)]` or `t[math.random(#t)]`.
    fn is_random_index(&self, base: &Expression, key: &Expression) -> bool {
        let ExpressionKind::Call { callee, args } = &key.kind else {
            return false;
        };
        if callee.dotted_path().as_deref() != Some("math.random") || self.is_local("math") {
            return false;
        }
        let length_of = match args.as_slice() {
            [len] => len,
            [one, len] if matches!(one.kind, ExpressionKind::Number(n) if n == 1.0) => len,
            _ => return false,
        };
        matches!(
            &length_of.kind,
            ExpressionKind::Unary { op: ast::UnaryOp::Len, operand } if operand.structure_eq(base)
        )
    }

    fn lower_call(&mut self, callee: &Expression, args: &[Expression], line: usize) -> Expr {
        if let Some(path) = self.library_path(callee) {
            if path == "math.random" {
                return self.lower_random(args, line);
            }
            return match library::lookup_call(&path) {
                Some(rewrite) => self.apply_rewrite(rewrite, &path, None, args, line),
                None => {
                    self.fatal(line, format!("`{path}()` has no JavaScript translation"));
                    Expr::Undefined
                }
            };
        }

        if let Some(name) = callee.as_identifier() {
            if !self.is_local(name) && Helper::from_name(name).is_none() {
                self.warning(line, format!("call to unknown function `{name}`"));
                let callee = Expr::ident(self.resolve(name));
                let args = self.lower_args(args);
                return Expr::call(callee, args);
            }
        }

        let callee = self.lower_expr(callee);
        let args = self.lower_args(args);
        Expr::call(callee, args)
    }

    fn lower_random(&mut self, args: &[Expression], line: usize) -> Expr {
        let call = match random::classify(args) {
            Ok(call) => call,
            Err(message) => {
                self.fatal(line, message);
                return Expr::Undefined;
            }
        };
        match call {
            RandomCall::Upper(n) => {
                let n = self.lower_expr(n);
                self.usage.mark(Helper::Rnd);
                random::upper_expr(n)
            }
            RandomCall::Range { lo, hi } => {
                let lo = self.lower_expr(lo);
                let hi = self.lower_expr(hi);
                match random::range_expr(lo, hi) {
                    Ok(expr) => {
                        self.usage.mark(Helper::Rn2);
                        expr
                    }
                    Err(message) => {
                        self.fatal(line, message);
                        Expr::Undefined
                    }
                }
            }
            RandomCall::Dice { count, sides } => {
                self.usage.mark(Helper::D);
                random::dice_expr(count, sides)
            }
        }
    }

    /// Apply a library rewrite. `receiver` is set for `s:method()` calls
    /// and takes the place of the first argument.
    fn apply_rewrite(
        &mut self,
        rewrite: CallRewrite,
        name: &str,
        receiver: Option<Expr>,
        args: &[Expression],
        line: usize,
    ) -> Expr {
        let (receiver, args) = match receiver {
            Some(receiver) => (Some(receiver), args),
            None => match rewrite {
                CallRewrite::Method(_)
                | CallRewrite::Property(_)
                | CallRewrite::TableInsert
                | CallRewrite::TableRemove
                | CallRewrite::TableConcat => match args.split_first() {
                    Some((first, rest)) => (Some(self.lower_expr(first)), rest),
                    None => {
                        self.fatal(line, format!("`{name}` needs an argument"));
                        return Expr::Undefined;
                    }
                },
                _ => (None, args),
            },
        };

        match (rewrite, receiver) {
            (CallRewrite::Rename(js), None) => {
                let args = self.lower_args(args);
                Expr::call(path_expr(js), args)
            }
            (CallRewrite::Helper(helper), receiver) => {
                let callee = self.helper(helper);
                let mut lowered: Vec<Expr> = receiver.into_iter().collect();
                lowered.extend(self.lower_args(args));
                Expr::call(callee, lowered)
            }
            (CallRewrite::Method(method), Some(receiver)) => {
                let args = self.lower_args(args);
                Expr::method(receiver, method, args)
            }
            (CallRewrite::Property(property), Some(receiver)) => {
                if !args.is_empty() {
                    self.fatal(line, format!("`{name}` takes no extra arguments"));
                }
                Expr::member(receiver, property)
            }
            (CallRewrite::TableInsert, Some(table)) => match args {
                [value] => {
                    let value = self.lower_expr(value);
                    Expr::method(table, "push", vec![value])
                }
                [position, value] => {
                    let position = self.lower_position(position);
                    let value = self.lower_expr(value);
                    Expr::method(table, "splice", vec![position, Expr::number(0), value])
                }
                _ => {
                    self.fatal(line, "`table.insert` takes two or three arguments");
                    Expr::Undefined
                }
            },
            (CallRewrite::TableRemove, Some(table)) => match args {
                [] => Expr::method(table, "pop", Vec::new()),
                [position] => {
                    let position = self.lower_position(position);
                    let removed = Expr::method(table, "splice", vec![position, Expr::number(1)]);
                    Expr::index(removed, Expr::number(0))
                }
                _ => {
                    self.fatal(line, "`table.remove` takes one or two arguments");
                    Expr::Undefined
                }
            },
            (CallRewrite::TableConcat, Some(table)) => match args {
                [] => Expr::method(table, "join", vec![Expr::string("")]),
                [separator] => {
                    let separator = self.lower_expr(separator);
                    Expr::method(table, "join", vec![separator])
                }
                _ => {
                    self.fatal(line, "`table.concat` with a range cannot be translated");
                    Expr::Undefined
                }
            },
            (CallRewrite::SelectCount, None) => match args {
                [count, vararg]
                    if matches!(&count.kind, ExpressionKind::String(s) if s == "#")
                        && matches!(vararg.kind, ExpressionKind::Vararg)
                        && self.vararg =>
                {
                    Expr::member(Expr::ident(VARARG_NAME), "length")
                }
                _ => {
                    self.fatal(line, "only `select(\"#\", ...)` can be translated");
                    Expr::Undefined
                }
            },
            _ => {
                self.fatal(line, format!("`{name}` cannot be translated here"));
                Expr::Undefined
            }
        }
    }

    /// A 1-based position argument, shifted to 0-based.
    fn lower_position(&mut self, position: &Expression) -> Expr {
        let position = self.lower_expr(position);
        match position {
            Expr::Number(n) => Expr::number(n - 1.0),
            other => Expr::binary(other, BinaryOp::Sub, Expr::number(1)),
        }
    }

    fn lower_method_call(
        &mut self,
        receiver: &Expression,
        method: &str,
        args: &[Expression],
        line: usize,
    ) -> Expr {
        if self.methods.contains(method) {
            if receiver.contains_call() {
                self.fatal(
                    line,
                    format!(
                        "receiver of `:{method}()` contains a call and would be evaluated twice"
                    ),
                );
                return Expr::Undefined;
            }
            let receiver = self.lower_expr(receiver);
            let mut lowered = vec![receiver.clone()];
            lowered.extend(self.lower_args(args));
            return Expr::method(receiver, method, lowered);
        }

        let lowered_receiver = self.lower_expr(receiver);
        if let Some(rewrite) = library::lookup_string_method(method) {
            let name = format!(":{method}()");
            return self.apply_rewrite(rewrite, &name, Some(lowered_receiver), args, line);
        }

        let args = self.lower_args(args);
        Expr::method(lowered_receiver, method, args)
    }

    fn lower_binary(
        &mut self,
        op: ast::BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> Expr {
        use ast::BinaryOp as Lua;

        let is_nil = |e: &Expression| matches!(e.kind, ExpressionKind::Nil);
        if matches!(op, Lua::Eq | Lua::Ne) && (is_nil(left) || is_nil(right)) {
            let op = if op == Lua::Eq {
                BinaryOp::LooseEq
            } else {
                BinaryOp::LooseNe
            };
            let mut side = |e: &Expression| {
                if is_nil(e) {
                    Expr::Null
                } else {
                    self.lower_expr(e)
                }
            };
            let l = side(left);
            let r = side(right);
            return Expr::binary(l, op, r);
        }

        if op == Lua::Concat {
            let stringy = self.is_static_string(left) || self.is_static_string(right);
            let mut l = self.lower_expr(left);
            let r = self.lower_expr(right);
            if !stringy {
                l = Expr::call(Expr::ident("String"), vec![l]);
            }
            return Expr::binary(l, BinaryOp::Add, r);
        }

        if matches!(op, Lua::And | Lua::Or) && !self.keeps_truthiness(left) {
            let keyword = if op == Lua::And { "and" } else { "or" };
            self.warning(
                left.line,
                format!(
                    "left operand of `{keyword}` may be 0 or \"\", which JavaScript \
                     treats as false and Lua does not"
                ),
            );
        }

        let l = self.lower_expr(left);
        let r = self.lower_expr(right);
        let op = match op {
            Lua::IDiv => {
                let quotient = Expr::binary(l, BinaryOp::Div, r);
                return Expr::call(path_expr("Math.floor"), vec![quotient]);
            }
            Lua::Or => BinaryOp::Or,
            Lua::And => BinaryOp::And,
            Lua::Lt => BinaryOp::Lt,
            Lua::Gt => BinaryOp::Gt,
            Lua::Le => BinaryOp::Le,
            Lua::Ge => BinaryOp::Ge,
            Lua::Ne => BinaryOp::StrictNe,
            Lua::Eq => BinaryOp::StrictEq,
            Lua::Add => BinaryOp::Add,
            Lua::Sub => BinaryOp::Sub,
            Lua::Mul => BinaryOp::Mul,
            Lua::Div => BinaryOp::Div,
            Lua::Mod => BinaryOp::Mod,
            Lua::Pow => BinaryOp::Pow,
            Lua::Concat => BinaryOp::Add,
        };
        Expr::binary(l, op, r)
    }

    /// Whether the value is known not to be `0` or `""`, the values Lua
    /// treats as true and JavaScript as false.
    fn keeps_truthiness(&self, expr: &Expression) -> bool {
        match &expr.kind {
            ExpressionKind::Nil
            | ExpressionKind::Bool(_)
            | ExpressionKind::TableCtor(_)
            | ExpressionKind::FunctionExpr(_) => true,
            ExpressionKind::Number(n) => *n != 0.0,
            ExpressionKind::String(s) | ExpressionKind::LongString(s) => !s.is_empty(),
            ExpressionKind::Unary {
                op: ast::UnaryOp::Not,
                ..
            } => true,
            ExpressionKind::Binary { op, left, right } => match op {
                ast::BinaryOp::Eq
                | ast::BinaryOp::Ne
                | ast::BinaryOp::Lt
                | ast::BinaryOp::Le
                | ast::BinaryOp::Gt
                | ast::BinaryOp::Ge => true,
                ast::BinaryOp::And => self.keeps_truthiness(right),
                ast::BinaryOp::Or => self.keeps_truthiness(left) && self.keeps_truthiness(right),
                _ => false,
            },
            ExpressionKind::Paren(inner) => self.keeps_truthiness(inner),
            ExpressionKind::Call { callee, .. } => callee
                .as_identifier()
                .is_some_and(|name| !self.is_local(name) && name == Helper::Percent.name()),
            _ => false,
        }
    }

    /// Whether the expression is known to produce a string without
    /// evaluating it.
    fn is_static_string(&self, expr: &Expression) -> bool {
        match &expr.kind {
            ExpressionKind::String(_) | ExpressionKind::LongString(_) => true,
            ExpressionKind::Binary {
                op: ast::BinaryOp::Concat,
                ..
            } => true,
            ExpressionKind::Paren(inner) => self.is_static_string(inner),
            ExpressionKind::Call { callee, .. } => self
                .library_path(callee)
                .and_then(|path| library::lookup_call(&path))
                .is_some_and(library::returns_string),
            ExpressionKind::MethodCall { method, .. } => {
                !self.methods.contains(method.as_str())
                    && library::lookup_string_method(method).is_some_and(library::returns_string)
            }
            _ => false,
        }
    }

    fn lower_table(&mut self, fields: &[Field], line: usize) -> Expr {
        let positional = fields
            .iter()
            .filter(|f| matches!(f, Field::Positional(_)))
            .count();

        if positional == fields.len() {
            let items: Vec<Expression> = fields
                .iter()
                .filter_map(|f| match f {
                    Field::Positional(value) => Some(value.clone()),
                    _ => None,
                })
                .collect();
            return Expr::Array(self.lower_args(&items));
        }

        let mixed = positional > 0;
        if mixed {
            self.fatal(
                line,
                "table constructor mixes positional and keyed fields",
            );
        }

        let mut entries = Vec::with_capacity(fields.len());
        for field in fields {
            match field {
                Field::Positional(value) => {
                    self.lower_expr(value);
                }
                Field::Named(name, value) => {
                    let value = self.lower_expr(value);
                    entries.push((ObjectKey::Name(name.clone()), value));
                }
                Field::Computed(key, value) => {
                    let key = match &key.kind {
                        ExpressionKind::String(name) => ObjectKey::Name(name.clone()),
                        ExpressionKind::Number(n) => {
                            self.warning(
                                key.line,
                                format!("numeric key `[{n}]` in a record is not index-adjusted"),
                            );
                            ObjectKey::Computed(Expr::number(*n))
                        }
                        _ => ObjectKey::Computed(self.lower_expr(key)),
                    };
                    let value = self.lower_expr(value);
                    entries.push((key, value));
                }
            }
        }

        if mixed {
            Expr::Undefined
        } else {
            Expr::Object(entries)
        }
    }
}
