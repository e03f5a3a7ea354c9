//! Lint checks: ES6 feature detection, syntax errors, and free-variable
//! analysis against a permitted globals list.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ast::{Expr, Program, Stmt, UnaryOp};
use crate::lexer::{self, Token};
use crate::parser;

use super::issue::{LintCode, LintIssue};

/// Options accepted alongside a lint request. Fields other than
/// `includewarnings` (linter tuning the original tool forwards verbatim)
/// are accepted and ignored.
#[derive(Debug, Default, Deserialize)]
pub struct LintOptions {
    #[serde(default)]
    pub includewarnings: Option<Vec<String>>,
}

/// One lint request: source code, permitted global names, options.
#[derive(Debug, Deserialize)]
pub struct LintRequest {
    pub code: String,
    #[serde(default)]
    pub globals: Vec<String>,
    #[serde(default)]
    pub options: LintOptions,
}

/// The reply for one request: diagnostics plus the names the source
/// declares at top level, so callers can accumulate a library's exports.
#[derive(Debug, Serialize)]
pub struct LintReply {
    pub errors: Vec<LintIssue>,
    pub globals: Vec<String>,
}

/// Run all checks over one request.
pub fn validate(request: &LintRequest) -> LintReply {
    let source = &request.code;

    let tokens = match lexer::tokenize(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            // scanner failure: report the first offending position and stop
            let offset = errors.first().map(|e| e.span.start).unwrap_or(0);
            return LintReply {
                errors: apply_filter(
                    vec![LintIssue::at_offset(
                        LintCode::Unrecoverable,
                        "Unrecoverable syntax error.",
                        source,
                        offset,
                    )],
                    request.options.includewarnings.as_deref(),
                ),
                globals: Vec::new(),
            };
        }
    };

    let mut issues = Vec::new();
    for spanned in &tokens {
        if let Some(issue) = es6_marker_issue(&spanned.token, source, spanned.span.start) {
            issues.push(issue);
        }
    }

    let mut globals = Vec::new();
    if issues.is_empty() {
        match parser::parse(source) {
            Ok(program) => {
                globals = top_level_declarations(&program);
                let mut walker = FreeVarWalker::new(source, &request.globals, &globals);
                walker.walk_program(&program);
                issues.extend(walker.issues);
            }
            Err(errors) => {
                for error in &errors {
                    issues.push(LintIssue::at_offset(
                        LintCode::UnexpectedToken,
                        format!("Unexpected token: {}.", error.message),
                        source,
                        error.span.start,
                    ));
                }
            }
        }
    }

    LintReply {
        errors: apply_filter(issues, request.options.includewarnings.as_deref()),
        globals,
    }
}

/// The reasons already carry the supported-language suffix; there is no
/// default-phrasing rewrite step because both sides are ours.
fn es6_marker_issue(token: &Token, source: &str, offset: usize) -> Option<LintIssue> {
    let (code, reason) = match token {
        Token::Let => (
            LintCode::Es6Declaration,
            "'let' is available in ES6. CWL only supports ES5.1".to_string(),
        ),
        Token::Const => (
            LintCode::Es6Declaration,
            "'const' is available in ES6. CWL only supports ES5.1".to_string(),
        ),
        Token::Arrow => (
            LintCode::Es6Syntax,
            "'arrow function syntax (=>)' is only available in ES6. CWL only supports ES5.1"
                .to_string(),
        ),
        Token::TemplateString => (
            LintCode::Es6Syntax,
            "'template literal syntax' is only available in ES6. CWL only supports ES5.1"
                .to_string(),
        ),
        _ => return None,
    };
    Some(LintIssue::at_offset(code, reason, source, offset))
}

/// Warnings survive only if listed; error-class codes always survive.
fn apply_filter(issues: Vec<LintIssue>, include: Option<&[String]>) -> Vec<LintIssue> {
    let Some(include) = include else {
        return issues;
    };
    issues
        .into_iter()
        .filter(|issue| {
            issue.code.code().starts_with('E') || include.iter().any(|c| c == issue.code.code())
        })
        .collect()
}

/// Names the source declares with `var` at function scope level zero, in
/// declaration order.
fn top_level_declarations(program: &Program) -> Vec<String> {
    let mut names = Vec::new();
    collect_vars(&program.body, &mut names);
    names
}

/// Collect `var` names through nested blocks and control flow, but not into
/// nested functions (var is function-scoped).
fn collect_vars(stmts: &[Stmt], names: &mut Vec<String>) {
    for stmt in stmts {
        match stmt {
            Stmt::VarDecl(decls) => {
                for (name, _) in decls {
                    if !names.contains(name) {
                        names.push(name.clone());
                    }
                }
            }
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_vars(then_branch, names);
                if let Some(else_branch) = else_branch {
                    collect_vars(else_branch, names);
                }
            }
            Stmt::While { body, .. } => collect_vars(body, names),
            Stmt::Block(body) => collect_vars(body, names),
            Stmt::Expr(_) | Stmt::Return(_) | Stmt::Empty => {}
        }
    }
}

/// AST walk reporting identifier references that resolve neither to a
/// declaration in scope nor to a permitted global.
struct FreeVarWalker<'a> {
    source: &'a str,
    scopes: Vec<HashSet<String>>,
    issues: Vec<LintIssue>,
}

impl<'a> FreeVarWalker<'a> {
    fn new(source: &'a str, permitted: &[String], top_level: &[String]) -> Self {
        let mut root: HashSet<String> = permitted.iter().cloned().collect();
        root.extend(top_level.iter().cloned());
        Self {
            source,
            scopes: vec![root],
            issues: Vec::new(),
        }
    }

    fn walk_program(&mut self, program: &Program) {
        self.walk_stmts(&program.body);
    }

    fn defined(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn walk_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.walk_stmt(stmt);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => self.walk_expr(expr),
            Stmt::VarDecl(decls) => {
                for (_, init) in decls {
                    if let Some(init) = init {
                        self.walk_expr(init);
                    }
                }
            }
            Stmt::Return(Some(expr)) => self.walk_expr(expr),
            Stmt::Return(None) | Stmt::Empty => {}
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.walk_expr(cond);
                self.walk_stmts(then_branch);
                if let Some(else_branch) = else_branch {
                    self.walk_stmts(else_branch);
                }
            }
            Stmt::While { cond, body } => {
                self.walk_expr(cond);
                self.walk_stmts(body);
            }
            Stmt::Block(body) => self.walk_stmts(body),
        }
    }

    fn walk_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident { name, span } => {
                if !self.defined(name) {
                    self.issues.push(LintIssue::at_offset(
                        LintCode::UndefinedName,
                        format!("'{}' is not defined.", name),
                        self.source,
                        span.start,
                    ));
                }
            }
            Expr::Literal(_) | Expr::This => {}
            Expr::Array(items) => {
                for item in items {
                    self.walk_expr(item);
                }
            }
            Expr::Object(fields) => {
                for (_, value) in fields {
                    self.walk_expr(value);
                }
            }
            Expr::Function(func) => {
                let mut scope: HashSet<String> = func.params.iter().cloned().collect();
                let mut vars = Vec::new();
                collect_vars(&func.body, &mut vars);
                scope.extend(vars);
                self.scopes.push(scope);
                self.walk_stmts(&func.body);
                self.scopes.pop();
            }
            Expr::Member { object, .. } => self.walk_expr(object),
            Expr::Index { object, index } => {
                self.walk_expr(object);
                self.walk_expr(index);
            }
            Expr::Call { callee, args } => {
                self.walk_expr(callee);
                for arg in args {
                    self.walk_expr(arg);
                }
            }
            Expr::Unary { op, operand } => {
                // typeof on a bare name never reports, matching the
                // evaluator's tolerance
                if *op == UnaryOp::TypeOf && matches!(**operand, Expr::Ident { .. }) {
                    return;
                }
                self.walk_expr(operand);
            }
            Expr::Binary { left, right, .. } => {
                self.walk_expr(left);
                self.walk_expr(right);
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.walk_expr(cond);
                self.walk_expr(then_expr);
                self.walk_expr(else_expr);
            }
            Expr::Assign { target, value, .. } => {
                self.walk_expr(target);
                self.walk_expr(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lint(code: &str, globals: &[&str], include: Option<&[&str]>) -> LintReply {
        validate(&LintRequest {
            code: code.to_string(),
            globals: globals.iter().map(|s| s.to_string()).collect(),
            options: LintOptions {
                includewarnings: include
                    .map(|list| list.iter().map(|s| s.to_string()).collect()),
            },
        })
    }

    fn codes(reply: &LintReply) -> Vec<&str> {
        reply.errors.iter().map(|e| e.code.code()).collect()
    }

    #[rstest]
    #[case("let x = 1;", "W104", "'let'")]
    #[case("const x = 1;", "W104", "'const'")]
    #[case("var f = (a) => a;", "W119", "arrow function")]
    #[case("var s = `tpl`;", "W119", "template literal")]
    fn es6_features_are_flagged(
        #[case] code: &str,
        #[case] expected_code: &str,
        #[case] reason_fragment: &str,
    ) {
        let reply = lint(code, &[], None);
        assert_eq!(codes(&reply), vec![expected_code]);
        let reason = &reply.errors[0].reason;
        assert!(reason.contains(reason_fragment), "reason: {}", reason);
        assert!(reason.ends_with(". CWL only supports ES5.1"), "reason: {}", reason);
    }

    #[test]
    fn undefined_name_is_w117_with_location() {
        let reply = lint("var x = 1;\nmissing + x", &[], None);
        assert_eq!(codes(&reply), vec!["W117"]);
        let issue = &reply.errors[0];
        assert_eq!(issue.reason, "'missing' is not defined.");
        assert_eq!((issue.line, issue.character), (2, 1));
    }

    #[test]
    fn permitted_globals_are_not_flagged() {
        let reply = lint("inputs.threads", &["inputs"], None);
        assert!(reply.errors.is_empty());
    }

    #[test]
    fn params_and_vars_resolve() {
        let reply = lint(
            "var f = function(a){ var b = a; return a + b + f };",
            &[],
            None,
        );
        assert!(reply.errors.is_empty(), "issues: {:?}", reply.errors);
    }

    #[test]
    fn typeof_bare_name_is_tolerated() {
        let reply = lint("typeof missing", &[], None);
        assert!(reply.errors.is_empty());
    }

    #[test]
    fn syntax_error_is_error_class() {
        let reply = lint("var = 1;", &[], None);
        assert!(!reply.errors.is_empty());
        assert!(reply.errors.iter().all(|e| e.code.code().starts_with('E')));
    }

    #[test]
    fn includewarnings_filters_warnings_but_not_errors() {
        // W117 not listed: dropped
        let reply = lint("missing", &[], Some(&["W104"]));
        assert!(reply.errors.is_empty());

        // errors survive an empty include list
        let reply = lint("var = 1;", &[], Some(&[]));
        assert!(!reply.errors.is_empty());

        // listed warnings survive
        let reply = lint("let x = 1;", &[], Some(&["W104"]));
        assert_eq!(codes(&reply), vec!["W104"]);
    }

    #[test]
    fn reply_lists_top_level_declarations() {
        let reply = lint("var a = 1; var b = a, c;", &[], None);
        assert_eq!(reply.globals, vec!["a", "b", "c"]);
    }

    #[test]
    fn nested_function_vars_are_not_exported() {
        let reply = lint("var f = function(){ var inner = 1; return inner };", &[], None);
        assert_eq!(reply.globals, vec!["f"]);
    }
}
