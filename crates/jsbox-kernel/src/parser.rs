//! Parser for the jsbox expression subset.
//!
//! Transforms a token stream from the lexer into an AST. Uses chumsky for
//! parser combinators with good error recovery. The grammar is a statement
//! list; braces open a block in statement position and an object literal in
//! expression position, matching ES5.1.

use std::rc::Rc;

use chumsky::{input::ValueInput, prelude::*};

use crate::ast::{
    AssignOp, BinaryOp, Expr, FunctionLit, Lit, Program, SrcSpan, Stmt, UnaryOp,
};
use crate::lexer::{self, Token};

/// Span type used throughout the parser.
pub type Span = SimpleSpan;

/// Parse error with location and context.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub span: SrcSpan,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

impl std::error::Error for ParseError {}

/// Parse expression source into a Program AST.
pub fn parse(source: &str) -> Result<Program, Vec<ParseError>> {
    let tokens = lexer::tokenize(source).map_err(|errs| {
        errs.into_iter()
            .map(|e| ParseError {
                span: SrcSpan::new(e.span.start, e.span.end),
                message: format!("lexer error: {}", e.token),
            })
            .collect::<Vec<_>>()
    })?;

    // Convert tokens to (Token, SimpleSpan) pairs
    let tokens: Vec<(Token, Span)> = tokens
        .into_iter()
        .map(|spanned| (spanned.token, (spanned.span.start..spanned.span.end).into()))
        .collect();

    let end_span: Span = (source.len()..source.len()).into();

    let parser = program_parser();
    let result = parser.parse(tokens.as_slice().map(end_span, |(t, s)| (t, s)));

    result.into_result().map_err(|errs| {
        errs.into_iter()
            .map(|e| ParseError {
                span: SrcSpan::new(e.span().start, e.span().end),
                message: e.to_string(),
            })
            .collect()
    })
}

fn program_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Program, extra::Err<Rich<'tokens, Token, Span>>>
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    statement_parser()
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map(|body| Program { body })
}

/// Statement parser. Statements consume their own optional terminator.
fn statement_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Stmt, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    recursive(|stmt| {
        let expr = expr_parser(stmt.clone());

        let block = stmt
            .clone()
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBrace), just(Token::RBrace));

        // if/while bodies: a block or a single statement
        let block_or_stmt = choice((block.clone(), stmt.clone().map(|s| vec![s])));

        // var a = 1, b;
        let var_decl = just(Token::Var)
            .ignore_then(
                select! { Token::Ident(name) => name }
                    .then(just(Token::Eq).ignore_then(expr.clone()).or_not())
                    .separated_by(just(Token::Comma))
                    .at_least(1)
                    .collect::<Vec<_>>(),
            )
            .map(Stmt::VarDecl);

        let return_stmt = just(Token::Return)
            .ignore_then(expr.clone().or_not())
            .map(Stmt::Return);

        let if_stmt = just(Token::If)
            .ignore_then(
                expr.clone()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .then(block_or_stmt.clone())
            .then(
                just(Token::Else)
                    .ignore_then(block_or_stmt.clone())
                    .or_not(),
            )
            .map(|((cond, then_branch), else_branch)| Stmt::If {
                cond,
                then_branch,
                else_branch,
            });

        let while_stmt = just(Token::While)
            .ignore_then(
                expr.clone()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .then(block_or_stmt)
            .map(|(cond, body)| Stmt::While { cond, body });

        let base = choice((
            just(Token::Semi).to(Stmt::Empty),
            var_decl,
            return_stmt,
            if_stmt,
            while_stmt,
            // `{` in statement position opens a block, not an object literal
            block.map(Stmt::Block),
            expr.map(Stmt::Expr),
        ))
        .boxed();

        base.then_ignore(just(Token::Semi).repeated())
    })
}

/// Expression parser, layered by precedence:
/// assignment → conditional → or → and → equality → relational →
/// additive → multiplicative → unary → postfix → primary.
fn expr_parser<'tokens, I, S>(
    stmt: S,
) -> impl Parser<'tokens, I, Expr, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    S: Parser<'tokens, I, Stmt, extra::Err<Rich<'tokens, Token, Span>>> + Clone + 'tokens,
{
    recursive(|expr| {
        let literal = select! {
            Token::Null => Expr::Literal(Lit::Null),
            Token::True => Expr::Literal(Lit::Bool(true)),
            Token::False => Expr::Literal(Lit::Bool(false)),
            Token::Int(n) => Expr::Literal(Lit::Int(n)),
            Token::Float(x) => Expr::Literal(Lit::Float(x)),
            Token::String(s) => Expr::Literal(Lit::String(s)),
        };

        let ident = select! { Token::Ident(name) => name }.map_with(|name, e| {
            let span: Span = e.span();
            Expr::Ident {
                name,
                span: SrcSpan::new(span.start, span.end),
            }
        });

        let array = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map(Expr::Array);

        // Object literal keys: identifier, string, or numeric
        let object_key = choice((
            select! { Token::Ident(name) => name },
            select! { Token::String(s) => s },
            select! { Token::Int(n) => n.to_string() },
        ));

        let object = object_key
            .then_ignore(just(Token::Colon))
            .then(expr.clone())
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .map(Expr::Object);

        let params = select! { Token::Ident(name) => name }
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let function = just(Token::Function)
            .ignore_then(params)
            .then(
                stmt.clone()
                    .repeated()
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::LBrace), just(Token::RBrace)),
            )
            .map(|(params, body)| Expr::Function(Rc::new(FunctionLit { params, body })));

        let grouping = expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let primary = choice((
            literal,
            just(Token::This).to(Expr::This),
            function,
            ident,
            array,
            object,
            grouping,
        ))
        .boxed();

        // Postfix chains: member access, computed access, calls
        enum Postfix {
            Member(String),
            Index(Expr),
            Call(Vec<Expr>),
        }

        let member = just(Token::Dot)
            .ignore_then(select! { Token::Ident(name) => name })
            .map(Postfix::Member);

        let index = expr
            .clone()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map(Postfix::Index);

        let call = expr
            .clone()
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map(Postfix::Call);

        let postfix = primary.foldl(
            choice((member, index, call)).repeated(),
            |object, op| match op {
                Postfix::Member(property) => Expr::Member {
                    object: Box::new(object),
                    property,
                },
                Postfix::Index(idx) => Expr::Index {
                    object: Box::new(object),
                    index: Box::new(idx),
                },
                Postfix::Call(args) => Expr::Call {
                    callee: Box::new(object),
                    args,
                },
            },
        );

        let unary_op = choice((
            just(Token::Bang).to(UnaryOp::Not),
            just(Token::Minus).to(UnaryOp::Neg),
            just(Token::Plus).to(UnaryOp::Plus),
            just(Token::TypeOf).to(UnaryOp::TypeOf),
        ));

        let unary = unary_op
            .repeated()
            .foldr(postfix, |op, operand| Expr::Unary {
                op,
                operand: Box::new(operand),
            })
            .boxed();

        fn fold_binary(left: Expr, (op, right): (BinaryOp, Expr)) -> Expr {
            Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            }
        }

        let mul_op = choice((
            just(Token::Star).to(BinaryOp::Mul),
            just(Token::Slash).to(BinaryOp::Div),
            just(Token::Percent).to(BinaryOp::Mod),
        ));
        let multiplicative = unary
            .clone()
            .foldl(mul_op.then(unary).repeated(), fold_binary)
            .boxed();

        let add_op = choice((
            just(Token::Plus).to(BinaryOp::Add),
            just(Token::Minus).to(BinaryOp::Sub),
        ));
        let additive = multiplicative
            .clone()
            .foldl(add_op.then(multiplicative).repeated(), fold_binary)
            .boxed();

        let rel_op = choice((
            just(Token::LtEq).to(BinaryOp::LtEq),
            just(Token::GtEq).to(BinaryOp::GtEq),
            just(Token::Lt).to(BinaryOp::Lt),
            just(Token::Gt).to(BinaryOp::Gt),
        ));
        let relational = additive
            .clone()
            .foldl(rel_op.then(additive).repeated(), fold_binary)
            .boxed();

        let eq_op = choice((
            just(Token::EqEqEq).to(BinaryOp::EqStrict),
            just(Token::NotEqEq).to(BinaryOp::NotEqStrict),
            just(Token::EqEq).to(BinaryOp::EqLoose),
            just(Token::NotEq).to(BinaryOp::NotEqLoose),
        ));
        let equality = relational
            .clone()
            .foldl(eq_op.then(relational).repeated(), fold_binary)
            .boxed();

        let and = equality
            .clone()
            .foldl(
                just(Token::And).to(BinaryOp::And).then(equality).repeated(),
                fold_binary,
            )
            .boxed();

        let or = and
            .clone()
            .foldl(
                just(Token::Or).to(BinaryOp::Or).then(and).repeated(),
                fold_binary,
            )
            .boxed();

        let conditional = or
            .clone()
            .then(
                just(Token::Question)
                    .ignore_then(expr.clone())
                    .then_ignore(just(Token::Colon))
                    .then(expr.clone())
                    .or_not(),
            )
            .map(|(cond, branches)| match branches {
                Some((then_expr, else_expr)) => Expr::Conditional {
                    cond: Box::new(cond),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                None => cond,
            })
            .boxed();

        let assign_op = choice((
            just(Token::Eq).to(AssignOp::Assign),
            just(Token::PlusEq).to(AssignOp::AddAssign),
            just(Token::MinusEq).to(AssignOp::SubAssign),
            just(Token::StarEq).to(AssignOp::MulAssign),
            just(Token::SlashEq).to(AssignOp::DivAssign),
        ));

        // Right-associative assignment; lvalue validity is checked at
        // evaluation time.
        conditional
            .then(assign_op.then(expr.clone()).or_not())
            .map(|(target, rest)| match rest {
                Some((op, value)) => Expr::Assign {
                    target: Box::new(target),
                    op,
                    value: Box::new(value),
                },
                None => target,
            })
            .boxed()
    })
}
