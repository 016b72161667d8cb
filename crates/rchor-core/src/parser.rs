//! Recursive descent parser.
//!
//! One token of lookahead decides every statement form; after `ID '.'` a
//! literal field forces a communication, while an identifier field is
//! disambiguated by the following `=` (assignment) or `->` (communication).

use crate::ast::{
    Assign, Block, CallStmt, Comm, Discharge, Expr, IfLocalStmt, IfRaceStmt, Interaction,
    InteractionStmt, ProcDef, ProcExpr, ProcVar, Program, Race, RaceId, Select, Stmt,
};
use crate::frontend::FrontendError;
use crate::lexer::{Token, TokenKind};
use crate::types::SourceSpan;
use crate::value::Value;

pub fn parse_tokens(tokens: Vec<Token>, path: &str) -> Result<Program, FrontendError> {
    Parser {
        tokens,
        pos: 0,
        path,
    }
    .program()
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    path: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn peek_ahead(&self, n: usize) -> TokenKind {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        self.tokens[idx].kind
    }

    fn prev(&self) -> &Token {
        &self.tokens[self.pos - 1]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, FrontendError> {
        if self.at(kind) {
            return Ok(self.bump());
        }
        Err(self.unexpected(kind.name()))
    }

    fn unexpected(&self, expected: &str) -> FrontendError {
        let found = self.peek();
        let shown = if found.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", found.text)
        };
        FrontendError::syntax(
            format!("expected {expected}, found {shown}"),
            found.span(self.path),
        )
    }

    /// Span from the start of `first` to the end of the last consumed token.
    fn span_from(&self, first: &Token) -> SourceSpan {
        let last = self.prev();
        SourceSpan::new(
            self.path,
            first.line,
            first.col,
            last.line,
            last.end_col(),
        )
    }

    // ----- toplevel -----

    fn program(&mut self) -> Result<Program, FrontendError> {
        let first = self.peek().clone();

        let mut procedures = Vec::new();
        while self.at(TokenKind::KwProc) {
            procedures.push(self.proc_def()?);
        }

        self.expect(TokenKind::KwMain)?;
        let main = self.block()?;
        self.expect(TokenKind::Eof)?;

        Ok(Program {
            procedures,
            main,
            span: self.span_from(&first),
        })
    }

    fn proc_def(&mut self) -> Result<ProcDef, FrontendError> {
        let first = self.expect(TokenKind::KwProc)?;
        let name = self.expect(TokenKind::Ident)?.text;

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                params.push(self.expect(TokenKind::Ident)?.text);
                if !self.at(TokenKind::Comma) {
                    break;
                }
                self.bump();
            }
        }
        self.expect(TokenKind::RParen)?;

        let body = self.block()?;
        Ok(ProcDef {
            name,
            params,
            body,
            span: self.span_from(&first),
        })
    }

    fn block(&mut self) -> Result<Block, FrontendError> {
        let first = self.expect(TokenKind::LBrace)?;

        let mut statements = Vec::new();
        while !self.at(TokenKind::RBrace) {
            statements.push(self.stmt()?);
            if self.at(TokenKind::Semi) {
                self.bump();
            } else if !self.at(TokenKind::RBrace) {
                return Err(self.unexpected("SEMI or RBRACE"));
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Block {
            statements,
            span: self.span_from(&first),
        })
    }

    // ----- statements -----

    fn stmt(&mut self) -> Result<Stmt, FrontendError> {
        match self.peek_kind() {
            TokenKind::KwIf => self.if_stmt(),
            TokenKind::KwRace => self.race_stmt(),
            TokenKind::KwDischarge => self.discharge_stmt(),
            TokenKind::Ident => match self.peek_ahead(1) {
                TokenKind::LParen => self.call_stmt(),
                TokenKind::Arrow => self.select_stmt(),
                TokenKind::Dot => self.dotted_stmt(),
                _ => Err(self.unexpected("statement")),
            },
            _ => Err(self.unexpected("statement")),
        }
    }

    fn if_stmt(&mut self) -> Result<Stmt, FrontendError> {
        let first = self.expect(TokenKind::KwIf)?;

        if self.at(TokenKind::KwRace) {
            self.bump();
            let condition = self.race_id()?;
            self.expect(TokenKind::KwThen)?;
            let then_block = self.block()?;
            self.expect(TokenKind::KwElse)?;
            let else_block = self.block()?;
            return Ok(Stmt::IfRace(IfRaceStmt {
                condition,
                then_block,
                else_block,
                span: self.span_from(&first),
            }));
        }

        let condition = self.proc_expr()?;
        self.expect(TokenKind::KwThen)?;
        let then_block = self.block()?;
        self.expect(TokenKind::KwElse)?;
        let else_block = self.block()?;
        Ok(Stmt::IfLocal(IfLocalStmt {
            condition,
            then_block,
            else_block,
            span: self.span_from(&first),
        }))
    }

    fn race_stmt(&mut self) -> Result<Stmt, FrontendError> {
        let first = self.expect(TokenKind::KwRace)?;
        let id = self.race_id()?;
        self.expect(TokenKind::Colon)?;
        let left = self.proc_expr()?;
        self.expect(TokenKind::Comma)?;
        let right = self.proc_expr()?;
        self.expect(TokenKind::Arrow)?;
        let target = self.proc_var()?;

        let span = self.span_from(&first);
        Ok(interaction_stmt(
            Interaction::Race(Race {
                id,
                left,
                right,
                target,
                span: span.clone(),
            }),
            span,
        ))
    }

    fn discharge_stmt(&mut self) -> Result<Stmt, FrontendError> {
        let first = self.expect(TokenKind::KwDischarge)?;
        let id = self.race_id()?;
        self.expect(TokenKind::Colon)?;
        let source = self.expect(TokenKind::Ident)?.text;
        self.expect(TokenKind::Arrow)?;
        let target = self.proc_var()?;

        let span = self.span_from(&first);
        Ok(interaction_stmt(
            Interaction::Discharge(Discharge {
                id,
                source,
                target,
                span: span.clone(),
            }),
            span,
        ))
    }

    fn call_stmt(&mut self) -> Result<Stmt, FrontendError> {
        let first = self.expect(TokenKind::Ident)?;
        let proc = first.text.clone();

        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.expect(TokenKind::Ident)?.text);
                if !self.at(TokenKind::Comma) {
                    break;
                }
                self.bump();
            }
        }
        self.expect(TokenKind::RParen)?;

        Ok(Stmt::Call(CallStmt {
            proc,
            args,
            span: self.span_from(&first),
        }))
    }

    fn select_stmt(&mut self) -> Result<Stmt, FrontendError> {
        let first = self.expect(TokenKind::Ident)?;
        let from = first.text.clone();
        self.expect(TokenKind::Arrow)?;
        let to = self.expect(TokenKind::Ident)?.text;
        self.expect(TokenKind::LBracket)?;
        let label = self.expect(TokenKind::Ident)?.text;
        self.expect(TokenKind::RBracket)?;

        let span = self.span_from(&first);
        Ok(interaction_stmt(
            Interaction::Select(Select {
                from,
                to,
                label,
                span: span.clone(),
            }),
            span,
        ))
    }

    /// `p.` followed by an assignment target or a communication source.
    fn dotted_stmt(&mut self) -> Result<Stmt, FrontendError> {
        let first = self.expect(TokenKind::Ident)?;
        let process = first.text.clone();
        self.expect(TokenKind::Dot)?;

        if self.at(TokenKind::Ident) && self.peek_ahead(1) == TokenKind::Eq {
            let var_token = self.bump();
            let target_span = SourceSpan::new(
                self.path,
                first.line,
                first.col,
                var_token.line,
                var_token.end_col(),
            );
            let target = ProcVar {
                process,
                var: var_token.text,
                span: target_span,
            };
            self.expect(TokenKind::Eq)?;

            // A qualified right-hand side (`q.e`) makes this a communication
            // into the left-hand variable, equivalent to `q.e -> p.x`.
            if self.at(TokenKind::Ident) && self.peek_ahead(1) == TokenKind::Dot {
                let from = self.proc_expr()?;
                let span = self.span_from(&first);
                return Ok(interaction_stmt(
                    Interaction::Comm(Comm {
                        from,
                        to: target,
                        span: span.clone(),
                    }),
                    span,
                ));
            }

            let value = self.expr()?;
            let span = self.span_from(&first);
            return Ok(interaction_stmt(
                Interaction::Assign(Assign {
                    target,
                    value,
                    span: span.clone(),
                }),
                span,
            ));
        }

        let expr = self.expr()?;
        let from = ProcExpr {
            process,
            expr,
            span: self.span_from(&first),
        };
        self.expect(TokenKind::Arrow)?;
        let to = self.proc_var()?;

        let span = self.span_from(&first);
        Ok(interaction_stmt(
            Interaction::Comm(Comm {
                from,
                to,
                span: span.clone(),
            }),
            span,
        ))
    }

    // ----- leaves -----

    fn expr(&mut self) -> Result<Expr, FrontendError> {
        match self.peek_kind() {
            TokenKind::Int => {
                let token = self.bump();
                let span = token.span(self.path);
                let value = token.text.parse::<i64>().map_err(|_| {
                    FrontendError::invalid_input(
                        format!("integer literal out of range: {}", token.text),
                        span.clone(),
                    )
                })?;
                Ok(Expr::Value {
                    value: Value::Int(value),
                    span,
                })
            }
            TokenKind::KwTrue => {
                let token = self.bump();
                Ok(Expr::Value {
                    value: Value::Bool(true),
                    span: token.span(self.path),
                })
            }
            TokenKind::KwFalse => {
                let token = self.bump();
                Ok(Expr::Value {
                    value: Value::Bool(false),
                    span: token.span(self.path),
                })
            }
            TokenKind::Ident => {
                let token = self.bump();
                let span = token.span(self.path);
                Ok(Expr::Var {
                    name: token.text,
                    span,
                })
            }
            _ => Err(self.unexpected("ID, INT, TRUE or FALSE")),
        }
    }

    fn proc_expr(&mut self) -> Result<ProcExpr, FrontendError> {
        let first = self.expect(TokenKind::Ident)?;
        let process = first.text.clone();
        self.expect(TokenKind::Dot)?;
        let expr = self.expr()?;
        Ok(ProcExpr {
            process,
            expr,
            span: self.span_from(&first),
        })
    }

    fn proc_var(&mut self) -> Result<ProcVar, FrontendError> {
        let first = self.expect(TokenKind::Ident)?;
        let process = first.text.clone();
        self.expect(TokenKind::Dot)?;
        let var = self.expect(TokenKind::Ident)?.text;
        Ok(ProcVar {
            process,
            var,
            span: self.span_from(&first),
        })
    }

    fn race_id(&mut self) -> Result<RaceId, FrontendError> {
        let first = self.expect(TokenKind::Ident)?;
        let process = first.text.clone();
        self.expect(TokenKind::LBracket)?;
        let key = self.expect(TokenKind::Ident)?.text;
        self.expect(TokenKind::RBracket)?;
        Ok(RaceId {
            process,
            key,
            span: self.span_from(&first),
        })
    }
}

fn interaction_stmt(interaction: Interaction, span: SourceSpan) -> Stmt {
    Stmt::Interaction(InteractionStmt { interaction, span })
}
