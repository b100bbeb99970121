// src/schedule/parser.rs

//! Token stream → abstract syntax tree.
//!
//! The tree is a flat arena of nodes addressed by index, with a synthetic
//! root at index 0. The root's children are the field nodes of the
//! expression; a field node's children are symbol nodes (comma, dash,
//! slash), and each symbol node carries exactly one alphanumeric child with
//! the partner value.
//!
//! The parser assigns no semantic meaning. A sequence it cannot place ends
//! the current branch with an [`TokenKind::Error`] marker and leaves the
//! rest to the validator; malformed input therefore never panics here, it
//! just yields a tree the validator will reject.

use super::lexer::{Lexer, Token, TokenKind};

/// One node of the flat AST arena.
#[derive(Debug)]
pub struct Node<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub parent: usize,
    pub children: Vec<usize>,
}

/// Flat AST arena with a synthetic root at [`Ast::ROOT`].
#[derive(Debug)]
pub struct Ast<'a> {
    nodes: Vec<Node<'a>>,
}

impl<'a> Ast<'a> {
    pub const ROOT: usize = 0;

    fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: TokenKind::Eof,
                text: "",
                parent: Self::ROOT,
                children: Vec::new(),
            }],
        }
    }

    /// Indices of the top-level field nodes.
    pub fn fields(&self) -> &[usize] {
        &self.nodes[Self::ROOT].children
    }

    pub fn node(&self, id: usize) -> &Node<'a> {
        &self.nodes[id]
    }

    fn add(&mut self, parent: usize, kind: TokenKind, text: &'a str) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            text,
            parent,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);

        id
    }
}

/// Parse the input into an AST.
///
/// This never fails; structural problems are surfaced by
/// [`validate`](super::validate::validate) on the returned tree.
pub fn parse(input: &str) -> Ast<'_> {
    Parser::new(input).run()
}

/// Where the parser resumes after handling the token under the cursor.
enum State {
    /// Expecting the start of a field (or the end of the input).
    Top,
    /// Inside a field node: chained values and symbols.
    Alphanum,
    Stop,
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token<'a>>,
    ast: Ast<'a>,
    /// Node new children attach to.
    cur: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(input),
            peeked: None,
            ast: Ast::new(),
            cur: Ast::ROOT,
        }
    }

    fn run(mut self) -> Ast<'a> {
        let mut state = State::Top;

        loop {
            state = match state {
                State::Top => match self.peek().kind {
                    TokenKind::At => self.parse_at(),
                    TokenKind::Star => self.parse_star(),
                    TokenKind::AlphaNum => State::Alphanum,
                    _ => State::Stop,
                },
                State::Alphanum => self.parse_alphanum(),
                State::Stop => break,
            };
        }

        self.ast
    }

    fn peek(&mut self) -> Token<'a> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token());
        }
        self.peeked.unwrap_or(Token {
            kind: TokenKind::Eof,
            text: "",
        })
    }

    fn next(&mut self) -> Token<'a> {
        let token = self.peek();
        self.peeked = None;

        token
    }

    /// Add a child for `token` and move the cursor into it.
    fn descend(&mut self, token: Token<'a>) {
        self.cur = self.ast.add(self.cur, token.kind, token.text);
    }

    fn ascend(&mut self) {
        self.cur = self.ast.node(self.cur).parent;
    }

    fn parse_at(&mut self) -> State {
        let token = self.next();
        self.descend(token);

        match self.peek().kind {
            TokenKind::AlphaNum => State::Alphanum,
            _ => {
                // "@" without a name: discard the offending token and leave
                // the bare at-node for the validator to reject
                self.next();
                self.ascend();

                State::Top
            }
        }
    }

    fn parse_star(&mut self) -> State {
        let token = self.next();
        self.descend(token);

        match self.peek().kind {
            TokenKind::Space => {
                self.ascend();
                self.next();

                State::Top
            }
            TokenKind::Slash => State::Alphanum,
            _ => {
                self.ascend();

                State::Stop
            }
        }
    }

    fn parse_alphanum(&mut self) -> State {
        match self.peek().kind {
            TokenKind::AlphaNum => {
                let token = self.next();
                self.descend(token);

                State::Alphanum
            }
            TokenKind::Comma | TokenKind::Dash | TokenKind::Slash => self.parse_symbols(),
            TokenKind::Space => {
                self.ascend();
                self.next();

                State::Top
            }
            _ => State::Stop,
        }
    }

    /// Consume one `{comma|dash|slash} alphanum` pair chained to the current
    /// field node.
    fn parse_symbols(&mut self) -> State {
        let symbol = self.next();
        self.descend(symbol);

        match self.peek().kind {
            TokenKind::AlphaNum => {
                let token = self.next();
                self.descend(token);

                // back to the field node the symbol chain hangs off
                self.ascend();
                self.ascend();

                State::Alphanum
            }
            _ => {
                // symbol without a partner value: keep an error marker under
                // the symbol node for the validator
                let token = self.next();
                self.cur = self.ast.add(self.cur, TokenKind::Error, token.text);

                State::Top
            }
        }
    }
}
