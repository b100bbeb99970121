// src/schedule/validate.rs

//! AST validation.
//!
//! Rejects structurally or semantically invalid trees before the processor
//! derives a schedule. Problems across fields are joined, so one pass over
//! a bad expression reports everything wrong with it.

use crate::errors::{CronError, Result};

use super::lexer::TokenKind;
use super::parser::Ast;

/// Month names, 1-indexed (position 0 is a filler).
pub(crate) static MONTHS: [&str; 13] = [
    "", "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Weekday names, Sunday-first. Position 7 re-maps the non-standard `7`
/// alias back onto Sunday.
pub(crate) static WEEKDAYS: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// Supported `@` override names.
pub(crate) static OVERRIDES: [&str; 7] = [
    "reboot", "hourly", "daily", "weekly", "monthly", "annually", "yearly",
];

/// Per-field validation limits.
struct FieldSpec {
    /// Upper bound on chained symbol nodes.
    max_symbols: usize,
    min: i64,
    max: i64,
    /// Closed name list for fields that accept alphabetic values.
    names: Option<&'static [&'static str]>,
}

static FIELD_SPECS: [FieldSpec; 6] = [
    // seconds
    FieldSpec {
        max_symbols: 60,
        min: 0,
        max: 59,
        names: None,
    },
    // minutes
    FieldSpec {
        max_symbols: 60,
        min: 0,
        max: 59,
        names: None,
    },
    // hours
    FieldSpec {
        max_symbols: 24,
        min: 0,
        max: 23,
        names: None,
    },
    // day of month
    FieldSpec {
        max_symbols: 31,
        min: 1,
        max: 31,
        names: None,
    },
    // month
    FieldSpec {
        max_symbols: 12,
        min: 1,
        max: 12,
        names: Some(&MONTHS),
    },
    // day of week
    FieldSpec {
        max_symbols: 7,
        min: 0,
        max: 7,
        names: Some(&WEEKDAYS),
    },
];

/// Reject the empty string and any byte outside the accepted character set,
/// before lexing starts.
pub(crate) fn validate_characters(input: &str) -> Result<()> {
    if input.is_empty() {
        return Err(CronError::EmptyInput);
    }

    for character in input.chars() {
        match character {
            'a'..='z' | 'A'..='Z' | '0'..='9' | ' ' | '*' | ',' | '/' | '-' | '@' => {}
            _ => {
                return Err(CronError::InvalidCharacter {
                    character,
                    input: input.to_string(),
                })
            }
        }
    }

    Ok(())
}

/// Scan the whole tree for inconsistencies, joining every error found.
pub fn validate(ast: &Ast<'_>) -> Result<()> {
    let fields = ast.fields();

    let specs: &[FieldSpec] = match fields.len() {
        1 => return validate_override(ast, fields[0]),
        5 => &FIELD_SPECS[1..],
        6 => &FIELD_SPECS[..],
        n => return Err(CronError::InvalidNumNodes(n)),
    };

    let mut errors = Vec::new();

    for (&field, spec) in fields.iter().zip(specs) {
        validate_field(ast, field, spec, &mut errors);
    }

    CronError::join(errors)
}

fn validate_override(ast: &Ast<'_>, id: usize) -> Result<()> {
    let node = ast.node(id);

    if node.kind != TokenKind::At {
        return Err(CronError::InvalidNodeType(node.kind.name()));
    }

    if node.children.len() != 1 {
        return Err(CronError::InvalidNumEdges(node.children.len()));
    }

    let name = ast.node(node.children[0]).text;

    if OVERRIDES
        .iter()
        .any(|override_name| override_name.eq_ignore_ascii_case(name))
    {
        return Ok(());
    }

    Err(CronError::InvalidFrequency(name.to_string()))
}

fn validate_field(ast: &Ast<'_>, id: usize, spec: &FieldSpec, errors: &mut Vec<CronError>) {
    let node = ast.node(id);

    match node.kind {
        TokenKind::Star => {
            // a bare star is fine; it may carry a single step symbol
            validate_symbols(ast, id, 1, &[TokenKind::Slash], spec, errors);
        }
        TokenKind::AlphaNum => {
            if let Err(err) = check_value(node.text, spec) {
                errors.push(err);
            }

            validate_symbols(
                ast,
                id,
                spec.max_symbols,
                &[TokenKind::Comma, TokenKind::Dash, TokenKind::Slash],
                spec,
                errors,
            );
        }
        kind => errors.push(CronError::InvalidNodeType(kind.name())),
    }
}

fn validate_symbols(
    ast: &Ast<'_>,
    id: usize,
    max_symbols: usize,
    allowed: &[TokenKind],
    spec: &FieldSpec,
    errors: &mut Vec<CronError>,
) {
    let children = &ast.node(id).children;

    if children.is_empty() {
        return;
    }

    if children.len() > max_symbols {
        errors.push(CronError::InvalidNumEdges(children.len()));
        return;
    }

    for &child in children {
        let symbol = ast.node(child);

        if !allowed.contains(&symbol.kind) {
            continue;
        }

        if symbol.children.len() != 1 {
            errors.push(CronError::InvalidNumEdges(symbol.children.len()));
            continue;
        }

        let value = ast.node(symbol.children[0]);

        match value.kind {
            TokenKind::AlphaNum => {
                if let Err(err) = check_value(value.text, spec) {
                    errors.push(err);
                }
            }
            _ => errors.push(CronError::InvalidAlphanum(value.text.to_string())),
        }
    }
}

fn check_value(text: &str, spec: &FieldSpec) -> Result<()> {
    match spec.names {
        Some(names) => check_alpha(text, spec, names),
        None => check_number(text, spec),
    }
}

fn check_number(text: &str, spec: &FieldSpec) -> Result<()> {
    let value: i64 = text
        .parse()
        .map_err(|_| CronError::UnsupportedAlphanum(text.to_string()))?;

    if value < spec.min || value > spec.max {
        return Err(CronError::OutOfBoundsAlphanum {
            value,
            min: spec.min,
            max: spec.max,
        });
    }

    Ok(())
}

fn check_alpha(text: &str, spec: &FieldSpec, names: &[&str]) -> Result<()> {
    if text.is_empty() {
        return Err(CronError::EmptyAlphanum);
    }

    if text.as_bytes()[0].is_ascii_digit() {
        return check_number(text, spec);
    }

    let upper = text.to_ascii_uppercase();

    if names.iter().any(|name| !name.is_empty() && *name == upper) {
        return Ok(());
    }

    Err(CronError::InvalidAlphanum(text.to_string()))
}
