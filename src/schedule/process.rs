// src/schedule/process.rs

//! Validated AST → [`Schedule`]: resolver construction and `@`-override
//! expansion.

use super::lexer::TokenKind;
use super::parser::Ast;
use super::resolve::{value_range, Resolver};
use super::validate::{MONTHS, OVERRIDES, WEEKDAYS};
use super::{Schedule, IMPLICIT_SECONDS};

/// Derive a [`Schedule`] from a tree that already passed
/// [`validate`](super::validate::validate).
pub(crate) fn process(ast: &Ast<'_>) -> Schedule {
    let fields = ast.fields();

    let mut schedule = match fields.len() {
        1 => build_override(ast, fields[0]),
        5 => Schedule {
            // five-field expressions fire at the top of the minute
            sec: IMPLICIT_SECONDS,
            min: build_field(ast, fields[0], 0, 59, None),
            hour: build_field(ast, fields[1], 0, 23, None),
            day_of_month: build_field(ast, fields[2], 1, 31, None),
            month: build_field(ast, fields[3], 1, 12, Some(&MONTHS)),
            day_of_week: build_field(ast, fields[4], 0, 7, Some(&WEEKDAYS)),
        },
        // six fields, per validation
        _ => Schedule {
            sec: build_field(ast, fields[0], 0, 59, None),
            min: build_field(ast, fields[1], 0, 59, None),
            hour: build_field(ast, fields[2], 0, 23, None),
            day_of_month: build_field(ast, fields[3], 1, 31, None),
            month: build_field(ast, fields[4], 1, 12, Some(&MONTHS)),
            day_of_week: build_field(ast, fields[5], 0, 7, Some(&WEEKDAYS)),
        },
    };

    // Sundays written as 7 fold onto 0.
    if let Resolver::Step { steps, .. } = &mut schedule.day_of_week {
        if steps.contains(&7) {
            for step in steps.iter_mut() {
                if *step == 7 {
                    *step = 0;
                }
            }

            steps.sort_unstable();
            steps.dedup();
        }
    }

    schedule
}

fn build_field(
    ast: &Ast<'_>,
    id: usize,
    min: i64,
    max: i64,
    names: Option<&[&str]>,
) -> Resolver {
    match ast.node(id).kind {
        TokenKind::Star => build_star(ast, id, min, max),
        _ => build_alphanum(ast, id, max, names),
    }
}

fn build_star(ast: &Ast<'_>, id: usize, min: i64, max: i64) -> Resolver {
    let children = &ast.node(id).children;

    if children.len() == 1 {
        let symbol = ast.node(children[0]);

        if symbol.kind == TokenKind::Slash && symbol.children.len() == 1 {
            if let Ok(step) = ast.node(symbol.children[0]).text.parse::<i64>() {
                let steps = value_range(min, max, step);

                if !steps.is_empty() {
                    return Resolver::Step { max, steps };
                }
            }
        }
    }

    Resolver::Everytime
}

fn build_alphanum(ast: &Ast<'_>, id: usize, max: i64, names: Option<&[&str]>) -> Resolver {
    let node = ast.node(id);
    let mut value = lookup_value(node.text, names);

    if node.children.is_empty() {
        return Resolver::Fixed { max, at: value };
    }

    // a single dash is a plain window
    if node.children.len() == 1 && ast.node(node.children[0]).kind == TokenKind::Dash {
        return Resolver::Range {
            max,
            from: value,
            to: symbol_value(ast, node.children[0], names),
        };
    }

    // Mixed sets: walk the symbols in order and accumulate concrete step
    // values. A comma carries the next value and re-bases the walk; a dash
    // expands the window from the current base; a slash expands the
    // frequency from the current base up to the field maximum.
    let mut steps = Vec::with_capacity(node.children.len() * 2);

    for (i, &child) in node.children.iter().enumerate() {
        let symbol = ast.node(child);

        match symbol.kind {
            TokenKind::Comma => {
                if i == 0 {
                    // the field's own value would otherwise be dropped
                    steps.push(value);
                }

                let next = symbol_value(ast, child, names);

                if next >= 0 {
                    steps.push(next);
                    value = next;
                }
            }
            TokenKind::Dash => {
                let to = symbol_value(ast, child, names);

                if to >= 0 {
                    steps.extend(value..=to);
                }
            }
            TokenKind::Slash => {
                let frequency = symbol_value(ast, child, names);

                if frequency >= 0 {
                    steps.extend(value_range(value, max, frequency));
                }
            }
            _ => {}
        }
    }

    steps.sort_unstable();
    steps.dedup();

    Resolver::Step { max, steps }
}

/// Read a node's value as a number, falling back to the field's name list.
/// Returns -1 when neither applies; validation rules that case out for
/// field values.
fn lookup_value(text: &str, names: Option<&[&str]>) -> i64 {
    if text.as_bytes().first().is_some_and(u8::is_ascii_digit) {
        if let Ok(value) = text.parse::<i64>() {
            return value;
        }
    }

    let Some(names) = names else {
        return -1;
    };

    let upper = text.to_ascii_uppercase();

    names
        .iter()
        .position(|name| !name.is_empty() && *name == upper)
        .map_or(-1, |index| index as i64)
}

fn symbol_value(ast: &Ast<'_>, id: usize, names: Option<&[&str]>) -> i64 {
    let symbol = ast.node(id);

    if symbol.children.len() == 1 {
        return lookup_value(ast.node(symbol.children[0]).text, names);
    }

    -1
}

fn build_override(ast: &Ast<'_>, id: usize) -> Schedule {
    let node = ast.node(id);

    let Some(&child) = node.children.first() else {
        return hourly();
    };

    let name = ast.node(child).text;
    let index = OVERRIDES
        .iter()
        .position(|override_name| override_name.eq_ignore_ascii_case(name));

    match index {
        Some(2) => daily(),
        Some(3) => weekly(),
        Some(4) => monthly(),
        Some(5 | 6) => yearly(),
        // reboot currently behaves as hourly; a fire-once semantic never
        // made it into the expression language
        _ => hourly(),
    }
}

fn hourly() -> Schedule {
    Schedule {
        sec: Resolver::Fixed { max: 59, at: 0 },
        min: Resolver::Fixed { max: 59, at: 0 },
        hour: Resolver::Everytime,
        day_of_month: Resolver::Everytime,
        month: Resolver::Everytime,
        day_of_week: Resolver::Everytime,
    }
}

fn daily() -> Schedule {
    Schedule {
        hour: Resolver::Fixed { max: 23, at: 0 },
        ..hourly()
    }
}

fn weekly() -> Schedule {
    Schedule {
        day_of_week: Resolver::Fixed { max: 7, at: 0 },
        ..daily()
    }
}

fn monthly() -> Schedule {
    Schedule {
        day_of_month: Resolver::Fixed { max: 31, at: 1 },
        ..daily()
    }
}

fn yearly() -> Schedule {
    Schedule {
        month: Resolver::Fixed { max: 12, at: 1 },
        ..monthly()
    }
}
