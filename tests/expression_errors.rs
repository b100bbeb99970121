// tests/expression_errors.rs

//! Error surface of the expression compiler.

use cronloop::schedule::parse;
use cronloop::CronError;

#[test]
fn empty_input() {
    assert!(matches!(parse(""), Err(CronError::EmptyInput)));
}

#[test]
fn invalid_character() {
    let err = parse("* * ? * *").unwrap_err();

    assert!(matches!(
        err,
        CronError::InvalidCharacter { character: '?', .. },
    ));
}

#[test]
fn wrong_field_counts() {
    assert!(matches!(
        parse("* * * * * * *"),
        Err(CronError::InvalidNumNodes(7)),
    ));
    assert!(matches!(
        parse("* * *"),
        Err(CronError::InvalidNumNodes(3)),
    ));
}

#[test]
fn lone_star_is_not_an_override() {
    // a single field must be an @-override; a bare star is the wrong node
    assert!(matches!(parse("*"), Err(CronError::InvalidNodeType(_))));
}

#[test]
fn unknown_frequency() {
    let err = parse("@take-a-guess").unwrap_err();

    match err {
        CronError::InvalidFrequency(name) => assert_eq!(name, "take"),
        other => panic!("expected InvalidFrequency, got {other:?}"),
    }
}

#[test]
fn bare_at_has_no_frequency() {
    assert!(matches!(parse("@"), Err(CronError::InvalidNumEdges(0))));
}

#[test]
fn out_of_bounds_values() {
    let err = parse("61 * * * *").unwrap_err();

    assert!(matches!(
        err,
        CronError::OutOfBoundsAlphanum {
            value: 61,
            min: 0,
            max: 59,
        },
    ));

    // day-of-month has a lower bound of 1
    assert!(matches!(
        parse("0 0 0 * *"),
        Err(CronError::OutOfBoundsAlphanum { value: 0, .. }),
    ));
}

#[test]
fn names_only_valid_for_month_and_weekday() {
    // minutes take numbers only
    assert!(matches!(
        parse("JAN * * * *"),
        Err(CronError::UnsupportedAlphanum(_)),
    ));

    // unknown month name
    let err = parse("* * * FOO *").unwrap_err();
    match err {
        CronError::InvalidAlphanum(name) => assert_eq!(name, "FOO"),
        other => panic!("expected InvalidAlphanum, got {other:?}"),
    }
}

#[test]
fn dangling_symbol() {
    // a trailing dash never received its partner value
    assert!(matches!(
        parse("* * * * 5-"),
        Err(CronError::InvalidAlphanum(_)),
    ));
}

#[test]
fn all_field_problems_are_reported_together() {
    let err = parse("61 25 * FOO *").unwrap_err();

    let CronError::Many(joined) = err else {
        panic!("expected joined errors, got {err:?}");
    };

    assert_eq!(joined.0.len(), 3);
    assert!(matches!(
        joined.0[0],
        CronError::OutOfBoundsAlphanum { value: 61, .. },
    ));
    assert!(matches!(
        joined.0[1],
        CronError::OutOfBoundsAlphanum { value: 25, .. },
    ));
    assert!(matches!(joined.0[2], CronError::InvalidAlphanum(_)));
}
