use partita_domain_notation::{NotationError, PartBook, FULL_SCORE};
use partita_ports::analysis::PartSource;
use pretty_assertions::assert_eq;

fn part(name: &str, source: &str) -> PartSource {
    PartSource {
        name: name.to_string(),
        source: source.to_string(),
    }
}

#[test]
fn full_score_is_the_default_part() {
    let book = PartBook::new(vec![
        part("Melody", "X:1\nK:C\nCDEF|"),
        part(FULL_SCORE, "X:1\nK:C\n[CEG]4|"),
        part("Bass", "X:1\nK:C\nC,4|"),
    ])
    .unwrap();

    assert_eq!(book.default_part(), FULL_SCORE);
}

#[test]
fn first_part_is_the_default_without_a_full_score() {
    let book = PartBook::new(vec![
        part("Melody", "X:1\nK:C\nCDEF|"),
        part("Bass", "X:1\nK:C\nC,4|"),
    ])
    .unwrap();

    assert_eq!(book.default_part(), "Melody");
}

#[test]
fn empty_result_is_rejected() {
    let err = PartBook::new(vec![]).unwrap_err();
    assert!(matches!(err, NotationError::EmptyResult));
}

#[test]
fn lookup_is_exact_and_order_preserving() {
    let book = PartBook::new(vec![
        part("Melody", "melody source"),
        part("Bass", "bass source"),
    ])
    .unwrap();

    assert_eq!(book.source("Bass"), Some("bass source"));
    assert_eq!(book.source("bass"), None);
    assert_eq!(book.source("Drums"), None);
    assert_eq!(book.names().collect::<Vec<_>>(), vec!["Melody", "Bass"]);
}

#[test]
fn duplicate_names_keep_the_first_occurrence() {
    let book = PartBook::new(vec![
        part("Melody", "first"),
        part("Melody", "second"),
        part("Bass", "bass"),
    ])
    .unwrap();

    assert_eq!(book.len(), 2);
    assert_eq!(book.source("Melody"), Some("first"));
}
