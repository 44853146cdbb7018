use rstest::rstest;
use shooter_core::{RangeTable, TableError};

fn scenario_table() -> RangeTable {
    RangeTable::new([(5.0, 1000.0), (7.5, 1500.0), (9.5, 2000.0), (14.5, 2500.0)]).unwrap()
}

#[rstest]
#[case(3.0, 1000.0)]
#[case(5.0, 1000.0)]
#[case(7.49, 1000.0)]
#[case(7.5, 1500.0)]
#[case(8.0, 1500.0)]
#[case(9.5, 2000.0)]
#[case(14.49, 2000.0)]
#[case(14.5, 2500.0)]
#[case(20.0, 2500.0)]
#[case(-1.0, 1000.0)]
fn floor_lookup_with_clamping(#[case] range_m: f64, #[case] expected: f64) {
    assert_eq!(scenario_table().lookup(range_m), expected);
}

#[rstest]
#[case(vec![], TableError::Empty)]
#[case(vec![(5.0, 1.0), (5.0, 2.0)], TableError::NotIncreasing { index: 1 })]
#[case(vec![(5.0, 1.0), (9.0, 2.0), (7.0, 3.0)], TableError::NotIncreasing { index: 2 })]
#[case(vec![(f64::NAN, 1.0)], TableError::NonFinite { index: 0 })]
#[case(vec![(1.0, 1.0), (2.0, f64::INFINITY)], TableError::NonFinite { index: 1 })]
fn invalid_tables_are_rejected(#[case] entries: Vec<(f64, f64)>, #[case] expected: TableError) {
    assert_eq!(RangeTable::new(entries).unwrap_err(), expected);
}

#[test]
fn entries_round_trip_in_order() {
    let t = scenario_table();
    let keys: Vec<f64> = t.entries().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![5.0, 7.5, 9.5, 14.5]);
    assert_eq!(t.len(), 4);
    assert!(!t.is_empty());
    assert_eq!(t.first_key(), 5.0);
    assert_eq!(t.last_key(), 14.5);
}

#[test]
fn builds_from_config_rows() {
    let rows = [
        shooter_config::TableRow {
            range_m: 5.0,
            value: 45.0,
        },
        shooter_config::TableRow {
            range_m: 14.5,
            value: 25.0,
        },
    ];
    let t = RangeTable::try_from(&rows[..]).unwrap();
    assert_eq!(t.lookup(10.0), 45.0);
    assert_eq!(t.lookup(15.0), 25.0);
}

#[test]
fn error_messages_name_the_entry() {
    let err = RangeTable::new([(2.0, 1.0), (1.0, 1.0)]).unwrap_err();
    assert_eq!(err.to_string(), "entry 1 does not increase strictly in range");
}
