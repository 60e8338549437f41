use super::lookup::Lookup;
use super::normalizer::{Coercion, KeyKind};
use super::stage::{SkipReason, StageName, StagePlan};
use super::{BatchJoiner, Frame, JoinPipeline, JoinPlan, RowJoiner, StageOutcome};

use anyhow::{anyhow, Result};
use serde_json::json;

use crate::sources::{FraudLabels, ReferenceData, Table};
use crate::types::{ColumnType, JoinKey, Record, Value};

fn table(lines: &[&str]) -> Table {
    let names: Vec<String> = lines[0].split(',').map(str::to_string).collect();

    let rows = lines[1..].iter()
        .map(|line| names.iter().zip(line.split(',')).map(|(name, cell)| (name.as_str(), Value::parse(cell))).collect::<Record>())
        .collect();

    Table::new(names, rows)
}

fn transactions() -> Table {
    table(&[
        "id,card_id,amount,mcc",
        "100,1,$10.00,5411",
        "101,2,$-4.50,5812",
        "102,9,$7.25,5411",
        "103,,$1.00,4829"
    ])
}

fn reference(fraud: FraudLabels) -> ReferenceData {
    ReferenceData {
        fraud,
        cards: table(&["id,user_id,card_brand", "1,10,Visa", "2,11,Mastercard"]),
        users: table(&["id,current_age,address", "10,53,462 Rose Lane", "11,40,3606 Federal Blvd"]),
        mcc: table(&["mcc,mcc_description", "5411,Grocery Stores", "5812,Eating Places"])
    }
}

fn fraud_labels() -> FraudLabels {
    FraudLabels::resolve(json!({ "100": "No", "101": "Yes" }))
}

fn join_rows(plan: &JoinPlan, rows: &[Record]) -> Vec<Record> {
    let joiner = RowJoiner::new(plan);

    rows.iter()
        .cloned()
        .map(|mut row| {
            joiner.apply(&mut row);
            row
        })
        .collect()
}

fn render(rows: &[Record], names: &[String]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| names.iter().map(|name| row.get(name).map(Value::to_string).unwrap_or_default()).collect())
        .collect()
}

#[test]
fn test_coercion_prefers_the_transaction_column_type() {
    let right = [Value::Text("123".to_string()), Value::Null, Value::Integer(7)];

    assert_eq!(Coercion::harmonize(ColumnType::Integer, &right), Coercion::Native(KeyKind::Integer));
    assert_eq!(Coercion::harmonize(ColumnType::Text, &right), Coercion::Native(KeyKind::Text));
    assert_eq!(Coercion::harmonize(ColumnType::Decimal, &right), Coercion::Native(KeyKind::Decimal));
}

#[test]
fn test_decimal_keys_match_integral_reference_keys() {
    let right = [Value::Integer(2), Value::Text("3.50".to_string())];
    let coercion = Coercion::harmonize(ColumnType::Decimal, &right);

    assert_eq!(coercion, Coercion::Native(KeyKind::Decimal));
    assert_eq!(coercion.key(&Value::parse("2.0")), coercion.key(&Value::Integer(2)));
    assert_eq!(coercion.key(&Value::parse("3.5")), coercion.key(&Value::Text("3.50".to_string())));
    assert_eq!(coercion.key(&Value::Text("n/a".to_string())), None);
    assert_eq!(Coercion::harmonize(ColumnType::Decimal, &[Value::Text("n/a".to_string())]), Coercion::Canonical);
}

#[test]
fn test_coercion_falls_back_to_strings_when_a_reference_key_cannot_be_cast() {
    let right = [Value::Text("123".to_string()), Value::Text("A-7".to_string())];
    let coercion = Coercion::harmonize(ColumnType::Integer, &right);

    assert_eq!(coercion, Coercion::Canonical);
    assert_eq!(coercion.key(&Value::Integer(123)), coercion.key(&Value::Text("123".to_string())));
    assert_eq!(coercion.key(&Value::Text("A-7".to_string())), Some(JoinKey::Text("A-7".to_string())));
}

#[test]
fn test_coercion_never_keys_nulls_or_uncastable_left_values() {
    let coercion = Coercion::Native(KeyKind::Integer);

    assert_eq!(coercion.key(&Value::Null), None);
    assert_eq!(coercion.key(&Value::Text("abc".to_string())), None);
    assert_eq!(coercion.key(&Value::Text("42".to_string())), Some(JoinKey::Integer(42)));
    assert_eq!(Coercion::Canonical.key(&Value::Null), None);
}

#[test]
fn test_lookup_resolves_duplicate_keys_to_the_last_row() -> Result<()> {
    let cards = table(&["id,card_brand", "1,Visa", "2,Amex", "1,Discover"]);

    for _ in 0..3 {
        let lookup = Lookup::build(cards.clone(), "id", Coercion::Native(KeyKind::Integer));
        let card = lookup.get(&JoinKey::Integer(1)).ok_or_else(|| anyhow!("card 1 missing"))?;

        assert_eq!(lookup.len(), 2);
        assert_eq!(card.get("card_brand"), Some(&Value::Text("Discover".to_string())));
    }

    Ok(())
}

#[test]
fn test_lookup_excludes_rows_without_a_key() {
    let cards = table(&["id,card_brand", ",Visa", "2,Amex"]);
    let lookup = Lookup::build(cards.clone(), "id", Coercion::Native(KeyKind::Integer));

    assert_eq!(lookup.len(), 1);
    assert!(Lookup::build(cards, "card_number", Coercion::Canonical).is_empty());
    assert!(Lookup::build(Table::empty(), "id", Coercion::Canonical).is_empty());
}

#[test]
fn test_matched_rows_carry_every_card_field_and_unmatched_rows_none() -> Result<()> {
    let transactions = transactions();
    let plan = JoinPlan::build(transactions.columns(), reference(fraud_labels()));
    let rows = join_rows(&plan, transactions.rows());

    assert_eq!(rows[0].get("user_id"), Some(&Value::Integer(10)));
    assert_eq!(rows[0].get("card_brand"), Some(&Value::Text("Visa".to_string())));
    assert_eq!(rows[1].get("card_brand"), Some(&Value::Text("Mastercard".to_string())));

    for unmatched in &rows[2..] {
        assert!(!unmatched.contains("user_id"));
        assert!(!unmatched.contains("card_brand"));
        assert!(!unmatched.contains("current_age"));
    }

    Ok(())
}

#[test]
fn test_reference_key_column_never_overwrites_transaction_identifier() {
    let transactions = transactions();
    let plan = JoinPlan::build(transactions.columns(), reference(fraud_labels()));
    let rows = join_rows(&plan, transactions.rows());

    let identifiers: Vec<Option<&Value>> = rows.iter().map(|row| row.get("id")).collect();

    assert_eq!(identifiers, vec![
        Some(&Value::Integer(100)),
        Some(&Value::Integer(101)),
        Some(&Value::Integer(102)),
        Some(&Value::Integer(103))
    ]);
    assert!(!rows[0].contains("transaction_id"));
}

#[test]
fn test_every_stage_enriches_in_order() {
    let transactions = transactions();
    let plan = JoinPlan::build(transactions.columns(), reference(fraud_labels()));
    let rows = join_rows(&plan, transactions.rows());

    assert_eq!(rows[0].get("target"), Some(&Value::Text("No".to_string())));
    assert_eq!(rows[1].get("target"), Some(&Value::Text("Yes".to_string())));
    assert_eq!(rows[0].get("address"), Some(&Value::Text("462 Rose Lane".to_string())));
    assert_eq!(rows[0].get("mcc_description"), Some(&Value::Text("Grocery Stores".to_string())));
    assert!(!rows[3].contains("mcc_description"));

    assert_eq!(plan.column_names(), vec![
        "id", "card_id", "amount", "mcc", "target", "user_id", "card_brand", "current_age", "address", "mcc_description"
    ]);
}

#[test]
fn test_skipping_the_card_join_turns_the_user_join_into_a_no_op() {
    let transactions = transactions();
    let mut reference = reference(fraud_labels());
    reference.cards = Table::empty();

    let plan = JoinPlan::build(transactions.columns(), reference);
    let rows = join_rows(&plan, transactions.rows());

    assert!(matches!(plan.card(), StagePlan::Skipped { reason: SkipReason::EmptySource, .. }));
    assert!(matches!(plan.user(), StagePlan::Skipped { reason: SkipReason::MissingLeftKey, .. }));
    assert!(rows.iter().all(|row| !row.contains("current_age") && !row.contains("user_id")));
    assert!(rows[0].contains("mcc_description"));
    assert!(rows[0].contains("target"));
}

#[test]
fn test_later_join_wins_field_name_collisions() {
    let transactions = transactions();
    let mut reference = reference(fraud_labels());
    reference.cards = table(&["id,user_id,address", "1,10,Card Billing St"]);
    reference.users = table(&["id,address", "10,462 Rose Lane"]);

    let plan = JoinPlan::build(transactions.columns(), reference);
    let rows = join_rows(&plan, transactions.rows());

    assert_eq!(rows[0].get("address"), Some(&Value::Text("462 Rose Lane".to_string())));

    let address_columns = plan.column_names().iter().filter(|name| *name == "address").count();

    assert_eq!(address_columns, 1);
}

#[test]
fn test_fraud_shapes_produce_identical_enrichment() {
    let transactions = transactions();

    let shapes = vec![
        FraudLabels::resolve(json!({ "100": "No", "101": "Yes" })),
        FraudLabels::resolve(json!([{ "transaction_id": 100, "target": "No" }, { "transaction_id": 101, "target": "Yes" }])),
        FraudLabels::resolve(json!([{ "id": "100", "target": "No" }, { "id": "101", "target": "Yes" }]))
    ];

    let outputs: Vec<Vec<Vec<String>>> = shapes.into_iter()
        .map(|fraud| {
            let plan = JoinPlan::build(transactions.columns(), reference(fraud));
            render(&join_rows(&plan, transactions.rows()), &plan.column_names())
        })
        .collect();

    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);
    assert_eq!(outputs[0][1][4], "Yes");
}

#[test]
fn test_malformed_fraud_source_leaves_transactions_without_fraud_columns() {
    let transactions = transactions();
    let plan = JoinPlan::build(transactions.columns(), reference(FraudLabels::resolve(json!(["No", "Yes"]))));
    let rows = join_rows(&plan, transactions.rows());

    assert!(matches!(plan.fraud(), StagePlan::Skipped { name: StageName::Fraud, reason: SkipReason::EmptySource }));
    assert!(!plan.column_names().contains(&"target".to_string()));
    assert!(rows.iter().all(|row| !row.contains("target")));
    assert_eq!(rows.len(), transactions.len());
}

#[test]
fn test_textual_and_numeric_keys_match_like_pre_coerced_keys() {
    let numeric = table(&["id,card_id,mcc", "1,1,5411", "2,2,5812", "3,3,5411"]);

    let mut textual_cards = reference(FraudLabels::Unavailable("none".to_string()));
    textual_cards.cards = Table::new(
        vec!["id".to_string(), "card_brand".to_string()],
        vec![
            [("id", Value::Text("1".to_string())), ("card_brand", Value::Text("Visa".to_string()))].into_iter().collect(),
            [("id", Value::Text("3".to_string())), ("card_brand", Value::Text("Amex".to_string()))].into_iter().collect()
        ]
    );

    let mut numeric_cards = textual_cards.clone();
    numeric_cards.cards = table(&["id,card_brand", "1,Visa", "3,Amex"]);

    let textual_plan = JoinPlan::build(numeric.columns(), textual_cards);
    let numeric_plan = JoinPlan::build(numeric.columns(), numeric_cards);

    let textual = render(&join_rows(&textual_plan, numeric.rows()), &textual_plan.column_names());
    let pre_coerced = render(&join_rows(&numeric_plan, numeric.rows()), &numeric_plan.column_names());

    assert_eq!(textual, pre_coerced);
    assert_eq!(textual_plan.card().active().map(|stage| stage.coercion), Some(Coercion::Native(KeyKind::Integer)));
}

#[test]
fn test_row_and_batch_joiners_agree() {
    let transactions = transactions();
    let row_plan = JoinPlan::build(transactions.columns(), reference(fraud_labels()));
    let batch_plan = JoinPlan::build(transactions.columns(), reference(fraud_labels()));

    let row_output = join_rows(&row_plan, transactions.rows());

    let mut frame = Frame::from_records(transactions.rows().to_vec());
    BatchJoiner::new(&batch_plan).apply(&mut frame);
    let batch_output = frame.into_records();

    let names = row_plan.column_names();

    assert_eq!(render(&row_output, &names), render(&batch_output, &names));
    assert_eq!(row_plan.report(), batch_plan.report());
}

#[test]
fn test_batch_joiner_keeps_every_row() {
    let mut lines = vec!["id,card_id,mcc".to_string()];
    lines.extend((0..1000).map(|index| format!("{index},{},{}", index % 7, 5411 + index % 3)));
    let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
    let transactions = table(&lines);

    let plan = JoinPlan::build(transactions.columns(), reference(fraud_labels()));
    let mut frame = Frame::from_records(transactions.rows().to_vec());
    BatchJoiner::new(&plan).apply(&mut frame);

    assert_eq!(frame.height(), 1000);
    assert_eq!(frame.into_records().len(), 1000);

    let card_report = plan.report()[1];

    assert_eq!(card_report.name, StageName::Card);
    assert!(matches!(card_report.outcome, StageOutcome::Joined { matched, .. } if matched > 0 && matched < 1000));
}

#[test]
fn test_frame_round_trips_records_with_missing_fields() {
    let rows: Vec<Record> = vec![
        [("id", Value::Integer(1)), ("mcc", Value::Integer(5411))].into_iter().collect(),
        [("id", Value::Integer(2))].into_iter().collect()
    ];

    let frame = Frame::from_records(rows);

    assert_eq!(frame.column("id"), Some([Value::Integer(1), Value::Integer(2)].as_slice()));
    assert_eq!(frame.column("mcc"), Some([Value::Integer(5411), Value::Null].as_slice()));
    assert_eq!(frame.into_records()[1].get("mcc"), Some(&Value::Null));
}
