use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use anyhow::Result;
use tempfile::{tempdir, TempDir};

fn create_archive() -> Result<TempDir> {
    let directory = tempdir()?;

    fs::write(directory.path().join("transactions_data.csv"), "id,date,client_id,card_id,amount,use_chip,mcc\n\
        7475327,2010-01-01 00:01:00,1556,2972,$-77.00,Swipe Transaction,5499\n\
        7475328,2010-01-01 00:02:00,561,4575,$14.57,Swipe Transaction,5311\n\
        7475329,2010-01-01 00:02:00,1129,102,$80.00,Swipe Transaction,4829\n")?;
    fs::write(directory.path().join("cards_data.csv"), "id,user_id,card_brand,card_type\n\
        2972,1556,Mastercard,Debit (Prepaid)\n\
        4575,561,Visa,Credit\n")?;
    fs::write(directory.path().join("users_data.csv"), "id,current_age,gender\n1556,30,Female\n561,42,Male\n")?;
    fs::write(directory.path().join("train_fraud_labels.json"), r#"{"target": {"7475327": "No", "7475328": "Yes"}}"#)?;
    fs::write(directory.path().join("mcc_codes.json"), r#"{"5499": "Miscellaneous Food Stores", "5311": "Department Stores"}"#)?;

    Ok(directory)
}

fn run_binary(data_dir: &Path, output: &Path, extra: &[&str]) -> Result<Output> {
    let binary_path = env!("CARGO_BIN_EXE_unified-financial-dataset");

    let output = Command::new(binary_path)
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--output")
        .arg(output)
        .args(extra)
        .output()?;

    Ok(output)
}

#[test]
fn test_cli_writes_unified_dataset() -> Result<()> {
    let archive = create_archive()?;
    let output_path = archive.path().join("unified").join("unified_financial_dataset.csv");

    let output = run_binary(archive.path(), &output_path, &[])?;

    assert!(output.status.success());

    let contents = fs::read_to_string(&output_path)?;
    let mut lines = contents.lines();

    assert_eq!(lines.next(), Some("id,date,client_id,card_id,amount,use_chip,mcc,target,user_id,card_brand,card_type,current_age,gender,mcc_description"));

    for line in lines.clone() {
        assert_eq!(line.split(',').count(), 14);
    }

    assert_eq!(lines.next(), Some("7475327,2010-01-01 00:01:00,1556,2972,$-77.00,Swipe Transaction,5499,No,1556,Mastercard,Debit (Prepaid),30,Female,Miscellaneous Food Stores"));
    assert_eq!(lines.count(), 2);

    Ok(())
}

#[test]
fn test_cli_modes_agree() -> Result<()> {
    let archive = create_archive()?;
    let sequential_path = archive.path().join("sequential.csv");
    let batched_path = archive.path().join("batched.csv");

    assert!(run_binary(archive.path(), &sequential_path, &["--mode", "sequential"])?.status.success());
    assert!(run_binary(archive.path(), &batched_path, &["--mode", "batched", "--partitions", "2"])?.status.success());

    assert_eq!(fs::read_to_string(sequential_path)?, fs::read_to_string(batched_path)?);

    Ok(())
}

#[test]
fn test_cli_fails_without_transactions_and_writes_nothing() -> Result<()> {
    let archive = create_archive()?;
    fs::remove_file(archive.path().join("transactions_data.csv"))?;
    let output_path = archive.path().join("unified").join("unified_financial_dataset.csv");

    let output = run_binary(archive.path(), &output_path, &[])?;

    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)?.contains("does not exist"));
    assert!(!output_path.exists());

    Ok(())
}

#[test]
fn test_cli_tolerates_missing_reference_files() -> Result<()> {
    let archive = create_archive()?;
    fs::remove_file(archive.path().join("users_data.csv"))?;
    fs::remove_file(archive.path().join("mcc_codes.json"))?;
    let output_path = archive.path().join("unified.csv");

    let output = run_binary(archive.path(), &output_path, &["--log-level", "error"])?;

    assert!(output.status.success());

    let contents = fs::read_to_string(&output_path)?;

    assert_eq!(contents.lines().next(), Some("id,date,client_id,card_id,amount,use_chip,mcc,target,user_id,card_brand,card_type"));
    assert_eq!(contents.lines().count(), 4);

    Ok(())
}
