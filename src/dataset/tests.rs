use super::*;
use tempfile::TempDir;

fn write_dataset(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("alpaca_bfsi.json");
    std::fs::write(&path, content).expect("should write dataset");
    path
}

fn samples(n: usize) -> Vec<CuratedSample> {
    (0..n)
        .map(|i| CuratedSample::new(format!("Question {i} about loans"), format!("Answer {i}")))
        .collect()
}

#[test]
fn embedding_text_joins_non_blank_input() {
    let plain = CuratedSample::new("  What is EMI? ", "A monthly instalment.");
    assert_eq!(plain.embedding_text(), "What is EMI?");

    let blank_input = plain.clone().with_input("   ");
    assert_eq!(blank_input.embedding_text(), "What is EMI?");

    let with_input = plain.with_input(" home loan ");
    assert_eq!(with_input.embedding_text(), "What is EMI? home loan");
}

#[test]
fn load_defaults_missing_input() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_dataset(
        &dir,
        r#"[
            {"instruction": "What is KYC?", "output": "Know your customer."},
            {"instruction": "Rate?", "input": "home loan", "output": "8.5%"}
        ]"#,
    );

    let loaded = load_samples(&path).expect("should load samples");

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].input, "");
    assert_eq!(loaded[1].input, "home loan");
}

#[test]
fn load_treats_null_input_as_empty() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_dataset(
        &dir,
        r#"[
            {"instruction": "What is KYC?", "input": null, "output": "Know your customer."},
            {"instruction": "Rate?", "input": "home loan", "output": "8.5%"}
        ]"#,
    );

    let loaded = load_samples(&path).expect("null input should load");

    assert_eq!(loaded[0].input, "");
    assert_eq!(loaded[0].embedding_text(), "What is KYC?");
    assert_eq!(loaded[1].input, "home loan");
}

#[test]
fn load_missing_file_is_dataset_error() {
    let dir = TempDir::new().expect("should create temp dir");
    let result = load_samples(&dir.path().join("missing.json"));
    assert!(matches!(result, Err(AssistError::Dataset(_))));
}

#[test]
fn load_rejects_non_array() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_dataset(&dir, r#"{"instruction": "x", "output": "y"}"#);

    let error = load_samples(&path).expect_err("object should be rejected");
    assert!(error.to_string().contains("JSON array"));
}

#[test]
fn load_reports_offending_item() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_dataset(
        &dir,
        r#"[{"instruction": "ok", "output": "ok"}, {"instruction": "no output"}]"#,
    );

    let error = load_samples(&path).expect_err("missing output should be rejected");
    assert!(error.to_string().contains("Item 1"));
}

#[test]
fn validate_accepts_enough_samples() {
    let mut corpus = samples(150);
    corpus[3].input = "savings".to_string();

    let report = validate_samples(&corpus, DEFAULT_MIN_SAMPLES).expect("should validate");
    assert_eq!(report.samples, 150);
    assert_eq!(report.with_input, 1);
}

#[test]
fn validate_rejects_small_corpus() {
    let error = validate_samples(&samples(149), DEFAULT_MIN_SAMPLES)
        .expect_err("149 samples should be too few");
    assert!(error.to_string().contains("149"));
}

#[test]
fn validate_rejects_blank_output() {
    let mut corpus = samples(5);
    corpus[2].output = "  ".to_string();

    let error = validate_samples(&corpus, 1).expect_err("blank output should be rejected");
    assert!(error.to_string().contains("Item 2"));
}

#[test]
fn validate_dataset_reads_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let json = serde_json::to_string(&samples(3)).expect("should serialize samples");
    let path = write_dataset(&dir, &json);

    let report = validate_dataset(&path, 3).expect("should validate file");
    assert_eq!(report.samples, 3);
}
