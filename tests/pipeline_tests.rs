//! Integration tests for the extraction pipeline, enhancement, and dataset output.

use std::path::Path;

use mboxtune::config::{Config, DatasetConfig, EnhancerConfig};
use mboxtune::enhance::{enhance_unresolved, HeuristicEnhancer};
use mboxtune::export;
use mboxtune::filter::{FilterConfig, FilterVerdict};
use mboxtune::model::pair::{Dataset, PromptSource};
use mboxtune::parser::mbox::MboxReader;
use mboxtune::pipeline::Pipeline;

const OWNER: &str = "me@example.com";

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn run_fixture() -> Dataset {
    let pipeline = Pipeline::new(OWNER, &FilterConfig::default()).unwrap();
    pipeline
        .run_mbox(&fixture("conversation.mbox"), None)
        .unwrap()
}

// ─── Test 1: conversation.mbox splits into 10 records ───────────────

#[test]
fn test_split_fixture_count() {
    let reader = MboxReader::open(fixture("conversation.mbox")).unwrap();
    let records = reader.read_all(None).unwrap();
    assert_eq!(records.len(), 10, "conversation.mbox should contain 10 messages");
    assert_eq!(records[0].offset, 0);
}

// ─── Test 2: Counters ───────────────────────────────────────────────

#[test]
fn test_pipeline_stats() {
    let dataset = run_fixture();
    let stats = &dataset.stats;
    assert_eq!(stats.total_records, 10);
    assert_eq!(stats.parse_failures, 1, "record without From must be counted");
    assert_eq!(stats.total_parsed, 9);
    assert_eq!(stats.outbound, 7);
    assert_eq!(stats.inbound, 2);
    assert_eq!(stats.outbound + stats.inbound, stats.total_parsed);
    assert_eq!(stats.duplicates_removed, 1);
    assert_eq!(stats.dropped_total(), 1);
    assert_eq!(stats.inbound_filtered_total(), 0);
    assert_eq!(
        stats.dropped_by_reason.get(&FilterVerdict::MeetingInvite),
        Some(&1)
    );
}

// ─── Test 3: Reply pair with quote stripped ─────────────────────────

#[test]
fn test_reply_pair() {
    let dataset = run_fixture();
    let pair = dataset
        .pairs
        .iter()
        .find(|p| p.subject == "Re: Tuesday")
        .expect("reply pair present");
    assert_eq!(
        pair.prompt_source,
        PromptSource::Inbound("Are you free Tuesday?".into())
    );
    assert_eq!(pair.response_text, "Yes, Tuesday works, see you then.");
}

// ─── Test 4: HTML-only inbound becomes a text prompt ────────────────

#[test]
fn test_html_prompt_and_signature() {
    let dataset = run_fixture();
    let pair = dataset
        .pairs
        .iter()
        .find(|p| p.subject == "Re: Budget")
        .expect("budget pair present");
    let prompt = pair.prompt_source.text();
    assert!(
        prompt.contains("Can you send the budget numbers by Friday?"),
        "unexpected prompt: {prompt:?}"
    );
    assert!(!prompt.contains('<'));
    assert!(!prompt.contains("color"));
    assert_eq!(
        pair.response_text,
        "Sure, I will send the budget numbers on Thursday morning."
    );
}

// ─── Test 5: Unresolved outbound, deduplicated ──────────────────────

#[test]
fn test_unresolved_entries() {
    let dataset = run_fixture();
    assert_eq!(dataset.pairs.len(), 2);

    let subjects: Vec<&str> = dataset.unresolved.iter().map(|u| u.subject.as_str()).collect();
    assert_eq!(subjects, ["Quick update", "Notes", "Lunch plans"]);

    assert_eq!(dataset.unresolved[0].response_text, "Project is on track.");
    assert_eq!(
        dataset.unresolved[1].response_text,
        "Here are my notes from the planning session yesterday."
    );
}

// ─── Test 6: Attachments are not body text ──────────────────────────

#[test]
fn test_attachment_skipped() {
    let dataset = run_fixture();
    let lunch = dataset
        .unresolved
        .iter()
        .find(|u| u.subject == "Lunch plans")
        .expect("lunch message present");
    assert_eq!(
        lunch.response_text,
        "Lunch at noon works for me, I will book a table at the usual place."
    );
    assert!(!lunch.response_text.contains("ATTACHED"));
}

// ─── Test 7: Owner decides direction ────────────────────────────────

#[test]
fn test_other_owner_sees_mirror_image() {
    let pipeline = Pipeline::new("friend@example.com", &FilterConfig::default()).unwrap();
    let dataset = pipeline
        .run_mbox(&fixture("conversation.mbox"), None)
        .unwrap();
    assert_eq!(dataset.stats.outbound, 1);
    assert_eq!(dataset.stats.inbound, 8);
    assert!(dataset.pairs.is_empty());
    assert_eq!(dataset.unresolved.len(), 1);
}

// ─── Test 8: Full prepare flow writes JSONL ─────────────────────────

#[test]
fn test_prepare_writes_jsonl() {
    let mut dataset = run_fixture();
    let enhancer_config = EnhancerConfig::default();
    let mut enhancer = HeuristicEnhancer::new(&enhancer_config.fallback_prompt);

    let unresolved: Vec<_> = dataset.drain_unresolved().collect();
    let (enhanced, report) = enhance_unresolved(&mut enhancer, unresolved, &enhancer_config);
    assert_eq!(report.requested, 3);
    assert_eq!(report.fallbacks, 0);
    assert_eq!(
        enhanced[0].prompt_source.text(),
        "Write a brief one-line email in your tone."
    );

    let dataset_config = DatasetConfig {
        validation_split_ratio: 0.2,
        ..DatasetConfig::default()
    };
    let examples = export::build_examples(dataset.pairs, enhanced, &dataset_config);
    assert_eq!(examples.len(), 5);

    let final_dataset = export::finalize(examples, &dataset_config);
    let dir = tempfile::tempdir().unwrap();
    let summary = export::write_dataset(dir.path(), &final_dataset, &dataset_config).unwrap();
    assert_eq!(summary.validation_examples, 1);
    assert_eq!(summary.training_examples, 4);

    let training = std::fs::read_to_string(&summary.training_path).unwrap();
    let validation = std::fs::read_to_string(&summary.validation_path).unwrap();
    let lines: Vec<&str> = training.lines().chain(validation.lines()).collect();
    assert_eq!(lines.len(), 5);
    assert!(summary.estimated_tokens > 0);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][1]["role"], "assistant");
        assert!(!value["messages"][1]["content"].as_str().unwrap().is_empty());
    }
}

// ─── Test 9: Config validation happens before any mail is read ──────

#[test]
fn test_missing_owner_is_config_error() {
    let err = Pipeline::from_config(&Config::default(), None).unwrap_err();
    assert!(matches!(err, mboxtune::error::TuneError::Config(_)));
}
