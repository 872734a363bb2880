//! Integration tests for the chunked load step.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use kbatch_core::record::PersonRecord;
use kbatch_pipeline::load::{ChunkedLoadStep, LoadError, LoadSummary, DEFAULT_CHUNK_SIZE};
use tokio_util::sync::CancellationToken;

use common::{input_file, RecordingWriter};

#[tokio::test]
async fn twenty_five_records_are_written_in_chunks_of_ten() {
    let lines: Vec<String> = (0..25).map(|i| format!("first{i},last{i}")).collect();
    let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
    let file = input_file(&lines);
    let writer = Arc::new(RecordingWriter::new());
    let step = ChunkedLoadStep::new(writer.clone(), DEFAULT_CHUNK_SIZE);

    let summary = step
        .run(file.path(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        summary,
        LoadSummary {
            records_read: 25,
            records_written: 25,
            chunks: 3,
        }
    );
    let sizes: Vec<usize> = writer.chunks().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![10, 10, 5]);
}

#[tokio::test]
async fn records_are_transformed_before_writing() {
    let file = input_file(&["Jane,Doe", "", "John , Smith"]);
    let writer = Arc::new(RecordingWriter::new());

    ChunkedLoadStep::new(writer.clone(), 10)
        .run(file.path(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        writer.records(),
        vec![
            PersonRecord::new("JANE", "DOE"),
            PersonRecord::new("JOHN", "SMITH"),
        ]
    );
}

#[tokio::test]
async fn empty_file_writes_nothing() {
    let file = input_file(&[]);
    let writer = Arc::new(RecordingWriter::new());

    let summary = ChunkedLoadStep::new(writer.clone(), 10)
        .run(file.path(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary, LoadSummary::default());
    assert!(writer.chunks().is_empty());
}

#[tokio::test]
async fn malformed_line_fails_with_line_number() {
    let file = input_file(&["Jane,Doe", "John,Smith", "oops"]);
    let writer = Arc::new(RecordingWriter::new());

    let result = ChunkedLoadStep::new(writer.clone(), 2)
        .run(file.path(), &CancellationToken::new())
        .await;

    assert_matches!(result, Err(LoadError::Parse { line: 3, .. }));
    // The first full chunk was committed before the bad line was reached.
    assert_eq!(writer.chunks().len(), 1);
}

#[tokio::test]
async fn writer_failure_stops_the_load() {
    let file = input_file(&["a,b", "c,d", "e,f"]);
    let writer = Arc::new(RecordingWriter::failing_on(2));

    let result = ChunkedLoadStep::new(writer.clone(), 1)
        .run(file.path(), &CancellationToken::new())
        .await;

    assert_matches!(result, Err(LoadError::Write(_)));
    assert_eq!(writer.chunks().len(), 1);
}

#[tokio::test]
async fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let writer = Arc::new(RecordingWriter::new());

    let result = ChunkedLoadStep::new(writer, 10)
        .run(&dir.path().join("missing.csv"), &CancellationToken::new())
        .await;

    assert_matches!(result, Err(LoadError::Io { .. }));
}

#[tokio::test]
async fn cancelled_load_writes_nothing() {
    let file = input_file(&["Jane,Doe"]);
    let writer = Arc::new(RecordingWriter::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = ChunkedLoadStep::new(writer.clone(), 10)
        .run(file.path(), &cancel)
        .await;

    assert_matches!(result, Err(LoadError::Cancelled));
    assert!(writer.chunks().is_empty());
}

#[test]
fn zero_chunk_size_is_clamped() {
    let step = ChunkedLoadStep::new(Arc::new(RecordingWriter::new()), 0);
    assert_eq!(step.chunk_size(), 1);
}
