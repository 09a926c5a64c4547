use docslice_core::Pipeline;
use docslice_ingest::chunker::chunk_parse_result;
use docslice_ingest::{
    ChunkStats, ChunkingOutcome, ChunkingParameters, ChunkingStrategy, ChunksJson, DocumentParser,
    ParseOptions, SourceFile, UpsertBatch,
};

fn small_params() -> ChunkingParameters {
    let mut params = ChunkingParameters::default();
    params.set_chunk_size(128);
    params.set_chunk_overlap(20);
    params
}

#[tokio::test]
async fn markdown_file_to_chunks_json() {
    let paragraph = "Retrieval works best when chunks follow the structure of the text. ";
    let text = format!("# Guide\n\n{}\n\n{}", paragraph.repeat(3), paragraph.repeat(2));
    let file = SourceFile::new("guide.md", text.into_bytes());
    let opts = ParseOptions::new(file.clone(), Pipeline::SimpleText);

    let parsed = DocumentParser::default().parse(&opts).await.unwrap();
    let outcome = chunk_parse_result(&parsed, &small_params(), file.name());
    let chunks = outcome.chunks().unwrap();

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.content.chars().count() <= 128));
    assert!(chunks.iter().all(|c| c.row.is_none()));
    assert_eq!(chunks[0].content, "# Guide");

    let json = ChunksJson::new(file.name(), Pipeline::SimpleText, chunks);
    let value = serde_json::to_value(&json).unwrap();
    assert_eq!(value["metadata"]["source_file"], "guide.md");
    assert_eq!(value["metadata"]["pipeline"], "simple-text");
    assert_eq!(value["metadata"]["num_chunks"], chunks.len());
    assert_eq!(value["chunks"][1]["index"], 1);

    let stats = ChunkStats::from_chunks(chunks);
    assert_eq!(stats.count, chunks.len());
    assert!(stats.max_chars <= 128);
    assert!(stats.total_tokens > 0);
}

#[tokio::test]
async fn csv_rows_never_share_a_chunk() {
    let long_answer = "word ".repeat(60);
    let csv = format!("answer\nshort one\n\"{long_answer}\"\nshort two\n");
    let file = SourceFile::new("faq.csv", csv.into_bytes());
    let opts = ParseOptions::new(file.clone(), Pipeline::CsvSpreadsheet).with_column("answer");

    let parsed = DocumentParser::default().parse(&opts).await.unwrap();
    let chunks = chunk_parse_result(&parsed, &small_params(), file.name())
        .into_chunks()
        .unwrap();

    assert_eq!(chunks.first().map(|c| c.content.as_str()), Some("short one"));
    assert_eq!(chunks.first().and_then(|c| c.row), Some(0));
    assert_eq!(chunks.last().map(|c| c.content.as_str()), Some("short two"));
    assert_eq!(chunks.last().and_then(|c| c.row), Some(2));
    let middle: Vec<_> = chunks.iter().filter(|c| c.row == Some(1)).collect();
    assert!(middle.len() >= 2);
    assert!(middle.iter().all(|c| !c.content.contains("short")));
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
    }

    let embeddings = vec![vec![0.0_f32; 4]; chunks.len()];
    let batch = UpsertBatch::new(file.stem(), file.name(), Pipeline::CsvSpreadsheet, &chunks, embeddings)
        .unwrap();
    assert_eq!(batch.ids[0], "faq-0");
    assert_eq!(batch.metadatas[0].row, Some(0));
}

#[tokio::test]
async fn parent_child_reports_placeholder() {
    let file = SourceFile::new("notes.txt", b"some text worth chunking".to_vec());
    let parsed = DocumentParser::default()
        .parse(&ParseOptions::new(file.clone(), Pipeline::SimpleText))
        .await
        .unwrap();
    let mut params = ChunkingParameters::default();
    params.set_strategy(ChunkingStrategy::ParentChild);

    match chunk_parse_result(&parsed, &params, file.name()) {
        ChunkingOutcome::NotImplemented { placeholder } => {
            assert!(placeholder.iter().any(|line| line.contains("notes.txt")));
        }
        other => panic!("expected placeholder, got {other:?}"),
    }
}
