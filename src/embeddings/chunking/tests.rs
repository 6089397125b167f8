use super::*;

fn numbered_words(count: usize) -> String {
    (0..count).map(|i| format!("w{i}")).join(" ")
}

#[test]
fn normalize_whitespace_collapses_runs() {
    assert_eq!(
        normalize_whitespace("  Home loan\n\n\tpolicy   terms \r\n"),
        "Home loan policy terms"
    );
    assert_eq!(normalize_whitespace("   "), "");
}

#[test]
fn short_text_is_single_chunk() {
    let config = ChunkingConfig {
        chunk_size: 10,
        overlap: 2,
    };
    let chunks = chunk_words("prepayment charges apply", &config);
    assert_eq!(chunks, vec!["prepayment charges apply"]);
}

#[test]
fn empty_text_has_no_chunks() {
    assert!(chunk_words("", &ChunkingConfig::default()).is_empty());
    assert!(chunk_words(" \n\t ", &ChunkingConfig::default()).is_empty());
}

#[test]
fn windows_overlap_by_configured_words() {
    let config = ChunkingConfig {
        chunk_size: 4,
        overlap: 1,
    };
    let chunks = chunk_words(&numbered_words(10), &config);

    assert_eq!(
        chunks,
        vec!["w0 w1 w2 w3", "w3 w4 w5 w6", "w6 w7 w8 w9"],
        "each window should start on the last word of the previous one"
    );
}

#[test]
fn final_window_ends_at_last_word() {
    let config = ChunkingConfig {
        chunk_size: 4,
        overlap: 2,
    };
    let chunks = chunk_words(&numbered_words(7), &config);

    assert_eq!(chunks, vec!["w0 w1 w2 w3", "w2 w3 w4 w5", "w4 w5 w6"]);
    assert!(chunks.last().is_some_and(|c| c.ends_with("w6")));
}

#[test]
fn exact_multiple_does_not_emit_trailing_overlap_chunk() {
    let config = ChunkingConfig {
        chunk_size: 5,
        overlap: 0,
    };
    let chunks = chunk_words(&numbered_words(10), &config);
    assert_eq!(chunks.len(), 2);
}

#[test]
fn degenerate_overlap_still_terminates() {
    let config = ChunkingConfig {
        chunk_size: 3,
        overlap: 3,
    };
    let chunks = chunk_words(&numbered_words(5), &config);

    assert_eq!(chunks.first().map(String::as_str), Some("w0 w1 w2"));
    assert!(chunks.last().is_some_and(|c| c.ends_with("w4")));
    assert!(chunks.len() <= 5);
}

#[test]
fn chunk_documents_numbers_across_documents() {
    let config = ChunkingConfig {
        chunk_size: 3,
        overlap: 0,
    };
    let chunks = chunk_documents(
        ["EMI is due monthly\n\non the fifth", "Penalty applies"],
        &config,
    );

    let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c0", "c1", "c2", "c3"]);
    assert_eq!(chunks[0].content, "EMI is due");
    assert_eq!(chunks[1].content, "monthly on the");
    assert_eq!(chunks[2].content, "fifth");
    assert_eq!(chunks[3].content, "Penalty applies");
}

#[test]
fn config_from_rag_settings() {
    let rag = crate::config::RagConfig {
        chunk_size: 200,
        chunk_overlap: 20,
        ..Default::default()
    };
    let config = ChunkingConfig::from(&rag);
    assert_eq!(config.chunk_size, 200);
    assert_eq!(config.overlap, 20);
}
