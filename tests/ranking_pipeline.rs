// End-to-end relevance ranking over synthetic chunk collections
use docsift::config::RankerConfig;
use docsift::ranking::writer::{RankReport, RESULT_FILE, SCORE_LOG_FILE};
use docsift::ranking::{
    run_ranking, write_report, write_score_log, LeadSummarizer, LexiconSynonyms, NoSynonyms,
};
use docsift::DocumentChunk;

fn chunk(document: &str, text: &str) -> DocumentChunk {
    DocumentChunk {
        document: document.into(),
        section_title: format!("{document} intro"),
        text: text.into(),
        page_start: 1,
        page_end: 1,
    }
}

#[test]
fn scores_and_order_reproduce_across_runs() {
    let chunks = vec![
        chunk("menu.pdf", "vegetarian buffet options with seasonal produce"),
        chunk("venues.pdf", "conference venues near the city center downtown"),
        chunk("catering.pdf", "catering packages including vegetarian and vegan menus"),
    ];
    let config = RankerConfig::default();

    let run = |summ: &mut LeadSummarizer| {
        run_ranking(
            "vegetarian catering",
            "",
            &chunks,
            &config,
            &NoSynonyms,
            summ,
            false,
        )
        .unwrap()
    };
    let first = run(&mut LeadSummarizer::default());
    let second = run(&mut LeadSummarizer::default());

    assert_eq!(first.breakdowns, second.breakdowns);
    let order_a: Vec<&str> = first.results.iter().map(|r| r.chunk.document.as_str()).collect();
    let order_b: Vec<&str> = second.results.iter().map(|r| r.chunk.document.as_str()).collect();
    assert_eq!(order_a, order_b);
}

#[test]
fn tied_chunks_keep_input_order() {
    // Identical text means identical scores for every signal.
    let chunks = vec![
        chunk("first.pdf", "identical content in every chunk"),
        chunk("second.pdf", "identical content in every chunk"),
        chunk("third.pdf", "identical content in every chunk"),
    ];
    let outcome = run_ranking(
        "identical content",
        "",
        &chunks,
        &RankerConfig::default(),
        &NoSynonyms,
        &mut LeadSummarizer::default(),
        false,
    )
    .unwrap();

    let order: Vec<&str> = outcome
        .results
        .iter()
        .map(|r| r.chunk.document.as_str())
        .collect();
    assert_eq!(order, vec!["first.pdf", "second.pdf", "third.pdf"]);
}

#[test]
fn penalty_separates_otherwise_equal_chunks() {
    // Equal base scores are forced by zeroing the bm25/tfidf weights; the
    // penalized chunk must then trail by at least the penalty weight.
    let mut config = RankerConfig::default();
    config.weights.w_bm25 = 0.0;
    config.weights.w_tfidf = 0.0;
    config.irrelevant_terms = vec!["meat".into()];

    let chunks = vec![
        chunk("a.pdf", "vegetarian starters and vegetarian mains"),
        chunk("b.pdf", "vegetarian starters with meat garnish"),
    ];
    let outcome = run_ranking(
        "vegetarian",
        "",
        &chunks,
        &config,
        &NoSynonyms,
        &mut LeadSummarizer::default(),
        false,
    )
    .unwrap();

    let a = outcome.breakdowns[0].combined_score;
    let b = outcome.breakdowns[1].combined_score;
    assert!(a - b >= config.weights.penalty_weight - 1e-9);
    assert_eq!(outcome.results[0].chunk.document, "a.pdf");
}

#[test]
fn synonym_expansion_lifts_paraphrased_chunks() {
    let mut entries = std::collections::BTreeMap::new();
    entries.insert("vegetarian".to_string(), vec!["meatless".to_string()]);
    let lexicon = LexiconSynonyms::from_entries(entries);

    let chunks = vec![
        chunk("plain.pdf", "weekly specials and drink pairings"),
        chunk("para.pdf", "meatless weekly specials and drink pairings"),
    ];
    let outcome = run_ranking(
        "vegetarian",
        "",
        &chunks,
        &RankerConfig::default(),
        &lexicon,
        &mut LeadSummarizer::default(),
        false,
    )
    .unwrap();

    assert_eq!(outcome.results[0].chunk.document, "para.pdf");
    assert!(outcome.breakdowns[1].synonym_bonus > 0.0);
    assert_eq!(outcome.breakdowns[0].synonym_bonus, 0.0);
}

#[test]
fn persona_keywords_bias_the_ranking() {
    let mut config = RankerConfig::default();
    config.weights.w_bm25 = 0.0;
    config.weights.w_tfidf = 0.0;
    config
        .personas
        .insert("Travel Planner".into(), vec!["group booking".into()]);

    let chunks = vec![
        chunk("generic.pdf", "standard room rates and amenities"),
        chunk("groups.pdf", "group booking discounts for large parties"),
    ];
    let outcome = run_ranking(
        "hotel",
        "Travel Planner",
        &chunks,
        &config,
        &NoSynonyms,
        &mut LeadSummarizer::default(),
        false,
    )
    .unwrap();

    assert_eq!(outcome.results[0].chunk.document, "groups.pdf");
    assert_eq!(
        outcome.breakdowns[1].persona_bonus,
        config.weights.persona_weight
    );
}

#[test]
fn artifacts_cover_every_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let chunks = vec![
        chunk("hit.pdf", "vegetarian menu planning for events"),
        chunk("miss.pdf", "completely unrelated maintenance schedule"),
        chunk("zero.pdf", "another unrelated chunk with no overlap"),
    ];
    let mut config = RankerConfig::default();
    config.top_k = 1;

    let outcome = run_ranking(
        "vegetarian",
        "",
        &chunks,
        &config,
        &NoSynonyms,
        &mut LeadSummarizer::default(),
        false,
    )
    .unwrap();

    let report = RankReport::new("vegetarian", "", &outcome.results, chunks.len(), outcome.elapsed_ms);
    write_report(dir.path(), &report).unwrap();
    write_score_log(dir.path(), &chunks, &outcome.breakdowns, outcome.degraded).unwrap();

    let raw = std::fs::read_to_string(dir.path().join(RESULT_FILE)).unwrap();
    let parsed: RankReport = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed.stats.chunk_count, 3);
    assert_eq!(parsed.ranked_sections.len(), 3);
    assert_eq!(parsed.ranked_sections[0].document, "hit.pdf");
    // Only the top-1 section carries a summary.
    assert!(!parsed.ranked_sections[0].summary.is_empty());
    assert!(parsed.ranked_sections[1].summary.is_empty());

    let log = std::fs::read_to_string(dir.path().join(SCORE_LOG_FILE)).unwrap();
    let data_lines = log.lines().filter(|l| !l.starts_with('#')).count();
    assert_eq!(data_lines, 3);
}

#[test]
fn degraded_lexicon_still_produces_full_output() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no_such_lexicon.json");
    let err = LexiconSynonyms::from_file(&missing).unwrap_err();
    let kind = err.downcast_ref::<docsift::DocsiftError>().unwrap();
    assert!(!kind.is_fatal());

    // The run proceeds with the null lookup and a degraded marker.
    let chunks = vec![chunk("a.pdf", "vegetarian menu")];
    let outcome = run_ranking(
        "vegetarian",
        "",
        &chunks,
        &RankerConfig::default(),
        &NoSynonyms,
        &mut LeadSummarizer::default(),
        true,
    )
    .unwrap();
    assert!(outcome.degraded);
    assert_eq!(outcome.breakdowns[0].synonym_bonus, 0.0);

    write_score_log(dir.path(), &chunks, &outcome.breakdowns, outcome.degraded).unwrap();
    let log = std::fs::read_to_string(dir.path().join(SCORE_LOG_FILE)).unwrap();
    assert!(log.contains("degraded"));
}
