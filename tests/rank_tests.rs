use flow_aligner::embedding::embedder::{Embedder, HashingEmbedder, StaticEmbedder, tokenize};
use flow_aligner::index::{candidate_index::PoolEntry, identity::NodeId};
use flow_aligner::error::ServiceError;
use flow_aligner::rank::similarity::{
    SimilarityRanker, check_dimensions, cosine_similarity, rank_by_vector,
};

fn ids(names: &[&str]) -> Vec<NodeId> {
    names.iter().map(|n| NodeId::from(*n)).collect()
}

fn pool<'a>(ids: &'a [NodeId], vectors: &'a [Vec<f32>]) -> Vec<PoolEntry<'a>> {
    ids.iter()
        .zip(vectors)
        .map(|(identity, vector)| PoolEntry { identity, vector })
        .collect()
}

// ============================================================================
// cosine_similarity
// ============================================================================

#[test]
fn cosine_of_parallel_and_orthogonal_vectors() {
    let same = cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]).unwrap();
    assert!((same - 1.0).abs() < 1e-6);
    let ortho = cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).unwrap();
    assert!(ortho.abs() < 1e-6);
}

#[test]
fn cosine_rejects_degenerate_input() {
    assert_eq!(cosine_similarity(&[], &[]), None);
    assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
}

// ============================================================================
// rank_by_vector
// ============================================================================

#[test]
fn ranks_best_first_and_truncates_to_k() {
    let ids = ids(&["far", "near", "mid"]);
    let vectors = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
    let ranked = rank_by_vector(&[1.0, 0.0], &pool(&ids, &vectors), 2);

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].identity, NodeId::from("near"));
    assert_eq!(ranked[1].identity, NodeId::from("mid"));
    assert!(ranked[0].score >= ranked[1].score);
}

#[test]
fn k_larger_than_pool_returns_whole_pool() {
    let ids = ids(&["a", "b"]);
    let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
    assert_eq!(rank_by_vector(&[1.0, 1.0], &pool(&ids, &vectors), 10).len(), 2);
}

#[test]
fn ties_keep_pool_order() {
    let ids = ids(&["first", "second", "third"]);
    let vectors = vec![vec![1.0, 0.0]; 3];
    let ranked = rank_by_vector(&[1.0, 0.0], &pool(&ids, &vectors), 3);
    let order: Vec<_> = ranked.iter().map(|r| r.identity.as_str()).collect();
    assert_eq!(order, vec!["first", "second", "third"]);
}

#[test]
fn unusable_vectors_score_zero() {
    let ids = ids(&["empty", "good"]);
    let vectors = vec![vec![], vec![1.0, 0.0]];
    let ranked = rank_by_vector(&[1.0, 0.0], &pool(&ids, &vectors), 2);
    assert_eq!(ranked[0].identity, NodeId::from("good"));
    assert_eq!(ranked[1].score, 0.0);
}

// ============================================================================
// SimilarityRanker
// ============================================================================

#[test]
fn ranker_embeds_query_once() {
    let embedder = StaticEmbedder::new().with("open settings", vec![1.0, 0.0]);
    let ranker = SimilarityRanker::new(&embedder);
    let ids = ids(&["search", "settings"]);
    let vectors = vec![vec![0.0, 1.0], vec![1.0, 0.1]];

    let ranked = ranker.rank("open settings", &pool(&ids, &vectors), 10).unwrap();
    assert_eq!(ranked[0].identity, NodeId::from("settings"));
    assert_eq!(embedder.calls(), 1);
}

#[test]
fn ranker_skips_embedding_for_empty_pool_or_zero_k() {
    let embedder = StaticEmbedder::new();
    let ranker = SimilarityRanker::new(&embedder);
    assert!(ranker.rank("anything", &[], 10).unwrap().is_empty());

    let ids = ids(&["a"]);
    let vectors = vec![vec![1.0]];
    assert!(ranker.rank("anything", &pool(&ids, &vectors), 0).unwrap().is_empty());
    assert_eq!(embedder.calls(), 0);
}

#[test]
fn ranker_propagates_embedding_failure() {
    let embedder = StaticEmbedder::new();
    let ranker = SimilarityRanker::new(&embedder);
    let ids = ids(&["a"]);
    let vectors = vec![vec![1.0]];
    assert!(ranker.rank("unregistered", &pool(&ids, &vectors), 5).is_err());
}

#[test]
fn ranker_rejects_pool_from_another_embedding_space() {
    let embedder = HashingEmbedder::default();
    let ranker = SimilarityRanker::new(&embedder);
    let ids = ids(&["login", "main"]);
    let vectors = vec![vec![0.0, 0.0, 0.0, 1.0], vec![1.0, 0.0, 0.0, 0.0]];

    let err = ranker.rank("main page", &pool(&ids, &vectors), 15).unwrap_err();
    match err {
        ServiceError::DimensionMismatch { query, mismatched, pool } => {
            assert_eq!(query, 256);
            assert_eq!(mismatched, 2);
            assert_eq!(pool, 2);
        }
        other => panic!("expected a dimension mismatch, got {other}"),
    }
}

#[test]
fn dimension_check_ignores_candidates_without_vectors() {
    let ids = ids(&["empty", "good", "short"]);
    let vectors = vec![vec![], vec![1.0, 0.0], vec![1.0]];
    assert!(check_dimensions(&[1.0, 0.0], &pool(&ids[..2], &vectors[..2])).is_ok());
    assert!(check_dimensions(&[1.0, 0.0], &pool(&ids, &vectors)).is_err());
}

// ============================================================================
// HashingEmbedder
// ============================================================================

#[test]
fn hashing_embedder_is_deterministic_and_word_based() {
    let emb = HashingEmbedder::default();
    let a = emb.vector("Open Settings");
    assert_eq!(a, emb.vector("open settings"));
    assert_eq!(a.len(), 256);

    let near = cosine_similarity(&a, &emb.vector("open display settings")).unwrap();
    let far = cosine_similarity(&a, &emb.vector("toggle dark mode")).unwrap_or(0.0);
    assert!(near > far);
}

#[test]
fn hashing_embedder_batches_in_order() {
    let emb = HashingEmbedder { dimensions: 32 };
    let out = emb.embed(&["one", "two"]).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0], emb.vector("one"));
    assert_eq!(emb.embed_one("two").unwrap(), emb.vector("two"));
}

#[test]
fn tokenize_splits_on_non_alphanumerics() {
    assert_eq!(tokenize("Turn ON dark-mode!"), vec!["turn", "on", "dark", "mode"]);
    assert!(tokenize("  ").is_empty());
}
