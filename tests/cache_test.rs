use chat_toxicity::cache::AnalysisCache;
use chat_toxicity::models::{AnalysisRequest, AnalysisResult, SenderType};
use tempfile::TempDir;

fn batch(texts: &[&str]) -> Vec<AnalysisRequest> {
    texts
        .iter()
        .map(|text| AnalysisRequest {
            text: (*text).to_string(),
            sender_type: SenderType::Other,
        })
        .collect()
}

fn scored(toxicity: f64) -> AnalysisResult {
    AnalysisResult {
        toxicity_score: toxicity,
        sentiment_score: -toxicity,
        flags: vec!["insult".to_string()],
    }
}

#[test]
fn test_put_then_get() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let cache = AnalysisCache::open(dir.path(), "model-a").expect("open");

    let requests = batch(&["you never listen", "fine"]);
    assert!(cache.get(&requests).expect("get").is_none());

    let results = vec![scored(0.7), scored(0.1)];
    cache.put(&requests, &results).expect("put");

    assert_eq!(cache.get(&requests).expect("get"), Some(results));
    assert!(cache.cached_at(&requests).expect("cached_at").is_some());
}

#[test]
fn test_key_depends_on_sender_and_order() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let cache = AnalysisCache::open(dir.path(), "model-a").expect("open");

    let requests = batch(&["a", "b"]);
    cache.put(&requests, &[scored(0.2), scored(0.3)]).expect("put");

    assert!(cache.get(&batch(&["b", "a"])).expect("get").is_none());

    let mut as_self = requests.clone();
    as_self[0].sender_type = SenderType::Me;
    assert!(cache.get(&as_self).expect("get").is_none());
}

#[test]
fn test_entries_are_scoped_to_model() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let requests = batch(&["hello"]);

    {
        let cache = AnalysisCache::open(dir.path(), "model-a").expect("open");
        cache.put(&requests, &[scored(0.5)]).expect("put");
    }

    let other_model = AnalysisCache::open(dir.path(), "model-b").expect("reopen");
    assert!(other_model.get(&requests).expect("get").is_none());
}

#[test]
fn test_mismatched_entry_is_ignored() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let cache = AnalysisCache::open(dir.path(), "model-a").expect("open");

    let requests = batch(&["one", "two"]);
    cache.put(&requests, &[scored(0.4)]).expect("put");

    assert!(cache.get(&requests).expect("get").is_none());
}

#[test]
fn test_clear() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let cache = AnalysisCache::open(dir.path(), "model-a").expect("open");

    let requests = batch(&["x"]);
    cache.put(&requests, &[scored(0.9)]).expect("put");
    cache.clear().expect("clear");

    assert!(cache.get(&requests).expect("get").is_none());
}
