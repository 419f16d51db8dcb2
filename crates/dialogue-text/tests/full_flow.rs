use dialogue_core::error::Error;
use dialogue_core::traits::SparseEncoder;
use dialogue_text::KeywordModelStore;
use tempfile::TempDir;

fn corpus() -> Vec<String> {
    vec![
        "Bazinga! I was joking about the hair".to_string(),
        "Knock knock knock Penny".to_string(),
        "Our babies will be smart and beautiful".to_string(),
    ]
}

#[test]
fn train_then_load_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let store = KeywordModelStore::new(tmp.path().join("bm25_dataset"));

    let trained = store.train("the_big_bang_theory", &corpus()).expect("train");
    assert!(store.exists("the_big_bang_theory"));
    assert_eq!(store.model_path("the_big_bang_theory"), tmp.path().join("bm25_dataset/the_big_bang_theory/model.json"));

    let loaded = store.load("the_big_bang_theory").expect("load");
    assert_eq!(loaded, trained);

    let query = loaded.encode_query("knock penny").unwrap();
    let docs = loaded.encode_documents(&corpus()).unwrap();
    let best = docs
        .iter()
        .enumerate()
        .max_by(|a, b| query.dot(a.1).total_cmp(&query.dot(b.1)))
        .map(|(i, _)| i);
    assert_eq!(best, Some(1));
}

#[test]
fn missing_model_is_model_not_found() {
    let tmp = TempDir::new().unwrap();
    let store = KeywordModelStore::new(tmp.path());
    match store.load("the_big_bang_theory") {
        Err(Error::ModelNotFound { source_id, .. }) => assert_eq!(source_id, "the_big_bang_theory"),
        other => panic!("expected ModelNotFound, got {other:?}"),
    }
}

#[test]
fn empty_corpus_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let store = KeywordModelStore::new(tmp.path());
    let err = store.train("silent_movie", &[]).unwrap_err();
    assert!(matches!(err, Error::EmptyCorpus(_)));
    assert!(!store.exists("silent_movie"));
}

#[test]
fn retraining_replaces_the_model() {
    let tmp = TempDir::new().unwrap();
    let store = KeywordModelStore::new(tmp.path());
    store.train("friends", &corpus()).unwrap();
    let second = store.train("friends", &corpus()[..1]).unwrap();
    assert_eq!(store.load("friends").unwrap().n_docs, 1);
    assert_eq!(second.n_docs, 1);
}

#[test]
fn corrupt_model_file_is_a_decode_error() {
    let tmp = TempDir::new().unwrap();
    let store = KeywordModelStore::new(tmp.path());
    let path = store.model_path("lost");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(store.load("lost"), Err(Error::Decode { .. })));
}
