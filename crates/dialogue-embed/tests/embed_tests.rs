use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use dialogue_core::config::{EmbeddingConfig, EmbeddingProvider};
use dialogue_core::traits::{Embedder, TokenCounter};
use dialogue_core::Error;
use dialogue_embed::{get_default_embedder, HfTokenCounter, OpenAiEmbedder};

#[test]
fn fake_embedder_shapes_and_determinism() {
    let config = EmbeddingConfig { provider: EmbeddingProvider::Fake, dimension: 64, ..Default::default() };
    let embedder = get_default_embedder(&config).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string(), "goodbye moon".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");

    assert_eq!(embs.len(), 3);
    assert_eq!(embedder.dim(), 64);
    assert!(embs.iter().all(|v| v.len() == 64));
    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    assert_eq!(embs[0], embs[1]);
}

/// Serves the given HTTP responses in order, one per connection.
fn serve(responses: Vec<(u16, String)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap();
                }
            }
            let mut req_body = vec![0u8; content_length];
            reader.read_exact(&mut req_body).unwrap();
            let reply = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).unwrap();
        }
    });
    format!("http://{addr}")
}

fn client(base_url: &str, max_retries: usize) -> OpenAiEmbedder {
    OpenAiEmbedder::new("sk-test".into(), base_url, "text-embedding-3-small".into(), 2, Duration::from_secs(5), max_retries, 16)
        .unwrap()
}

#[test]
fn openai_results_are_reordered_by_index() {
    let body = r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#;
    let url = serve(vec![(200, body.to_string())]);
    let out = client(&url, 1).embed_batch(&["first".to_string(), "second".to_string()]).unwrap();
    assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[test]
fn openai_retries_server_errors() {
    let ok = r#"{"data":[{"index":0,"embedding":[0.5,0.5]}]}"#;
    let url = serve(vec![(503, "{}".to_string()), (200, ok.to_string())]);
    let out = client(&url, 3).embed_batch(&["retry me".to_string()]).unwrap();
    assert_eq!(out, vec![vec![0.5, 0.5]]);
}

#[test]
fn openai_count_mismatch_is_encoding_error() {
    let body = r#"{"data":[{"index":0,"embedding":[0.5,0.5]}]}"#;
    let url = serve(vec![(200, body.to_string())]);
    let err = client(&url, 1).embed_batch(&["a".to_string(), "b".to_string()]).unwrap_err();
    assert!(matches!(err, Error::EncodingService(_)), "got {err:?}");
}

#[test]
fn openai_wrong_dimension_is_encoding_error() {
    let body = r#"{"data":[{"index":0,"embedding":[0.5,0.5,0.5]}]}"#;
    let url = serve(vec![(200, body.to_string())]);
    let err = client(&url, 1).embed_batch(&["a".to_string()]).unwrap_err();
    assert!(matches!(err, Error::EncodingService(_)));
}

#[test]
fn hf_counter_counts_tokenizer_ids() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("tokenizer.json");
    let json = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": { "type": "WordLevel", "vocab": { "[UNK]": 0, "hello": 1, "world": 2 }, "unk_token": "[UNK]" }
    }"#;
    std::fs::write(&path, json).unwrap();
    let counter = HfTokenCounter::from_file(&path).unwrap();
    assert_eq!(counter.count("hello world again"), 3);
}

#[test]
fn hf_counter_ignores_truncation_in_tokenizer_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("tokenizer.json");
    let json = r#"{
        "version": "1.0",
        "truncation": { "direction": "Right", "max_length": 2, "strategy": "LongestFirst", "stride": 0 },
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": { "type": "WordLevel", "vocab": { "[UNK]": 0, "hello": 1, "world": 2 }, "unk_token": "[UNK]" }
    }"#;
    std::fs::write(&path, json).unwrap();
    let counter = HfTokenCounter::from_file(&path).unwrap();
    assert_eq!(counter.count("hello world again"), 3);
}
