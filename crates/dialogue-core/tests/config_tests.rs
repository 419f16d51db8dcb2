use std::fs;

use dialogue_core::config::Config;

// Single test: it mutates process-wide environment variables.
#[test]
fn load_from_layers_env_file_then_app_variables() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(
        dir.join("config.toml"),
        r#"
            [data]
            keyword_model_dir = "bm25_dataset"

            [chunking]
            max_tokens = 500
            overlap_lines = 3

            [ingest]
            batch_size = 100

            [query]
            top_k = 5
        "#,
    )
    .unwrap();
    fs::write(dir.join("config.test.toml"), "[chunking]\nmax_tokens = 250\n\n[query]\ntop_k = 9\n").unwrap();
    fs::write(dir.join("config.prod.toml"), "[chunking]\nmax_tokens = 900\n").unwrap();

    std::env::set_var("RUST_ENV", "test");
    std::env::set_var("APP_INGEST__BATCH_SIZE", "42");
    std::env::set_var("APP_QUERY__TOP_K", "7");
    let config = Config::load_from(dir);
    std::env::remove_var("RUST_ENV");
    std::env::remove_var("APP_INGEST__BATCH_SIZE");
    std::env::remove_var("APP_QUERY__TOP_K");
    let config = config.unwrap();

    // overlay beats the base file, the prod overlay is ignored
    let chunking = config.chunking().unwrap();
    assert_eq!(chunking.max_tokens, 250);
    assert_eq!(chunking.overlap_lines, 3);
    // APP_* beats both files
    assert_eq!(config.ingest().unwrap().batch_size, 42);
    assert_eq!(config.query().unwrap().top_k, 7);

    assert_eq!(config.base_dir(), dir);
    let data = config.data().unwrap();
    assert_eq!(config.resolve_path(&data.keyword_model_dir), dir.join("bm25_dataset"));

    // the dev overlay does not exist here, so only the base file applies
    std::env::set_var("RUST_ENV", "dev");
    let config = Config::load_from(dir);
    std::env::remove_var("RUST_ENV");
    let config = config.unwrap();
    assert_eq!(config.chunking().unwrap().max_tokens, 500);
    assert_eq!(config.query().unwrap().top_k, 5);
}
