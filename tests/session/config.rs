use std::io::Write;
use vellum::prelude::*;
use vellum::Options;

#[test]
fn test_load_options_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
dialect = "mysql"
cache_db = true
cache_db_collections = false
cache_db_expires = 60
debug = true
"#
    )
    .unwrap();

    let options = Options::load(file.path()).unwrap();
    assert_eq!(options.dialect, Dialect::MySQL);
    assert!(options.cache_db);
    assert!(!options.caches_collections());
    assert_eq!(options.cache_ttl(), Some(std::time::Duration::from_secs(60)));
    assert!(options.debug);
    assert_eq!(options.cache_db_key, "db");
}

#[test]
fn test_load_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("vellum.toml");
    assert!(matches!(Options::load(&missing), Err(VellumError::Config(_))));

    std::fs::write(&missing, "cache_db = \"sometimes\"").unwrap();
    assert!(matches!(Options::load(&missing), Err(VellumError::Config(_))));
}
