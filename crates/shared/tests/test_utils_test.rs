//! test_utils 模块的集成测试

use std::collections::HashSet;

use suministros_shared::test_utils::*;

#[test]
fn test_unique_suffix_under_parallel_use() {
    let handles: Vec<_> = (0..4)
        .map(|_| std::thread::spawn(|| (0..200).map(|_| unique_suffix()).collect::<Vec<_>>()))
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for value in handle.join().unwrap() {
            seen.insert(value);
        }
    }
    assert_eq!(seen.len(), 800);
}

#[test]
fn test_database_config_defaults() {
    let config = test_database_config();
    assert!(config.url.starts_with("postgres://"));
    assert_eq!(config.max_connections, 5);
}
