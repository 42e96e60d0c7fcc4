use std::path::PathBuf;

use super::*;

fn unique_temp_dir(name: &str) -> PathBuf {
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("valid clock")
        .as_nanos();
    std::env::temp_dir().join(format!("tu-indexer-config-{name}-{}-{nonce}", std::process::id()))
}

#[test]
fn parses_all_sections() {
    let text = r#"
        [compiler]
        clang_path = "/usr/bin/clang-18"
        std = "c++20"
        include_paths = ["/opt/include", " include "]
        defines = ["NDEBUG", "LEVEL=2"]
        pre_includes = ["config.h"]
        extra_flags = ["-fms-extensions"]

        [indexing]
        index_locals = true
        type_uses = true
        max_type_depth = 48
        extensions = ["cpp", ".H", "cpp"]
        timeout_secs = 30

        [logging]
        level = "debug"

        [thread_pool]
        worker_threads = 3
    "#;

    let settings = Settings::from_toml_str(text).expect("valid toml");
    assert_eq!(settings.compiler.clang_path, "/usr/bin/clang-18");
    assert_eq!(settings.compiler.std.as_deref(), Some("c++20"));
    assert_eq!(settings.compiler.include_paths, vec!["/opt/include", "include"]);
    assert_eq!(settings.compiler.defines, vec!["NDEBUG", "LEVEL=2"]);
    assert_eq!(settings.compiler.pre_includes, vec!["config.h"]);
    assert_eq!(settings.compiler.extra_flags, vec!["-fms-extensions"]);
    assert!(settings.indexing.index_locals);
    assert!(settings.indexing.type_uses);
    assert_eq!(settings.indexing.max_type_depth, 48);
    assert_eq!(settings.indexing.extensions, vec!["cpp", "h"]);
    assert_eq!(settings.indexing.timeout(), Some(std::time::Duration::from_secs(30)));
    assert_eq!(settings.logging.level, LogLevel::Debug);
    assert_eq!(settings.thread_pool.worker_threads, 3);
}

#[test]
fn empty_document_yields_defaults() {
    let settings = Settings::from_toml_str("").expect("valid toml");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.compiler.clang_path, "clang");
    assert_eq!(settings.logging.level, LogLevel::Info);
    assert!(!settings.indexing.index_locals);
    assert_eq!(settings.indexing.extensions, DEFAULT_EXTENSIONS);
}

#[test]
fn unknown_keys_are_ignored() {
    let text = r#"
        editor = "vim"

        [compiler]
        sysroot = "/nowhere"
        std = "c11"

        [plugins]
        enabled = true
    "#;

    let settings = Settings::from_toml_str(text).expect("unknown keys tolerated");
    assert_eq!(settings.compiler.std.as_deref(), Some("c11"));
}

#[test]
fn mistyped_values_are_rejected() {
    let text = "[indexing]\nindex_locals = \"yes\"\n";
    assert!(Settings::from_toml_str(text).is_err());
}

#[test]
fn clamps_numeric_values() {
    let low = Settings::from_toml_str("[indexing]\nmax_type_depth = 1\n[thread_pool]\nworker_threads = 1000\n")
        .expect("valid toml");
    assert_eq!(low.indexing.max_type_depth, MIN_MAX_TYPE_DEPTH);
    assert_eq!(low.thread_pool.worker_threads, MAX_WORKER_THREADS);

    let high = Settings::from_toml_str("[indexing]\nmax_type_depth = 100000\ntimeout_secs = 0\n").expect("valid toml");
    assert_eq!(high.indexing.max_type_depth, MAX_MAX_TYPE_DEPTH);
    assert_eq!(high.indexing.timeout(), None);
}

#[test]
fn zero_worker_threads_resolves_to_available_cores() {
    let settings = Settings::from_toml_str("[thread_pool]\nworker_threads = 0\n").expect("valid toml");
    assert_eq!(settings.thread_pool.worker_threads, 0);
    let resolved = settings.thread_pool.resolved_worker_threads();
    assert!((MIN_WORKER_THREADS..=MAX_WORKER_THREADS).contains(&resolved));
}

#[test]
fn blank_clang_path_falls_back_to_default() {
    let settings = Settings::from_toml_str("[compiler]\nclang_path = \"   \"\nstd = \"\"\n").expect("valid toml");
    assert_eq!(settings.compiler.clang_path, "clang");
    assert_eq!(settings.compiler.std, None);
}

#[test]
fn compiler_flags_follow_fixed_order() {
    let compiler = CompilerSettings {
        std: Some("c++17".to_string()),
        include_paths: vec!["/inc".to_string()],
        defines: vec!["A=1".to_string()],
        pre_includes: vec!["pre.h".to_string()],
        extra_flags: vec!["-Wall".to_string()],
        ..CompilerSettings::default()
    };
    assert_eq!(compiler.flags(), vec!["-std=c++17", "-DA=1", "-I/inc", "-include", "pre.h", "-Wall"]);
}

#[test]
fn indexing_settings_map_to_traversal_options() {
    let settings = Settings::from_toml_str("[indexing]\ntype_uses = true\nmax_type_depth = 8\n").expect("valid toml");
    let options = settings.indexing.index_options();
    assert!(options.type_uses);
    assert!(!options.index_locals);
    assert_eq!(options.max_type_depth, 8);
    assert!(settings.indexing.matches_extension("CPP"));
    assert!(!settings.indexing.matches_extension("txt"));
}

#[test]
fn log_level_is_raised_per_verbosity_step() {
    assert_eq!(LogLevel::Info.raised(0), LogLevel::Info);
    assert_eq!(LogLevel::Info.raised(1), LogLevel::Debug);
    assert_eq!(LogLevel::Warn.raised(9), LogLevel::Trace);
    assert_eq!(LogLevel::Error.as_filter(), "error");
}

#[test]
fn discovers_config_in_parent_directory() {
    let root = unique_temp_dir("discover");
    let nested = root.join("src").join("deep");
    std::fs::create_dir_all(&nested).expect("create dirs");
    std::fs::write(root.join(CONFIG_FILE_NAME), "[indexing]\nindex_locals = true\n").expect("write config");
    let source = nested.join("main.cpp");
    std::fs::write(&source, "int main() { return 0; }\n").expect("write source");

    assert_eq!(find_config(&source), Some(root.join(CONFIG_FILE_NAME)));
    let (settings, path) = Settings::discover(&nested).expect("loads");
    assert_eq!(path, Some(root.join(CONFIG_FILE_NAME)));
    assert!(settings.indexing.index_locals);

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn load_reports_the_offending_path() {
    let root = unique_temp_dir("invalid");
    std::fs::create_dir_all(&root).expect("create dir");
    let path = root.join(CONFIG_FILE_NAME);
    std::fs::write(&path, "[indexing\n").expect("write config");

    let err = Settings::load(&path).expect_err("invalid toml");
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains(CONFIG_FILE_NAME));

    let missing = Settings::load(&root.join("absent.toml")).expect_err("missing file");
    assert!(matches!(missing, ConfigError::Read { .. }));

    let _ = std::fs::remove_dir_all(&root);
}
