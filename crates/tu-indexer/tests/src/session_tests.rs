use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use super::*;
use crate::index::{Fact, JsonLinesSink};
use crate::test_support::{add_function, clang_json, decl, loc_in, parse_unit, range, symbols, tu, with};

fn unique_temp_dir(name: &str) -> PathBuf {
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("valid clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("tu-indexer-session-{name}-{}-{nonce}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// `int answer;` declared in `file`.
fn variable_in(file: &str) -> Value {
    let var = with(
        decl("0x10", "VarDecl", "answer", 1, 5, vec![]),
        json!({
            "loc": loc_in(file, 1, 5),
            "range": range(loc_in(file, 1, 1), loc_in(file, 1, 5)),
            "type": { "qualType": "int" }
        }),
    );
    tu(vec![var])
}

/// Front-end stand-in that prints `ast` and exits successfully.
fn printing_front_end(
    dir: &Path,
    ast: &str,
) -> (FrontEnd, String) {
    std::fs::write(dir.join("ast.json"), ast).expect("write ast");
    let script = dir.join("fake-clang.sh");
    let body = format!("#!/bin/sh\ncat > /dev/null\ncat '{}'\n", dir.join("ast.json").display());
    std::fs::write(&script, body).expect("write script");
    (FrontEnd::new("sh"), script.display().to_string())
}

#[test]
fn parsed_units_are_walked_into_the_given_sink() {
    let unit = parse_unit(tu(vec![add_function()]));
    let outcome = index_parsed(&unit, IndexOptions::default(), AbortHandle::new(), Vec::<Fact>::new());

    assert_eq!(outcome.stats.symbols, 1);
    assert_eq!(outcome.stats.references, 0);
    assert!(!outcome.stats.aborted);
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(symbols(&outcome.sink)[0].qualified_name, "add");
}

#[test]
fn json_lines_sink_writes_one_line_per_fact() {
    let unit = parse_unit(tu(vec![add_function()]));
    let options = IndexOptions {
        index_locals: true,
        ..IndexOptions::default()
    };
    let outcome = index_parsed(&unit, options, AbortHandle::new(), JsonLinesSink::new(Vec::new()));

    let written = outcome.sink.written();
    let bytes = outcome.sink.finish().expect("in-memory writes succeed");
    let text = String::from_utf8(bytes).expect("utf-8 output");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), written);
    assert_eq!(written, outcome.stats.symbols + outcome.stats.references);
    for line in lines {
        let value: Value = serde_json::from_str(line).expect("each line is a JSON object");
        assert!(value.is_object());
    }
}

#[test]
fn aborted_walk_reports_it() {
    let unit = parse_unit(tu(vec![add_function()]));
    let abort = AbortHandle::new();
    abort.abort();
    let outcome = index_parsed(&unit, IndexOptions::default(), abort, Vec::<Fact>::new());

    assert!(outcome.stats.aborted);
    assert!(outcome.sink.is_empty());
}

#[tokio::test]
async fn parse_failures_propagate() {
    let dir = unique_temp_dir("missing");
    let unit = CompilationUnit::build(dir.join("absent.c"), &dir, Vec::new(), None).expect("valid unit");

    let front_end = FrontEnd::new("sh");
    let result = index_unit(&front_end, &unit, IndexOptions::default(), AbortHandle::new(), Vec::<Fact>::new()).await;
    assert!(matches!(result, Err(ParseFailure::FileNotFound(_))));
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[tokio::test]
async fn units_are_parsed_then_walked() {
    let dir = unique_temp_dir("walk");
    let source = dir.join("main.c");
    std::fs::write(&source, "int answer;\n").expect("write source");
    let (front_end, script) = printing_front_end(&dir, &clang_json(&variable_in(&source.display().to_string())));
    let unit = CompilationUnit::build(&source, &dir, vec![script], None).expect("valid unit");

    let outcome = index_unit(&front_end, &unit, IndexOptions::default(), AbortHandle::new(), Vec::<Fact>::new())
        .await
        .expect("indexes");
    let found = symbols(&outcome.sink);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].qualified_name, "answer");
    assert!(found[0].is_definition);
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[tokio::test]
async fn abort_before_traversal_skips_the_walk() {
    let dir = unique_temp_dir("abort");
    let source = dir.join("main.c");
    std::fs::write(&source, "int answer;\n").expect("write source");
    let (front_end, script) = printing_front_end(&dir, &clang_json(&variable_in(&source.display().to_string())));
    let unit = CompilationUnit::build(&source, &dir, vec![script], None).expect("valid unit");
    let abort = AbortHandle::new();
    abort.abort();

    let outcome = index_unit(&front_end, &unit, IndexOptions::default(), abort, Vec::<Fact>::new())
        .await
        .expect("parse still succeeds");
    assert!(outcome.stats.aborted);
    assert!(outcome.sink.is_empty());
    let _ = std::fs::remove_dir_all(&dir);
}
