use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::test_support::{clang_json, decl, tu, with};

fn unique_temp_dir(name: &str) -> PathBuf {
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("valid clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("tu-indexer-driver-{name}-{}-{nonce}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// A stand-in front-end: a shell script run through `sh`, so the script
/// itself never needs to be executable. It records its arguments and stdin
/// next to itself and prints `stdout`/`stderr` verbatim.
fn fake_front_end(
    dir: &Path,
    stdout: &str,
    stderr: &str,
    status: i32,
) -> (FrontEnd, String) {
    std::fs::write(dir.join("stdout.txt"), stdout).expect("write stdout");
    std::fs::write(dir.join("stderr.txt"), stderr).expect("write stderr");
    let script = dir.join("fake-clang.sh");
    let body = format!(
        "#!/bin/sh\nd='{dir}'\necho \"$@\" > \"$d/args.txt\"\ncat > \"$d/stdin.txt\"\ncat \"$d/stdout.txt\"\ncat \"$d/stderr.txt\" >&2\nexit {status}\n",
        dir = dir.display()
    );
    std::fs::write(&script, body).expect("write script");
    (FrontEnd::new("sh"), script.display().to_string())
}

fn ast_with_variable(file: &str) -> String {
    let var = with(
        decl("0x10", "VarDecl", "answer", 1, 5, vec![]),
        json!({ "type": { "qualType": "int" } }),
    );
    let mut root = tu(vec![var]);
    root["inner"][0]["loc"]["file"] = json!(file);
    root["inner"][0]["range"]["begin"]["file"] = json!(file);
    root["inner"][0]["range"]["end"]["file"] = json!(file);
    clang_json(&root)
}

#[tokio::test]
async fn missing_source_fails_without_spawning() {
    let dir = unique_temp_dir("missing");
    let unit = CompilationUnit::build(dir.join("absent.c"), &dir, Vec::new(), None).expect("valid unit");
    let err = FrontEnd::new("/definitely/not/clang").parse(&unit).await.expect_err("missing file");
    assert!(matches!(err, ParseFailure::FileNotFound(_)));
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn unavailable_front_end_is_a_spawn_failure() {
    let dir = unique_temp_dir("spawn");
    let source = dir.join("main.c");
    std::fs::write(&source, "int main(void) { return 0; }\n").expect("write source");
    let unit = CompilationUnit::build(&source, &dir, Vec::new(), None).expect("valid unit");

    let front_end = FrontEnd::new("/definitely/not/clang");
    assert!(!front_end.is_available().await);
    let err = front_end.parse(&unit).await.expect_err("spawn fails");
    assert!(matches!(err, ParseFailure::Spawn { .. }), "{err}");
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[tokio::test]
async fn parses_the_ast_on_stdout() {
    let dir = unique_temp_dir("ok");
    let source = dir.join("main.c");
    std::fs::write(&source, "int answer;\n").expect("write source");
    let source_text = source.display().to_string();
    let (front_end, script) = fake_front_end(&dir, &ast_with_variable(&source_text), "", 0);
    let unit = CompilationUnit::build(&source, &dir, vec![script], None).expect("valid unit");

    let before = parse_counter();
    let parsed = front_end.parse(&unit).await.expect("parses");
    assert!(parse_counter() > before);
    assert_eq!(parsed.decls().len(), 2);
    assert!(parsed.diagnostics().is_empty());

    let args = std::fs::read_to_string(dir.join("args.txt")).expect("args recorded");
    assert!(args.contains("-ast-dump=json"));
    assert!(args.trim_end().ends_with(&source_text));
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[tokio::test]
async fn unsaved_content_is_piped_and_stdin_locations_remapped() {
    let dir = unique_temp_dir("unsaved");
    let source = dir.join("never-written.cpp");
    let (front_end, script) = fake_front_end(&dir, &ast_with_variable("<stdin>"), "", 0);
    let unit = CompilationUnit::build(&source, &dir, vec![script], Some(Arc::from("int answer = 42;\n")))
        .expect("valid unit");

    let parsed = front_end.parse(&unit).await.expect("parses");
    assert!(!source.exists(), "the source file is never written");

    let fed = std::fs::read_to_string(dir.join("stdin.txt")).expect("stdin recorded");
    assert_eq!(fed, "int answer = 42;\n");
    let args = std::fs::read_to_string(dir.join("args.txt")).expect("args recorded");
    assert!(args.contains("-x c++ -"));

    let var = parsed.decls().iter().find(|d| d.name.as_deref() == Some("answer")).expect("variable");
    let location = var.location.as_ref().expect("location");
    assert_eq!(location.file, parsed.primary());
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[tokio::test]
async fn fatal_diagnostic_fails_the_parse() {
    let dir = unique_temp_dir("fatal");
    let source = dir.join("main.c");
    std::fs::write(&source, "#include \"missing.h\"\n").expect("write source");
    let stderr = format!("{}:1:10: fatal error: 'missing.h' file not found\n", source.display());
    let (front_end, script) = fake_front_end(&dir, "", &stderr, 1);
    let unit = CompilationUnit::build(&source, &dir, vec![script], None).expect("valid unit");

    match front_end.parse(&unit).await {
        Err(ParseFailure::Fatal { message, .. }) => assert_eq!(message, "'missing.h' file not found"),
        other => panic!("expected fatal failure, got {other:?}"),
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[tokio::test]
async fn non_fatal_errors_keep_the_partial_ast() {
    let dir = unique_temp_dir("partial");
    let source = dir.join("main.c");
    std::fs::write(&source, "int answer = nope;\n").expect("write source");
    let source_text = source.display().to_string();
    let stderr = format!("{source_text}:1:14: error: use of undeclared identifier 'nope'\n");
    let (front_end, script) = fake_front_end(&dir, &ast_with_variable(&source_text), &stderr, 1);
    let unit = CompilationUnit::build(&source, &dir, vec![script], None).expect("valid unit");

    let parsed = front_end.parse(&unit).await.expect("partial AST is usable");
    assert_eq!(parsed.diagnostics().len(), 1);
    assert_eq!(parsed.diagnostics()[0].severity, Severity::Error);
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[tokio::test]
async fn output_that_is_not_an_ast_is_rejected() {
    let dir = unique_temp_dir("noast");
    let source = dir.join("main.c");
    std::fs::write(&source, "int x;\n").expect("write source");
    let (front_end, script) = fake_front_end(&dir, "clang version 18.1.0\n", "clang: error: unknown argument\n", 1);
    let unit = CompilationUnit::build(&source, &dir, vec![script], None).expect("valid unit");

    match front_end.parse(&unit).await {
        Err(ParseFailure::NoAst { summary, .. }) => assert_eq!(summary, "clang: error: unknown argument"),
        other => panic!("expected missing AST, got {other:?}"),
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[tokio::test]
async fn malformed_json_is_a_deserialize_failure() {
    let dir = unique_temp_dir("malformed");
    let source = dir.join("main.c");
    std::fs::write(&source, "int x;\n").expect("write source");
    let (front_end, script) = fake_front_end(&dir, "{\"id\": \"0x1\", \"kind\": ", "", 0);
    let unit = CompilationUnit::build(&source, &dir, vec![script], None).expect("valid unit");

    let err = front_end.parse(&unit).await.expect_err("truncated json");
    assert!(matches!(err, ParseFailure::Deserialize(_)), "{err}");
    let _ = std::fs::remove_dir_all(&dir);
}
