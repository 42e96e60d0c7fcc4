use super::*;

fn unit(
    source: &str,
    flags: &[&str],
) -> CompilationUnit {
    CompilationUnit::build(source, "/work", flags.iter().map(|f| f.to_string()).collect(), None)
        .expect("valid unit")
}

#[test]
fn empty_source_path_is_rejected() {
    let err = CompilationUnit::build("", "/work", Vec::new(), None).expect_err("empty path");
    assert_eq!(err, DescriptorError::EmptySourceFile);
}

#[test]
fn directory_source_path_is_rejected() {
    let dir = std::env::temp_dir();
    let err = CompilationUnit::build(dir.clone(), "/work", Vec::new(), None).expect_err("directory");
    assert_eq!(err, DescriptorError::Directory(dir));
}

#[test]
fn relative_source_is_joined_to_working_directory() {
    let unit = unit("src/main.cpp", &[]);
    assert_eq!(unit.source_file(), Path::new("/work/src/main.cpp"));
    assert_eq!(unit.working_directory(), Path::new("/work"));
}

#[test]
fn flags_are_kept_verbatim() {
    let unit = unit("/work/a.cc", &["-DFOO=1", "-I", "inc", "--bogus-flag"]);
    assert_eq!(unit.flags(), ["-DFOO=1", "-I", "inc", "--bogus-flag"]);
}

#[test]
fn unsaved_buffer_is_shared() {
    let content: Arc<str> = Arc::from("int x;");
    let unit = CompilationUnit::build("/work/a.c", "/work", Vec::new(), Some(content.clone())).expect("valid unit");
    assert_eq!(unit.unsaved_content(), Some("int x;"));
    let buffer = unit.unsaved_buffer().expect("buffer");
    assert!(Arc::ptr_eq(&buffer, &content));
}

#[test]
fn language_follows_extension() {
    assert_eq!(unit("a.c", &[]).language(), "c");
    assert_eq!(unit("a.C", &[]).language(), "c");
    assert_eq!(unit("a.m", &[]).language(), "objective-c");
    assert_eq!(unit("a.mm", &[]).language(), "objective-c++");
    assert_eq!(unit("a.cpp", &[]).language(), "c++");
    assert_eq!(unit("a.h", &[]).language(), "c++");
    assert_eq!(unit("noext", &[]).language(), "c++");
}

#[test]
fn headers_follow_a_c_standard_flag() {
    assert_eq!(unit("a.h", &["-std=c11"]).language(), "c");
    assert_eq!(unit("a.h", &["-std=gnu99"]).language(), "c");
    assert_eq!(unit("a.h", &["-std=c++17"]).language(), "c++");
    assert_eq!(unit("a.h", &["-std=gnu++20"]).language(), "c++");
}

#[test]
fn explicit_language_flag_is_detected() {
    assert!(unit("a.h", &["-x", "c"]).flags_specify_language());
    assert!(unit("a.h", &["-xc++"]).flags_specify_language());
    assert!(!unit("a.h", &["-Wall"]).flags_specify_language());
}
