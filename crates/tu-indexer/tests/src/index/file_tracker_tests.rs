use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use super::*;
use crate::frontend::clang_nodes::Node;
use crate::test_support::{MAIN_FILE, WORK_DIR, loc_in, parse_node, with};

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.0.lock().expect("recorder lock").clone()
    }
}

impl PreprocessorCallbacks for Recorder {
    fn file_changed(
        &mut self,
        file: Option<&str>,
    ) {
        self.0.lock().expect("recorder lock").push(format!("enter {}", file.unwrap_or("<none>")));
    }

    fn inclusion_directive(
        &mut self,
        includer: &str,
        included: &str,
    ) {
        self.0.lock().expect("recorder lock").push(format!("include {included} from {includer}"));
    }
}

fn node_at(loc: Value) -> Node {
    parse_node(json!({
        "id": "0x1",
        "kind": "TranslationUnitDecl",
        "loc": loc,
        "range": { "begin": {}, "end": {} }
    }))
}

fn observe(
    tracker: &mut FileTracker<'_>,
    map: &LocationMap,
    loc: Value,
) {
    let node = node_at(loc);
    if let Some(loc) = node.kind.loc() {
        tracker.observe(loc, map);
    }
}

fn map() -> LocationMap {
    LocationMap::new(std::path::Path::new(MAIN_FILE), std::path::Path::new(WORK_DIR))
}

#[test]
fn file_changes_are_reported_once_per_switch() {
    let recorder = Recorder::default();
    let mut tracker = FileTracker::with_downstream(Box::new(recorder.clone()));
    let map = map();

    observe(&mut tracker, &map, loc_in(MAIN_FILE, 1, 1));
    observe(&mut tracker, &map, loc_in(MAIN_FILE, 2, 1));
    let header = with(loc_in("/fixture/util.h", 1, 5), json!({ "includedFrom": { "file": MAIN_FILE } }));
    observe(&mut tracker, &map, header);
    observe(&mut tracker, &map, loc_in(MAIN_FILE, 9, 1));

    assert_eq!(
        recorder.events(),
        vec![
            "enter /fixture/main.cpp",
            "include /fixture/util.h from /fixture/main.cpp",
            "enter /fixture/util.h",
            "enter /fixture/main.cpp",
        ]
    );
    assert_eq!(tracker.current_file(), Some(MAIN_FILE));
}

#[test]
fn relative_spellings_resolve_against_the_working_directory() {
    let mut tracker = FileTracker::new();
    let map = map();

    observe(&mut tracker, &map, loc_in("inc/config.h", 3, 1));
    assert_eq!(tracker.current_file(), Some("/fixture/inc/config.h"));
}

#[test]
fn locations_without_a_file_are_ignored() {
    let recorder = Recorder::default();
    let mut tracker = FileTracker::with_downstream(Box::new(recorder.clone()));
    let map = map();

    observe(&mut tracker, &map, json!({}));
    assert_eq!(tracker.current_file(), None);
    assert!(recorder.events().is_empty());
}

#[test]
fn synthetic_boundaries_clear_the_current_file() {
    let recorder = Recorder::default();
    let mut tracker = FileTracker::with_downstream(Box::new(recorder.clone()));
    let map = map();

    observe(&mut tracker, &map, loc_in(MAIN_FILE, 1, 1));
    tracker.file_changed(None);
    tracker.file_changed(Some(""));

    assert_eq!(tracker.current_file(), None);
    assert_eq!(recorder.events(), vec!["enter /fixture/main.cpp", "enter <none>", "enter <none>"]);
}
