use serde_json::json;

use super::*;
use crate::test_support::{decl, decl_table, id, loc, tag_decl, tu, type_decls, typedef, with};

fn qual_type(
    spelling: &str,
    desugared: Option<&str>,
    alias: Option<Id>,
) -> clang_nodes::QualType {
    clang_nodes::QualType {
        qual_type: Some(spelling.to_owned()),
        desugared_qual_type: desugared.map(str::to_owned),
        type_alias_decl_id: alias,
    }
}

#[test]
fn structurally_equal_types_share_an_id() {
    let decls = decl_table(type_decls());
    let mut types = TypeTable::new(&decls);

    let first = types.from_spelling("node_t *");
    let second = types.from_spelling("node_t *");
    assert_eq!(first, second);
    assert_ne!(types.from_spelling("int").ty, types.from_spelling("long").ty);

    let before = types.len();
    types.from_spelling("node_t *");
    assert_eq!(types.len(), before);
}

#[test]
fn typedef_chains_desugar_one_layer_at_a_time() {
    let decls = decl_table(type_decls());
    let mut types = TypeTable::new(&decls);
    let record = Type::Record {
        decl: id("0x10"),
        tag: Some(TagKind::Struct),
        cxx: false,
    };

    let handle = types.from_spelling("handle_t");
    assert!(matches!(types.get(handle.ty), Type::Typedef { decl, .. } if *decl == id("0x12")));
    let node_t = types.desugar(handle);
    assert!(matches!(types.get(node_t.ty), Type::Typedef { decl, .. } if *decl == id("0x11")));
    let elaborated = types.desugar(node_t);
    assert!(matches!(types.get(elaborated.ty), Type::Elaborated { tag: TagKind::Struct, .. }));

    let stripped = types.strip_sugar(handle);
    assert_eq!(types.get(stripped.ty), &record);
    assert_eq!(types.canonical(handle), stripped);
}

#[test]
fn qualifiers_survive_desugaring() {
    let decls = decl_table(type_decls());
    let mut types = TypeTable::new(&decls);

    let ty = types.from_spelling("const node_t");
    assert!(ty.quals.is_const);
    let canonical = types.canonical(ty);
    assert!(canonical.quals.is_const);
    assert!(matches!(types.get(canonical.ty), Type::Record { .. }));
    assert!(types.canonical_unqualified(ty).quals.is_empty());
}

#[test]
fn canonicalization_rebuilds_compound_types() {
    let decls = decl_table(type_decls());
    let mut types = TypeTable::new(&decls);

    let sugared = types.from_spelling("handle_t *");
    let elaborated = types.from_spelling("struct node *");
    assert_ne!(sugared, elaborated);
    let canonical = types.canonical(sugared);
    assert_eq!(canonical, types.canonical(elaborated));
    assert_ne!(canonical, elaborated, "the pointee loses its `struct` elaboration");

    let builtin = types.from_spelling("int");
    assert_eq!(types.canonical(builtin), builtin);
}

#[test]
fn records_are_classified_by_tag_and_language() {
    let decls = decl_table(type_decls());
    let mut types = TypeTable::new(&decls);

    let node = types.from_spelling("struct node");
    let value = types.from_spelling("union value");
    let widget = types.from_spelling("Widget");
    let widget_ref = types.from_spelling("const Widget &");

    assert_eq!(types.as_structure(node), Some(id("0x10")));
    assert_eq!(types.as_union(node), None);
    assert_eq!(types.as_cxx_record(node), None);
    assert_eq!(types.as_union(value), Some(id("0x13")));
    assert_eq!(types.as_structure(value), None);
    assert_eq!(types.as_cxx_record(widget), Some(id("0x16")));
    assert_eq!(types.as_structure(widget), None, "declared with `class`");
    assert_eq!(types.pointee_cxx_record(widget_ref), Some(id("0x16")));
    assert!(types.is_reference(widget_ref));
    assert!(!types.is_pointer(widget_ref));
}

#[test]
fn pointee_looks_through_sugar() {
    let decls = decl_table(tu(vec![
        tag_decl("0x10", "RecordDecl", "node", 1, "struct", vec![]),
        typedef("0x20", "node_ptr", 2, "struct node *"),
    ]));
    let mut types = TypeTable::new(&decls);

    let int = types.from_spelling("int");
    assert_eq!(types.pointee(int), None);

    let ptr = types.from_spelling("node_ptr");
    assert!(types.is_pointer(ptr));
    let pointee = types.pointee(ptr).expect("pointer type");
    assert_eq!(types.as_structure(pointee), Some(id("0x10")));
}

#[test]
fn enums_are_not_records() {
    let decls = decl_table(type_decls());
    let mut types = TypeTable::new(&decls);

    let color = types.from_spelling("enum color");
    let stripped = types.strip_sugar(color);
    assert_eq!(types.get(stripped.ty), &Type::Enum { decl: id("0x14") });
    assert_eq!(types.as_structure(color), None);
    assert_eq!(types.as_cxx_record(color), None);
}

#[test]
fn template_specializations_name_their_template() {
    let decls = decl_table(type_decls());
    let mut types = TypeTable::new(&decls);

    let vec = types.from_spelling("Vec<int>");
    assert_eq!(types.as_template_specialization(vec), Some(Some(id("0x17"))));
    let missing = types.from_spelling("Missing<char>");
    assert_eq!(types.as_template_specialization(missing), Some(None));
    let int = types.from_spelling("int");
    assert_eq!(types.as_template_specialization(int), None);
}

#[test]
fn alias_template_specializations_are_sugar() {
    let param = with(decl("0x31", "TemplateTypeParmDecl", "T", 1, 20, vec![]), json!({ "tagUsed": "class" }));
    let pattern = with(decl("0x32", "TypeAliasDecl", "Ptr", 1, 29, vec![]), json!({ "type": { "qualType": "T *" } }));
    let decls = decl_table(tu(vec![decl("0x30", "TypeAliasTemplateDecl", "Ptr", 1, 1, vec![param, pattern])]));
    let mut types = TypeTable::new(&decls);

    let ty = types.from_clang(&qual_type("Ptr<int>", Some("int *"), None));
    assert!(matches!(
        types.get(ty.ty),
        Type::TemplateSpecialization { aliased: Some(_), .. }
    ));
    assert!(types.is_pointer(ty));
    assert_eq!(types.as_template_specialization(ty), Some(Some(id("0x30"))));
}

#[test]
fn alias_id_from_the_front_end_wins_over_name_lookup() {
    let decls = decl_table(type_decls());
    let mut types = TypeTable::new(&decls);

    let ty = types.from_clang(&qual_type("renamed_node", None, Some(id("0x11"))));
    assert!(matches!(types.get(ty.ty), Type::Typedef { decl, .. } if *decl == id("0x11")));
    assert_eq!(types.as_structure(ty), Some(id("0x10")));

    let unknown = types.from_clang(&qual_type("renamed_node", None, None));
    assert!(matches!(types.get(unknown.ty), Type::Unresolved(name) if name == "renamed_node"));
}

#[test]
fn desugared_spelling_rescues_unparsable_types() {
    let decls = decl_table(type_decls());
    let mut types = TypeTable::new(&decls);

    let ty = types.from_clang(&qual_type("@node", Some("struct node"), None));
    assert_eq!(types.as_structure(ty), Some(id("0x10")));
}

#[test]
fn unnamed_records_are_found_by_position() {
    let unnamed = json!({
        "id": "0x40",
        "kind": "RecordDecl",
        "loc": loc(3, 9),
        "range": { "begin": loc(3, 1), "end": loc(3, 20) },
        "tagUsed": "struct",
        "completeDefinition": true,
        "inner": []
    });
    let decls = decl_table(tu(vec![unnamed]));
    let mut types = TypeTable::new(&decls);

    let ty = types.from_spelling("struct (unnamed struct at /fixture/main.cpp:3:9)");
    assert_eq!(types.as_structure(ty), Some(id("0x40")));
    let elsewhere = types.from_spelling("struct (unnamed struct at /fixture/main.cpp:4:9)");
    assert!(matches!(types.get(elsewhere.ty), Type::Unresolved(_)));
}

#[test]
fn typedef_cycles_end_unresolved() {
    let decls = decl_table(tu(vec![typedef("0x50", "a", 1, "b"), typedef("0x51", "b", 2, "a")]));
    let mut types = TypeTable::new(&decls);

    let a = types.from_spelling("a");
    let canonical = types.canonical(a);
    assert!(matches!(types.get(canonical.ty), Type::Unresolved(_)));
}

#[test]
fn shadowed_names_resolve_through_the_desugared_spelling() {
    // namespace a { struct S {}; } namespace b { struct S {}; S s; }
    let a = decl("0x71", "NamespaceDecl", "a", 1, 11, vec![tag_decl("0x72", "CXXRecordDecl", "S", 1, "struct", vec![])]);
    let b = decl("0x73", "NamespaceDecl", "b", 2, 11, vec![tag_decl("0x74", "CXXRecordDecl", "S", 2, "struct", vec![])]);
    let decls = decl_table(tu(vec![a, b]));
    let mut types = TypeTable::new(&decls);
    let b_record = |types: &TypeTable, ty: TypeId| matches!(types.get(ty), Type::Record { decl, .. } if *decl == id("0x74"));

    let plain = types.from_clang(&qual_type("S", Some("b::S"), None));
    assert!(b_record(&types, types.strip_sugar(plain).ty));

    let pointer = types.from_clang(&qual_type("const S *", Some("const b::S *"), None));
    let pointee = types.pointee(pointer).expect("pointer");
    assert!(pointee.quals.is_const);
    assert!(b_record(&types, types.strip_sugar(pointee).ty));

    let qualified = types.from_clang(&qual_type("a::S", None, None));
    assert!(matches!(types.get(types.strip_sugar(qualified).ty), Type::Record { decl, .. } if *decl == id("0x72")));
}
