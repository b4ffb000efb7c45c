//! End-to-end detection scenarios on small hand-built models.

use std::collections::BTreeSet;

use refmine_core::config::DetectorConfig;
use refmine_core::diff::matcher::RenameHints;
use refmine_core::diff::motivation::MotivationTag;
use refmine_core::diff::refactoring::{RefactoringRecord, RefactoringType};
use refmine_core::diff::{detect, detect_records};
use refmine_core::model::draft::{MethodSpec, ModelDraft, TypeSpec};
use refmine_core::model::CodeModel;

fn build(types: Vec<TypeSpec>) -> CodeModel {
    let mut draft = ModelDraft::new();
    for t in types {
        draft.add_type(t);
    }
    draft.freeze().unwrap()
}

fn records(before: &CodeModel, after: &CodeModel) -> Vec<RefactoringRecord> {
    detect_records(before, after, &RenameHints::new(), &DetectorConfig::default())
}

fn tags(list: &[MotivationTag]) -> BTreeSet<MotivationTag> {
    list.iter().copied().collect()
}

fn only_extract(before: &CodeModel, after: &CodeModel) -> (String, BTreeSet<MotivationTag>) {
    let detection = detect(before, after, &RenameHints::new(), &DetectorConfig::default());
    let records = detection.records();
    assert_eq!(records.len(), 1, "unexpected records: {records:?}");
    assert_eq!(records[0].refactoring_type, RefactoringType::ExtractMethod);
    (
        records[0].description.clone(),
        detection.refactorings[0].motivations.clone(),
    )
}

#[test]
fn test_inline_method_into_external_caller() {
    let before = build(vec![
        TypeSpec::class("app.Foo")
            .method(MethodSpec::new("bar").returns("int").body(["int v = load();", "return v * 2;"]))
            .method(
                MethodSpec::new("baz")
                    .returns("int")
                    .body(["return bar();"])
                    .call("app.Foo", "bar", &[]),
            ),
        TypeSpec::class("app.Client").method(
            MethodSpec::new("use")
                .returns("int")
                .body(["log();", "return foo.baz();"])
                .call("app.Foo", "baz", &[]),
        ),
    ]);
    let after = build(vec![
        TypeSpec::class("app.Foo")
            .method(MethodSpec::new("bar").returns("int").body(["int v = load();", "return v * 2;"])),
        TypeSpec::class("app.Client").method(
            MethodSpec::new("use")
                .returns("int")
                .body(["log();", "return bar();"])
                .call("app.Foo", "bar", &[]),
        ),
    ]);

    let found = records(&before, &after);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].refactoring_type, RefactoringType::InlineMethod);
    assert_eq!(
        found[0].description,
        "Inline Method baz() inlined to use() in class app.Client"
    );
    assert_eq!(found[0].entity_before, "app.Foo#baz()");
    assert_eq!(found[0].entity_after, "app.Client#use()");
}

#[test]
fn test_rename_class_reports_no_move() {
    let members = |name: &str| {
        TypeSpec::class(name)
            .method(MethodSpec::new("size").returns("int").body(["return items.size();"]))
            .field("items", "List<Item>")
    };
    let before = build(vec![members("pkg1.A")]);
    let after = build(vec![members("pkg1.B")]);

    let found = records(&before, &after);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].refactoring_type, RefactoringType::RenameClass);
    assert_eq!(found[0].entity_before, "pkg1.A");
    assert_eq!(found[0].entity_after, "pkg1.B");
}

#[test]
fn test_extract_from_two_sites_prefers_same_type_origin() {
    let duplicated = ["int n = count();", "emit(n);"];
    // `a.Other` is declared first so its caller is discovered first.
    let before = build(vec![
        TypeSpec::class("a.Other").method(MethodSpec::new("run").body([
            "prepare();",
            duplicated[0],
            duplicated[1],
        ])),
        TypeSpec::class("a.Svc").method(MethodSpec::new("run").body([
            "start();",
            duplicated[0],
            duplicated[1],
        ])),
    ]);
    let after = build(vec![
        TypeSpec::class("a.Other").method(
            MethodSpec::new("run")
                .body(["prepare();", "svc.helper();"])
                .call("a.Svc", "helper", &[]),
        ),
        TypeSpec::class("a.Svc")
            .method(
                MethodSpec::new("run")
                    .body(["start();", "helper();"])
                    .call("a.Svc", "helper", &[]),
            )
            .method(MethodSpec::new("helper").body(duplicated)),
    ]);

    for _ in 0..3 {
        let (description, motivations) = only_extract(&before, &after);
        assert_eq!(
            description,
            "Extract Method helper() extracted from run() in class a.Svc"
        );
        assert_eq!(motivations, tags(&[MotivationTag::RemoveDuplication]));
    }
}

#[test]
fn test_empty_bodies_never_rename() {
    let before = build(vec![TypeSpec::class("a.Widget")
        .method(MethodSpec::new("onOpen"))
        .method(MethodSpec::new("draw").body(["paint();"]))]);
    let after = build(vec![TypeSpec::class("a.Widget")
        .method(MethodSpec::new("onClose"))
        .method(MethodSpec::new("draw").body(["paint();"]))]);

    assert!(records(&before, &after).is_empty());
}

#[test]
fn test_empty_bodies_never_move() {
    let keep = || TypeSpec::class("app.Keep").method(MethodSpec::new("run").body(["work();"]));
    let before = build(vec![
        TypeSpec::class("old.Gone").method(MethodSpec::new("close")),
        keep(),
    ]);
    let after = build(vec![
        keep(),
        TypeSpec::class("fresh.Other")
            .method(MethodSpec::new("close"))
            .method(MethodSpec::new("open").body(["connect();"]))
            .method(MethodSpec::new("flush").body(["sync();"])),
    ]);

    assert!(records(&before, &after).is_empty());
}

fn parser_models(deprecated: bool) -> (CodeModel, CodeModel) {
    let before = build(vec![TypeSpec::class("a.Parser").method(
        MethodSpec::new("parse")
            .param("text", "String")
            .returns("Tree")
            .body(["Lexer l = new Lexer(text);", "return l.tree();"]),
    )]);
    let mut old = MethodSpec::new("parse")
        .param("text", "String")
        .returns("Tree")
        .body(["return parse(text, false);"])
        .call("a.Parser", "parse", &["String", "boolean"]);
    if deprecated {
        old = old.deprecated();
    }
    let after = build(vec![TypeSpec::class("a.Parser").method(old).method(
        MethodSpec::new("parse")
            .param("text", "String")
            .param("strict", "boolean")
            .returns("Tree")
            .body([
                "Lexer l = new Lexer(text);",
                "if (strict) l.check();",
                "return l.tree();",
            ]),
    )]);
    (before, after)
}

#[test]
fn test_delegating_origin_introduces_alternative_signature() {
    let (before, after) = parser_models(false);
    let (description, motivations) = only_extract(&before, &after);
    assert_eq!(
        description,
        "Extract Method parse(String, boolean) extracted from parse(String) in class a.Parser"
    );
    assert_eq!(
        motivations,
        tags(&[MotivationTag::IntroduceAlternativeSignature])
    );
}

#[test]
fn test_deprecated_delegating_origin_preserves_compatibility() {
    let (before, after) = parser_models(true);
    let (_, motivations) = only_extract(&before, &after);
    assert_eq!(
        motivations,
        tags(&[MotivationTag::PreserveBackwardCompatibility])
    );
}

#[test]
fn test_reuse_and_testability() {
    let before = build(vec![
        TypeSpec::class("a.Report").method(MethodSpec::new("render").body([
            "header();",
            "String s = fmt(data);",
            "out.write(s);",
            "footer();",
        ])),
        TypeSpec::class("a.Printer").method(MethodSpec::new("print").body(["p();"])),
        TypeSpec::class("a.ReportTest").test_code().method(
            MethodSpec::new("testRender")
                .body(["r.render();"])
                .call("a.Report", "render", &[]),
        ),
    ]);
    let after = build(vec![
        TypeSpec::class("a.Report")
            .method(
                MethodSpec::new("render")
                    .body(["header();", "emit();", "footer();"])
                    .call("a.Report", "emit", &[]),
            )
            .method(MethodSpec::new("emit").body(["String s = fmt(data);", "out.write(s);"])),
        TypeSpec::class("a.Printer").method(
            MethodSpec::new("print")
                .body(["p();", "report.emit();"])
                .call("a.Report", "emit", &[]),
        ),
        TypeSpec::class("a.ReportTest").test_code().method(
            MethodSpec::new("testRender")
                .body(["r.emit();"])
                .call("a.Report", "emit", &[]),
        ),
    ]);

    let (description, motivations) = only_extract(&before, &after);
    assert_eq!(
        description,
        "Extract Method emit() extracted from render() in class a.Report"
    );
    assert_eq!(
        motivations,
        tags(&[MotivationTag::Reuse, MotivationTag::ImproveTestability])
    );
}

#[test]
fn test_overridden_extraction_enables_overriding() {
    let before = build(vec![
        TypeSpec::class("a.Base").method(MethodSpec::new("run").body([
            "open();",
            "int k = next();",
            "push(k);",
        ])),
        TypeSpec::class("a.Sub").extends("a.Base").field("extra", "int"),
    ]);
    let after = build(vec![
        TypeSpec::class("a.Base")
            .method(
                MethodSpec::new("run")
                    .body(["open();", "step();"])
                    .call("a.Base", "step", &[]),
            )
            .method(MethodSpec::new("step").body(["int k = next();", "push(k);"])),
        TypeSpec::class("a.Sub")
            .extends("a.Base")
            .field("extra", "int")
            .method(MethodSpec::new("step").body(["push(extra);"])),
    ]);

    let detection = detect(&before, &after, &RenameHints::new(), &DetectorConfig::default());
    let extract: Vec<_> = detection
        .refactorings
        .iter()
        .filter(|d| d.refactoring.refactoring_type() == RefactoringType::ExtractMethod)
        .collect();
    assert_eq!(extract.len(), 1);
    assert_eq!(extract[0].motivations, tags(&[MotivationTag::EnableOverriding]));
}

#[test]
fn test_recursive_extraction_enables_recursion() {
    let before = build(vec![TypeSpec::class("a.Tree").method(
        MethodSpec::new("traverse")
            .param("root", "Node")
            .body(["prepare();", "visit(n);", "walk(n.next);"]),
    )]);
    let after = build(vec![TypeSpec::class("a.Tree")
        .method(
            MethodSpec::new("traverse")
                .param("root", "Node")
                .body(["prepare();", "walk(root);"])
                .call("a.Tree", "walk", &["Node"]),
        )
        .method(
            MethodSpec::new("walk")
                .param("n", "Node")
                .body(["visit(n);", "walk(n.next);"])
                .call("a.Tree", "walk", &["Node"]),
        )]);

    let (description, motivations) = only_extract(&before, &after);
    assert_eq!(
        description,
        "Extract Method walk(Node) extracted from traverse(Node) in class a.Tree"
    );
    assert_eq!(motivations, tags(&[MotivationTag::EnableRecursion]));
}

#[test]
fn test_motivations_serialized_on_records() {
    let (before, after) = parser_models(false);
    let found = records(&before, &after);
    let json = serde_json::to_value(&found).unwrap();
    assert_eq!(json[0]["type"], "Extract Method");
    assert_eq!(json[0]["motivations"][0], "IntroduceAlternativeSignature");
}
