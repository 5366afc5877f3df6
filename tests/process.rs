//! End-to-end behaviour of `process` on realistic ebook markup.

use retag::{process, Action, Criteria};
use rstest::rstest;

fn span_x(action: Action) -> Criteria {
    Criteria::new("span", action).with_attribute("class", "x")
}

const CHAPTER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="en">
<head>
  <title>Chapter 1</title>
  <link href='../Styles/style.css' rel=stylesheet type="text/css"/>
</head>
<body>
  <!-- converted by hand -->
  <h1 class=chapter id="ch1">One</h1>
  <p class="first"><span class="x">Call</span> me <SPAN class="dropcap">I</SPAN>shmael.<br/>
  Some years ago<br />never mind how long.</p>
  <svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><span class="x">svg text</span></svg>
  <div><span>plain</span><span class="x"><span>nested</span></span></div>
</body>
</html>
"#;

#[rstest]
#[case::absent_tag(Criteria::new("table", Action::Delete))]
#[case::absent_value(Criteria::new("span", Action::Delete).with_attribute("class", "nope"))]
#[case::absent_attribute(Criteria::new("h1", Action::Unwrap).with_attribute("lang", "en"))]
#[case::bare_rule_vs_attributed_tags(Criteria::new("p", Action::Modify).rename_to("div"))]
fn non_matching_rules_leave_document_identical(#[case] rule: Criteria) {
    assert_eq!(process(CHAPTER, &rule), CHAPTER);
}

#[test]
fn delete_removes_subtree() {
    assert_eq!(
        process(r#"<div><span class="x">inner</span>tail</div>"#, &span_x(Action::Delete)),
        "<div>tail</div>"
    );
}

#[test]
fn modify_renames_and_replaces_attributes() {
    let rule = span_x(Action::Modify).rename_to("div").with_new_attributes(r#"id="y""#);
    insta::assert_snapshot!(process(r#"<span class="x">hi</span>"#, &rule), @r#"<div id="y">hi</div>"#);
}

#[test]
fn modify_with_copy_keeps_original_attributes() {
    let rule = span_x(Action::Modify)
        .rename_to("div")
        .with_new_attributes(r#"id="y""#)
        .copy_attributes();
    insta::assert_snapshot!(process(r#"<span class="x">hi</span>"#, &rule), @r#"<div class="x">hi</div>"#);
}

#[test]
fn modify_without_new_attributes_strips_them() {
    let rule = span_x(Action::Modify).rename_to("em");
    assert_eq!(process(r#"<span class="x" id="k">hi</span>"#, &rule), "<em>hi</em>");
}

#[rstest]
#[case("<span>a</span>", "a")]
#[case(r#"<span class="x">a</span>"#, r#"<span class="x">a</span>"#)]
#[case("<span/>b", "b")]
fn no_attribute_rule_matches_bare_tags_only(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(process(input, &Criteria::new("span", Action::Unwrap)), expected);
}

#[rstest]
#[case("foobar", true)]
#[case("foo", true)]
#[case("barfoo", false)]
#[case("Foobar", false)]
fn regex_is_anchored_at_start(#[case] class: &str, #[case] matches: bool) {
    let rule = Criteria::new("span", Action::Unwrap)
        .with_attribute("class", "^foo")
        .regex();
    let input = format!(r#"<span class="{class}">t</span>"#);
    let expected = if matches { "t".to_string() } else { input.clone() };
    assert_eq!(process(&input, &rule), expected);
}

#[rstest]
#[case::comment("<!-- c -->")]
#[case::doctype("<!DOCTYPE html>")]
#[case::lowercase_doctype("<!doctype html>")]
#[case::processing_instruction(r#"<?xml version="1.0"?>"#)]
#[case::cdata("<![CDATA[ <span class=\"x\"> ]]>")]
fn passthrough_round_trips(#[case] markup: &str, #[values(Action::Delete, Action::Unwrap, Action::Modify)] action: Action) {
    let input = format!("{markup}<p>x</p>");
    assert_eq!(process(&input, &span_x(action)), input);
}

#[test]
fn svg_content_is_never_rewritten() {
    let out = process(CHAPTER, &span_x(Action::Delete));
    assert!(out.contains(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><span class="x">svg text</span></svg>"#));
}

#[test]
fn delete_on_a_full_chapter() {
    let out = process(CHAPTER, &span_x(Action::Delete));
    let expected = CHAPTER
        .replace(r#"<span class="x">Call</span>"#, "")
        .replace(r#"<span class="x"><span>nested</span></span>"#, "");
    assert_eq!(out, expected);
}

#[test]
fn unwrap_on_a_full_chapter() {
    let out = process(CHAPTER, &span_x(Action::Unwrap));
    let expected = CHAPTER
        .replace(r#"<span class="x">Call</span>"#, "Call")
        .replace(r#"<span class="x"><span>nested</span></span>"#, "<span>nested</span>");
    assert_eq!(out, expected);
}

#[test]
fn modify_only_touches_matched_tag_pairs() {
    let rule = Criteria::new("span", Action::Modify)
        .with_attribute("class", "dropcap")
        .rename_to("b")
        .copy_attributes();
    let out = process(CHAPTER, &rule);
    let expected = CHAPTER.replace(r#"<SPAN class="dropcap">I</SPAN>"#, r#"<b class="dropcap">I</b>"#);
    assert_eq!(out, expected);
}

#[test]
fn self_closing_spacing_survives_modify() {
    let rule = Criteria::new("br", Action::Modify).with_new_attributes(r#"class="soft""#);
    let out = process("a<br/>b<br />c<br>d", &rule);
    insta::assert_snapshot!(out, @r#"a<br class="soft"/>b<br class="soft" />c<br class="soft">d"#);
}

#[rstest]
#[case::delete(Action::Delete, "<p>ab</p>")]
#[case::unwrap(Action::Unwrap, "<p>ab</p>")]
#[case::modify(Action::Modify, "<p>a<image></image>b</p>")]
fn xhtml_void_element_with_explicit_close(#[case] action: Action, #[case] expected: &str) {
    let rule = Criteria::new("img", action).with_attribute("class", "x").rename_to("image");
    assert_eq!(process(r#"<p>a<img class="x" src="i.png"></img>b</p>"#, &rule), expected);
}

#[test]
fn malformed_markup_is_carried_through() {
    let input = r#"<p>1 < 2 and <span class="x" <b>bold</b></p><!-- never closed"#;
    assert_eq!(process(input, &span_x(Action::Delete)), input);
}

#[test]
fn unterminated_deleted_element_drops_the_rest() {
    assert_eq!(process(r#"a<span class="x">b<i>c</i>"#, &span_x(Action::Delete)), "a");
}
