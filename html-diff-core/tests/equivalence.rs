use html_diff_core::{
    default_rules, Comparator, CompareOptions, DivergenceReason, Pipeline, SourceSpan,
};
use pretty_assertions::assert_eq;

#[test]
fn identical_after_pipeline_is_equivalent_without_span() {
    let rules = default_rules();
    let comparator = Comparator::new(&rules);
    let first = r#"<p sourcefile="a.md" sourcestartlinenumber="1" sourceendlinenumber="1">Hi <!-- note --></p>"#;
    let second = "<p>Hi</p>";

    let pipeline = Pipeline::standard();
    assert_eq!(pipeline.run(first), pipeline.run(second));

    let result = comparator.compare(first, second);
    assert!(result.is_equivalent());
    assert_eq!(result.span(), None);
}

#[test]
fn whitespace_only_text_differences_are_equivalent() {
    let rules = default_rules();
    let comparator = Comparator::new(&rules);
    let first = "<ul><li>a</li><li>b</li></ul>";
    let second = "<ul>\n  <li>a</li>\n\n  <li>b</li>\n</ul>\n";
    assert!(comparator.compare(first, second).is_equivalent());
}

#[test]
fn text_runs_realign_across_paragraph_split() {
    let rules = default_rules();
    let comparator = Comparator::new(&rules);
    let result = comparator.compare("<p>Hello world</p>", "<p>Hello</p><br/><p> world</p>");
    assert!(result.is_equivalent());
}

#[test]
fn mismatch_reports_span_of_enclosing_element() {
    let rules = default_rules();
    let comparator = Comparator::new(&rules);
    let result = comparator.compare(
        r#"<div sourcestartlinenumber="3" sourceendlinenumber="3"><span>A</span></div>"#,
        "<div><em>A</em></div>",
    );
    assert!(!result.is_equivalent());
    assert_eq!(result.span(), Some(SourceSpan::new(3, 3)));
}

#[test]
fn strong_matches_literal_delimiters() {
    let rules = default_rules();
    let comparator = Comparator::new(&rules);
    assert!(comparator
        .compare("<p><strong>x</strong></p>", "<p>**x**</p>")
        .is_equivalent());
    assert!(comparator
        .compare("<strong>x</strong>", "**x**")
        .is_equivalent());
}

#[test]
fn emphasis_and_strikethrough_use_their_own_delimiters() {
    let rules = default_rules();
    let comparator = Comparator::new(&rules);
    assert!(comparator.compare("<em>x</em>", "*x*").is_equivalent());
    assert!(comparator.compare("<del>x</del>", "~~x~~").is_equivalent());
    assert!(!comparator.compare("<em>x</em>", "**x**").is_equivalent());
}

#[test]
fn image_source_difference_respects_attribute_option() {
    let rules = default_rules();
    let first = r#"<p><img src="a.png" alt="logo"></p>"#;
    let second = r#"<p><img src="b.png" alt="logo"></p>"#;

    let result = Comparator::new(&rules).compare(first, second);
    assert_eq!(
        result.divergence().map(|d| d.reason.clone()),
        Some(DivergenceReason::AttributeMismatch {
            name: "src".to_string()
        })
    );

    let lenient = Comparator::with_options(
        &rules,
        CompareOptions {
            compare_attributes: false,
        },
    );
    assert!(lenient.compare(first, second).is_equivalent());
}

#[test]
fn alignment_spelling_is_canonicalized() {
    let rules = default_rules();
    let comparator = Comparator::new(&rules);
    let first = r#"<table><tr><td align="right">1</td></tr></table>"#;
    let second = r#"<table><tr><td style="text-align: right;">1</td></tr></table>"#;
    assert!(comparator.compare(first, second).is_equivalent());
}

#[test]
fn video_embeds_compare_on_canonical_source() {
    let rules = default_rules();
    let comparator = Comparator::new(&rules);
    let first = r#"<iframe src="https://www.youtube.com/embed/abc"></iframe>"#;
    let second = r#"<iframe src="https://www.youtube.com/embed/abc?nocookie=true"></iframe>"#;
    assert!(comparator.compare(first, second).is_equivalent());
}

#[test]
fn heading_class_is_compared() {
    let rules = default_rules();
    let comparator = Comparator::new(&rules);
    let result = comparator.compare(
        r#"<h2 class="note">Title</h2>"#,
        r#"<h2 class="tip">Title</h2>"#,
    );
    assert_eq!(
        result.divergence().map(|d| d.reason.clone()),
        Some(DivergenceReason::AttributeMismatch {
            name: "class".to_string()
        })
    );
}

#[test]
fn missing_trailing_block_is_reported() {
    let rules = default_rules();
    let comparator = Comparator::new(&rules);
    let result = comparator.compare(
        r#"<p sourcestartlinenumber="1" sourceendlinenumber="1">a</p><hr sourcestartlinenumber="3" sourceendlinenumber="3">"#,
        "<p>a</p>",
    );
    let divergence = result.divergence().expect("divergent");
    assert_eq!(divergence.reason, DivergenceReason::MissingSecond);
    assert_eq!(divergence.span, Some(SourceSpan::new(3, 3)));
    assert_eq!(divergence.second, None);
}
