use html_diff_core::{format_json, format_summary, format_text, Pipeline};
use html_diff_core::{default_rules, diff_html, parse_html, reformat_xml, Comparator};

#[test]
fn standard_pipeline_removes_renderer_noise() {
    let out = Pipeline::standard().run(
        r#"<p sourcefile="a.md" sourcestartlinenumber="4" sourceendlinenumber="4" nocheck="true">a&nbsp;b<!-- x --></p><p></p>"#,
    );
    assert!(!out.contains("sourcefile"));
    assert!(!out.contains("sourcestartlinenumber"));
    assert!(!out.contains("nocheck"));
    assert!(!out.contains("<!--"));
    assert_eq!(out.matches("<p").count(), 1);
}

#[test]
fn provenance_pipeline_keeps_line_numbers() {
    let out = Pipeline::preserving_provenance()
        .run(r#"<p sourcefile="a.md" sourcestartlinenumber="4" sourceendlinenumber="5">a</p>"#);
    assert!(!out.contains("sourcefile"));
    assert!(out.contains(r#"sourcestartlinenumber="4""#));
    assert!(out.contains(r#"sourceendlinenumber="5""#));
}

#[test]
fn malformed_markup_still_normalizes() {
    // Unclosed tags make the XML reformat fail; the remaining passes still apply.
    let out = Pipeline::standard().run("<p sourcefile=\"a.md\">a<b>b</p>");
    assert!(!out.contains("sourcefile"));
}

#[test]
fn reformatted_output_parses_back() {
    let layout = reformat_xml("<div><p>a</p><p>b</p></div>").expect("well-formed");
    let tree = parse_html(&layout);
    assert_eq!(tree.inner_text(tree.root()).split_whitespace().collect::<Vec<_>>(), ["a", "b"]);
}

#[test]
fn results_render_as_text_and_json() {
    let rules = default_rules();
    let comparator = Comparator::new(&rules);
    let results = vec![
        diff_html("a.html", "<p>same</p>", "<p>same</p>", &comparator),
        diff_html(
            "b.html",
            r#"<p sourcestartlinenumber="9" sourceendlinenumber="9">old</p>"#,
            "<p>new</p>",
            &comparator,
        ),
    ];

    let json = format_json(&results);
    assert!(json.contains("\"status\": \"divergent\""));
    assert!(json.contains("\"type\": \"text_mismatch\""));
    assert!(format_text(&results).contains("~ b.html (line 9)"));
    assert_eq!(format_summary(&results), "equivalent=1 divergent=1");
}
