// tests/render_scenarios.rs
// End-to-end renderer scenarios over realistic alert text.

use std::collections::BTreeSet;

use transit_alert_bot::merge::SourceTag;
use transit_alert_bot::render::{render, POST_HARD_LIMIT};

fn tags(names: &[&str]) -> BTreeSet<SourceTag> {
    names.iter().map(|n| SourceTag::new(*n)).collect()
}

fn known(routes: &[&str]) -> BTreeSet<String> {
    routes.iter().map(|r| r.to_string()).collect()
}

#[test]
fn known_route_gets_mode_emoji_and_no_source_prefix() {
    let out = render(
        "Route 61C: Delay",
        "",
        &tags(&["bus"]),
        &known(&["61C", "61D", "28X"]),
    );
    assert!(out.contains("61C 🚌"), "missing route emoji: {out}");
    // the route token already carries the mode emoji, so no prefix
    assert!(out.starts_with("Route"), "unexpected prefix: {out}");
    assert!(out.chars().count() <= 280);
}

#[test]
fn multi_source_alert_gets_both_prefix_emoji() {
    let out = render(
        "Downtown stops closed",
        "All downtown stops closed due to police activity",
        &tags(&["bus", "train"]),
        &known(&["61C"]),
    );
    assert!(out.starts_with("🚌🚊 "), "expected dual prefix: {out}");
}

#[test]
fn out_of_service_with_time_and_direction() {
    let out = render("", "OS 237 IB", &tags(&["bus"]), &known(&["61C"]));
    assert!(out.starts_with("⚠️ 🚌 "), "expected warning+bus prefix: {out}");
    assert!(out.contains("Out of Service"), "OS not expanded: {out}");
    assert!(out.contains("2:37"), "time not formatted: {out}");
    assert!(out.contains("Inbound"), "direction not expanded: {out}");
}

#[test]
fn color_line_annotation_on_train_alert() {
    let out = render(
        "RED Line delay",
        "RED Line trains delayed 15 minutes at Steel Plaza",
        &tags(&["train"]),
        &known(&[]),
    );
    assert!(out.starts_with("🚊 "), "expected train prefix: {out}");
    assert!(out.contains("🟥 Red"), "color not annotated: {out}");
}

#[test]
fn text_of_301_chars_truncates_to_exactly_300() {
    // body of 299 chars + "🚌 " prefix (2 chars) = 301 chars pre-truncation
    let description = "x".repeat(299);
    let out = render("", &description, &tags(&["bus"]), &known(&[]));
    assert_eq!(out.chars().count(), POST_HARD_LIMIT);
    assert!(out.ends_with("..."));
}

#[test]
fn over_length_candidate_falls_back_to_unexpanded_text() {
    // long description with IB tokens: the expanded candidate blows past 280
    // chars, so the adopted text keeps the compact "IB" spelling
    let description = format!("{} IB 237 IB", "Detour via Fifth Ave and Grant St. ".repeat(8));
    let out = render("", &description, &tags(&["bus"]), &known(&[]));
    assert!(!out.contains("Inbound"), "candidate should not be adopted: {out}");
    // time formatting happened before the candidate split, so it sticks
    assert!(out.contains("2:37"), "pre-candidate steps must persist: {out}");
}

#[test]
fn length_bound_holds_for_messy_inputs() {
    let inputs = [
        ("", ""),
        ("\\n\\n", "\\n"),
        ("OS", ""),
        ("a", &"word ".repeat(200) as &str),
        ("61C 28X 71A 71B", "RED BLUE SILVER OS O/S OSS 237 IB 1126a"),
    ];
    for (header, description) in inputs {
        let out = render(
            header,
            description,
            &tags(&["bus", "train"]),
            &known(&["61C", "28X", "71A", "71B"]),
        );
        assert!(
            out.chars().count() <= POST_HARD_LIMIT,
            "over limit for ({header:?}, {description:?}): {out}"
        );
    }
}
