// src/render.rs
// Turns raw feed text into a bounded-length post.
//
// The rewrite is an ordered pipeline of pure text transforms. Order matters:
// out-of-service detection and route extraction read the text BEFORE any
// substitution touches it, so later rewrites can never change what was
// detected. The emoji/expansion steps build a tentative candidate that is
// only adopted when it leaves headroom for the prefix emoji.

use std::collections::BTreeSet;

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::merge::SourceTag;

/// Platform hard limit (Bluesky).
pub const POST_HARD_LIMIT: usize = 300;
/// Cap for the annotated candidate; the gap to 300 is headroom for the
/// prefix emoji added afterwards.
const CANDIDATE_LIMIT: usize = 280;

const BUS_EMOJI: &str = "🚌";
const TRAIN_EMOJI: &str = "🚊";

/// Render an alert into the final post text.
///
/// Pure and total: empty header + description yields an empty or emoji-only
/// string, never an error. Output is at most [`POST_HARD_LIMIT`] chars.
pub fn render(
    header: &str,
    description: &str,
    sources: &BTreeSet<SourceTag>,
    known_routes: &BTreeSet<String>,
) -> String {
    // 1. Prefer the long-form description when present.
    let base = if !description.trim().is_empty() {
        description
    } else {
        header
    };

    // 2. Newline markers: paragraph break becomes " - ", the rest a space.
    let text = normalize_newlines(base);

    // 3-4. Read detection facts off the untouched text. The OS token and the
    // route tokens are both destroyed or shadowed by later substitutions.
    let out_of_service = detect_out_of_service(&text);
    let routes = extract_known_routes(&text, known_routes);

    // 5. "OS"/"O/S"/"OSS" -> "Out of Service".
    let text = replace_out_of_service(&text);

    // 6. "237 IB" -> "2:37 IB", "1126a" -> "11:26a".
    let text = format_times(&text);

    // 7-9. Tentative candidate: direction words, color-line emoji, per-route
    // mode emoji.
    let mut candidate = expand_directions(&text);
    candidate = annotate_color_lines(&candidate);
    if (1..=2).contains(&routes.len()) {
        let mode = mode_emoji(sources);
        candidate = annotate_routes(&candidate, &routes, mode);
    }

    // 10. Adopt the candidate only if it leaves prefix headroom; otherwise
    // fall back to the unexpanded step-6 text.
    let mut working = if candidate.chars().count() <= CANDIDATE_LIMIT {
        candidate
    } else {
        text
    };

    // 11. Source prefix.
    let prefix = source_prefix(sources, !routes.is_empty());
    if !prefix.is_empty() {
        working = format!("{prefix}{working}");
    }

    // 12. Out-of-service warning goes in front of everything.
    if out_of_service {
        working = format!("⚠️ {}", working.trim_start());
    }

    // 13. Hard cap.
    truncate_post(working)
}

/// Feeds carry literal `\n` escape sequences as well as real newlines; a
/// doubled marker is a paragraph break.
fn normalize_newlines(s: &str) -> String {
    let s = s.replace("\\n\\n", " - ").replace("\n\n", " - ");
    let s = s.replace("\\n", " ").replace('\n', " ");
    s.trim().to_string()
}

fn re_oos() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    // OSS before OS so the alternation prefers the longer token.
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:OSS|O/S|OS)\b").unwrap())
}

/// Whether the text flags a vehicle/line as out of service. Runs against the
/// pre-substitution text only.
pub fn detect_out_of_service(text: &str) -> bool {
    re_oos().is_match(text)
}

fn replace_out_of_service(text: &str) -> String {
    re_oos().replace_all(text, "Out of Service").into_owned()
}

/// Pull route tokens ("61C", "28X", "5") out of the text and keep the ones
/// the config recognizes. Repeat mentions collapse into the set.
pub fn extract_known_routes(text: &str, known_routes: &BTreeSet<String>) -> BTreeSet<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"\b[A-Za-z]?\d+[A-Za-z]?\b").unwrap());

    let mut found = BTreeSet::new();
    for m in re.find_iter(text) {
        let token = m.as_str().to_ascii_uppercase();
        if known_routes.contains(&token) {
            found.insert(token);
        }
    }
    found
}

/// Insert a colon into 3/4-digit clock tokens, but only when a trailing cue
/// (dash, am/pm letter, or an IB/OB direction) marks them as times. Bare
/// numbers stay untouched so route numbers never get corrupted.
pub fn format_times(text: &str) -> String {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE
        .get_or_init(|| Regex::new(r"(?i)\b(\d{3,4})(\s*)(-|[ap]\b|IB\b|OB\b)").unwrap());

    re.replace_all(text, |caps: &regex::Captures<'_>| {
        let digits = &caps[1];
        let split = digits.len() - 2;
        format!("{}:{}{}{}", &digits[..split], &digits[split..], &caps[2], &caps[3])
    })
    .into_owned()
}

/// Expand standalone IB/OB direction tokens. A token counts as standalone
/// when bounded by start/end of text, a space, a colon, or a dash.
pub fn expand_directions(text: &str) -> String {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)\b(?:IB|OB)\b").unwrap());

    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    for m in re.find_iter(text) {
        let before_ok = text[..m.start()]
            .chars()
            .next_back()
            .is_none_or(|c| matches!(c, ' ' | ':' | '-'));
        let after_ok = text[m.end()..]
            .chars()
            .next()
            .is_none_or(|c| matches!(c, ' ' | ':' | '-'));
        out.push_str(&text[last..m.start()]);
        if before_ok && after_ok {
            if m.as_str().eq_ignore_ascii_case("IB") {
                out.push_str("Inbound");
            } else {
                out.push_str("Outbound");
            }
        } else {
            out.push_str(m.as_str());
        }
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Light-rail color lines get their color square.
pub fn annotate_color_lines(text: &str) -> String {
    static RE_RED: OnceCell<Regex> = OnceCell::new();
    static RE_BLUE: OnceCell<Regex> = OnceCell::new();
    static RE_SILVER: OnceCell<Regex> = OnceCell::new();

    let red = RE_RED.get_or_init(|| Regex::new(r"(?i)\bRED\b").unwrap());
    let blue = RE_BLUE.get_or_init(|| Regex::new(r"(?i)\bBLUE\b").unwrap());
    let silver = RE_SILVER.get_or_init(|| Regex::new(r"(?i)\b(?:SILVER|SLVR)\b").unwrap());

    let out = red.replace_all(text, "🟥 Red").into_owned();
    let out = blue.replace_all(&out, "🟦 Blue").into_owned();
    silver.replace_all(&out, "⬜ Silver").into_owned()
}

/// Append the mode emoji after the first mention of each known route. Only
/// called for 1-2 routes; system-wide alerts naming more routes stay
/// unannotated to avoid clutter.
fn annotate_routes(text: &str, routes: &BTreeSet<String>, emoji: &str) -> String {
    let mut out = text.to_string();
    for route in routes {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(route));
        let Ok(re) = Regex::new(&pattern) else { continue };
        if let Some(m) = re.find(&out) {
            out.insert_str(m.end(), &format!(" {emoji}"));
        }
    }
    out
}

fn mode_emoji(sources: &BTreeSet<SourceTag>) -> &'static str {
    if sources.iter().any(SourceTag::is_bus) {
        BUS_EMOJI
    } else {
        TRAIN_EMOJI
    }
}

/// Prefix rules: multi-source alerts get both emoji, train-only alerts the
/// tram, alerts whose route token already carries a mode emoji nothing, and
/// bus alerts without an identifiable route the bus.
fn source_prefix(sources: &BTreeSet<SourceTag>, has_known_route: bool) -> &'static str {
    if sources.len() > 1 {
        "🚌🚊 "
    } else if sources.iter().all(SourceTag::is_train) && !sources.is_empty() {
        "🚊 "
    } else if has_known_route {
        ""
    } else {
        "🚌 "
    }
}

fn truncate_post(s: String) -> String {
    if s.chars().count() <= POST_HARD_LIMIT {
        return s;
    }
    let cut: String = s.chars().take(POST_HARD_LIMIT - 3).collect();
    format!("{cut}...")
}
