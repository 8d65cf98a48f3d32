//! `/api/study*` routes — flashcard-style browsing of the catalog.
//!
//! The filter form on the page sends `source`, `zone` and `search`; the
//! response is the `#study-card` fragment for the current cursor position.

use crate::game::state::{Session, with_session, with_session_mut};
use crate::game::study::{StudyFilter, StudySource};
use crate::routes::util::{escape_html, get_param, parse_query};

// ── GET /api/study ─────────────────────────────────────────────────

/// Handle GET /api/study?source={all|mistakes}&zone={n}&search={text}
/// Applies the filter and returns the card. An empty or non-numeric `zone`
/// means all zones.
pub fn handle_study_get(query: &str) -> String {
    let params = parse_query(query);
    let filter = StudyFilter {
        source: StudySource::parse(get_param(&params, "source").unwrap_or("all")),
        zone: get_param(&params, "zone").and_then(|z| z.trim().parse().ok()),
        search: get_param(&params, "search").unwrap_or("").to_string(),
    };
    with_session_mut(|s| {
        s.apply_study_filter(filter);
        render_study_card(s)
    })
}

// ── POST /api/study/next ───────────────────────────────────────────

pub fn handle_next_post(_body: &str) -> String {
    with_session_mut(|s| {
        s.study_next();
        render_study_card(s)
    })
}

// ── POST /api/study/random ─────────────────────────────────────────

pub fn handle_random_post(_body: &str) -> String {
    with_session_mut(|s| {
        s.study_random();
        render_study_card(s)
    })
}

/// Re-render the card without moving the cursor.
pub fn handle_card_get(_query: &str) -> String {
    with_session(render_study_card)
}

// ── Rendering ──────────────────────────────────────────────────────

fn render_study_card(s: &Session) -> String {
    let mut html = String::with_capacity(1024);
    html.push_str(r#"<div id="study-card" class="p-4 text-kip-drk-sienna">"#);

    let Some(concept) = s.study.current(&s.catalog) else {
        let message = match s.study.filter().source {
            StudySource::Mistakes => "No mistakes to review. Nice work!",
            StudySource::All => "No concepts match this filter.",
        };
        html.push_str(&format!(
            r#"<p class="text-center text-sm text-slate-500">{}</p></div>"#,
            message
        ));
        return html;
    };

    html.push_str(&format!(
        r#"<div class="flex justify-between text-xs text-slate-500 mb-1"><span id="study-counter">{} of {}</span><span>Zone {} · Code {}</span></div>"#,
        s.study.position() + 1,
        s.study.len(),
        concept.zone,
        concept.code
    ));
    html.push_str(&format!(
        r#"<p class="text-xl font-bold text-center my-2">{}</p>"#,
        escape_html(&concept.name)
    ));
    html.push_str(&format!(
        r#"<p class="text-sm">{}</p>"#,
        escape_html(&concept.definition)
    ));
    if s.mastery.is_mistake(&concept.name) {
        html.push_str(r#"<p class="text-xs text-kip-red mt-2">Missed in play</p>"#);
    } else if s.mastery.is_mastered(concept.code) {
        html.push_str(r#"<p class="text-xs text-emerald-600 mt-2">Mastered</p>"#);
    }
    html.push_str(
        r##"<div class="flex justify-center gap-2 mt-3"><button class="px-3 py-1 rounded bg-kip-drk-sienna text-white text-sm" hx-post="/api/study/next" hx-target="#study-card" hx-swap="outerHTML">Next</button><button class="px-3 py-1 rounded border text-sm" hx-post="/api/study/random" hx-target="#study-card" hx-swap="outerHTML">Random</button></div>"##,
    );
    html.push_str("</div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ConceptCatalog;
    use crate::config::GameConfig;
    use crate::game::round::Evaluation;
    use crate::game::state::replace_session;
    use crate::store::MemoryStore;

    fn reset_state() {
        replace_session(Session::new(
            GameConfig::default(),
            ConceptCatalog::bundled(),
            MemoryStore::new(),
            11,
        ));
    }

    #[test]
    fn default_filter_lists_every_concept() {
        reset_state();
        let total = with_session(|s| s.catalog.len());
        let html = handle_study_get("");
        assert!(html.contains(&format!("1 of {total}")));
        assert!(html.contains("Stack"));
        assert!(html.contains("Code 101"));
    }

    #[test]
    fn zone_and_search_narrow_the_list() {
        reset_state();
        let html = handle_study_get("?zone=4&search=INDEX");
        assert!(html.contains("1 of 1"));
        assert!(html.contains("Code 402"));
    }

    #[test]
    fn blank_zone_means_all_zones() {
        reset_state();
        let html = handle_study_get("?zone=&search=hash");
        // "Hash table" (zone 1) and "Hash function" (zone 5).
        assert!(html.contains("1 of 2"));
    }

    #[test]
    fn mistakes_source_shows_missed_concepts() {
        reset_state();
        let html = handle_study_get("?source=mistakes");
        assert!(html.contains("No mistakes to review"));

        with_session_mut(|s| {
            s.spin(&[3]);
            s.begin_round().unwrap();
            s.evaluate(Evaluation::Wrong);
        });
        let html = handle_study_get("?source=mistakes");
        assert!(html.contains("1 of 1"));
        assert!(html.contains("Missed in play"));
    }

    #[test]
    fn next_advances_and_wraps() {
        reset_state();
        handle_study_get("?zone=9");
        assert!(handle_next_post("").contains("2 of 3"));
        handle_next_post("");
        assert!(handle_next_post("").contains("1 of 3"));
    }

    #[test]
    fn random_stays_in_filtered_list() {
        reset_state();
        handle_study_get("?zone=9");
        for _ in 0..10 {
            let html = handle_random_post("");
            assert!(html.contains(" of 3"));
            assert!(html.contains("Zone 9"));
        }
    }

    #[test]
    fn card_get_keeps_cursor() {
        reset_state();
        handle_study_get("?zone=9");
        handle_next_post("");
        assert!(handle_card_get("").contains("2 of 3"));
    }

    #[test]
    fn empty_search_result() {
        reset_state();
        let html = handle_study_get("?search=zzzz");
        assert!(html.contains("No concepts match"));
    }
}
