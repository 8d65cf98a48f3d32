//! Concept Wheel in-browser WASM server.
//!
//! Exports `handle_request(method, path, query, body)` for the Web Worker
//! bridge to call. Uses `matchit` for URL routing — the same router
//! engine that powers Axum.
//!
//! The quiz itself (zone wheel, three timed questions per round, scoring
//! toward a target, mastery and mistake tracking, study browsing) lives in
//! [`game`]; [`routes`] renders it as HTMX fragments.

use wasm_bindgen::prelude::*;

pub mod catalog;
pub mod config;
pub mod game;
pub mod routes;
pub mod store;

/// Process an HTTP-like request and return an HTML fragment.
///
/// Called from JavaScript (Web Worker) via wasm-bindgen.
///
/// # Arguments
/// * `method` — HTTP method (e.g., "GET", "POST")
/// * `path`   — URL path (e.g., "/api/game/panel")
/// * `query`  — Query string (e.g., "?source=mistakes&zone=3")
/// * `body`   — Request body (e.g., POST form data). Empty string for GET requests.
///
/// # Returns
/// An HTML string fragment suitable for HTMX to swap into the DOM, or JSON
/// for `/api/game/state`.
#[wasm_bindgen]
pub fn handle_request(method: &str, path: &str, query: &str, body: &str) -> String {
    // Build the router. matchit compiles route patterns into a radix tree.
    let mut router = matchit::Router::new();

    // Session lifecycle
    router.insert("/api/session/restore", "session_restore").ok();
    router.insert("/api/session/export", "session_export").ok();
    router.insert("/api/session/import", "session_import").ok();
    router.insert("/api/catalog/load", "catalog_load").ok();

    // Quiz
    router.insert("/api/game/state", "game_state").ok();
    router.insert("/api/game/panel", "game_panel").ok();
    router.insert("/api/game/zones", "game_zones").ok();
    router.insert("/api/game/start", "game_start").ok();
    router.insert("/api/game/spin", "game_spin").ok();
    router.insert("/api/game/round", "game_round").ok();
    router.insert("/api/game/evaluate", "game_evaluate").ok();
    router.insert("/api/game/tick", "game_tick").ok();
    router.insert("/api/game/acknowledge", "game_acknowledge").ok();
    router.insert("/api/game/answer", "game_answer").ok();
    router.insert("/api/game/reset", "game_reset").ok();
    router.insert("/api/game/win", "game_win").ok();

    // Study mode
    router.insert("/api/study", "study").ok();
    router.insert("/api/study/card", "study_card").ok();
    router.insert("/api/study/next", "study_next").ok();
    router.insert("/api/study/random", "study_random").ok();

    match router.at(path) {
        Ok(matched) => match (*matched.value, method) {
            ("session_restore", "POST") => routes::session::handle_restore_post(body),
            ("session_export", "GET") => routes::session::handle_export_get(query),
            ("session_import", "POST") => routes::session::handle_import_post(body),
            ("catalog_load", "POST") => routes::session::handle_catalog_post(body),

            ("game_state", "GET") => routes::game::handle_state_get(query),
            ("game_panel", "GET") => routes::game::handle_panel_get(query),
            ("game_zones", "GET") => routes::game::handle_zones_get(query),
            ("game_start", "POST") => routes::game::handle_start_post(body),
            ("game_spin", "POST") => routes::game::handle_spin_post(body),
            ("game_round", "POST") => routes::game::handle_round_post(body),
            ("game_evaluate", "POST") => routes::game::handle_evaluate_post(body),
            ("game_tick", "POST") => routes::game::handle_tick_post(body),
            ("game_acknowledge", "POST") => routes::game::handle_acknowledge_post(body),
            ("game_answer", "POST") => routes::game::handle_answer_post(body),
            ("game_reset", "POST") => routes::game::handle_reset_post(body),
            ("game_win", "POST") => routes::game::handle_win_post(body),

            ("study", "GET") => routes::study::handle_study_get(query),
            ("study_card", "GET") => routes::study::handle_card_get(query),
            ("study_next", "POST") => routes::study::handle_next_post(body),
            ("study_random", "POST") => routes::study::handle_random_post(body),

            _ => method_not_allowed(),
        },
        Err(_) => not_found(),
    }
}

fn not_found() -> String {
    r#"<span class="text-kip-red">404 — route not found</span>"#.to_string()
}

fn method_not_allowed() -> String {
    r#"<span class="text-kip-red">405 — method not allowed</span>"#.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Session, replace_session, with_session};

    fn reset_state() {
        replace_session(Session::fresh());
    }

    #[test]
    fn returns_404_for_unknown_route() {
        let html = handle_request("GET", "/api/nonexistent", "", "");
        assert!(html.contains("404"));
    }

    #[test]
    fn returns_405_for_wrong_method() {
        let html = handle_request("POST", "/api/game/state", "", "");
        assert!(html.contains("405"));
        let html = handle_request("GET", "/api/game/spin", "", "");
        assert!(html.contains("405"));
    }

    #[test]
    fn routes_game_panel() {
        reset_state();
        let html = handle_request("GET", "/api/game/panel", "", "");
        assert!(html.contains(r#"id="quiz-panel""#));
    }

    #[test]
    fn routes_game_zones() {
        reset_state();
        let html = handle_request("GET", "/api/game/zones", "", "");
        assert!(html.contains(r#"id="zone-picker""#));
    }

    #[test]
    fn routes_full_round_flow() {
        reset_state();
        handle_request("POST", "/api/session/restore", "", "seed=42");
        handle_request("POST", "/api/game/start", "", "");
        let html = handle_request("POST", "/api/game/spin", "", "zones=1");
        assert!(html.contains("Spinning"));
        let html = handle_request("POST", "/api/game/round", "", "");
        assert!(html.contains("Question 1 of 3"));
        let html = handle_request("POST", "/api/game/answer", "", "text=lifo");
        assert!(html.contains("Answer saved"));
        handle_request("POST", "/api/game/evaluate", "", "kind=correct");
        handle_request("POST", "/api/game/evaluate", "", "kind=partial");
        let html = handle_request("POST", "/api/game/acknowledge", "", "");
        assert!(html.contains("Question 3 of 3"));
        let html = handle_request("POST", "/api/game/evaluate", "", "kind=correct");
        assert!(html.contains("Round complete"));
        let json = handle_request("GET", "/api/game/state", "", "");
        assert!(json.contains(r#""score":13"#));
        assert!(json.contains(r#""rounds_completed":1"#));
    }

    #[test]
    fn routes_game_tick() {
        reset_state();
        handle_request("POST", "/api/game/spin", "", "zones=3");
        handle_request("POST", "/api/game/round", "", "");
        let handle = with_session(|s| s.engine.timer().handle().map(|h| h.0)).unwrap();
        let html = handle_request("POST", "/api/game/tick", "", &format!("handle={handle}"));
        assert!(html.contains("4:59"));
    }

    #[test]
    fn routes_game_reset_and_win() {
        reset_state();
        let html = handle_request("POST", "/api/game/reset", "", "scope=all");
        assert!(html.contains("localStorage"));
        let html = handle_request("POST", "/api/game/win", "", "");
        assert!(html.contains(r#"id="quiz-panel""#));
    }

    #[test]
    fn routes_study() {
        reset_state();
        let html = handle_request("GET", "/api/study", "?zone=2", "");
        assert!(html.contains("1 of 5"));
        let html = handle_request("POST", "/api/study/next", "", "");
        assert!(html.contains("2 of 5"));
        let html = handle_request("GET", "/api/study/card", "", "");
        assert!(html.contains("2 of 5"));
        let html = handle_request("POST", "/api/study/random", "", "");
        assert!(html.contains(" of 5"));
    }

    #[test]
    fn routes_session_export_import() {
        reset_state();
        let script = handle_request("GET", "/api/session/export", "", "");
        assert!(script.contains("<script>"));
        let html = handle_request("POST", "/api/session/import", "", "state=@@@");
        assert!(html.contains("Import failed"));
    }

    #[test]
    fn routes_catalog_load() {
        reset_state();
        let html = handle_request(
            "POST",
            "/api/catalog/load",
            "",
            r#"{"1":[{"name":"Cache","definition":"fast copy"}]}"#,
        );
        assert!(html.contains("Loaded 1 concepts"));
        reset_state();
    }
}
