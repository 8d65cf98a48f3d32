//! `/api/session/*` and `/api/catalog/load` routes — page restore,
//! progress export/import and catalog replacement.

use crate::catalog::ConceptCatalog;
use crate::config::GameConfig;
use crate::game::state::{DEFAULT_SEED, Session, replace_session, with_session, with_session_mut};
use crate::routes::util::{error_span, flush_writes, get_param, js_string, parse_form_body};
use crate::store::{MemoryStore, keys};

// ── POST /api/session/restore ──────────────────────────────────────

/// Handle POST /api/session/restore
/// Body params (all optional):
///   - seed={u64}        → RNG seed from `crypto.getRandomValues`
///   - config={json}     → partial `GameConfig`
///   - nmScore=..., nmMasteredConceptCodes=..., nmWrongConcepts=...,
///     nmAnswers=...     → the page's current `localStorage` values
///
/// Rebuilds the session around the supplied values, keeping the loaded
/// catalog. An invalid config falls back to the defaults and is reported.
pub fn handle_restore_post(body: &str) -> String {
    let params = parse_form_body(body);
    let seed = get_param(&params, "seed")
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_SEED);

    let (config, config_error) = match get_param(&params, "config").filter(|c| !c.trim().is_empty()) {
        Some(json) => match GameConfig::from_json(json) {
            Ok(config) => (config, None),
            Err(e) => {
                log::warn!("[SESSION] ignoring config: {}", e);
                (GameConfig::default(), Some(e))
            }
        },
        None => (GameConfig::default(), None),
    };

    let mut store = MemoryStore::new();
    for key in keys::ALL {
        if let Some(value) = get_param(&params, key) {
            if !value.is_empty() {
                store.seed(key, value.to_string());
            }
        }
    }

    let catalog = with_session(|s| s.catalog.clone());
    replace_session(Session::new(config, catalog, store, seed));

    match config_error {
        None => "ok".to_string(),
        Some(e) => format!("error: {}", e),
    }
}

// ── GET /api/session/export ────────────────────────────────────────

/// Handle GET /api/session/export
/// Returns a <script> tag that triggers a file download of the player's
/// progress as a base64 text file.
pub fn handle_export_get(_query: &str) -> String {
    let state = with_session(|s| s.export_progress());
    format!(
        r#"<script>
(function() {{
  var b = new Blob([{state}], {{type: 'text/plain'}});
  var a = document.createElement('a');
  a.href = URL.createObjectURL(b);
  a.download = 'concept-wheel-progress.txt';
  a.click();
  URL.revokeObjectURL(a.href);
  console.log('[concept-wheel] Progress exported');
}})();
</script>"#,
        state = js_string(&state)
    )
}

// ── POST /api/session/import ───────────────────────────────────────

/// Handle POST /api/session/import
/// Accepts `state={base64}` (or the bare base64 body) from a previously
/// exported progress file.
pub fn handle_import_post(body: &str) -> String {
    let params = parse_form_body(body);
    let encoded = get_param(&params, "state").unwrap_or(body.trim());
    match with_session_mut(|s| s.import_progress(encoded)) {
        Ok(()) => flush_writes(
            r#"<span class="text-emerald-600">Progress imported successfully</span>"#.to_string(),
        ),
        Err(e) => error_span(&format!("Import failed: {}", e)),
    }
}

// ── POST /api/catalog/load ─────────────────────────────────────────

/// Handle POST /api/catalog/load
/// Accepts `catalog={json}` (or the bare JSON body) and replaces the concept
/// catalog. Any round in progress is abandoned.
pub fn handle_catalog_post(body: &str) -> String {
    let params = parse_form_body(body);
    let json = match get_param(&params, "catalog") {
        Some(json) => json.to_string(),
        None => body.trim().to_string(),
    };
    match ConceptCatalog::from_json(&json) {
        Ok(catalog) => {
            let count = catalog.len();
            with_session_mut(|s| s.replace_catalog(catalog));
            format!(
                r#"<span class="text-emerald-600">Loaded {} concepts</span>"#,
                count
            )
        }
        Err(e) => {
            log::warn!("[CATALOG] rejected upload: {}", e);
            error_span(&e.to_string())
        }
    }
}
