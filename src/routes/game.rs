//! `/api/game/*` routes — the zone wheel, question flow, timer ticks and
//! score resets.
//!
//! Every mutating handler returns the re-rendered quiz panel (swapped as
//! `outerHTML` on `#quiz-panel`) followed by the `localStorage` replay
//! script for whatever the mutation persisted.

use crate::game::round::{Evaluation, Phase, Tick};
use crate::game::state::{Session, export_state_json, with_session, with_session_mut};
use crate::game::timer::{TimerHandle, format_time};
use crate::routes::util::{
    error_span, escape_html, flush_writes, get_param, parse_form_body, parse_zone_list,
};

// ── GET /api/game/state ────────────────────────────────────────────

/// Handle GET /api/game/state
/// Returns the session read-outs as JSON.
pub fn handle_state_get(_query: &str) -> String {
    export_state_json()
}

// ── GET /api/game/panel ────────────────────────────────────────────

/// Handle GET /api/game/panel
/// Returns the full quiz panel for the current phase.
pub fn handle_panel_get(_query: &str) -> String {
    with_session(|s| render_panel(s, None, false))
}

// ── GET /api/game/zones ────────────────────────────────────────────

/// Handle GET /api/game/zones
/// Returns the zone picker with the default zones pre-selected.
pub fn handle_zones_get(_query: &str) -> String {
    with_session(render_zone_picker)
}

// ── POST /api/game/start ───────────────────────────────────────────

pub fn handle_start_post(_body: &str) -> String {
    let html = with_session_mut(|s| {
        s.start_game();
        render_panel(s, None, false)
    });
    flush_writes(html)
}

// ── POST /api/game/spin ────────────────────────────────────────────

/// Handle POST /api/game/spin
/// Body: `zones=1,3,4` and/or repeated `zone=N` checkbox values. No zones
/// selected → the configured default zones.
pub fn handle_spin_post(body: &str) -> String {
    let params = parse_form_body(body);
    let mut zones = get_param(&params, "zones")
        .map(parse_zone_list)
        .unwrap_or_default();
    for (key, value) in &params {
        if key == "zone" {
            for z in parse_zone_list(value) {
                if !zones.contains(&z) {
                    zones.push(z);
                }
            }
        }
    }

    with_session_mut(|s| {
        let notice = match s.spin(&zones) {
            Some(_) => None,
            None if s.engine.phase() == Phase::GameOver => {
                Some("Game over. Reset your score to play again.")
            }
            None => Some("Finish the current round before spinning again."),
        };
        render_panel(s, notice, false)
    })
}

// ── POST /api/game/round ───────────────────────────────────────────

/// Handle POST /api/game/round
/// Fired by the spinning panel once the wheel animation has run.
pub fn handle_round_post(_body: &str) -> String {
    let html = with_session_mut(|s| match s.begin_round() {
        Ok(_) => render_panel(s, None, false),
        Err(e) => render_panel(s, Some(&e.to_string()), false),
    });
    flush_writes(html)
}

// ── POST /api/game/evaluate ────────────────────────────────────────

/// Handle POST /api/game/evaluate
/// Body: `kind=correct|partial|wrong|timeout`
pub fn handle_evaluate_post(body: &str) -> String {
    let params = parse_form_body(body);
    let kind = get_param(&params, "kind").unwrap_or("");
    let Some(evaluation) = Evaluation::parse(kind) else {
        return error_span("Missing or invalid kind parameter");
    };
    let html = with_session_mut(|s| {
        s.evaluate(evaluation);
        render_panel(s, None, false)
    });
    flush_writes(html)
}

// ── POST /api/game/tick ────────────────────────────────────────────

/// Handle POST /api/game/tick
/// Body: `handle=N` — the timer handle the polling element was rendered with.
///
/// Running → the timer element with the new remaining time.
/// Stale   → empty, which removes the retired polling element.
/// Timeout → empty timer plus the whole panel as an out-of-band swap.
pub fn handle_tick_post(body: &str) -> String {
    let params = parse_form_body(body);
    let Some(handle) = get_param(&params, "handle").and_then(|h| h.parse::<u64>().ok()) else {
        return String::new();
    };
    let html = with_session_mut(|s| match s.tick(TimerHandle(handle)) {
        Tick::Stale => String::new(),
        Tick::Running { remaining } => render_timer(TimerHandle(handle), remaining),
        Tick::TimedOut(_) => render_panel(s, Some("Time's up!"), true),
    });
    flush_writes(html)
}

// ── POST /api/game/acknowledge ─────────────────────────────────────

pub fn handle_acknowledge_post(_body: &str) -> String {
    with_session_mut(|s| {
        s.acknowledge();
        render_panel(s, None, false)
    })
}

// ── POST /api/game/answer ──────────────────────────────────────────

/// Handle POST /api/game/answer
/// Body: `text=...` — saved against the question on screen.
pub fn handle_answer_post(body: &str) -> String {
    let params = parse_form_body(body);
    let text = get_param(&params, "text").unwrap_or("");
    let saved = with_session_mut(|s| s.record_answer(text));
    if !saved {
        return error_span("No question is waiting for an answer");
    }
    flush_writes(r#"<span class="text-xs text-emerald-600">Answer saved</span>"#.to_string())
}

// ── POST /api/game/reset ───────────────────────────────────────────

/// Handle POST /api/game/reset
/// Body: `scope=score` (configured reset policy) or `scope=all`.
pub fn handle_reset_post(body: &str) -> String {
    let params = parse_form_body(body);
    let scope = get_param(&params, "scope").unwrap_or("score");
    let html = with_session_mut(|s| {
        let notice = if scope == "all" {
            s.reset_all();
            "All progress cleared."
        } else {
            s.reset_score();
            "Score reset."
        };
        render_panel(s, Some(notice), false)
    });
    flush_writes(html)
}

// ── POST /api/game/win ─────────────────────────────────────────────

/// Handle POST /api/game/win
/// Dismisses the win banner; play continues with the current score.
pub fn handle_win_post(_body: &str) -> String {
    with_session_mut(|s| {
        s.dismiss_win();
        render_panel(s, None, false)
    })
}

// ── Rendering ──────────────────────────────────────────────────────

/// Render the quiz panel. `oob` marks it for an out-of-band swap so it can
/// ride along with another response (timer expiry).
pub fn render_panel(s: &Session, notice: Option<&str>, oob: bool) -> String {
    let mut html = String::with_capacity(4096);
    let oob_attr = if oob { r#" hx-swap-oob="outerHTML""# } else { "" };
    html.push_str(&format!(
        r#"<div id="quiz-panel" class="p-4 text-kip-drk-sienna"{}>"#,
        oob_attr
    ));

    html.push_str(&render_score_bar(s));
    if s.show_win() {
        html.push_str(&render_win_banner(s));
    }
    if let Some(msg) = notice {
        html.push_str(&format!(
            r#"<div class="text-center text-xs text-kip-red mb-2">{}</div>"#,
            escape_html(msg)
        ));
    }

    match s.engine.phase() {
        Phase::Idle => {
            html.push_str(&render_last_reveal(s));
            html.push_str(&render_zone_picker(s));
        }
        Phase::ZoneSelecting { zone } => html.push_str(&render_spinning(s, zone)),
        Phase::QuestionActive => {
            html.push_str(&render_last_reveal(s));
            html.push_str(&render_question(s));
        }
        Phase::Reviewing => html.push_str(&render_review(s)),
        Phase::RoundComplete => {
            html.push_str(&render_last_reveal(s));
            html.push_str(
                r#"<p class="text-center font-bold my-2">Round complete. Spin again!</p>"#,
            );
            html.push_str(&render_zone_picker(s));
        }
        Phase::GameOver => html.push_str(&render_game_over(s)),
    }

    html.push_str(&render_reset_controls());
    html.push_str("</div>");
    html
}

fn render_score_bar(s: &Session) -> String {
    let points = s.ledger.points();
    let color = if points < 0 { "text-kip-red" } else { "text-emerald-700" };
    format!(
        r#"<div class="flex justify-between text-sm mb-3"><span>Score: <span id="quiz-score" class="font-bold {}">{}</span> / {}</span><span class="text-slate-500">Mastered {} · Mistakes {}</span></div>"#,
        color,
        points,
        s.ledger.target(),
        s.mastery.mastered().len(),
        s.mastery.mistakes().len()
    )
}

fn render_win_banner(s: &Session) -> String {
    format!(
        r##"<div class="bg-amber-100 border border-amber-300 rounded-lg p-3 mb-3 text-center"><p class="text-lg font-bold">You reached {} points!</p><div class="flex justify-center gap-2 mt-2"><button class="px-3 py-1 rounded bg-emerald-600 text-white text-sm" hx-post="/api/game/win" hx-target="#quiz-panel" hx-swap="outerHTML">Continue</button><button class="px-3 py-1 rounded bg-kip-red text-white text-sm" hx-post="/api/game/reset" hx-vals='{{"scope":"score"}}' hx-target="#quiz-panel" hx-swap="outerHTML">Reset score</button></div></div>"##,
        s.ledger.target()
    )
}

/// Zone checkboxes plus the spin button.
pub fn render_zone_picker(s: &Session) -> String {
    let mut html = String::with_capacity(1024);
    html.push_str(
        r##"<form id="zone-picker" hx-post="/api/game/spin" hx-target="#quiz-panel" hx-swap="outerHTML">"##,
    );
    html.push_str(r#"<div class="flex flex-wrap justify-center gap-2 mb-3">"#);
    for zone in s.catalog.zone_ids() {
        let checked = if s.config.default_zones.contains(&zone) {
            " checked"
        } else {
            ""
        };
        html.push_str(&format!(
            r#"<label class="flex items-center gap-1 text-sm border rounded px-2 py-1"><input type="checkbox" name="zone" value="{zone}"{checked}> Zone {zone}</label>"#,
        ));
    }
    html.push_str("</div>");
    html.push_str(
        r#"<div class="text-center"><button type="submit" class="px-4 py-2 rounded bg-kip-red text-white font-bold">Spin the wheel</button></div>"#,
    );
    html.push_str("</form>");
    html
}

/// The wheel is turning; the loader element begins the round after the
/// configured delay.
fn render_spinning(s: &Session, zone: u32) -> String {
    format!(
        r##"<div class="text-center my-4"><p class="text-lg font-bold animate-pulse">Spinning…</p><p class="text-sm">Zone {zone}</p><div hx-post="/api/game/round" hx-trigger="load delay:{delay}ms" hx-target="#quiz-panel" hx-swap="outerHTML"></div></div>"##,
        zone = zone,
        delay = s.config.spin_delay_ms
    )
}

fn render_question(s: &Session) -> String {
    let Some(concept) = s.engine.current_question() else {
        return String::new();
    };
    let round = s.engine.round();
    let timer = s.engine.timer();
    let saved = s.answers.get(concept).unwrap_or("");

    let mut html = String::with_capacity(2048);
    html.push_str(r#"<div class="border rounded-lg p-3 bg-white">"#);
    html.push_str(&format!(
        r#"<div class="flex justify-between text-xs text-slate-500 mb-1"><span>Zone {} · Question {} of {}</span><span>Code {}</span></div>"#,
        concept.zone,
        round.index + 1,
        round.questions.len(),
        concept.code
    ));
    if let Some(handle) = timer.handle() {
        html.push_str(&render_timer(handle, timer.remaining()));
    }
    html.push_str(&format!(
        r#"<p class="text-xl font-bold text-center my-3">{}</p>"#,
        escape_html(&concept.name)
    ));
    html.push_str(&format!(
        r##"<textarea name="text" rows="3" maxlength="2000" placeholder="Explain it in your own words" class="w-full border rounded px-2 py-1 text-sm" hx-post="/api/game/answer" hx-trigger="change, keyup delay:800ms" hx-target="#answer-status">{}</textarea><div id="answer-status" class="h-4"></div>"##,
        escape_html(saved)
    ));
    html.push_str(r#"<div class="grid grid-cols-3 gap-2 mt-2">"#);
    for (kind, label, class) in [
        ("correct", "Got it", "bg-emerald-600"),
        ("partial", "Partly", "bg-amber-500"),
        ("wrong", "Missed", "bg-kip-red"),
    ] {
        html.push_str(&format!(
            r##"<button class="px-2 py-1 rounded text-white text-sm {class}" hx-post="/api/game/evaluate" hx-vals='{{"kind":"{kind}"}}' hx-target="#quiz-panel" hx-swap="outerHTML">{label}</button>"##,
        ));
    }
    html.push_str("</div></div>");
    html
}

/// Countdown element. Polls `/api/game/tick` every second with its own handle
/// and replaces itself with the response.
pub fn render_timer(handle: TimerHandle, remaining: u32) -> String {
    let urgent = if remaining <= 30 { " text-kip-red" } else { "" };
    format!(
        r#"<div id="quiz-timer" class="text-center font-mono text-lg{urgent}" hx-post="/api/game/tick" hx-vals='{{"handle":"{id}"}}' hx-trigger="every 1s" hx-swap="outerHTML">{time}</div>"#,
        urgent = urgent,
        id = handle.0,
        time = format_time(remaining)
    )
}

fn render_review(s: &Session) -> String {
    let Some(reveal) = s.engine.last_reveal() else {
        return String::new();
    };
    let label = match reveal.evaluation {
        Evaluation::Correct => "Correct",
        Evaluation::Partial => "Partly right",
        Evaluation::Wrong => "Not quite",
        Evaluation::Timeout => "Out of time",
    };
    let mut html = String::with_capacity(1024);
    html.push_str(r#"<div class="border border-kip-red rounded-lg p-3 bg-white">"#);
    html.push_str(&format!(
        r#"<p class="text-sm font-bold text-kip-red">{} ({:+})</p>"#,
        label, reveal.delta
    ));
    html.push_str(&format!(
        r#"<p class="text-lg font-bold mt-1">{}</p><p class="text-sm mt-1">{}</p>"#,
        escape_html(&reveal.concept.name),
        escape_html(&reveal.concept.definition)
    ));
    if let Some(answer) = s.answers.get(&reveal.concept) {
        html.push_str(&format!(
            r#"<p class="text-xs text-slate-500 mt-2">Your answer: {}</p>"#,
            escape_html(answer)
        ));
    }
    html.push_str(
        r##"<div class="text-center mt-3"><button class="px-4 py-1 rounded bg-kip-drk-sienna text-white text-sm" hx-post="/api/game/acknowledge" hx-target="#quiz-panel" hx-swap="outerHTML">Continue</button></div>"##,
    );
    html.push_str("</div>");
    html
}

/// One-line recap of the previous answer when no review pause is showing.
fn render_last_reveal(s: &Session) -> String {
    match s.engine.last_reveal() {
        Some(reveal) => format!(
            r#"<p class="text-xs text-slate-500 mb-2"><span class="font-bold">{} ({:+})</span>: {}</p>"#,
            escape_html(&reveal.concept.name),
            reveal.delta,
            escape_html(&reveal.concept.definition)
        ),
        None => String::new(),
    }
}

fn render_game_over(s: &Session) -> String {
    format!(
        r##"<div class="text-center my-4"><p class="text-lg font-bold text-kip-red">Game over</p><p class="text-sm">Your score fell to {}.</p><button class="mt-2 px-4 py-1 rounded bg-kip-red text-white text-sm" hx-post="/api/game/reset" hx-vals='{{"scope":"score"}}' hx-target="#quiz-panel" hx-swap="outerHTML">Reset score</button></div>"##,
        s.ledger.points()
    )
}

fn render_reset_controls() -> String {
    r##"<div class="flex justify-center gap-3 mt-4 text-xs"><button class="underline" hx-post="/api/game/reset" hx-vals='{"scope":"score"}' hx-target="#quiz-panel" hx-swap="outerHTML" hx-confirm="Reset your score?">Reset score</button><button class="underline text-kip-red" hx-post="/api/game/reset" hx-vals='{"scope":"all"}' hx-target="#quiz-panel" hx-swap="outerHTML" hx-confirm="Clear score, mastery and saved answers?">Reset everything</button></div>"##
        .to_string()
}
