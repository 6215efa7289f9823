//! Canvas / keyboard presentation layer for the match-3 board.
//!
//! Everything with real game logic lives in [`crate::engine`]; this module
//! is the browser driver: it owns the single `BoardState`, maps keys to
//! cursor / swap intents, stages one cascade pass per resolve tick so the
//! clears read as little explosions, and repaints via
//! `requestAnimationFrame`. Score, level, and the countdown timer are
//! bookkeeping over the engine's results, shown as DOM overlays.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, window};

use crate::engine::{self, Cell, CellRng, LINE_LEN, MAX_CASCADE_PASSES};

const CANVAS_PX: u32 = 640;

/// Pause between cascade passes; pacing only, the engine could settle
/// synchronously.
const RESOLVE_STEP_MS: f64 = 250.0;
const POP_EFFECT_MS: f64 = 300.0;

const START_TIME_MS: f64 = 120_000.0;
const LEVEL_TIME_BONUS_MS: f64 = 20_000.0;
/// Linear level scaling: one level per this many points.
const LEVEL_SCORE_STEP: i64 = 500;
const CELL_SCORE: i64 = 10;

/// One fill color per cell kind (kinds are `1..=8`).
const KIND_COLORS: [&str; 8] = [
    "#e6553f", "#f2a33c", "#f2d43c", "#62c462", "#3cb8b0", "#4a90d9", "#9b6dd6", "#e06fb2",
];

fn level_for_score(score: i64) -> usize {
    (score / LEVEL_SCORE_STEP) as usize + 1
}

fn remaining_seconds(time_left_ms: f64) -> i64 {
    (time_left_ms / 1000.0).ceil().max(0.0) as i64
}

/// Map an arrow key to a cursor delta, refusing moves that would leave the
/// grid or wrap across a row edge. The engine's swap is blind; this is the
/// boundary check the core delegates to its caller.
fn move_delta(key: &str, cursor: usize) -> Option<isize> {
    let row = cursor / LINE_LEN;
    let col = cursor % LINE_LEN;
    match key {
        "ArrowLeft" if col > 0 => Some(-1),
        "ArrowRight" if col + 1 < LINE_LEN => Some(1),
        "ArrowUp" if row > 0 => Some(-(LINE_LEN as isize)),
        "ArrowDown" if row + 1 < LINE_LEN => Some(LINE_LEN as isize),
        _ => None,
    }
}

// Transient clear-explosion effect drawn over a just-refilled cell.
struct PopEffect {
    index: usize,
    start_ms: f64,
}

/// Runtime game state, single-owner behind the thread-local cell.
struct BoardState {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    board: Vec<Cell>,
    cursor: usize,
    active: bool,
    rng: CellRng,
    // --- Bookkeeping ---
    score: i64,
    level: usize,
    time_left_ms: f64,
    last_frame_ms: f64,
    game_over: bool,
    // --- Staged cascade resolution ---
    resolving: bool,
    next_resolve_ms: f64,
    cascade_passes: usize,
    // --- Visual transient effects ---
    pop_effects: Vec<PopEffect>,
}

#[wasm_bindgen]
pub fn start_match_mode() -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    // Create / reuse the board canvas
    let canvas: HtmlCanvasElement = if let Some(el) = doc.get_element_by_id("am-board-canvas") {
        el.dyn_into()?
    } else {
        let c: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
        c.set_id("am-board-canvas");
        c.set_width(CANVAS_PX);
        c.set_height(CANVAS_PX);
        c.set_attribute("style", "position:fixed; left:50%; top:50%; transform:translate(-50%,-50%); box-shadow:0 0 32px 0 rgba(0,0,0,0.18); border-radius:18px; border:2px solid #222; background:#181818; z-index:20;").ok();
        doc.body()
            .ok_or_else(|| JsValue::from_str("no body"))?
            .append_child(&c)?;
        c
    };
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;

    let now = performance_now();
    let mut rng = CellRng::new(rng_seed());
    let board = rng.random_board();
    let state = BoardState {
        canvas,
        ctx,
        board,
        cursor: 0,
        active: false,
        rng,
        score: 0,
        level: 1,
        time_left_ms: START_TIME_MS,
        last_frame_ms: now,
        game_over: false,
        // A fresh random board may already hold runs; it is shown as-is and
        // resolved reactively by the first ticks.
        resolving: true,
        next_resolve_ms: now,
        cascade_passes: 0,
        pop_effects: Vec::new(),
    };
    BOARD_STATE.with(|b| b.replace(Some(state)));

    ensure_overlay(
        &doc,
        "am-score",
        "Score: 0  Lv 1",
        "position:fixed; top:10px; left:12px; font-family:'Fira Code', monospace; font-size:15px; padding:4px 8px; background:rgba(0,0,0,0.42); border:1px solid #333; border-radius:6px; color:#ffd166; z-index:45; letter-spacing:0.5px;",
    )?;
    ensure_overlay(
        &doc,
        "am-timer",
        "Time: 120s",
        "position:fixed; top:10px; right:12px; font-family:'Fira Code', monospace; font-size:15px; padding:4px 8px; background:rgba(0,0,0,0.42); border:1px solid #333; border-radius:6px; color:#9ad1ff; z-index:45; letter-spacing:0.5px;",
    )?;

    // Keyboard listener: arrows move the cursor, Space arms a swap,
    // Escape disarms it. Moving while armed swaps first, then moves.
    {
        let closure = Closure::wrap(Box::new(move |evt: web_sys::KeyboardEvent| {
            BOARD_STATE.with(|state_cell| {
                if let Some(state) = state_cell.borrow_mut().as_mut() {
                    if state.game_over {
                        return;
                    }
                    let key = evt.key();
                    match key.as_str() {
                        " " => state.active = !state.active,
                        "Escape" => state.active = false,
                        _ => {
                            if let Some(delta) = move_delta(&key, state.cursor) {
                                if state.active {
                                    state.board =
                                        engine::swapped(&state.board, state.cursor, delta);
                                    state.active = false;
                                    begin_resolve(state, performance_now());
                                }
                                state.cursor = (state.cursor as isize + delta) as usize;
                            }
                        }
                    }
                }
            });
        }) as Box<dyn FnMut(_)>);
        doc.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    start_board_loop();
    Ok(())
}

fn ensure_overlay(
    doc: &web_sys::Document,
    id: &str,
    initial_text: &str,
    style: &str,
) -> Result<(), JsValue> {
    if doc.get_element_by_id(id).is_none() {
        if let Some(body) = doc.body() {
            let div = doc.create_element("div")?;
            div.set_id(id);
            div.set_text_content(Some(initial_text));
            div.set_attribute("style", style).ok();
            body.append_child(&div)?;
        }
    }
    Ok(())
}

fn begin_resolve(state: &mut BoardState, now: f64) {
    state.resolving = true;
    state.cascade_passes = 0;
    // Small delay so the swap is visible before the first clear.
    state.next_resolve_ms = now + RESOLVE_STEP_MS;
}

// RefCell::new isn't const on this toolchain; allow Clippy lint until a const initializer is feasible.
thread_local! {
    static BOARD_STATE: std::cell::RefCell<Option<BoardState>> = std::cell::RefCell::new(None);
}

type FrameCallback = std::rc::Rc<std::cell::RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn start_board_loop() {
    let f: FrameCallback = std::rc::Rc::new(std::cell::RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        BOARD_STATE.with(|state_cell| {
            if let Some(state) = state_cell.borrow_mut().as_mut() {
                board_tick(state, ts);
            }
        });
        if let Some(w) = window() {
            let _ =
                w.request_animation_frame(f.borrow().as_ref().unwrap().as_ref().unchecked_ref());
        }
    }) as Box<dyn FnMut(f64)>));
    if let Some(w) = window() {
        let _ = w.request_animation_frame(g.borrow().as_ref().unwrap().as_ref().unchecked_ref());
    }
}

// --- Tick & rendering --------------------------------------------------------

fn board_tick(state: &mut BoardState, now: f64) {
    if !state.game_over {
        let dt = (now - state.last_frame_ms).max(0.0);
        state.time_left_ms -= dt;
        if state.time_left_ms <= 0.0 {
            state.time_left_ms = 0.0;
            state.game_over = true;
            state.active = false;
        }
    }
    state.last_frame_ms = now;

    if !state.game_over && state.resolving && now >= state.next_resolve_ms {
        resolve_tick(state, now);
    }

    state.pop_effects.retain(|e| now - e.start_ms < POP_EFFECT_MS);
    render_board(state, now);

    // Keep DOM overlays (score + timer) in sync each frame
    if let Some(doc) = window().and_then(|w| w.document()) {
        if let Some(el) = doc.get_element_by_id("am-score") {
            el.set_text_content(Some(&format!("Score: {}  Lv {}", state.score, state.level)));
        }
        if let Some(el) = doc.get_element_by_id("am-timer") {
            el.set_text_content(Some(&format!(
                "Time: {}s",
                remaining_seconds(state.time_left_ms)
            )));
        }
    }
}

/// One staged cascade pass: clear + refill the current match set, award
/// score, and schedule the next pass. The engine's fixed-point guard plus
/// the pass cap keep this from spinning.
fn resolve_tick(state: &mut BoardState, now: f64) {
    if state.cascade_passes >= MAX_CASCADE_PASSES {
        // Invariant violation: the refill source stopped making progress.
        web_sys::console::warn_1(&JsValue::from_str(
            "animatch: cascade did not settle within the pass cap; halting resolution",
        ));
        state.resolving = false;
        state.cascade_passes = 0;
        return;
    }
    let rng = &mut state.rng;
    match engine::resolve_step(&state.board, &mut || rng.random_cell()) {
        Some((next, matched)) => {
            state.cascade_passes += 1;
            state.score += matched.len() as i64 * CELL_SCORE * state.level as i64;
            for &index in &matched {
                state.pop_effects.push(PopEffect {
                    index,
                    start_ms: now,
                });
            }
            state.board = next;
            state.next_resolve_ms = now + RESOLVE_STEP_MS;
            let level = level_for_score(state.score);
            if level > state.level {
                state.time_left_ms += LEVEL_TIME_BONUS_MS * (level - state.level) as f64;
                state.level = level;
            }
        }
        None => {
            state.resolving = false;
            state.cascade_passes = 0;
        }
    }
}

fn render_board(state: &mut BoardState, now: f64) {
    let cell_w = state.canvas.width() as f64 / LINE_LEN as f64;
    let cell_h = state.canvas.height() as f64 / LINE_LEN as f64;

    state.ctx.set_fill_style_str("#181818");
    state.ctx.fill_rect(
        0.0,
        0.0,
        state.canvas.width() as f64,
        state.canvas.height() as f64,
    );

    // Grid lines
    state.ctx.set_stroke_style_str("#222");
    state.ctx.set_line_width(2.0);
    for x in 0..=LINE_LEN {
        let fx = x as f64 * cell_w;
        line(&state.ctx, fx, 0.0, fx, state.canvas.height() as f64);
    }
    for y in 0..=LINE_LEN {
        let fy = y as f64 * cell_h;
        line(&state.ctx, 0.0, fy, state.canvas.width() as f64, fy);
    }

    // Cells
    for (idx, cell) in state.board.iter().enumerate() {
        if let Some(kind) = cell {
            let px = (idx % LINE_LEN) as f64 * cell_w;
            let py = (idx / LINE_LEN) as f64 * cell_h;
            state
                .ctx
                .set_fill_style_str(KIND_COLORS[(*kind as usize - 1) % KIND_COLORS.len()]);
            state
                .ctx
                .fill_rect(px + 4.0, py + 4.0, cell_w - 8.0, cell_h - 8.0);
            // Soft top highlight so tiles read as raised
            state.ctx.set_fill_style_str("rgba(255,255,255,0.14)");
            state
                .ctx
                .fill_rect(px + 4.0, py + 4.0, cell_w - 8.0, (cell_h - 8.0) * 0.28);
        }
    }

    // Cursor highlight; brighter when a swap is armed
    {
        let px = (state.cursor % LINE_LEN) as f64 * cell_w;
        let py = (state.cursor / LINE_LEN) as f64 * cell_h;
        if state.active {
            state.ctx.set_fill_style_str("rgba(255,255,255,0.18)");
            state.ctx.fill_rect(px, py, cell_w, cell_h);
            state.ctx.set_stroke_style_str("rgba(255,240,150,0.95)");
            state.ctx.set_line_width(4.0);
        } else {
            state.ctx.set_stroke_style_str("rgba(255,240,150,0.55)");
            state.ctx.set_line_width(3.0);
        }
        state
            .ctx
            .stroke_rect(px + 1.5, py + 1.5, cell_w - 3.0, cell_h - 3.0);
    }

    // Pop effects: expanding fading ring over each just-cleared cell
    for eff in &state.pop_effects {
        let age = now - eff.start_ms;
        let t = (age / POP_EFFECT_MS).clamp(0.0, 1.0);
        let alpha = 1.0 - t;
        if alpha <= 0.0 {
            continue;
        }
        let cx = (eff.index % LINE_LEN) as f64 * cell_w + cell_w / 2.0;
        let cy = (eff.index / LINE_LEN) as f64 * cell_h + cell_h / 2.0;
        let r = (cell_w.min(cell_h)) * (0.15 + 0.40 * t);
        state.ctx.set_line_width(4.0);
        state
            .ctx
            .set_stroke_style_str(&format!("rgba(255,210,120,{alpha})"));
        state.ctx.begin_path();
        state.ctx.arc(cx, cy, r, 0.0, std::f64::consts::TAU).ok();
        state.ctx.stroke();
    }

    // GAME OVER overlay
    if state.game_over {
        state.ctx.set_fill_style_str("rgba(0,0,0,0.55)");
        state.ctx.fill_rect(
            0.0,
            0.0,
            state.canvas.width() as f64,
            state.canvas.height() as f64,
        );
        state.ctx.set_fill_style_str("#ffffff");
        state.ctx.set_font("72px 'Fira Code', monospace");
        state.ctx.set_text_align("center");
        state.ctx.set_line_width(6.0);
        state.ctx.set_stroke_style_str("#000000");
        let cx = state.canvas.width() as f64 / 2.0;
        let cy = state.canvas.height() as f64 / 2.0;
        state.ctx.stroke_text("GAME OVER", cx, cy).ok();
        state.ctx.fill_text("GAME OVER", cx, cy).ok();
        state.ctx.set_font("20px 'Fira Code', monospace");
        state
            .ctx
            .fill_text(&format!("Final score: {}", state.score), cx, cy + 44.0)
            .ok();
    }
}

fn line(ctx: &CanvasRenderingContext2d, x1: f64, y1: f64, x2: f64, y2: f64) {
    ctx.begin_path();
    ctx.move_to(x1, y1);
    ctx.line_to(x2, y2);
    ctx.stroke();
}

fn performance_now() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

fn rng_seed() -> u64 {
    #[cfg(feature = "rng")]
    {
        let mut buf = [0u8; 8];
        if getrandom::getrandom(&mut buf).is_ok() {
            return u64::from_le_bytes(buf);
        }
    }
    performance_now().to_bits() ^ 0xA076_1D64_78BD_642F
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_delta_respects_row_edges() {
        // col 0 cannot go west, col 7 cannot go east
        assert_eq!(move_delta("ArrowLeft", 8), None);
        assert_eq!(move_delta("ArrowRight", 15), None);
        assert_eq!(move_delta("ArrowLeft", 9), Some(-1));
        assert_eq!(move_delta("ArrowRight", 9), Some(1));
    }

    #[test]
    fn move_delta_respects_top_and_bottom() {
        assert_eq!(move_delta("ArrowUp", 3), None);
        assert_eq!(move_delta("ArrowDown", 60), None);
        assert_eq!(move_delta("ArrowUp", 11), Some(-8));
        assert_eq!(move_delta("ArrowDown", 11), Some(8));
    }

    #[test]
    fn move_delta_ignores_unknown_keys() {
        assert_eq!(move_delta("Enter", 27), None);
        assert_eq!(move_delta("a", 27), None);
    }

    #[test]
    fn level_scales_linearly_with_score() {
        assert_eq!(level_for_score(0), 1);
        assert_eq!(level_for_score(499), 1);
        assert_eq!(level_for_score(500), 2);
        assert_eq!(level_for_score(2_600), 6);
    }

    #[test]
    fn remaining_seconds_rounds_up_and_floors_at_zero() {
        assert_eq!(remaining_seconds(120_000.0), 120);
        assert_eq!(remaining_seconds(100.0), 1);
        assert_eq!(remaining_seconds(0.0), 0);
        assert_eq!(remaining_seconds(-50.0), 0);
    }
}
