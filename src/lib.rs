//! Animatch core crate.
//!
//! A browser match-3 game compiled to WebAssembly. The pure board logic
//! (run detection, cascade resolution, random generation) lives in
//! [`engine`] and runs anywhere; the canvas / keyboard / overlay glue in
//! the private `board` module only does anything inside a browser and is
//! launched from JS via `start_game()`.

use wasm_bindgen::prelude::*;

pub mod engine;

mod board;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

#[wasm_bindgen]
pub fn start_game() -> Result<(), JsValue> {
    board::start_match_mode()
}
