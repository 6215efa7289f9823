//! Pure match-3 board logic: run detection, cascade resolution, and the
//! board random generator. Everything here is deterministic given its
//! inputs (randomness is injected), free of web APIs, and testable on the
//! host. The wasm presentation layer in `board` drives these functions.

use std::collections::BTreeSet;
use std::fmt;

/// Cells per row / column.
pub const LINE_LEN: usize = 8;
/// Total cells on the 8x8 board (row-major, `index = row * 8 + col`).
pub const BOARD_CELLS: usize = LINE_LEN * LINE_LEN;
/// Number of distinct cell kinds; settled cells hold `1..=CELL_KINDS`.
pub const CELL_KINDS: u8 = 8;
/// Cascade passes allowed before `settle` reports a stuck refill source.
pub const MAX_CASCADE_PASSES: usize = 64;

/// A board cell: a settled kind in `1..=CELL_KINDS`, or `None` while unset
/// (boards mid-generation carry the sentinel transiently).
pub type Cell = Option<u8>;

/// Contiguous same-valued span of >= 3 line-local indices.
pub type Run = Vec<usize>;

/// Find every run of length >= 3 in one row or column, scanned in line
/// order. Fails closed: a line that is not exactly [`LINE_LEN`] long or
/// contains an unset cell reports no runs, so a board mid-generation never
/// produces false matches.
///
/// The scan is greedy: each position counts the equal values following it,
/// records the span when it reaches 3, and jumps past the whole span either
/// way, so overlapping runs are never double-counted and a line of 8 equal
/// values is a single run.
pub fn find_runs(line: &[Cell]) -> Vec<Run> {
    if line.len() != LINE_LEN || line.iter().any(|c| c.is_none()) {
        return Vec::new();
    }
    let mut runs = Vec::new();
    let mut i = 0;
    while i < LINE_LEN {
        let mut count = 1;
        while i + count < LINE_LEN && line[i + count] == line[i] {
            count += 1;
        }
        if count >= 3 {
            runs.push((i..i + count).collect());
        }
        i += count;
    }
    runs
}

/// Scan all 8 rows and 8 columns of a board and return the deduplicated
/// union of absolute indices covered by any run. A cell sitting on both a
/// row run and a column run appears once. Pure; a board that is not exactly
/// [`BOARD_CELLS`] long yields the empty set.
pub fn scan_board(board: &[Cell]) -> BTreeSet<usize> {
    let mut matched = BTreeSet::new();
    if board.len() != BOARD_CELLS {
        return matched;
    }
    for r in 0..LINE_LEN {
        let row = &board[r * LINE_LEN..(r + 1) * LINE_LEN];
        for run in find_runs(row) {
            matched.extend(run.into_iter().map(|off| r * LINE_LEN + off));
        }
    }
    for c in 0..LINE_LEN {
        let col: Vec<Cell> = (0..LINE_LEN).map(|r| board[c + r * LINE_LEN]).collect();
        for run in find_runs(&col) {
            matched.extend(run.into_iter().map(|off| c + off * LINE_LEN));
        }
    }
    matched
}

/// Element-wise structural inequality. A length mismatch counts as
/// "different" rather than an error, so the resolution loop's fixed-point
/// check never raises.
pub fn boards_differ(a: &[Cell], b: &[Cell]) -> bool {
    a.len() != b.len() || a.iter().zip(b).any(|(x, y)| x != y)
}

/// Return a new board with the cells at `index` and `index + delta`
/// exchanged. Boundary legality (staying in range, not wrapping across a
/// row edge) is the caller's responsibility; the swap itself is blind.
pub fn swapped(board: &[Cell], index: usize, delta: isize) -> Vec<Cell> {
    let mut next = board.to_vec();
    let other = (index as isize + delta) as usize;
    next.swap(index, other);
    next
}

/// One cascade pass: clear every matched cell and refill it from
/// `next_cell`. Returns `None` when the board is already stable, or when
/// the refill happened to reproduce the identical board (fixed-point guard
/// against non-progress); otherwise the refilled board together with the
/// set of indices that were cleared.
pub fn resolve_step<F>(board: &[Cell], next_cell: &mut F) -> Option<(Vec<Cell>, BTreeSet<usize>)>
where
    F: FnMut() -> u8,
{
    let matched = scan_board(board);
    if matched.is_empty() {
        return None;
    }
    let mut next = board.to_vec();
    for &i in &matched {
        next[i] = Some(next_cell());
    }
    if !boards_differ(board, &next) {
        return None;
    }
    Some((next, matched))
}

/// The cascade iteration cap was exceeded without reaching a stable board,
/// meaning the refill source stopped making progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeOverflow;

impl fmt::Display for CascadeOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cascade did not settle within {MAX_CASCADE_PASSES} passes")
    }
}

impl std::error::Error for CascadeOverflow {}

/// Run [`resolve_step`] to a fixed point synchronously, returning the
/// stable board and the number of passes taken. Termination is only
/// probabilistic (matched cells are refilled independently at random), so
/// passes are capped at [`MAX_CASCADE_PASSES`]; exceeding the cap is an
/// internal-invariant violation reported as [`CascadeOverflow`].
pub fn settle<F>(board: &[Cell], next_cell: &mut F) -> Result<(Vec<Cell>, usize), CascadeOverflow>
where
    F: FnMut() -> u8,
{
    let mut current = board.to_vec();
    let mut passes = 0;
    while let Some((next, _)) = resolve_step(&current, next_cell) {
        current = next;
        passes += 1;
        if passes > MAX_CASCADE_PASSES {
            return Err(CascadeOverflow);
        }
    }
    Ok((current, passes))
}

/// Xorshift64 generator behind the board's randomness. Seeded explicitly so
/// tests can replay exact cell sequences; the wasm layer seeds it from
/// browser entropy or the clock.
pub struct CellRng {
    state: u64,
}

impl CellRng {
    pub fn new(seed: u64) -> Self {
        // Xorshift has a single absorbing zero state; displace it.
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform kind in `1..=CELL_KINDS` (the modulus divides 2^64 exactly).
    pub fn random_cell(&mut self) -> u8 {
        (self.next_u64() % CELL_KINDS as u64) as u8 + 1
    }

    /// 64 independent draws, no adjacency constraint. A fresh board MAY
    /// already contain matches; the resolution loop clears them on the
    /// first pass rather than generation avoiding them.
    pub fn random_board(&mut self) -> Vec<Cell> {
        (0..BOARD_CELLS).map(|_| Some(self.random_cell())).collect()
    }
}
