// Integration tests (native) for the `animatch` crate.
// These avoid wasm/browser APIs and exercise the public engine the way the
// in-browser driver does, so they run under `cargo test` on the host.

use animatch::engine::{
    BOARD_CELLS, Cell, CellRng, LINE_LEN, MAX_CASCADE_PASSES, boards_differ, resolve_step,
    scan_board, settle, swapped,
};

/// Board with no two equal adjacent cells in any row or column (steps of 3
/// and 5 are units mod 7), so it contains no runs at all.
fn runless_board() -> Vec<Cell> {
    (0..BOARD_CELLS)
        .map(|i| {
            let (r, c) = (i / LINE_LEN, i % LINE_LEN);
            Some((((r * 3 + c * 5) % 7) + 1) as u8)
        })
        .collect()
}

#[test]
fn seeded_random_boards_settle_within_the_cap() {
    for seed in [1u64, 7, 42, 0xDEAD_BEEF] {
        let mut rng = CellRng::new(seed);
        let board = rng.random_board();
        // Presented as-is (initial matches are accepted by design) and then
        // resolved reactively, exactly as the driver does on its first ticks.
        let (stable, passes) = settle(&board, &mut || rng.random_cell())
            .unwrap_or_else(|e| panic!("seed {seed}: {e}"));
        assert!(passes <= MAX_CASCADE_PASSES, "seed {seed} took {passes} passes");
        assert!(scan_board(&stable).is_empty(), "seed {seed} left matches");
        assert!(!boards_differ(&stable, &stable.clone()));
    }
}

#[test]
fn player_swap_creates_and_clears_a_column_run() {
    let mut board = runless_board();
    // Kind 8 never occurs in the base pattern. Park two 8s in column 3
    // (rows 2 and 4) and one just west of the gap between them.
    board[2 * LINE_LEN + 3] = Some(8);
    board[4 * LINE_LEN + 3] = Some(8);
    board[3 * LINE_LEN + 2] = Some(8);
    assert!(scan_board(&board).is_empty(), "setup must start stable");

    // Swap east from (row 3, col 2): column 3 now holds 8s in rows 2..=4.
    let after_swap = swapped(&board, 3 * LINE_LEN + 2, 1);
    let matched = scan_board(&after_swap);
    assert_eq!(
        matched.iter().copied().collect::<Vec<_>>(),
        vec![2 * LINE_LEN + 3, 3 * LINE_LEN + 3, 4 * LINE_LEN + 3]
    );

    // Refill with values that break the run and start nothing new.
    let mut feed = [1u8, 2, 1].into_iter();
    let (next, cleared) = resolve_step(&after_swap, &mut || feed.next().unwrap()).unwrap();
    assert_eq!(cleared, matched);
    assert!(
        scan_board(&next).is_empty(),
        "cascade should end after one pass"
    );
}

#[test]
fn swap_touches_exactly_the_two_exchanged_cells() {
    let board = runless_board();
    let after = swapped(&board, 9, 1);
    assert_eq!(after[9], board[10]);
    assert_eq!(after[10], board[9]);
    let untouched = (0..BOARD_CELLS)
        .filter(|&i| i != 9 && i != 10)
        .all(|i| after[i] == board[i]);
    assert!(untouched);
}

#[test]
fn distinct_seeds_produce_distinct_boards() {
    let a = CellRng::new(3).random_board();
    let b = CellRng::new(4).random_board();
    assert!(boards_differ(&a, &b));
}
