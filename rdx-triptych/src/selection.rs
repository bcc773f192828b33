//! Picks the next image for a slot.
//!
//! Everything here is a pure function of its arguments plus the random source
//! handed in by the caller, so a seeded generator makes every choice
//! reproducible.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Chooses the image a slot should rotate to.
///
/// In priority order:
/// 1. An empty pool yields `None`.
/// 2. A single-entry pool yields that entry.
/// 3. A random entry not visible in any slot, if one exists.
/// 4. A random entry different from the slot's `current` image. When the pool
///    only holds copies of `current`, `current` itself is returned.
///
/// So whenever the pool holds more distinct images than are currently
/// visible, the result is never already on screen.
pub fn select_next<'a, R: Rng + ?Sized>(
    pool: &'a [String],
    visible: &HashSet<&str>,
    current: Option<&'a str>,
    rng: &mut R,
) -> Option<&'a str> {
    match pool {
        [] => return None,
        [only] => return Some(only.as_str()),
        _ => {}
    }

    let unseen: Vec<&str> = pool
        .iter()
        .map(String::as_str)
        .filter(|id| !visible.contains(id))
        .collect();
    if let Some(pick) = unseen.choose(rng) {
        return Some(*pick);
    }

    let others: Vec<&str> = pool
        .iter()
        .map(String::as_str)
        .filter(|id| Some(*id) != current)
        .collect();
    others.choose(rng).copied().or(current)
}

/// Draws one entry uniformly from the pool.
pub fn random_image<'a, R: Rng + ?Sized>(pool: &'a [String], rng: &mut R) -> Option<&'a str> {
    pool.choose(rng).map(String::as_str)
}
