// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text differencer: token-set arithmetic over whitespace-separated words.
//
// This is a cheap approximation of an edit distance. It has no notion of word
// order or position, and `modifications` merely balances the add/delete
// tallies: it does not pair a removed word with the word that replaced it.

use std::collections::HashSet;

use pagediff_core::TextDelta;

/// Compare two page texts word by word.
///
/// Additions are tokens of `second` absent from the set of `first`'s tokens,
/// counted once per occurrence; deletions are the mirror image. The smaller of
/// the two raw tallies is reported as modifications and subtracted from both.
pub fn compare_text(first: &str, second: &str) -> TextDelta {
    let tokens_a: Vec<&str> = first.split_whitespace().collect();
    let tokens_b: Vec<&str> = second.split_whitespace().collect();

    let set_a: HashSet<&str> = tokens_a.iter().copied().collect();
    let set_b: HashSet<&str> = tokens_b.iter().copied().collect();

    let raw_additions = tokens_b.iter().filter(|word| !set_a.contains(*word)).count();
    let raw_deletions = tokens_a.iter().filter(|word| !set_b.contains(*word)).count();

    let modifications = raw_additions.min(raw_deletions);

    TextDelta {
        additions: raw_additions - modifications,
        deletions: raw_deletions - modifications,
        modifications,
    }
}
