//! Edit distance between user input and candidate names.
//!
//! The raw kernel is the optimal-string-alignment form of Damerau-Levenshtein
//! (insert, delete, substitute and adjacent transposition all cost 1).
//! [`name_distance`] wraps it with the rules that make typed prefixes cheap.

/// Score given to input that runs past the end of a name it fully contains.
const OVERSHOOT_CAP: usize = 2;

/// Damerau-Levenshtein (optimal string alignment) distance between `a` and `b`.
///
/// An empty side scores the length of the other side, so only two empty
/// strings are at distance zero.
pub fn damerau_levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    osa(&a, &b)
}

fn osa(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return a.len().max(b.len());
    }

    let width = b.len() + 1;
    let mut table = vec![0usize; (a.len() + 1) * width];
    for i in 0..=a.len() {
        table[i * width] = i;
    }
    for (j, cell) in table.iter_mut().enumerate().take(width) {
        *cell = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (table[(i - 1) * width + j] + 1)
                .min(table[i * width + j - 1] + 1)
                .min(table[(i - 1) * width + j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(table[(i - 2) * width + j - 2] + 1);
            }
            table[i * width + j] = best;
        }
    }

    table[a.len() * width + b.len()]
}

/// Distance from what the user typed (`query`) to one candidate `name`.
///
/// Comparison is case-insensitive. Identical strings score 0. When the name
/// is longer than the query only its first `len(query)` characters are
/// compared, so the untyped suffix never matters; a name that starts with the
/// whole query scores 1. A query that overshoots a name it starts with is
/// capped at 2.
pub fn name_distance(query: &str, name: &str) -> usize {
    let query: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
    let name: Vec<char> = name.chars().flat_map(char::to_lowercase).collect();

    if query == name {
        return 0;
    }
    if query.is_empty() || name.is_empty() {
        return query.len().max(name.len());
    }
    if name.len() > query.len() {
        if name.starts_with(&query) {
            return 1;
        }
        return osa(&query, &name[..query.len()]);
    }

    let full = osa(&query, &name);
    if query.starts_with(&name) {
        full.min(OVERSHOOT_CAP)
    } else {
        full
    }
}

/// Smallest [`name_distance`] from `query` to any of `names`.
///
/// Returns `usize::MAX` when `names` is empty.
pub fn item_distance<'a>(query: &str, names: impl IntoIterator<Item = &'a str>) -> usize {
    names
        .into_iter()
        .map(|name| name_distance(query, name))
        .min()
        .unwrap_or(usize::MAX)
}
