use std::collections::{BTreeSet, HashMap};

/// Index key for the ordered view: score first, member string as tie-breaker,
/// giving a total order (scores compare via `f64::total_cmp`).
#[derive(Debug, Clone)]
struct ScoreKey {
    score: f64,
    member: String,
}

impl Ord for ScoreKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.member.cmp(&other.member))
    }
}

impl PartialOrd for ScoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// Equality must agree with `cmp`, which total_cmp-based ordering does not
// get from a derived float comparison.
impl PartialEq for ScoreKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for ScoreKey {}

/// Set of (member, score) pairs with two indexes kept consistent: a hash map
/// from member to score and an ordered set keyed by (score, member).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SortedSet {
    scores: HashMap<String, f64>,
    ordered: BTreeSet<ScoreKey>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts members that are not already present; existing members keep
    /// their score. Returns the number of newly added members.
    pub fn add<I>(&mut self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut added = 0;

        for (member, score) in pairs {
            if self.scores.contains_key(&member) {
                continue;
            }

            self.scores.insert(member.clone(), score);
            self.ordered.insert(ScoreKey { score, member });
            added += 1;
        }

        added
    }

    pub fn card(&self) -> usize {
        self.scores.len()
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// 0-based position of `member` in score order.
    pub fn rank(&self, member: &str) -> Option<usize> {
        let score = self.score(member)?;
        let key = ScoreKey {
            score,
            member: member.to_string(),
        };

        self.ordered.iter().position(|candidate| *candidate == key)
    }

    /// Members between two ranks, with LRANGE-style negative indices and an
    /// inclusive right bound.
    pub fn range_by_rank(&self, start: i64, stop: i64) -> Vec<String> {
        let length = self.ordered.len() as i64;
        if length == 0 {
            return Vec::new();
        }

        let mut start = if start < 0 { start + length } else { start };
        let mut stop = if stop < 0 { stop + length } else { stop };

        if start < 0 {
            start = 0;
        }
        if stop >= length {
            stop = length - 1;
        }

        if start >= length || stop < 0 || start > stop {
            return Vec::new();
        }

        self.ordered
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .map(|key| key.member.clone())
            .collect()
    }

    /// Members whose score falls inside the closed interval `[min, max]`,
    /// in score order.
    pub fn range_by_score(&self, min: f64, max: f64) -> Vec<(String, f64)> {
        let lower = ScoreKey {
            score: min,
            member: String::new(),
        };

        self.ordered
            .range(lower..)
            .take_while(|key| key.score <= max)
            .map(|key| (key.member.clone(), key.score))
            .collect()
    }

    /// Removes the given members; returns how many were present.
    pub fn remove<'a, I>(&mut self, members: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut removed = 0;

        for member in members {
            let Some(score) = self.scores.remove(member) else {
                continue;
            };

            self.ordered.remove(&ScoreKey {
                score,
                member: member.to_string(),
            });
            removed += 1;
        }

        removed
    }
}
