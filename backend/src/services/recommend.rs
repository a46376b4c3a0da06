//! Destination suggestions for a group.
//!
//! The group is reduced to a bag of preference words (the members' preferred
//! activities and destination types) and an average top budget. Each
//! destination becomes a bag of the words in its type, state and name. The
//! score is the cosine similarity of the two bags, plus a small bonus when the
//! destination's starting price fits within 120% of the group budget.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{Destination, User};

/// Words used when no member has stated a preference.
pub const DEFAULT_TAGS: [&str; 3] = ["nature", "city", "relax"];
/// Budget assumed when no member has set one.
pub const DEFAULT_BUDGET: f64 = 5000.0;
pub const BUDGET_TOLERANCE: f64 = 1.2;
pub const BUDGET_BONUS: f64 = 0.1;
pub const DEFAULT_LIMIT: usize = 10;

/// Aggregated preferences of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupProfile {
    pub tags: Vec<String>,
    pub average_budget: f64,
}

impl GroupProfile {
    pub fn from_members(members: &[User]) -> Self {
        let mut tags: Vec<String> = members
            .iter()
            .flat_map(|m| m.preferred_activities.iter().chain(&m.preferred_types))
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        if tags.is_empty() {
            tags = DEFAULT_TAGS.iter().map(|t| t.to_string()).collect();
        }

        let budgets: Vec<f64> = members
            .iter()
            .filter_map(|m| m.budget_max)
            .map(f64::from)
            .collect();
        let average_budget = if budgets.is_empty() {
            DEFAULT_BUDGET
        } else {
            budgets.iter().sum::<f64>() / budgets.len() as f64
        };

        Self {
            tags,
            average_budget,
        }
    }
}

/// A destination with its match score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDestination {
    #[serde(flatten)]
    pub destination: Destination,
    pub similarity: f64,
}

fn bag<'a>(words: impl IntoIterator<Item = &'a str>) -> HashMap<&'a str, u32> {
    let mut counts = HashMap::new();
    for word in words {
        *counts.entry(word).or_insert(0) += 1;
    }
    counts
}

/// Cosine similarity of two word bags; 0 when either is empty.
pub fn cosine_similarity(a: &HashMap<&str, u32>, b: &HashMap<&str, u32>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(word, x)| b.get(word).map(|y| f64::from(*x) * f64::from(*y)))
        .sum();
    let norm = |v: &HashMap<&str, u32>| {
        v.values()
            .map(|c| f64::from(*c).powi(2))
            .sum::<f64>()
            .sqrt()
    };
    let (na, nb) = (norm(a), norm(b));
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

fn destination_words(dest: &Destination) -> String {
    format!(
        "{} {} {}",
        dest.kind.as_deref().unwrap_or(""),
        dest.state.as_deref().unwrap_or(""),
        dest.name
    )
    .to_lowercase()
}

pub fn score(profile: &GroupProfile, dest: &Destination) -> f64 {
    let group_bag = bag(profile.tags.iter().map(String::as_str));
    let text = destination_words(dest);
    let dest_bag = bag(text.split_whitespace());
    let mut similarity = cosine_similarity(&group_bag, &dest_bag);

    let price = f64::from(dest.price_min.unwrap_or(0));
    if price <= profile.average_budget * BUDGET_TOLERANCE {
        similarity += BUDGET_BONUS;
    }
    similarity
}

/// Top `limit` destinations by score, best first. Equal scores keep catalog order.
pub fn rank_destinations(
    profile: &GroupProfile,
    destinations: Vec<Destination>,
    limit: usize,
) -> Vec<ScoredDestination> {
    let mut scored: Vec<ScoredDestination> = destinations
        .into_iter()
        .map(|destination| ScoredDestination {
            similarity: score(profile, &destination),
            destination,
        })
        .collect();
    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(limit);
    scored
}
