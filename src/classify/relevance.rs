//! Heuristic "how technical is this post" scoring.
//!
//! Three fixed keyword tiers contribute independently: high-signal terms
//! weigh 0.30 each (at most 3 counted), medium 0.15 (at most 4), low 0.05
//! (at most 5). Contributions are summed and clamped to 1.0. Matching is
//! case-insensitive substring containment — deliberately not tokenized, so
//! a keyword inside a longer word still counts.
//!
//! Keyword order matters: each tier stops matching once its cap is reached,
//! so reordering a list can shift scores for borderline texts. Edit with care.

/// Strong signals that a post is about engineering proper.
const HIGH_KEYWORDS: &[&str] = &[
    "rust",
    "kubernetes",
    "typescript",
    "graphql",
    "webassembly",
    "terraform",
    "postgresql",
    "compiler",
    "distributed system",
    "machine learning",
    "deep learning",
    "serverless",
    "docker",
    "react",
    "linux kernel",
    "grpc",
    "observability",
    "concurrency",
];

/// Terms common in technical writing but also in product announcements.
const MEDIUM_KEYWORDS: &[&str] = &[
    "api",
    "backend",
    "frontend",
    "framework",
    "library",
    "database",
    "deploy",
    "cloud",
    "architecture",
    "algorithm",
    "refactor",
    "performance",
    "security",
    "testing",
    "open source",
    "sdk",
    "cli",
    "devops",
    "python",
    "javascript",
    "sql",
    "cache",
    "async",
    "git",
];

/// Weak signals; only meaningful in aggregate.
const LOW_KEYWORDS: &[&str] = &[
    "code",
    "server",
    "web",
    "app",
    "tool",
    "release",
    "update",
    "bug",
    "data",
    "tech",
    "software",
    "develop",
    "engineer",
    "programming",
    "build",
];

const HIGH_WEIGHT: f64 = 0.30;
const HIGH_CAP: usize = 3;
const MEDIUM_WEIGHT: f64 = 0.15;
const MEDIUM_CAP: usize = 4;
const LOW_WEIGHT: f64 = 0.05;
const LOW_CAP: usize = 5;

/// Default cutoff for [`is_relevant`].
pub const RELEVANCE_THRESHOLD: f64 = 0.30;

/// Scores how technical a post looks from its title and summary, in [0, 1].
///
/// A text with zero keyword hits across all tiers scores exactly 0.0.
pub fn score(title: &str, summary: Option<&str>) -> f64 {
    let text = format!("{} {}", title, summary.unwrap_or("")).to_lowercase();

    let total = tier_contribution(&text, HIGH_KEYWORDS, HIGH_WEIGHT, HIGH_CAP)
        + tier_contribution(&text, MEDIUM_KEYWORDS, MEDIUM_WEIGHT, MEDIUM_CAP)
        + tier_contribution(&text, LOW_KEYWORDS, LOW_WEIGHT, LOW_CAP);

    total.min(1.0)
}

/// True when [`score`] meets the relevance threshold.
pub fn is_relevant(title: &str, summary: Option<&str>) -> bool {
    score(title, summary) >= RELEVANCE_THRESHOLD
}

fn tier_contribution(text: &str, keywords: &[&str], weight: f64, cap: usize) -> f64 {
    let mut hits = 0usize;
    for keyword in keywords {
        if text.contains(keyword) {
            hits += 1;
            if hits == cap {
                break;
            }
        }
    }
    hits as f64 * weight
}
