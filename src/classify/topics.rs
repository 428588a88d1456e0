//! Topic tagging from a fixed ten-topic taxonomy.
//!
//! Every keyword hit counts as one vote for its topic; the two topics with
//! the most votes become the main and sub tags. Ties resolve to the topic
//! declared first in [`TAXONOMY`], so declaration order is part of the
//! contract.

use serde::Serialize;

use crate::feed::entities::decode_entities;
use crate::util::text::strip_tags;

/// The fixed topic taxonomy. Declaration order breaks ranking ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Ai,
    Frontend,
    Backend,
    Mobile,
    Infrastructure,
    Data,
    Security,
    Languages,
    Design,
    Career,
}

impl Topic {
    /// Stable string form used in storage and the read API.
    pub fn slug(self) -> &'static str {
        match self {
            Topic::Ai => "ai",
            Topic::Frontend => "frontend",
            Topic::Backend => "backend",
            Topic::Mobile => "mobile",
            Topic::Infrastructure => "infrastructure",
            Topic::Data => "data",
            Topic::Security => "security",
            Topic::Languages => "languages",
            Topic::Design => "design",
            Topic::Career => "career",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Topic> {
        TAXONOMY
            .iter()
            .map(|(topic, _)| *topic)
            .find(|t| t.slug() == slug)
    }
}

/// Keyword lists per topic. Matching is substring containment over the
/// lowercased, entity-decoded, tag-stripped text, so multi-word phrases work.
const TAXONOMY: &[(Topic, &[&str])] = &[
    (
        Topic::Ai,
        &[
            "machine learning",
            "deep learning",
            "llm",
            "neural",
            "chatgpt",
            "generative",
            "transformer",
            "prompt",
            "inference",
            "embedding",
        ],
    ),
    (
        Topic::Frontend,
        &[
            "react", "vue", "svelte", "css", "frontend", "javascript", "typescript", "next.js",
            "browser", "dom",
        ],
    ),
    (
        Topic::Backend,
        &[
            "api",
            "backend",
            "golang",
            "rails",
            "django",
            "spring boot",
            "node.js",
            "microservice",
            "grpc",
            "graphql",
        ],
    ),
    (
        Topic::Mobile,
        &[
            "ios",
            "android",
            "swift",
            "kotlin",
            "flutter",
            "react native",
            "mobile",
            "app store",
        ],
    ),
    (
        Topic::Infrastructure,
        &[
            "kubernetes",
            "docker",
            "terraform",
            "aws",
            "gcp",
            "azure",
            "infrastructure",
            "devops",
            "ci/cd",
            "serverless",
            "observability",
        ],
    ),
    (
        Topic::Data,
        &[
            "sql",
            "database",
            "postgres",
            "mysql",
            "redis",
            "data pipeline",
            "etl",
            "bigquery",
            "analytics",
            "kafka",
        ],
    ),
    (
        Topic::Security,
        &[
            "security",
            "vulnerability",
            "cve",
            "encryption",
            "oauth",
            "xss",
            "csrf",
            "phishing",
            "zero-day",
            "pentest",
        ],
    ),
    (
        Topic::Languages,
        &[
            "rust",
            "python",
            "haskell",
            "compiler",
            "type system",
            "garbage collect",
            "functional programming",
            "scala",
            "elixir",
            "webassembly",
        ],
    ),
    (
        Topic::Design,
        &[
            "design system",
            "ui design",
            "ux",
            "figma",
            "typography",
            "accessibility",
            "usability",
            "prototype",
            "wireframe",
        ],
    ),
    (
        Topic::Career,
        &[
            "career",
            "hiring",
            "interview",
            "onboarding",
            "leadership",
            "management",
            "team building",
            "remote work",
            "mentoring",
        ],
    ),
];

/// The main and optional secondary topic assigned to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TopicPair {
    pub main: Option<Topic>,
    pub sub: Option<Topic>,
}

/// Assigns up to two topic tags by keyword-match voting.
///
/// Deterministic: identical input always yields the same pair. Topics with
/// zero matches never rank; with a single matching topic `sub` is `None`;
/// with none, both are `None`.
pub fn classify(title: &str, summary: Option<&str>) -> TopicPair {
    let raw = format!("{} {}", title, summary.unwrap_or(""));
    let text = strip_tags(&decode_entities(&raw)).to_lowercase();

    let mut ranked: Vec<(Topic, usize)> = TAXONOMY
        .iter()
        .map(|(topic, keywords)| {
            let votes = keywords.iter().filter(|kw| text.contains(*kw)).count();
            (*topic, votes)
        })
        .filter(|(_, votes)| *votes > 0)
        .collect();

    // Stable sort: equal vote counts keep taxonomy declaration order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    TopicPair {
        main: ranked.first().map(|(t, _)| *t),
        sub: ranked.get(1).map(|(t, _)| *t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_matches_yields_empty_pair() {
        let pair = classify("gardening for beginners", None);
        assert_eq!(pair.main, None);
        assert_eq!(pair.sub, None);
    }

    #[test]
    fn test_single_topic_no_sub() {
        let pair = classify("Understanding the borrow checker in Rust", None);
        assert_eq!(pair.main, Some(Topic::Languages));
        assert_eq!(pair.sub, None);
    }

    #[test]
    fn test_two_topics_ranked_by_votes() {
        // Three infrastructure hits, one data hit
        let pair = classify(
            "Kubernetes and Terraform on AWS",
            Some("with a postgres backing store"),
        );
        assert_eq!(pair.main, Some(Topic::Infrastructure));
        assert_eq!(pair.sub, Some(Topic::Data));
    }

    #[test]
    fn test_tie_broken_by_declaration_order() {
        // One Frontend vote and one Data vote; Frontend is declared first
        let pair = classify("css tricks for redis dashboards", None);
        assert_eq!(pair.main, Some(Topic::Frontend));
        assert_eq!(pair.sub, Some(Topic::Data));
    }

    #[test]
    fn test_deterministic() {
        let a = classify("Docker security hardening", Some("scanning for cve"));
        let b = classify("Docker security hardening", Some("scanning for cve"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_entities_and_tags_stripped_before_matching() {
        // "&lt;b&gt;rust&lt;/b&gt;" decodes to "<b>rust</b>", strips to "rust"
        let pair = classify("&lt;b&gt;rust&lt;/b&gt;", None);
        assert_eq!(pair.main, Some(Topic::Languages));
    }

    #[test]
    fn test_slug_round_trip() {
        for (topic, _) in TAXONOMY {
            assert_eq!(Topic::from_slug(topic.slug()), Some(*topic));
        }
        assert_eq!(Topic::from_slug("nope"), None);
    }
}
