//! Merging per-chunk section lists into one ordered taxonomy.
//!
//! The reduction walks chunks in order and their sections in order:
//!
//! 1. A heading's key is its trimmed, lowercased text. The first occurrence
//!    of a key fixes the section's position and its display text.
//! 2. Items are appended to their section unless their link has already been
//!    placed anywhere in the report (first occurrence wins, across headings).
//! 3. Sections left without items are dropped.

use std::collections::{HashMap, HashSet};

use crate::models::Section;

fn heading_key(heading: &str) -> String {
    heading.trim().to_lowercase()
}

/// Merge section lists given in chunk order.
pub fn merge_sections<I>(chunks: I) -> Vec<Section>
where
    I: IntoIterator<Item = Vec<Section>>,
{
    let mut merged: Vec<Section> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut placed: HashSet<String> = HashSet::new();

    for sections in chunks {
        for section in sections {
            let key = heading_key(&section.heading);
            let position = *positions.entry(key).or_insert_with(|| {
                merged.push(Section::new(section.heading.trim(), Vec::new()));
                merged.len() - 1
            });
            for item in section.items {
                if placed.insert(item.link.clone()) {
                    merged[position].items.push(item);
                }
            }
        }
    }

    merged.retain(|s| !s.items.is_empty());
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategorizedItem, CoverageType, Tier};

    fn item(n: usize, tier: Tier) -> CategorizedItem {
        CategorizedItem {
            title: format!("Story {n}"),
            link: format!("https://example.com/{n}"),
            source: "example.com".to_string(),
            tier,
            coverage_type: CoverageType::Headline,
        }
    }

    fn section(heading: &str, links: &[usize]) -> Section {
        Section::new(heading, links.iter().map(|n| item(*n, Tier::Top)).collect())
    }

    fn links(section: &Section) -> Vec<String> {
        section.items.iter().map(|i| i.link.clone()).collect()
    }

    #[test]
    fn test_two_chunks_same_heading() {
        let merged = merge_sections(vec![
            vec![section("Headlines", &[0, 1, 2])],
            vec![section("Headlines", &[3, 4, 5])],
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].heading, "Headlines");
        assert_eq!(
            links(&merged[0]),
            (0..6).map(|n| format!("https://example.com/{n}")).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_headings_match_case_insensitively() {
        let merged = merge_sections(vec![
            vec![section(" Industry News ", &[0])],
            vec![section("industry news", &[1]), section("INDUSTRY NEWS", &[2])],
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].heading, "Industry News");
        assert_eq!(merged[0].items.len(), 3);
    }

    #[test]
    fn test_order_is_first_appearance() {
        let merged = merge_sections(vec![
            vec![section("B", &[0]), section("A", &[1])],
            vec![section("C", &[2]), section("B", &[3]), section("A", &[4])],
        ]);
        let headings: Vec<&str> = merged.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["B", "A", "C"]);
        assert_eq!(links(&merged[0]), vec!["https://example.com/0", "https://example.com/3"]);
    }

    #[test]
    fn test_dedup_is_global_and_first_wins() {
        let mut late = section("Mentions", &[1, 2]);
        late.items[0].tier = Tier::Low;
        let merged = merge_sections(vec![vec![section("Headlines", &[0, 1])], vec![late]]);
        assert_eq!(merged.len(), 2);
        assert_eq!(links(&merged[0]), vec!["https://example.com/0", "https://example.com/1"]);
        assert_eq!(merged[0].items[1].tier, Tier::Top);
        assert_eq!(links(&merged[1]), vec!["https://example.com/2"]);
    }

    #[test]
    fn test_sections_emptied_by_dedup_are_dropped() {
        let merged = merge_sections(vec![
            vec![section("Headlines", &[0, 1])],
            vec![section("Repeats", &[0, 1]), section("Empty", &[])],
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].heading, "Headlines");
    }

    #[test]
    fn test_remerging_own_output_is_stable() {
        let once = merge_sections(vec![
            vec![section("Headlines", &[0, 1]), section("Mentions", &[2])],
            vec![section("mentions", &[3]), section("Opinion", &[4, 0])],
        ]);
        let twice = merge_sections(vec![once.clone(), once.clone()]);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_merge_of_nothing() {
        assert!(merge_sections(Vec::<Vec<Section>>::new()).is_empty());
    }
}
