//! Splitting the article list into bounded chunks for the model.

use crate::models::Article;

/// A contiguous run of articles sent to the model in one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Position of the chunk in processing order.
    pub index: usize,
    pub articles: Vec<Article>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Look up one of this chunk's articles by link.
    pub fn article(&self, link: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.link() == link)
    }
}

/// Partition `articles` into chunks of at most `max_chunk_size`, preserving order.
///
/// A `max_chunk_size` of zero is treated as one.
pub fn split_into_chunks(articles: &[Article], max_chunk_size: usize) -> Vec<Chunk> {
    articles
        .chunks(max_chunk_size.max(1))
        .enumerate()
        .map(|(index, run)| Chunk {
            index,
            articles: run.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn articles(n: usize) -> Vec<Article> {
        (0..n)
            .map(|i| {
                Article::new(
                    format!("Story {i}"),
                    format!("https://example.com/{i}"),
                    "",
                    "example.com",
                    None,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_empty_list_yields_no_chunks() {
        assert!(split_into_chunks(&[], 5).is_empty());
    }

    #[test]
    fn test_short_list_yields_one_chunk() {
        let chunks = split_into_chunks(&articles(3), 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 3);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_chunk_counts_and_order() {
        for n in 0..25 {
            for k in 1..8 {
                let input = articles(n);
                let chunks = split_into_chunks(&input, k);
                assert_eq!(chunks.len(), n.div_ceil(k), "n={n} k={k}");
                if let Some((last, rest)) = chunks.split_last() {
                    assert!(rest.iter().all(|c| c.len() == k));
                    assert!(last.len() >= 1 && last.len() <= k);
                }
                let flattened: Vec<Article> =
                    chunks.iter().flat_map(|c| c.articles.clone()).collect();
                assert_eq!(flattened, input);
                assert!(chunks.iter().enumerate().all(|(i, c)| c.index == i));
            }
        }
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let chunks = split_into_chunks(&articles(2), 0);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_article_lookup() {
        let chunk = &split_into_chunks(&articles(4), 2)[1];
        assert_eq!(chunk.article("https://example.com/3").map(|a| a.title()), Some("Story 3"));
        assert!(chunk.article("https://example.com/0").is_none());
    }
}
