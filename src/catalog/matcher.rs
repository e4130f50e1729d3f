//! Ingredient matching and suitability scoring over catalog products.

use std::sync::Arc;

use serde::Serialize;

use super::{Product, ProductRepository};
use crate::error::CatalogError;
use crate::rules::ActivesDecision;

/// Options for [`CatalogMatcher::find_candidates`].
#[derive(Debug, Clone, Copy)]
pub struct FindOptions {
    pub limit: usize,
    /// Require every active instead of any.
    pub must_include_all: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            must_include_all: false,
        }
    }
}

impl FindOptions {
    pub fn limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

/// A product scored against an actives decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductScore {
    pub product: Product,
    pub score: i32,
    pub matches: Vec<String>,
    pub conflicts: Vec<String>,
}

/// Matches catalog products against actives.
#[derive(Clone)]
pub struct CatalogMatcher {
    repository: Arc<dyn ProductRepository>,
}

impl CatalogMatcher {
    pub fn new(repository: Arc<dyn ProductRepository>) -> Self {
        Self { repository }
    }

    /// Products containing the actives, most matches first.
    pub async fn find_candidates(
        &self,
        actives: &[String],
        options: FindOptions,
    ) -> Result<Vec<Product>, CatalogError> {
        let products = self.repository.all().await?;
        let actives: Vec<String> = actives.iter().map(|a| a.to_lowercase()).collect();

        let mut scored: Vec<(usize, &Product)> = products
            .iter()
            .map(|p| {
                let matches = actives.iter().filter(|a| p.contains_ingredient(a)).count();
                (matches, p)
            })
            .filter(|(matches, _)| {
                if options.must_include_all {
                    *matches == actives.len()
                } else {
                    *matches > 0
                }
            })
            .collect();
        // Stable sort keeps catalog order among equal match counts.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(options.limit)
            .map(|(_, p)| p.clone())
            .collect())
    }
}

/// Score = matches - 2 * conflicts, highest first.
pub fn score_by_suitability(products: &[Product], decision: &ActivesDecision) -> Vec<ProductScore> {
    let mut scored: Vec<ProductScore> = products
        .iter()
        .map(|p| {
            let matches: Vec<String> = decision
                .recommended
                .iter()
                .filter(|a| p.contains_ingredient(a))
                .cloned()
                .collect();
            let conflicts: Vec<String> = decision
                .blocked
                .iter()
                .filter(|a| p.contains_ingredient(a))
                .cloned()
                .collect();
            ProductScore {
                product: p.clone(),
                score: matches.len() as i32 - 2 * conflicts.len() as i32,
                matches,
                conflicts,
            }
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Positive-scoring products only, truncated to `limit`.
pub fn filter_suitable(
    products: &[Product],
    decision: &ActivesDecision,
    limit: usize,
) -> Vec<ProductScore> {
    score_by_suitability(products, decision)
        .into_iter()
        .filter(|s| s.score > 0)
        .take(limit)
        .collect()
}

/// Hard filter: drop every product whose ingredients contain an allergen
/// substring. Matching is case-insensitive.
pub fn remove_allergens(products: Vec<Product>, allergens: &[String]) -> Vec<Product> {
    let allergens: Vec<String> = allergens
        .iter()
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .collect();
    if allergens.is_empty() {
        return products;
    }
    products
        .into_iter()
        .filter(|p| !allergens.iter().any(|a| p.contains_ingredient(a)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;

    fn fixture() -> Vec<Product> {
        vec![
            Product::new("p1", "BP Wash", &["water", "benzoyl peroxide 5%"]),
            Product::new("p2", "Azelaic Gel", &["azelaic acid", "niacinamide", "fragrance"]),
            Product::new("p3", "Calm Serum", &["niacinamide", "zinc pca"]),
            Product::new("p4", "Plain Lotion", &["water", "glycerin"]),
            Product::new("p5", "Mandelic Peel", &["mandelic acid", "azelaic acid", "niacinamide"]),
        ]
    }

    fn matcher() -> CatalogMatcher {
        CatalogMatcher::new(Arc::new(InMemoryCatalog::new(fixture())))
    }

    fn decision(recommended: &[&str], blocked: &[&str]) -> ActivesDecision {
        ActivesDecision {
            recommended: recommended.iter().map(|s| s.to_string()).collect(),
            blocked: blocked.iter().map(|s| s.to_string()).collect(),
            notes: vec![],
        }
    }

    fn actives(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn candidates_ranked_by_match_count() {
        let found = matcher()
            .find_candidates(
                &actives(&["Niacinamide", "azelaic acid", "mandelic acid"]),
                FindOptions::default(),
            )
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["p5", "p2", "p3"]);
    }

    #[tokio::test]
    async fn candidates_respect_limit_and_must_include_all() {
        let m = matcher();
        let limited = m
            .find_candidates(&actives(&["niacinamide"]), FindOptions::limit(2))
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);

        let all = m
            .find_candidates(
                &actives(&["niacinamide", "azelaic acid"]),
                FindOptions {
                    limit: 10,
                    must_include_all: true,
                },
            )
            .await
            .unwrap();
        let ids: Vec<&str> = all.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p5"]);
    }

    #[test]
    fn conflicts_weigh_double() {
        let scores = score_by_suitability(
            &fixture(),
            &decision(&["niacinamide", "benzoyl peroxide"], &["benzoyl peroxide"]),
        );
        let bp = scores.iter().find(|s| s.product.product_id == "p1").unwrap();
        assert_eq!(bp.score, -1);
        assert_eq!(bp.conflicts, vec!["benzoyl peroxide"]);
        assert!(scores.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn filter_keeps_positive_scores_only() {
        let suitable = filter_suitable(
            &fixture(),
            &decision(&["niacinamide", "benzoyl peroxide"], &["benzoyl peroxide"]),
            5,
        );
        assert!(suitable.iter().all(|s| s.score > 0));
        assert!(suitable.iter().all(|s| s.product.product_id != "p1"));
        assert!(suitable.iter().all(|s| s.product.product_id != "p4"));
        assert_eq!(filter_suitable(&fixture(), &decision(&["niacinamide"], &[]), 1).len(), 1);
    }

    #[test]
    fn allergen_products_never_survive() {
        let safe = remove_allergens(fixture(), &["Fragrance".to_string()]);
        let suitable = filter_suitable(&safe, &decision(&["azelaic acid", "niacinamide"], &[]), 5);
        assert!(suitable.iter().all(|s| !s.product.contains_ingredient("fragrance")));
        assert!(!suitable.is_empty());
    }

    #[test]
    fn allergen_match_is_substring() {
        // Known imprecision: "zinc" also removes "zinc pca".
        let safe = remove_allergens(fixture(), &["zinc".to_string()]);
        assert!(safe.iter().all(|p| p.product_id != "p3"));
        assert_eq!(remove_allergens(fixture(), &[]).len(), 5);
    }
}
