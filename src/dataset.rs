//! Conjunto de reseñas en memoria y sus agregaciones por producto y categoría.

use std::collections::BTreeMap;

use crate::models::{CategoryProperties, ProductProperties, ProductReview, SentimentDistribution};

/// Reseñas cargadas del CSV junto con los valores únicos derivados,
/// en orden de primera aparición.
#[derive(Debug, Clone, Default)]
pub struct ReviewDataset {
    pub reviews: Vec<ProductReview>,
    pub unique_products: Vec<String>,
    pub unique_categories: Vec<String>,
    pub features: Vec<String>,
}

/// Agregado de todas las reseñas de un producto.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDocument {
    pub product: String,
    pub category: String,
    pub reviews: Vec<String>,
    pub features: Vec<String>,
    pub attributes: Vec<String>,
    pub average_rating: f64,
    pub review_count: usize,
}

/// Agregado de todos los productos de una categoría.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDocument {
    pub category: String,
    pub products: Vec<String>,
    pub features: Vec<String>,
    pub attributes: Vec<String>,
    pub average_rating: f64,
    pub review_count: usize,
}

impl ReviewDataset {
    pub fn from_reviews(reviews: Vec<ProductReview>) -> Self {
        let unique_products = unique_values(reviews.iter().map(|r| r.product.as_str()));
        let unique_categories = unique_values(reviews.iter().map(|r| r.category.as_str()));
        let features = unique_values(reviews.iter().map(|r| r.feature_mentioned.as_str()));

        Self {
            reviews,
            unique_products,
            unique_categories,
            features,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn reviews_for_product<'a>(&'a self, product: &'a str) -> impl Iterator<Item = &'a ProductReview> + 'a {
        self.reviews.iter().filter(move |r| r.product == product)
    }

    pub fn reviews_in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a ProductReview> + 'a {
        self.reviews.iter().filter(move |r| r.category == category)
    }

    /// Agrupa por producto con las claves ordenadas.
    pub fn product_documents(&self) -> Vec<ProductDocument> {
        let mut groups: BTreeMap<&str, Vec<&ProductReview>> = BTreeMap::new();
        for review in &self.reviews {
            groups.entry(review.product.as_str()).or_default().push(review);
        }

        groups
            .into_iter()
            .map(|(product, rows)| ProductDocument {
                product: product.to_string(),
                category: rows[0].category.clone(),
                reviews: rows.iter().map(|r| r.review_text.clone()).collect(),
                features: unique_values(rows.iter().map(|r| r.feature_mentioned.as_str())),
                attributes: unique_values(rows.iter().map(|r| r.attribute_mentioned.as_str())),
                average_rating: mean_rating(rows.iter().copied()),
                review_count: rows.len(),
            })
            .collect()
    }

    pub fn product_document(&self, product: &str) -> Option<ProductDocument> {
        let rows: Vec<&ProductReview> = self.reviews_for_product(product).collect();
        let first = rows.first()?;

        Some(ProductDocument {
            product: product.to_string(),
            category: first.category.clone(),
            reviews: rows.iter().map(|r| r.review_text.clone()).collect(),
            features: unique_values(rows.iter().map(|r| r.feature_mentioned.as_str())),
            attributes: unique_values(rows.iter().map(|r| r.attribute_mentioned.as_str())),
            average_rating: mean_rating(rows.iter().copied()),
            review_count: rows.len(),
        })
    }

    pub fn category_document(&self, category: &str) -> Option<CategoryDocument> {
        let rows: Vec<&ProductReview> = self.reviews_in_category(category).collect();
        if rows.is_empty() {
            return None;
        }

        Some(CategoryDocument {
            category: category.to_string(),
            products: unique_values(rows.iter().map(|r| r.product.as_str())),
            features: unique_values(rows.iter().map(|r| r.feature_mentioned.as_str())),
            attributes: unique_values(rows.iter().map(|r| r.attribute_mentioned.as_str())),
            average_rating: mean_rating(rows.iter().copied()),
            review_count: rows.len(),
        })
    }

    /// Documentos de categoría en orden de primera aparición.
    pub fn category_documents(&self) -> Vec<CategoryDocument> {
        self.unique_categories
            .iter()
            .filter_map(|c| self.category_document(c))
            .collect()
    }

    pub fn product_properties(&self, product: &str) -> Option<ProductProperties> {
        let doc = self.product_document(product)?;
        let mut sentiment = SentimentDistribution::default();
        for review in self.reviews_for_product(product) {
            match review.sentiment.as_str() {
                "positive" => sentiment.positive += 1,
                "neutral" => sentiment.neutral += 1,
                "negative" => sentiment.negative += 1,
                _ => {}
            }
        }

        Some(ProductProperties {
            product_name: doc.product,
            category: doc.category,
            average_rating: doc.average_rating,
            total_reviews: doc.review_count,
            features: doc.features,
            attributes: doc.attributes,
            sentiment_distribution: sentiment,
        })
    }

    pub fn category_properties(&self, category: &str) -> Option<CategoryProperties> {
        let doc = self.category_document(category)?;
        Some(CategoryProperties {
            category: doc.category,
            products_in_category: doc.products,
            average_category_rating: doc.average_rating,
            total_category_reviews: doc.review_count,
            common_features: doc.features,
            common_attributes: doc.attributes,
        })
    }
}

/// Media de las valoraciones presentes; `NaN` si no hay ninguna.
pub fn mean_rating<'a>(rows: impl Iterator<Item = &'a ProductReview>) -> f64 {
    let (sum, count) = rows
        .filter_map(|r| r.rating)
        .fold((0.0, 0usize), |(sum, count), rating| (sum + rating, count + 1));

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

fn unique_values<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn review(product: &str, category: &str, feature: &str, rating: Option<f64>, sentiment: &str) -> ProductReview {
        ProductReview {
            product: product.to_string(),
            category: category.to_string(),
            review_text: format!("{product} review about {feature}"),
            feature_mentioned: feature.to_string(),
            attribute_mentioned: format!("{feature} quality"),
            rating,
            sentiment: sentiment.to_string(),
        }
    }

    pub fn sample_dataset() -> ReviewDataset {
        ReviewDataset::from_reviews(vec![
            review("EchoBuds Pro", "Audio", "battery life", Some(4.0), "positive"),
            review("EchoBuds Pro", "Audio", "sound quality", Some(5.0), "positive"),
            review("PixelWave 8", "Smartphones", "camera", Some(2.0), "negative"),
            review("EchoBuds Pro", "Audio", "battery life", Some(3.0), "neutral"),
            review("AeroBook Air", "Laptops", "keyboard", None, "neutral"),
        ])
    }
}
