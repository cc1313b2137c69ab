use faturai_core::category::{CategoryDictionary, OTHER_CATEGORY};
use faturai_core::text::fold;
use faturai_core::Transaction;

struct CompiledCategory {
    name: String,
    keywords: Vec<String>,
}

/// Keyword matcher built from one [`CategoryDictionary`].
///
/// Categories are checked in dictionary order and keywords in stored order;
/// the first keyword found inside the folded description decides the
/// category. A later, more specific keyword never overrides an earlier hit.
pub struct CategoryDetector {
    categories: Vec<CompiledCategory>,
}

impl CategoryDetector {
    pub fn new(dictionary: &CategoryDictionary) -> Self {
        let categories = dictionary
            .categories()
            .iter()
            .map(|c| CompiledCategory {
                name: c.name.clone(),
                keywords: c
                    .keywords
                    .iter()
                    .map(|k| fold(k))
                    .filter(|k| !k.trim().is_empty())
                    .collect(),
            })
            .collect();
        Self { categories }
    }

    pub fn builtin() -> Self {
        Self::new(&CategoryDictionary::builtin())
    }

    pub fn detect(&self, description: &str) -> &str {
        let text = fold(description);
        if text.trim().is_empty() {
            return OTHER_CATEGORY;
        }
        self.categories
            .iter()
            .find(|c| c.keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|c| c.name.as_str())
            .unwrap_or(OTHER_CATEGORY)
    }

    /// Re-runs detection over every transaction, replacing its category.
    /// Returns how many categories changed.
    pub fn recategorize(&self, transactions: &mut [Transaction]) -> usize {
        let mut changed = 0;
        for tx in transactions.iter_mut() {
            let category = self.detect(&tx.description);
            if tx.category != category {
                tx.category = category.to_string();
                changed += 1;
            }
        }
        changed
    }
}
