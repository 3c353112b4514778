use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Credits granted by one product, and how long they stay spendable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCredit {
    pub credits: i32,
    pub validity_days: i64,
}

/// Static product-id -> credit grant mapping, read-only at runtime.
///
/// Built from configuration at startup. Products absent from the table grant
/// no credits; processing them records the purchase but credits nothing.
#[derive(Debug, Clone)]
pub struct PlanCreditTable {
    products: HashMap<String, PlanCredit>,
}

impl PlanCreditTable {
    pub fn new(products: HashMap<String, PlanCredit>) -> Self {
        Self { products }
    }

    pub fn get(&self, product_id: &str) -> Option<PlanCredit> {
        self.products.get(product_id).copied()
    }

    /// The plan for a product, only if it actually grants credits.
    pub fn crediting_plan(&self, product_id: &str) -> Option<PlanCredit> {
        self.get(product_id).filter(|plan| plan.credits > 0)
    }
}
