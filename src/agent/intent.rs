//! Keyword routing of questions to local answers
//!
//! Substring checks on the lowercased question, tried in a fixed order. The
//! first match wins, so "stock" questions that also contain "ca" are answered
//! with the revenue.

use crate::sales::SalesTable;

/// What a question asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    BestSeller,
    Revenue,
    ProductList,
    LowStock,
    Overview,
}

impl Intent {
    pub fn classify(question: &str) -> Self {
        let q = question.to_lowercase();
        if q.contains("plus vendu") {
            Intent::BestSeller
        } else if q.contains("chiffre") || q.contains("ca") {
            Intent::Revenue
        } else if q.contains("liste") {
            Intent::ProductList
        } else if q.contains("stock") {
            Intent::LowStock
        } else {
            Intent::Overview
        }
    }
}

/// Answer a question from the table alone.
pub fn answer_locally(table: &SalesTable, question: &str, low_stock_threshold: u32) -> String {
    match Intent::classify(question) {
        Intent::BestSeller => match table.best_seller() {
            Some(p) => format!(
                "Produit le plus vendu : {} ({} unités)",
                p.name,
                p.total_units()
            ),
            None => overview(table),
        },
        Intent::Revenue => format!("Chiffre d'affaires : {:.2} €", table.total_revenue()),
        Intent::ProductList => format!("Produits : {}", table.product_names().join(", ")),
        Intent::LowStock => {
            let low = table.low_stock(low_stock_threshold);
            if low.is_empty() {
                "Stock OK pour tous les produits".to_string()
            } else {
                let names: Vec<&str> = low.iter().map(|p| p.name.as_str()).collect();
                format!("Stock faible : {}", names.join(", "))
            }
        }
        Intent::Overview => overview(table),
    }
}

fn overview(table: &SalesTable) -> String {
    format!(
        "Données disponibles : {} produits, {} ventes totales",
        table.len(),
        table.total_units()
    )
}
