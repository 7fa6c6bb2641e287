//! Sales table and its aggregations

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Stock level under which a product is reported as low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 50;

/// One product row. Field names on disk follow the CSV export headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "Produit")]
    pub name: String,
    #[serde(rename = "Catégorie")]
    pub category: String,
    #[serde(rename = "Ventes_Q1")]
    pub sales_q1: u32,
    #[serde(rename = "Ventes_Q2")]
    pub sales_q2: u32,
    #[serde(rename = "Prix")]
    pub price: f64,
    #[serde(rename = "Stock")]
    pub stock: u32,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        sales_q1: u32,
        sales_q2: u32,
        price: f64,
        stock: u32,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            sales_q1,
            sales_q2,
            price,
            stock,
        }
    }

    /// Units sold over both quarters.
    pub fn total_units(&self) -> u64 {
        u64::from(self.sales_q1) + u64::from(self.sales_q2)
    }

    pub fn revenue(&self) -> f64 {
        self.total_units() as f64 * self.price
    }
}

/// Non-empty set of products
#[derive(Debug, Clone, PartialEq)]
pub struct SalesTable {
    products: Vec<Product>,
}

impl SalesTable {
    /// Build a table from product rows. An empty table is rejected.
    pub fn new(products: Vec<Product>) -> Result<Self> {
        if products.is_empty() {
            return Err(Error::Sales("sales table has no products".to_string()));
        }
        Ok(Self { products })
    }

    /// The built-in demonstration data.
    pub fn demo() -> Self {
        Self {
            products: vec![
                Product::new("Laptop Elite", "Informatique", 156, 142, 1299.99, 45),
                Product::new("Souris Pro", "Périphérique", 342, 367, 79.99, 120),
                Product::new("Clavier Mech", "Périphérique", 198, 213, 149.99, 85),
                Product::new("Écran 4K", "Informatique", 87, 92, 449.99, 32),
            ],
        }
    }

    /// Read a table from a CSV file with the export headers.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let products = reader
            .deserialize()
            .collect::<std::result::Result<Vec<Product>, csv::Error>>()?;
        tracing::debug!(path = %path.display(), products = products.len(), "Sales table loaded");
        Self::new(products)
    }

    /// Write the table as CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for product in &self.products {
            writer.serialize(product)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn product_names(&self) -> Vec<&str> {
        self.products.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn total_units(&self) -> u64 {
        self.products.iter().map(Product::total_units).sum()
    }

    pub fn total_revenue(&self) -> f64 {
        self.products.iter().map(Product::revenue).sum()
    }

    pub fn total_stock(&self) -> u64 {
        self.products.iter().map(|p| u64::from(p.stock)).sum()
    }

    /// Product with the most units sold; the first one wins a tie.
    pub fn best_seller(&self) -> Option<&Product> {
        self.products.iter().fold(None, |best: Option<&Product>, p| match best {
            Some(b) if b.total_units() >= p.total_units() => Some(b),
            _ => Some(p),
        })
    }

    /// Products with stock strictly below `threshold`, in table order.
    pub fn low_stock(&self, threshold: u32) -> Vec<&Product> {
        self.products.iter().filter(|p| p.stock < threshold).collect()
    }

    /// The `n` best-selling products, highest first. Ties keep table order.
    pub fn top_by_units(&self, n: usize) -> Vec<&Product> {
        let mut ranked: Vec<&Product> = self.products.iter().collect();
        ranked.sort_by(|a, b| b.total_units().cmp(&a.total_units()));
        ranked.truncate(n);
        ranked
    }
}

impl fmt::Display for SalesTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16}{:<16}{:>10}{:>10}{:>10}{:>7}",
            "Produit", "Catégorie", "Ventes_Q1", "Ventes_Q2", "Prix", "Stock"
        )?;
        for p in &self.products {
            writeln!(
                f,
                "{:<16}{:<16}{:>10}{:>10}{:>10.2}{:>7}",
                p.name, p.category, p.sales_q1, p.sales_q2, p.price, p.stock
            )?;
        }
        Ok(())
    }
}
