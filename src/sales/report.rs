//! Commercial report rendering

use super::table::SalesTable;
use chrono::{Local, NaiveDate};

/// Number of products listed in the "Top produits" section.
const TOP_PRODUCTS: usize = 2;

/// Render the report for today.
pub fn render_report(table: &SalesTable) -> String {
    render_report_on(table, Local::now().date_naive())
}

/// Render the report as of `date`.
pub fn render_report_on(table: &SalesTable, date: NaiveDate) -> String {
    let mut report = format!(
        "📊 RAPPORT COMMERCIAL - {}\n\n\
         Produits analysés : {}\n\
         Ventes totales : {} unités\n\
         CA total : {:.2} €\n\
         Stock total : {} unités\n\n\
         Top produits :\n",
        date.format("%d/%m/%Y"),
        table.len(),
        table.total_units(),
        table.total_revenue(),
        table.total_stock(),
    );

    for product in table.top_by_units(TOP_PRODUCTS) {
        report.push_str(&format!(
            "• {} : {} ventes\n",
            product.name,
            product.total_units()
        ));
    }

    report
}
