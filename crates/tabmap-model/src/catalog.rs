//! The standard field catalog.
//!
//! Source columns are mapped onto these canonical target attributes. The
//! catalog is always loaded whole - a single file may straddle several
//! domains (an order export with embedded supplier columns, for example) -
//! and the curated alias lists double as the exact-match table for the
//! deterministic fallback mapper.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::column::DeclaredType;

/// Target domain a standard field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldDomain {
    Inventory,
    Orders,
    Suppliers,
    Products,
    Recipes,
    Customers,
}

impl FieldDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Orders => "orders",
            Self::Suppliers => "suppliers",
            Self::Products => "products",
            Self::Recipes => "recipes",
            Self::Customers => "customers",
        }
    }
}

impl fmt::Display for FieldDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical target attribute that source columns map onto.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardField {
    /// Canonical name, e.g. `unit_cost`.
    pub name: String,
    /// Human-readable label for prompts and review UIs.
    pub label: String,
    pub domain: FieldDomain,
    pub data_type: DeclaredType,
    /// Known source-column spellings for this field, lowercase.
    pub aliases: Vec<String>,
}

/// The full catalog across all domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCatalog {
    pub fields: Vec<StandardField>,
}

impl FieldCatalog {
    /// Builds the built-in catalog.
    pub fn builtin() -> Self {
        let mut fields = Vec::new();
        for (domain, entries) in builtin_entries() {
            for (name, label, data_type, aliases) in *entries {
                fields.push(StandardField {
                    name: (*name).to_string(),
                    label: (*label).to_string(),
                    domain: *domain,
                    data_type: *data_type,
                    aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
                });
            }
        }
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&StandardField> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn fields_for_domain(&self, domain: FieldDomain) -> Vec<&StandardField> {
        self.fields.iter().filter(|f| f.domain == domain).collect()
    }
}

type Entry = (
    &'static str,
    &'static str,
    DeclaredType,
    &'static [&'static str],
);

#[allow(clippy::too_many_lines)]
fn builtin_entries() -> &'static [(FieldDomain, &'static [Entry])] {
    use DeclaredType::{Date, Float, Integer, Text};
    &[
        (
            FieldDomain::Inventory,
            &[
                (
                    "sku_code",
                    "SKU / item code",
                    Text,
                    &[
                        "sku",
                        "sku_code",
                        "item_code",
                        "product_code",
                        "stock_code",
                        "upc",
                        "barcode",
                        "item_number",
                        "part_number",
                    ],
                ),
                (
                    "item_name",
                    "Item name",
                    Text,
                    &[
                        "item_name",
                        "item",
                        "product_name",
                        "product",
                        "description",
                        "title",
                    ],
                ),
                (
                    "quantity_on_hand",
                    "Quantity on hand",
                    Float,
                    &[
                        "quantity_on_hand",
                        "qty",
                        "quantity",
                        "stock",
                        "on_hand",
                        "stock_level",
                        "units_in_stock",
                        "count",
                    ],
                ),
                (
                    "unit_cost",
                    "Unit cost",
                    Float,
                    &["unit_cost", "cost", "cost_per_unit", "purchase_price"],
                ),
                (
                    "unit_price",
                    "Unit sale price",
                    Float,
                    &["unit_price", "price", "sale_price", "retail_price"],
                ),
                (
                    "reorder_point",
                    "Reorder point",
                    Float,
                    &["reorder_point", "reorder_level", "min_stock", "par_level"],
                ),
                (
                    "unit_of_measure",
                    "Unit of measure",
                    Text,
                    &["unit_of_measure", "uom", "unit", "measure"],
                ),
                (
                    "category",
                    "Category",
                    Text,
                    &["category", "group", "class", "department"],
                ),
                (
                    "location",
                    "Storage location",
                    Text,
                    &["location", "warehouse", "bin", "aisle", "storage"],
                ),
                (
                    "expiration_date",
                    "Expiration date",
                    Date,
                    &[
                        "expiration_date",
                        "expiry",
                        "expiry_date",
                        "best_by",
                        "use_by",
                    ],
                ),
                (
                    "received_date",
                    "Received date",
                    Date,
                    &["received_date", "date_received", "received"],
                ),
            ],
        ),
        (
            FieldDomain::Orders,
            &[
                (
                    "order_number",
                    "Order number",
                    Text,
                    &[
                        "order_number",
                        "order_id",
                        "order_no",
                        "po_number",
                        "invoice_number",
                    ],
                ),
                (
                    "order_date",
                    "Order date",
                    Date,
                    &["order_date", "ordered", "date_ordered", "purchase_date"],
                ),
                (
                    "customer_name",
                    "Customer name",
                    Text,
                    &["customer_name", "customer", "client", "buyer"],
                ),
                (
                    "total_amount",
                    "Order total",
                    Float,
                    &[
                        "total_amount",
                        "total",
                        "amount",
                        "order_total",
                        "grand_total",
                    ],
                ),
                (
                    "order_status",
                    "Order status",
                    Text,
                    &["order_status", "status", "state", "fulfillment_status"],
                ),
                (
                    "quantity_ordered",
                    "Quantity ordered",
                    Float,
                    &["quantity_ordered", "qty_ordered", "order_qty"],
                ),
                (
                    "ship_date",
                    "Ship date",
                    Date,
                    &["ship_date", "shipped", "delivery_date", "shipped_date"],
                ),
                (
                    "discount_amount",
                    "Discount",
                    Float,
                    &["discount_amount", "discount", "promo_amount"],
                ),
                (
                    "tax_amount",
                    "Tax",
                    Float,
                    &["tax_amount", "tax", "vat", "sales_tax"],
                ),
            ],
        ),
        (
            FieldDomain::Suppliers,
            &[
                (
                    "supplier_name",
                    "Supplier name",
                    Text,
                    &[
                        "supplier_name",
                        "supplier",
                        "vendor",
                        "vendor_name",
                        "manufacturer",
                    ],
                ),
                (
                    "contact_email",
                    "Contact email",
                    Text,
                    &["contact_email", "email", "e_mail", "email_address"],
                ),
                (
                    "contact_phone",
                    "Contact phone",
                    Text,
                    &["contact_phone", "phone", "telephone", "phone_number"],
                ),
                (
                    "address",
                    "Street address",
                    Text,
                    &["address", "street", "address_line_1"],
                ),
                ("city", "City", Text, &["city", "town"]),
                ("country", "Country", Text, &["country", "country_code"]),
                (
                    "payment_terms",
                    "Payment terms",
                    Text,
                    &["payment_terms", "terms", "net_terms"],
                ),
                (
                    "lead_time_days",
                    "Lead time (days)",
                    Integer,
                    &["lead_time_days", "lead_time", "delivery_time"],
                ),
            ],
        ),
        (
            FieldDomain::Products,
            &[
                (
                    "brand",
                    "Brand",
                    Text,
                    &["brand", "brand_name", "make", "label"],
                ),
                (
                    "weight",
                    "Weight",
                    Float,
                    &["weight", "net_weight", "weight_kg", "weight_g"],
                ),
                (
                    "dimensions",
                    "Dimensions",
                    Text,
                    &["dimensions", "size", "dims"],
                ),
            ],
        ),
        (
            FieldDomain::Recipes,
            &[
                (
                    "recipe_name",
                    "Recipe name",
                    Text,
                    &["recipe_name", "recipe", "dish", "menu_item"],
                ),
                (
                    "ingredient_name",
                    "Ingredient",
                    Text,
                    &["ingredient_name", "ingredient", "component"],
                ),
                (
                    "yield_quantity",
                    "Yield",
                    Float,
                    &["yield_quantity", "yield", "portions", "servings"],
                ),
                (
                    "portion_cost",
                    "Portion cost",
                    Float,
                    &["portion_cost", "cost_per_portion", "cost_per_serving"],
                ),
            ],
        ),
        (
            FieldDomain::Customers,
            &[
                (
                    "customer_id",
                    "Customer ID",
                    Text,
                    &["customer_id", "client_id", "account_number"],
                ),
                (
                    "loyalty_id",
                    "Loyalty ID",
                    Text,
                    &["loyalty_id", "loyalty_number", "membership_id"],
                ),
                (
                    "signup_date",
                    "Signup date",
                    Date,
                    &["signup_date", "joined", "registered", "created_at"],
                ),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_spans_all_domains() {
        let catalog = FieldCatalog::builtin();
        for domain in [
            FieldDomain::Inventory,
            FieldDomain::Orders,
            FieldDomain::Suppliers,
            FieldDomain::Products,
            FieldDomain::Recipes,
            FieldDomain::Customers,
        ] {
            assert!(
                !catalog.fields_for_domain(domain).is_empty(),
                "no fields for {domain}"
            );
        }
    }

    #[test]
    fn aliases_are_lowercase_and_unique_per_field() {
        let catalog = FieldCatalog::builtin();
        for field in &catalog.fields {
            for alias in &field.aliases {
                assert_eq!(alias, &alias.to_lowercase(), "{}", field.name);
            }
            let mut sorted = field.aliases.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), field.aliases.len(), "{}", field.name);
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let catalog = FieldCatalog::builtin();
        assert!(catalog.field("SKU_CODE").is_some());
        assert!(catalog.field("missing_field").is_none());
    }
}
