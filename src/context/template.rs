//! Deployment-specific static text merged into the rendered context.
//!
//! None of this is derived from the uploaded schema. The defaults describe the
//! e-commerce database the service was first deployed against; other deployments
//! override them under the `context` key of the config file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default relationship rules (join paths between known tables).
pub const DEFAULT_RELATIONSHIP_RULES: &str = r#"### Core Relationships:

1. **Users → Orders:**
   JOIN tbl_orders.user_id = tbl_users.id

2. **Orders → Order Items:**
   JOIN tbl_order_items.order_id = tbl_orders.id

3. **Products → Order Items:**
   JOIN tbl_order_items.product_id = tbl_products.id

4. **Products → Categories:**
   JOIN tbl_products.category_id = tbl_categories.id

5. **Products → Attachments:**
   JOIN tbl_attachments.product_id = tbl_products.id
   (Use WHERE is_primary = 1 for main image)

6. **Shopping Cart:**
   JOIN tbl_cart.product_id = tbl_products.id
   JOIN tbl_cart.user_id = tbl_users.id
"#;

/// Default query patterns and domain vocabulary.
pub const DEFAULT_QUERY_PATTERNS: &str = r#"### Revenue Queries:
- Total revenue: SUM(total_amount) WHERE payment_status = 'paid'
- Daily revenue: GROUP BY DATE(created_at)

### Order Status:
- payment_status: 'pending', 'paid', 'failed', 'refunded'
- order_status: 'pending', 'processing', 'shipped', 'delivered', 'cancelled'

### Product Filters:
- Active products: WHERE isActive = 1
- Hot/Featured: WHERE isHot = 1
- By category: JOIN tbl_categories ON category_id

### Payment Methods:
- 'cod' = Cash on Delivery
- 'card' = Credit/Debit Card

### Important Notes:
- tinyint(1) represents BOOLEAN (0=false, 1=true)
- decimal(10,2) for monetary values
- ENUM fields require exact quoted values
- subtotal in tbl_order_items is GENERATED (calculated automatically)
"#;

/// Static configuration for the schema context document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextTemplate {
    /// Top-level heading of the document.
    #[serde(default = "default_title")]
    pub title: String,
    /// Database label shown in the header block.
    #[serde(default = "default_database_label")]
    pub database_label: String,
    /// Free-text descriptions keyed by table name.
    #[serde(default = "default_descriptions")]
    pub descriptions: BTreeMap<String, String>,
    /// Body of the relationship rules section.
    #[serde(default = "default_relationship_rules")]
    pub relationship_rules: String,
    /// Body of the query patterns section.
    #[serde(default = "default_query_patterns")]
    pub query_patterns: String,
}

fn default_title() -> String {
    "DASHBOARDDB E-COMMERCE SCHEMA".to_string()
}
fn default_database_label() -> String {
    "dashboarddb (MySQL 8.2.0)".to_string()
}
fn default_relationship_rules() -> String {
    DEFAULT_RELATIONSHIP_RULES.to_string()
}
fn default_query_patterns() -> String {
    DEFAULT_QUERY_PATTERNS.to_string()
}

fn default_descriptions() -> BTreeMap<String, String> {
    [
        ("tbl_users", "Main user/customer accounts table"),
        ("tbl_products", "Product catalog with pricing and availability"),
        ("tbl_categories", "Product categories for organization"),
        ("tbl_orders", "Customer orders and payment tracking"),
        ("tbl_order_items", "Individual items within orders"),
        ("tbl_cart", "Shopping cart for logged-in users"),
        ("tbl_attachments", "Product images and file attachments"),
        ("users", "Legacy user table (consider migrating to tbl_users)"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for ContextTemplate {
    fn default() -> Self {
        Self {
            title: default_title(),
            database_label: default_database_label(),
            descriptions: default_descriptions(),
            relationship_rules: default_relationship_rules(),
            query_patterns: default_query_patterns(),
        }
    }
}

impl ContextTemplate {
    /// Description for a table, if one is configured.
    pub fn description(&self, table: &str) -> Option<&str> {
        self.descriptions.get(table).map(String::as_str)
    }
}
