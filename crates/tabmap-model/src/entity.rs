//! Entity types and their target dashboards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed enumeration of entity types a file can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Inventory,
    Orders,
    Suppliers,
    Products,
    Recipes,
    Customers,
    Unknown,
}

impl EntityType {
    /// All detectable entity types, in prompt-enumeration order.
    pub const DETECTABLE: [EntityType; 6] = [
        Self::Inventory,
        Self::Orders,
        Self::Suppliers,
        Self::Products,
        Self::Recipes,
        Self::Customers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Orders => "orders",
            Self::Suppliers => "suppliers",
            Self::Products => "products",
            Self::Recipes => "recipes",
            Self::Customers => "customers",
            Self::Unknown => "unknown",
        }
    }

    /// Static lookup from entity type to the dashboards its records feed.
    ///
    /// Unknown entity types default to the executive dashboard only.
    pub fn target_dashboards(&self) -> Vec<Dashboard> {
        match self {
            Self::Inventory => vec![Dashboard::Inventory, Dashboard::Executive],
            Self::Orders => vec![
                Dashboard::Orders,
                Dashboard::Executive,
                Dashboard::Financial,
            ],
            Self::Suppliers => vec![Dashboard::Suppliers, Dashboard::Executive],
            Self::Products => vec![
                Dashboard::Products,
                Dashboard::Inventory,
                Dashboard::Executive,
            ],
            Self::Recipes => vec![Dashboard::Recipes, Dashboard::Inventory],
            Self::Customers => vec![
                Dashboard::Customers,
                Dashboard::Executive,
                Dashboard::Financial,
            ],
            Self::Unknown => vec![Dashboard::Executive],
        }
    }
}

impl FromStr for EntityType {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "inventory" => Ok(Self::Inventory),
            "orders" | "order" => Ok(Self::Orders),
            "suppliers" | "supplier" => Ok(Self::Suppliers),
            "products" | "product" => Ok(Self::Products),
            "recipes" | "recipe" => Ok(Self::Recipes),
            "customers" | "customer" => Ok(Self::Customers),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dashboards that consume standardized records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dashboard {
    Executive,
    Financial,
    Inventory,
    Orders,
    Suppliers,
    Products,
    Recipes,
    Customers,
}

impl Dashboard {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Executive => "executive",
            Self::Financial => "financial",
            Self::Inventory => "inventory",
            Self::Orders => "orders",
            Self::Suppliers => "suppliers",
            Self::Products => "products",
            Self::Recipes => "recipes",
            Self::Customers => "customers",
        }
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of entity type detection for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDetection {
    pub entity_type: EntityType,
    /// Confidence in the detection (0.0 to 1.0).
    pub confidence: f64,
    pub reasoning: String,
    pub target_dashboards: Vec<Dashboard>,
}

impl EntityDetection {
    /// Conservative default used when detection fails: inventory with zero
    /// confidence, so a weak signal never blocks the pipeline.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            entity_type: EntityType::Inventory,
            confidence: 0.0,
            reasoning: reason.into(),
            target_dashboards: EntityType::Inventory.target_dashboards(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_feed_financial_dashboards() {
        let dashboards = EntityType::Orders.target_dashboards();
        assert_eq!(
            dashboards,
            vec![
                Dashboard::Orders,
                Dashboard::Executive,
                Dashboard::Financial
            ]
        );
    }

    #[test]
    fn unknown_defaults_to_executive() {
        assert_eq!(
            EntityType::Unknown.target_dashboards(),
            vec![Dashboard::Executive]
        );
    }

    #[test]
    fn parses_singular_forms() {
        assert_eq!("Order".parse::<EntityType>(), Ok(EntityType::Orders));
        assert!("gibberish".parse::<EntityType>().is_err());
    }
}
