use {
    super::error::HistoryError,
    super::snapshot::Snapshot,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Unit price held as whole cents; (de)serialized as a decimal number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(i64);

impl Price {
    pub fn from_cents(cents: i64) -> Result<Self, HistoryError> {
        if cents < 0 {
            return Err(HistoryError::Validation(format!(
                "price cannot be negative, got {cents} cents"
            )));
        }
        Ok(Self(cents))
    }

    pub fn from_decimal(value: f64) -> Result<Self, HistoryError> {
        if !value.is_finite() {
            return Err(HistoryError::Validation(format!(
                "price must be a finite number, got {value}"
            )));
        }
        if value < 0.0 {
            return Err(HistoryError::Validation(format!(
                "price cannot be negative, got {value}"
            )));
        }
        let cents = (value * 100.0).round();
        if cents > i64::MAX as f64 {
            return Err(HistoryError::Validation(format!(
                "price exceeds storage capacity: {value}"
            )));
        }
        Ok(Self(cents as i64))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl TryFrom<f64> for Price {
    type Error = HistoryError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_decimal(value)
    }
}

impl From<Price> for f64 {
    fn from(price: Price) -> f64 {
        price.as_decimal()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    pub fn new(value: i64) -> Result<Self, HistoryError> {
        if value < 0 {
            return Err(HistoryError::Validation(format!(
                "quantity cannot be negative, got {value}"
            )));
        }
        let value = i32::try_from(value).map_err(|_| {
            HistoryError::Validation(format!("quantity exceeds storage capacity: {value}"))
        })?;
        Ok(Self(value))
    }

    pub fn get(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = HistoryError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> i32 {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current state of one tracked inventory record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub quantity: Quantity,
    pub price: Price,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

impl Item {
    /// Attribute set recorded in history. Audit metadata is not part of it.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_attributes(
            &self.name,
            &self.description,
            self.quantity,
            self.price,
            &self.location,
        )
    }
}

/// Attributes for INSERT. Used by create and by restoring a deleted item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub quantity: Quantity,
    pub price: Price,
    #[serde(default)]
    pub location: String,
}

impl NewItem {
    pub fn validate(&self) -> Result<(), HistoryError> {
        if self.name.trim().is_empty() {
            return Err(HistoryError::Validation("name must not be empty".into()));
        }
        Ok(())
    }

    /// Build a full attribute set out of a reconstructed patch. A snapshot
    /// without a name cannot be turned back into an item.
    pub fn from_patch(patch: ItemPatch) -> Result<Self, HistoryError> {
        let name = patch.name.filter(|n| !n.trim().is_empty()).ok_or_else(|| {
            HistoryError::Unsupported("prior state has no item name to restore".into())
        })?;

        Ok(Self {
            name,
            description: patch.description.unwrap_or_default(),
            quantity: patch.quantity.unwrap_or(Quantity(0)),
            price: patch.price.unwrap_or(Price(0)),
            location: patch.location.unwrap_or_default(),
        })
    }
}

/// Partial attribute set for UPDATE; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<Quantity>,
    pub price: Option<Price>,
    pub location: Option<String>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.quantity.is_none()
            && self.price.is_none()
            && self.location.is_none()
    }

    pub fn validate(&self) -> Result<(), HistoryError> {
        if self.is_empty() {
            return Err(HistoryError::Validation("no attributes to update".into()));
        }
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(HistoryError::Validation("name must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_rounds_to_cents() {
        let price = Price::from_decimal(9.99).unwrap();
        assert_eq!(price.cents(), 999);
        assert_eq!(price.to_string(), "9.99");
        assert_eq!(price.as_decimal(), 9.99);
    }

    #[test]
    fn negative_values_rejected() {
        assert!(matches!(
            Price::from_decimal(-0.01),
            Err(HistoryError::Validation(_))
        ));
        assert!(matches!(Quantity::new(-1), Err(HistoryError::Validation(_))));
        assert!(Price::from_decimal(f64::NAN).is_err());
    }

    #[test]
    fn new_item_deserializes_with_defaults() {
        let item: NewItem =
            serde_json::from_value(serde_json::json!({"name": "Widget", "quantity": 5, "price": 9.99}))
                .unwrap();
        assert_eq!(item.quantity.get(), 5);
        assert_eq!(item.price.cents(), 999);
        assert!(item.description.is_empty());
        assert!(item.validate().is_ok());
    }

    #[test]
    fn new_item_rejects_negative_quantity_on_deserialize() {
        let result: Result<NewItem, _> =
            serde_json::from_value(serde_json::json!({"name": "W", "quantity": -3, "price": 1.0}));
        assert!(result.is_err());
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert!(matches!(
            ItemPatch::default().validate(),
            Err(HistoryError::Validation(_))
        ));
    }

    #[test]
    fn restore_requires_name() {
        let patch = ItemPatch {
            quantity: Some(Quantity::new(3).unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            NewItem::from_patch(patch),
            Err(HistoryError::Unsupported(_))
        ));
    }
}
