use {
    super::item::{Price, Quantity},
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

pub const FIELD_NAME: &str = "name";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_QUANTITY: &str = "quantity";
pub const FIELD_PRICE: &str = "price";
pub const FIELD_LOCATION: &str = "location";

/// Schema-less attribute document captured before or after a mutation.
///
/// Historical rows stay readable even if the item's attribute set changes,
/// so fields are looked up by name and never assumed to exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Map<String, Value>);

impl Snapshot {
    pub fn from_attributes(
        name: &str,
        description: &str,
        quantity: Quantity,
        price: Price,
        location: &str,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert(FIELD_NAME.into(), Value::from(name));
        fields.insert(FIELD_DESCRIPTION.into(), Value::from(description));
        fields.insert(FIELD_QUANTITY.into(), Value::from(quantity.get()));
        fields.insert(FIELD_PRICE.into(), Value::from(price.as_decimal()));
        fields.insert(FIELD_LOCATION.into(), Value::from(location));
        Self(fields)
    }

    /// Read a stored payload. Objects are taken as-is, strings holding an
    /// encoded object are decoded, anything else counts as absent.
    pub fn from_stored(value: Option<Value>) -> Option<Self> {
        match value? {
            Value::Object(fields) => Some(Self(fields)),
            Value::String(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(fields)) => Some(Self(fields)),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for Snapshot {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}
