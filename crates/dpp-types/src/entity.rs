use serde::{Deserialize, Deserializer, Serialize};

/// A physical site belonging to an [`Entity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Network location of a federated passport repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryAddress {
    pub hostname: String,
}

/// A party related to a passport: manufacturer, owner, or economic
/// operator.
///
/// Entities are embedded by value in the passport record -- they are not
/// separately stored and carry no cross-store references. Inbound
/// documents may supply `facility` and `repository_address` as either a
/// single object or a list; both are normalized to a list on
/// deserialization so the single/list ambiguity never reaches the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub facility: Vec<Facility>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub repository_address: Vec<RepositoryAddress>,
    #[serde(default)]
    pub batch_id: Option<String>,
}

impl Entity {
    /// Country code of the entity's first facility, if any.
    ///
    /// Used by search filtering and statistics to group passports by the
    /// location of their owner or manufacturer.
    pub fn country_code(&self) -> Option<&str> {
        self.facility.first().and_then(|f| f.country_code.as_deref())
    }
}

/// Accept either a single `T` or a list of `T`, always producing a list.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(item) => vec![item],
        OneOrMany::Many(items) => items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_facility_normalizes_to_list() {
        let entity: Entity = serde_json::from_value(serde_json::json!({
            "id": "ent-1",
            "name": "Acme",
            "facility": {"id": "fac-1", "name": "Plant A", "country_code": "DE"}
        }))
        .unwrap();
        assert_eq!(entity.facility.len(), 1);
        assert_eq!(entity.country_code(), Some("DE"));
    }

    #[test]
    fn facility_list_passes_through() {
        let entity: Entity = serde_json::from_value(serde_json::json!({
            "id": "ent-2",
            "name": "Acme",
            "facility": [
                {"id": "fac-1", "name": "Plant A", "country_code": "DE"},
                {"id": "fac-2", "name": "Plant B", "country_code": "FR"}
            ]
        }))
        .unwrap();
        assert_eq!(entity.facility.len(), 2);
        // First facility wins for the country code.
        assert_eq!(entity.country_code(), Some("DE"));
    }

    #[test]
    fn missing_facility_defaults_empty() {
        let entity: Entity =
            serde_json::from_value(serde_json::json!({"id": "ent-3", "name": "Solo"})).unwrap();
        assert!(entity.facility.is_empty());
        assert_eq!(entity.country_code(), None);
    }
}
