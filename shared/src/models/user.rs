//! User Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::{Role, RoleQuery, deserialize_lenient};

/// Identity record returned by the auth and profile endpoints
///
/// Decodes from `id`, `_id` or both (Mongoose documents with virtuals carry
/// both); `id` wins when they differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WireUser")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    /// `None` when the server sent no role or one outside the closed set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    // Seller onboarding fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Wire shape of [`UserRecord`] with both identifier spellings
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    mongo_id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    role: Option<Role>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    zipcode: Option<String>,
    #[serde(default)]
    business_name: Option<String>,
    #[serde(default)]
    business_description: Option<String>,
    #[serde(default)]
    tax_id: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<WireUser> for UserRecord {
    type Error = String;

    fn try_from(wire: WireUser) -> Result<Self, Self::Error> {
        let id = wire
            .id
            .or(wire.mongo_id)
            .ok_or_else(|| "missing field `id`".to_string())?;
        Ok(Self {
            id,
            name: wire.name,
            email: wire.email,
            role: wire.role,
            phone: wire.phone,
            address: wire.address,
            city: wire.city,
            state: wire.state,
            zipcode: wire.zipcode,
            business_name: wire.business_name,
            business_description: wire.business_description,
            tax_id: wire.tax_id,
            created_at: wire.created_at,
        })
    }
}

impl UserRecord {
    /// Minimal record with identity fields only
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Option<Role>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role,
            phone: None,
            address: None,
            city: None,
            state: None,
            zipcode: None,
            business_name: None,
            business_description: None,
            tax_id: None,
            created_at: None,
        }
    }

    /// True iff the user carries a known role matched by `query`
    pub fn has_role(&self, query: impl RoleQuery) -> bool {
        self.role.is_some_and(|role| query.matches(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_mongo_shape() {
        let json = r#"{
            "_id": "65f0c0ffee",
            "name": "Kamal",
            "email": "k@example.com",
            "role": "seller",
            "phone": "0771234567",
            "businessName": "Herbal Roots",
            "createdAt": "2024-03-01T10:00:00.000Z"
        }"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "65f0c0ffee");
        assert_eq!(user.role, Some(Role::Seller));
        assert_eq!(user.business_name.as_deref(), Some("Herbal Roots"));
        assert!(user.created_at.is_some());
        assert!(user.city.is_none());
    }

    #[test]
    fn test_decode_with_both_identifiers() {
        let json = r#"{"_id":"65f0","id":"65f0","name":"Kamal","email":"k@example.com","role":"customer"}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "65f0");
        assert_eq!(user.role, Some(Role::Customer));

        let json = r#"{"_id":"mongo","id":"virtual","name":"Kamal"}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "virtual");
    }

    #[test]
    fn test_decode_without_identifier_fails() {
        let err = serde_json::from_str::<UserRecord>(r#"{"name":"Kamal"}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `id`"));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut user = UserRecord::new("u1", "Kamal", "k@example.com", Some(Role::Seller));
        user.business_name = Some("Herbal Roots".into());
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(serde_json::from_str::<UserRecord>(&json).unwrap(), user);
    }

    #[test]
    fn test_unknown_role_grants_nothing() {
        let json = r#"{"id":"u9","name":"Eve","email":"e@example.com","role":"root"}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, None);
        for role in Role::ALL {
            assert!(!user.has_role(role));
        }
    }

    #[test]
    fn test_has_role() {
        let user = UserRecord::new("u1", "Kamal", "k@example.com", Some(Role::Customer));
        assert!(user.has_role(Role::Customer));
        assert!(!user.has_role(Role::Seller));
        assert!(user.has_role([Role::Admin, Role::Customer]));
        assert!(!user.has_role(vec![Role::Admin, Role::Seller]));
    }

    #[test]
    fn test_serialize_skips_empty_fields() {
        let user = UserRecord::new("u1", "Kamal", "k@example.com", Some(Role::Customer));
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["role"], "customer");
        assert!(json.get("phone").is_none());
        assert!(json.get("createdAt").is_none());
    }
}
