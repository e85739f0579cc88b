//! Strongly-typed model identity (the target table name).

use crate::newtype_string::define_qualified_name;

define_qualified_name! {
    /// Identity of a model: the table it materializes, optionally schema-qualified
    /// (`analytics.fct_orders`).
    ///
    /// Prevents accidental mixing of model identities with function names or
    /// free-form table references pulled out of SQL text.
    pub struct ModelName;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_name_rejects_blank() {
        assert!(ModelName::try_new("").is_none());
        assert!(ModelName::try_new("   ").is_none());
    }

    #[test]
    fn test_model_name_trims_whitespace() {
        let name = ModelName::try_new("  my_schema.result ").unwrap();
        assert_eq!(name, "my_schema.result");
    }

    #[test]
    fn test_model_name_schema_split() {
        let name = ModelName::try_new("my_schema.result").unwrap();
        assert_eq!(name.schema(), Some("my_schema"));
        assert_eq!(name.object_name(), "result");
        assert!(name.is_qualified());

        let bare = ModelName::try_new("result").unwrap();
        assert_eq!(bare.schema(), None);
        assert_eq!(bare.object_name(), "result");
    }

    #[test]
    fn test_model_name_three_part_schema() {
        let name = ModelName::try_new("db.sch.tbl").unwrap();
        assert_eq!(name.schema(), Some("db.sch"));
        assert_eq!(name.object_name(), "tbl");
    }

    #[test]
    fn test_model_name_qualified_with() {
        let bare = ModelName::try_new("orders").unwrap();
        assert_eq!(bare.qualified_with("staging"), "staging.orders");

        let qualified = ModelName::try_new("raw.orders").unwrap();
        assert_eq!(qualified.qualified_with("staging"), "raw.orders");
        assert_eq!(bare.qualified_with(""), "orders");
    }

    #[test]
    fn test_model_name_serde_roundtrip() {
        let name = ModelName::try_new("a.b").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, r#""a.b""#);
        let back: ModelName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
        assert!(serde_json::from_str::<ModelName>(r#""""#).is_err());
    }

    #[test]
    fn test_model_name_borrow_lookup() {
        use std::collections::HashMap;
        let mut map: HashMap<ModelName, i32> = HashMap::new();
        map.insert(ModelName::try_new("t").unwrap(), 1);
        assert_eq!(map.get("t"), Some(&1));
    }
}
