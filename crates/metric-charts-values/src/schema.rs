//! JSON Schema for chart values (the `values.schema.json` of a chart)

use schemars::gen::SchemaGenerator;
use schemars::schema::RootSchema;
use schemars::JsonSchema;

pub fn values_schema<T: JsonSchema>() -> RootSchema {
    SchemaGenerator::default().into_root_schema_for::<T>()
}

pub fn values_schema_json<T: JsonSchema>() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&values_schema::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PusherValues, ScraperValues};

    fn required(schema: &RootSchema) -> Vec<String> {
        schema
            .schema
            .object
            .as_ref()
            .map(|o| o.required.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_scraper_schema_requires_env() {
        let schema = values_schema::<ScraperValues>();
        let required = required(&schema);
        assert!(required.contains(&"replicaCount".to_string()));
        assert!(required.contains(&"image".to_string()));
        assert!(required.contains(&"env".to_string()));
        assert!(!required.contains(&"resources".to_string()));

        let json = values_schema_json::<ScraperValues>().unwrap();
        assert!(json.contains("AUTH_URL"));
        assert!(json.contains("IfNotPresent"));
    }

    #[test]
    fn test_pusher_schema_env_is_optional() {
        let schema = values_schema::<PusherValues>();
        let required = required(&schema);
        assert!(required.contains(&"replicaCount".to_string()));
        assert!(!required.contains(&"env".to_string()));
    }
}
