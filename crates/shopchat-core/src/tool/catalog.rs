//! The fixed tool catalog declared to the model.

use serde_json::json;
use shopchat_types::llm::ToolDefinition;
use shopchat_types::tool::{PRODUCT_BY_SKU, SEARCH_PRODUCTS, SMART_SEARCH};

/// The three product-search tools, in the order they are offered.
pub fn catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: SEARCH_PRODUCTS.to_string(),
            description: "Search the product database with a short list of focused terms \
                          (core product type plus critical specs such as size, finish or material)."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "terms": {
                        "type": "string",
                        "description": "Space-separated search terms, 3-5 recommended"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of products to return",
                        "minimum": 1
                    }
                },
                "required": ["terms"]
            }),
        },
        ToolDefinition {
            name: SMART_SEARCH.to_string(),
            description: "Search products with a natural-language query; filters such as \
                          price or colour are extracted from the query."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Natural-language description of the wanted product"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of products to return",
                        "minimum": 1
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: PRODUCT_BY_SKU.to_string(),
            description: "Fetch the full record of a single product by its exact SKU, \
                          including attributes and certifications."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sku": {
                        "type": "string",
                        "description": "Exact product SKU"
                    }
                },
                "required": ["sku"]
            }),
        },
    ]
}
