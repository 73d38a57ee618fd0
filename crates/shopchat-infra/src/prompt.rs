//! System prompt loading.
//!
//! The prompt is plain markdown. Deployments can ship their own search
//! methodology file; otherwise the built-in instructions are used.

use std::path::{Path, PathBuf};

/// Built-in product-search instructions.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful assistant with access to a WooCommerce product database through search tools.

CRITICAL INSTRUCTIONS:

1. **Evidence-Based Claims**: Never make assumptions about product specifications.
   - ✓ CONFIRMED: Only use when data is in attributes or quoted from descriptions
   - ✗ NOT FOUND: State clearly when specifications aren't in the database
   - ? REQUIRES VERIFICATION: Mark what needs supplier confirmation

2. **Search Strategy**: Use llm_search_products as your primary tool.
   - Extract the core product type plus critical specs (size, finish, material)
   - Start with 3-5 focused terms
   - Remove noise (stopwords, certifications, accessories)
   - Use smart_search_products for natural-language queries with price or attribute filters

3. **Verification Protocol**: For critical specs (certifications, standards, ratings):
   - Fetch the product with get_product_by_sku
   - Check the certification field
   - Quote exact text if found
   - State "NOT FOUND" if absent
   - NEVER infer from similar products

4. **Response Structure**:
   - ✓ CONFIRMED: List verified specifications
   - ✗ NOT FOUND: List missing specifications
   - ? REQUIRES VERIFICATION: List what needs checking
   - Honest recommendation based on confirmed data

Your goal is to find the right products efficiently while staying honest about what is confirmed and what still requires verification.
"#;

/// Files checked, in order, for a custom prompt.
pub fn prompt_candidates(data_dir: &Path) -> Vec<PathBuf> {
    vec![
        data_dir.join("system_instructions.md"),
        PathBuf::from("./updated_system_instructions.md"),
        PathBuf::from("./system_instructions.md"),
    ]
}

/// Load the system prompt: the first readable, non-empty candidate file,
/// else [`DEFAULT_SYSTEM_PROMPT`].
pub async fn load_system_prompt(data_dir: &Path) -> String {
    load_first(&prompt_candidates(data_dir)).await
}

async fn load_first(candidates: &[PathBuf]) -> String {
    for path in candidates {
        match tokio::fs::read_to_string(path).await {
            Ok(content) if !content.trim().is_empty() => {
                tracing::info!(path = %path.display(), "Loaded system instructions");
                return content;
            }
            Ok(_) => {
                tracing::warn!(path = %path.display(), "System instructions file is empty, skipping");
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %path.display(), "Failed to read system instructions: {err}");
            }
        }
    }

    tracing::warn!("System instructions file not found, using default");
    DEFAULT_SYSTEM_PROMPT.to_string()
}
