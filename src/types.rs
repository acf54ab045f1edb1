//! Document types used by the benchmark.

use serde::{Deserialize, Serialize};

/// A document in the `RandomDocs` container.
///
/// This is the layout written by the data-loading tooling, one document per
/// `itemN` id spread across `partitionM` partition keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomDocsItem {
    pub id: String,
    #[serde(rename = "partitionKey")]
    pub partition_key: String,
    pub data: String,
    #[serde(rename = "randomNumber")]
    pub random_number: i32,
}
