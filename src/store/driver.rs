//! Store driver seam: the engine's only suspension point.

use crate::error::StoreError;
use crate::query::{StoreOutcome, StoreQuery};
use crate::schema::ResourceModel;
use async_trait::async_trait;

/// Executes store query descriptors against persistent tabular storage.
///
/// `Fetch` and `Update` yield rows, `Delete` yields an affected count. Addressing a key
/// with no row must fail with [`StoreError::NotFound`]; rejected writes with
/// [`StoreError::Unique`] or [`StoreError::Constraint`]; everything else is
/// [`StoreError::Transport`]. Each call is one atomic statement.
#[async_trait]
pub trait StoreDriver: Send + Sync {
    async fn execute(&self, query: &StoreQuery) -> Result<StoreOutcome, StoreError>;

    /// Cheap liveness probe used by the readiness route.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Create the resource's table if it does not exist yet.
    async fn ensure_table(&self, model: &ResourceModel) -> Result<(), StoreError>;
}
