/// Reentrant scratch-context pooling.
pub mod reentrant;

pub use reentrant::{
    MemoryPressure, PoolStats, PoolStrategy, PooledContext, ReentrantContext,
    ReentrantContextPool, RefStrength, Usage,
};
