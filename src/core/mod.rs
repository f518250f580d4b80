//! Engine-wide plumbing: the error surface, the three task queues, the shared
//! context handed to every component, and the observer callbacks.
pub mod context;
pub mod error;
pub mod observer;
pub mod sync;
pub mod task_queue;
pub use context::EngineContext;
pub use error::EngineError;
pub use observer::{EngineObserver, PusherId};
pub use task_queue::TaskQueue;
