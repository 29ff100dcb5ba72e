//! Application layer: the allocator service.

pub mod service;

pub use service::NonceAllocator;
