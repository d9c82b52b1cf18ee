pub mod memory_kv;
pub mod redis_kv;
pub mod store;

pub use memory_kv::MemoryKv;
pub use redis_kv::RedisKv;
pub use store::{KvInfo, KvStore};
