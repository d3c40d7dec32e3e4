pub mod cache;
pub mod file;
pub mod redis;

pub use cache::{CachedTrailer, TrailerCache, TrailerCacheKey};
pub use file::JsonFileCache;
pub use self::redis::{create_redis_client, Cache, CacheWriterHandle};
