#![allow(dead_code, unused_imports)]

use gamedata::{ObjectCache, Release, ResRef, ResourceKind, ViolationPolicy};
use std::time::Instant;

#[cfg(feature = "profiling")]
#[tracing::instrument(skip(cache))]
fn profile_churn(cache: &ObjectCache<Vec<u8>>, count: usize) {
    for i in 0..count {
        if i % 1_000 == 0 {
            tracing::info!("Churning entry {}/{}", i, count);
        }
        let name = ResRef::new(&format!("ITM{:05}", i % 512));
        let handle = match cache.get(&name).into_option() {
            Some(handle) => handle,
            None => match cache.set_at(&name, vec![0u8; 1024]) {
                Ok(handle) => handle,
                Err(violation) => {
                    tracing::error!(%violation, "churn aborted");
                    return;
                }
            },
        };
        let again = handle.clone();
        drop(handle);
        if let Err(violation) = again.release(Release::Free) {
            tracing::error!(%violation, "churn aborted");
            return;
        }
    }
}

#[cfg(feature = "profiling")]
fn main() {
    let _guard = gamedata::profiling::init_file(".", "trace.json");
    let cache = ObjectCache::new(ResourceKind::Item, ViolationPolicy::Panic);

    println!("Profiling cache churn...");
    let start = Instant::now();
    profile_churn(&cache, 10_000);
    println!("10k get/release cycles complete in: {:?}", start.elapsed());
    println!("{:?}", cache.stats());
}

#[cfg(not(feature = "profiling"))]
fn main() {
    println!("profile_cache binary requires --features profiling");
}
