//! Thread-local LRU cache of compiled expressions.
//!
//! Compiled programs are namespace-map independent (prefixes resolve
//! at evaluation), so the cache key is just the expression source.
//! Thread-local storage fits the crate's single-owner model; there is
//! no cross-thread sharing to lock for.

use super::compiler::{compile, Compiled};
use lru::LruCache;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

const CACHE_CAPACITY: usize = 64;

thread_local! {
    static COMPILED: RefCell<LruCache<String, Rc<Compiled>>> = RefCell::new(LruCache::new(
        NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
    ));
}

/// Compile an expression, reusing a cached program when the same
/// source was compiled before on this thread. Failures are not cached.
pub(crate) fn compile_cached(expr: &str) -> Result<Rc<Compiled>, String> {
    COMPILED.with(|cell| {
        let mut cache = cell.borrow_mut();
        if let Some(hit) = cache.get(expr) {
            return Ok(Rc::clone(hit));
        }
        let compiled = Rc::new(compile(expr)?);
        cache.put(expr.to_string(), Rc::clone(&compiled));
        Ok(compiled)
    })
}
