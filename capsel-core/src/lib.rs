//! # Capsel Core
//!
//! The core library for Capsel - a runtime feature-detection registry with a
//! compact conditional-expression language for selecting between alternative
//! resources based on detected capabilities.
//!
//! ## Overview
//!
//! Capsel answers two questions for an embedding host:
//!
//! - "Does capability X exist in this environment?" - answered by the
//!   [`cache::FeatureCache`], a lazily-evaluated, memoized registry of
//!   booleans and probe functions.
//! - "Given what exists, which resource should I use?" - answered by the
//!   [`resolver`], which evaluates expressions of the form
//!   `feature?whenTrue:whenFalse` against the cache.
//!
//! ## Basic Usage
//!
//! ```rust,ignore
//! use capsel_core::{FeatureCache, FeatureValue, ProbeContext, select};
//!
//! let cache = FeatureCache::new(ProbeContext::detect());
//! cache.register("fast-path", FeatureValue::probe(|global, _, _| {
//!     global.var("FAST_PATH").is_some()
//! }));
//!
//! // Picks "impl/fast" when the feature holds, "impl/portable" otherwise.
//! let id = select("fast-path?impl/fast:impl/portable", &cache);
//! ```
//!
//! ## Architecture
//!
//! - [`env`]: the probe environment context (global scope, optional
//!   document, scratch element)
//! - [`cache`]: the memoized feature cache
//! - [`resolver`]: tokenizer and recursive evaluator for selection
//!   expressions
//! - [`loader`]: the asynchronous resource-loading boundary
//! - [`bootstrap`]: default feature registration for bare hosts
//! - [`error`]: error types and handling

pub mod bootstrap;
pub mod cache;
pub mod env;
pub mod error;
pub mod loader;
pub mod resolver;

pub use cache::{CacheSnapshot, FeatureCache, FeatureKey, FeatureSeed, FeatureValue};
pub use env::{reset_probe_element, Document, GlobalScope, ProbeContext, ScratchElement};
pub use error::{CapselError, Result};
pub use loader::{resolve, ResourceLoader};
pub use resolver::select;
