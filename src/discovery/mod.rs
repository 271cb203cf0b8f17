//! Module discovery: walks the "module references module" graph from a seed
//!
//! Each unique module path is read once per run, with at most
//! `max_concurrency` reads in flight. Results stream out of a [`DiscoveryRun`]
//! as reads complete; the first read failure ends the run.

mod cancel;
mod error;
mod gate;
mod hasher;
mod module;
mod reader;
mod traversal;

pub use cancel::CancellationToken;
pub use error::{ModuleReadError, Result};
pub use gate::{AdmissionGate, Permit};
pub use hasher::{ContentHasher, Sha256Hasher};
pub use module::{ContentDigest, ModuleDescriptor};
pub use reader::{system_library_paths, ElfModuleReader, ModuleImage, ModuleReader};
pub use traversal::{
    default_concurrency, DiscoveryOptions, DiscoveryRun, ModuleDiscovery, TraversalState,
};
