// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Pure Rust structs and traits that define what the system
// talks about: latent codes, parent pairs, the ordered list
// of edit directions, and the editing capability itself.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, traits and functions
//
// Keeping the edit fold here means the order-dependent edit
// semantics can be tested without a tensor backend.

// Latent shape and single-sample latent codes
pub mod latent;

// A father/mother latent pair
pub mod pair;

// Ordered, named edit directions
pub mod direction;

// Abstractions other layers implement (PairSource, LatentEditor)
pub mod traits;

// Sequential per-direction edit application
pub mod edit_chain;
