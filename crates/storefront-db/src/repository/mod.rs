//! # Repository Module
//!
//! Typed access to the catalog collections.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories over a DocumentStore                    │
//! │                                                                         │
//! │  RatingAggregator / RelatedProductMatcher / Catalog                    │
//! │       │                                                                 │
//! │       │  products.set_rating("TSHIRT-001", summary)                    │
//! │       ▼                                                                 │
//! │  ProductRepository ─┐                                                  │
//! │  ReviewRepository  ─┼──► Arc<dyn DocumentStore>                        │
//! │  ComboRepository   ─┘        │                                          │
//! │                              ├──► SqliteDocumentStore                   │
//! │                              └──► InMemoryDocumentStore                 │
//! │                                                                         │
//! │  Repositories speak Product / Review / Combo; the store speaks         │
//! │  documents, filters and updates.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Product lookup, listing, rating persistence
//! - [`ReviewRepository`] - Review insertion and score queries
//! - [`ComboRepository`] - Combo lookup and listing

pub mod combo;
pub mod product;
pub mod review;

pub use combo::ComboRepository;
pub use product::ProductRepository;
pub use review::ReviewRepository;
