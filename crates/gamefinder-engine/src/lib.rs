pub mod elastic;
pub mod facets;
pub mod gateway;
pub mod mem;
pub mod traits;

pub use elastic::ElasticEngine;
pub use facets::FacetEnumerator;
pub use gateway::SearchGateway;
pub use mem::InMemoryEngine;
pub use traits::*;
