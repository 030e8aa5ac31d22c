pub mod catalog;
pub mod chat;
pub mod metadata;
pub mod recommendation;
pub mod user;

pub use catalog::{
    normalize_title, parse_rating, CatalogEntry, CatalogFilter, CatalogPage, CatalogUpdate,
    Category, NewCatalogEntry,
};
pub use chat::{ChatMessage, ChatRole};
pub use metadata::{
    CastMember, DetailsQuery, MediaType, MetadataSource, MovieDetails, SearchResult,
};
pub use recommendation::{Recommendation, RecommendationKind};
pub use user::User;
