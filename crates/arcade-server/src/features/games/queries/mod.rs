pub mod get;
pub mod list;
pub mod play;
pub mod search;

pub use get::{GetGameError, GetGameQuery};
pub use list::{ListGamesError, ListGamesQuery, ListGamesResponse};
pub use play::{PlayGameError, PlayGameQuery, PlayGameResponse};
pub use search::{SearchGamesError, SearchGamesQuery, SEARCH_LIMIT};
