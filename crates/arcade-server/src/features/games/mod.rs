pub mod commands;
pub mod queries;
pub mod routes;
pub mod upload;

pub use commands::{
    DeleteGameCommand, DeleteGameError, DeleteGameResponse, GamePublisher, PublishGameCommand,
    PublishGameError,
};

pub use queries::{
    GetGameError, GetGameQuery, ListGamesError, ListGamesQuery, ListGamesResponse, PlayGameError,
    PlayGameQuery, PlayGameResponse, SearchGamesError, SearchGamesQuery,
};

pub use routes::games_routes;
