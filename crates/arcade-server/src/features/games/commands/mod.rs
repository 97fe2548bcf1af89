pub mod delete;
pub mod publish;

pub use delete::{DeleteGameCommand, DeleteGameError, DeleteGameResponse};
pub use publish::{GamePublisher, PublishGameCommand, PublishGameError};
