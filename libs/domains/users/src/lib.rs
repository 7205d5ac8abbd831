//! User accounts and authentication.
//!
//! Registration and login issue HS256 JWTs; passwords are hashed with
//! Argon2. Storage sits behind [`UserRepository`] with a MongoDB
//! implementation.

pub mod error;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;

pub use error::{UserError, UserResult};
pub use handlers::ApiDoc;
pub use models::{
    ChangePassword, LoginRequest, LoginResponse, RegisterRequest, Role, User, UserResponse,
};
pub use mongodb::MongoUserRepository;
pub use repository::UserRepository;
pub use service::UserService;
