pub mod error;
pub mod ident;
pub mod inspect;
pub mod query;
pub mod schema;
pub mod validator;
