pub mod dates;
pub mod error;
pub mod response;
pub mod text;
pub mod validation;
