pub mod article;
pub mod bookmark;
pub mod cursor;
pub mod page;
pub mod rank;
pub mod recommendation;
pub mod response;
