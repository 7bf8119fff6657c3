pub mod extraction;
pub mod text;
pub mod transcript;
pub mod window;
