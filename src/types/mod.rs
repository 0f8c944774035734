pub mod fonts;
pub mod weather;
