pub mod crop;
pub mod fertilizer;
pub mod health;
pub mod nutrient;
pub mod recommendation;
pub mod soil;

pub use crop::*;
pub use fertilizer::*;
pub use health::*;
pub use nutrient::*;
pub use recommendation::*;
pub use soil::*;
