pub mod country;
pub mod normalize;
pub mod record;
pub mod score;
pub mod trend;

pub use country::*;
pub use normalize::*;
pub use record::*;
pub use score::*;
pub use trend::*;
