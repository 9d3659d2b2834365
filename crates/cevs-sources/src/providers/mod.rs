mod edgar;
mod eea;
mod epa;
mod iso;
mod policy;

pub use edgar::EdgarProvider;
pub use eea::EeaProvider;
pub use epa::EpaProvider;
pub use iso::IsoProvider;
pub use policy::PolicyProvider;
