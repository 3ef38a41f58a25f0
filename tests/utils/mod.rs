pub mod mocks;
pub mod setup;

pub use setup::TestSetupBuilder;
