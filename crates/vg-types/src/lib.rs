pub mod config;
pub mod errors;
pub mod forecast;
pub mod results;
pub mod series;

pub use config::*;
pub use errors::*;
pub use forecast::*;
pub use results::*;
pub use series::*;
