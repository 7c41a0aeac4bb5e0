pub mod catalog;
pub mod checkout;
pub mod confidence;
pub mod error;
pub mod needs;
pub mod offers;
pub mod scenario;
pub mod session;

pub use catalog::*;
pub use checkout::*;
pub use confidence::*;
pub use error::*;
pub use needs::*;
pub use offers::*;
pub use scenario::*;
pub use session::*;
