pub mod clock;
pub mod token;

pub use clock::RequestDate;
pub use token::{AuthToken, RequestSigner};
