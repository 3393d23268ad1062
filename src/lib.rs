pub mod addr;
pub mod copy;
pub mod error;
pub mod firmware;
pub mod offsets;
pub mod user;

pub mod all {
    pub use crate::addr::*;
    pub use crate::copy::*;
    pub use crate::error::*;
    pub use crate::firmware::*;
    pub use crate::offsets::*;
    pub use crate::user::*;
}
