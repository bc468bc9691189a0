//! Testing utilities and harness for Weave

pub mod testing;

pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
}
