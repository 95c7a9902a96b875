//! Media record persistence.

pub mod ports;

#[cfg(feature = "database")]
#[cfg_attr(docsrs, doc(cfg(feature = "database")))]
pub mod postgres;

pub use ports::MediaStore;
#[cfg(test)]
pub use ports::MockMediaStore;

#[cfg(feature = "database")]
pub use postgres::{PostgresDatabase, PostgresMediaRepository};
