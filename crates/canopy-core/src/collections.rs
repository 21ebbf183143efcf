//! Map/set selection for internal bookkeeping (child maps, handler caches,
//! refs). `hashbrown` by default, `std` behind the `std-hash` feature.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::{HashMap, HashSet};
}
