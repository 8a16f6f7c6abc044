//! Service layer: the discrete owners of live state. Each manager holds a
//! partitioned map and communicates with the others only through public
//! operations.

pub mod connections;
pub mod games;
pub mod lobbies;
