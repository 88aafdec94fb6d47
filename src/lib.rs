mod collections;
pub mod chunk;
pub mod counter;
pub mod dependents;
pub mod entity;
pub mod error;
pub mod host;
pub mod limits;
pub mod material;
pub mod permission;
pub mod record;
pub mod resolve;
pub mod scan;
pub mod settings;
pub mod spawn;
pub mod store;
pub mod types;
pub mod world;

pub use counter::{Decision, Mutation, MutationKind, Notice};
pub use limits::Limits;
pub use resolve::{Cap, Subject};
pub use scan::{Pending, Poll, ScanResult, ScanState};
pub use settings::Settings;
pub use spawn::{Spawn, SpawnReason};
pub use world::World;

mod prelude {
    pub(crate) use crate::chunk::ChunkSnapshot;
    pub(crate) use crate::collections::*;
    pub(crate) use crate::entity::EntityKind;
    pub(crate) use crate::host::{Blocks, Entities, Territories, Territory};
    pub(crate) use crate::material::{BlockState, Material};
    pub(crate) use crate::types::*;
}
