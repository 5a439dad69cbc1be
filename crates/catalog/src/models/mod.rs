mod repository;
mod resolved;
mod scene;

pub use self::repository::{ArtifactRepository, UnrecognizedRepository};
pub use self::resolved::{Located, ResolvedPair};
pub(crate) use self::resolved::{LocateRow, MatchRow};
pub(crate) use self::scene::SceneRow;
pub use self::scene::{SceneRecord, SuiteMembership};
