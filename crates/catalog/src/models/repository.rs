use derive_more::{Display, Error};
use std::{
    fmt::{Display as FmtDisplay, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Backing store holding an artifact's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactRepository {
    /// S3-compatible object storage (historically "swiftstack").
    ObjectStore,
    /// A dataset repository on a hosted hub.
    HostedDataset,
    /// The local filesystem; the locator is a path.
    Local,
}

/// A repository tag that isn't one of the known spellings.
///
/// Not an error as far as locating goes: the artifact is assumed to live in
/// the object store. Returned alongside the default so the caller can decide
/// how loudly to complain.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("unrecognized artifact repository tag {tag:?}")]
pub struct UnrecognizedRepository {
    #[error(not(source))]
    pub tag: Option<String>,
}

impl ArtifactRepository {
    /// Repository assumed for rows that carry no usable tag.
    pub const DEFAULT: Self = Self::ObjectStore;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ObjectStore => "object-store",
            Self::HostedDataset => "hosted-dataset",
            Self::Local => "local",
        }
    }

    /// Total parse of an optional, raw repository tag.
    ///
    /// Never fails. A missing, blank or unknown tag yields
    /// [`ArtifactRepository::DEFAULT`] plus the offending tag, so older
    /// catalogs without the column keep working.
    pub fn parse(tag: Option<&str>) -> (Self, Option<UnrecognizedRepository>) {
        match tag.map(str::parse::<Self>) {
            Some(Ok(repository)) => (repository, None),
            Some(Err(unrecognized)) => (Self::DEFAULT, Some(unrecognized)),
            None => (Self::DEFAULT, Some(UnrecognizedRepository { tag: None })),
        }
    }
}

impl FromStr for ArtifactRepository {
    type Err = UnrecognizedRepository;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "swiftstack" | "s3" | "object-store" => Self::ObjectStore,
            "huggingface" | "hf" | "hosted-dataset" => Self::HostedDataset,
            "local" => Self::Local,
            _ => return Err(UnrecognizedRepository { tag: Some(s.to_string()) }),
        })
    }
}

impl FmtDisplay for ArtifactRepository {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}
