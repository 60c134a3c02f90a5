use std::path::Path;

use figment::{
    providers::{Data, Format, Json, Yaml},
    value::{Dict, Map},
    Error, Metadata, Profile, Provider,
};
use snafu::ResultExt as _;

use crate::{ConfigurationError, ReadFile};

/// A file-backed provider whose contents are read and parsed up front.
///
/// Reading eagerly surfaces missing or malformed files when the source is added, rather than when the configuration is
/// extracted.
pub struct ResolvedProvider {
    data: Map<Profile, Dict>,
    metadata: Metadata,
}

impl ResolvedProvider {
    pub fn from_yaml<P>(path: P) -> Result<Self, ConfigurationError>
    where
        P: AsRef<Path>,
    {
        Self::from_file::<Yaml, _>(path, "YAML file")
    }

    pub fn from_json<P>(path: P) -> Result<Self, ConfigurationError>
    where
        P: AsRef<Path>,
    {
        Self::from_file::<Json, _>(path, "JSON file")
    }

    fn from_file<F, P>(path: P, source_name: &'static str) -> Result<Self, ConfigurationError>
    where
        F: Format,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file_data = std::fs::read_to_string(path).context(ReadFile {
            path: path.to_path_buf(),
        })?;

        let data = Data::<F>::string(&file_data).data()?;

        Ok(Self {
            data,
            metadata: Metadata::from(source_name, path),
        })
    }
}

impl Provider for ResolvedProvider {
    fn metadata(&self) -> Metadata {
        self.metadata.clone()
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        Ok(self.data.clone())
    }
}
