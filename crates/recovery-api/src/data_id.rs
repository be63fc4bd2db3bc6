use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const CONNECTION_PREFIX: &str = "connection_";
pub const GROUP_PREFIX: &str = "group_";
pub const SIGNATURE_PREFIX: &str = "sig_";
pub const PROFILE_DATA_ID: &str = "data";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataKind {
    Connection,
    Group,
    Signature,
    SelfProfile,
    Unknown,
}

/// A channel data-id after classification.
///
/// The wire form is recovered with `Display`, so a classified id can be handed
/// back to the channel without keeping the original string around.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataId {
    Connection(String),
    Group(String),
    Signature(String),
    SelfProfile,
    Unknown(String),
}

impl DataId {
    pub fn parse(raw: &str) -> Self {
        if raw == PROFILE_DATA_ID {
            return DataId::SelfProfile;
        }
        let keyed = [
            (CONNECTION_PREFIX, DataKind::Connection),
            (GROUP_PREFIX, DataKind::Group),
            (SIGNATURE_PREFIX, DataKind::Signature),
        ];
        for (prefix, kind) in keyed {
            match raw.strip_prefix(prefix) {
                // a bare prefix names no entity
                Some("") => return DataId::Unknown(raw.to_string()),
                Some(key) => {
                    let key = key.to_string();
                    return match kind {
                        DataKind::Connection => DataId::Connection(key),
                        DataKind::Group => DataId::Group(key),
                        _ => DataId::Signature(key),
                    };
                }
                None => continue,
            }
        }
        DataId::Unknown(raw.to_string())
    }

    pub fn kind(&self) -> DataKind {
        match self {
            DataId::Connection(_) => DataKind::Connection,
            DataId::Group(_) => DataKind::Group,
            DataId::Signature(_) => DataKind::Signature,
            DataId::SelfProfile => DataKind::SelfProfile,
            DataId::Unknown(_) => DataKind::Unknown,
        }
    }

    /// Key of the entity this id refers to. Empty for the profile singleton
    /// and for unknown ids.
    pub fn natural_key(&self) -> &str {
        match self {
            DataId::Connection(key) | DataId::Group(key) | DataId::Signature(key) => key,
            DataId::SelfProfile | DataId::Unknown(_) => "",
        }
    }

    pub fn connection(key: impl Into<String>) -> Self {
        DataId::Connection(key.into())
    }

    pub fn group(key: impl Into<String>) -> Self {
        DataId::Group(key.into())
    }

    pub fn signature(signer: impl Into<String>) -> Self {
        DataId::Signature(signer.into())
    }
}

impl Display for DataId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DataId::Connection(key) => write!(f, "{}{}", CONNECTION_PREFIX, key),
            DataId::Group(key) => write!(f, "{}{}", GROUP_PREFIX, key),
            DataId::Signature(key) => write!(f, "{}{}", SIGNATURE_PREFIX, key),
            DataId::SelfProfile => f.write_str(PROFILE_DATA_ID),
            DataId::Unknown(raw) => f.write_str(raw),
        }
    }
}

impl From<&str> for DataId {
    fn from(raw: &str) -> Self {
        DataId::parse(raw)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classified {
    pub kind: DataKind,
    pub natural_key: String,
}

pub fn classify(raw: &str) -> Classified {
    let id = DataId::parse(raw);
    Classified {
        kind: id.kind(),
        natural_key: id.natural_key().to_string(),
    }
}
