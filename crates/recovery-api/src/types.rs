use serde::{Deserialize, Serialize};

/// Decrypted `connection_<key>` blob as uploaded by a recovery connection.
///
/// Counterparts run different app versions, so unknown fields are tolerated
/// and every field defaults; required fields are enforced by validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub timestamp: u64,
}

/// Decrypted `group_<key>` blob.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub aes_key: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub admins: Vec<String>,
}

/// Decrypted `data` blob: the uploader's own profile bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
    #[serde(default)]
    pub signing_key: String,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    pub id: String,
    pub name: String,
    pub score: f64,
    /// File name returned by the image store; never the image bytes.
    pub photo: Option<String>,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub id: String,
    pub aes_key: String,
    pub photo: Option<String>,
    pub name: Option<String>,
    pub members: Vec<String>,
    pub admins: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub name: String,
    pub photo: Option<String>,
}

/// Opaque cosignature blob, kept exactly as decrypted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cosignature(pub Vec<u8>);

impl Cosignature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Result of the session bootstrap download.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryBootstrap {
    pub signing_key: String,
    pub timestamp: u64,
}
