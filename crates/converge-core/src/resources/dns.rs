// # DNS Record Set Resource
//
// Manages the set of DNS entries sharing one name+type within a domain's
// zone. The remote zone is a single flat collection; this resource owns only
// its name+type partition and leaves every other entry alone.
//
// The id format is `domain/type/name` so resources can be imported from an
// identifier alone.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::executor::Reconciler;
use crate::traits::{CollectionClient, Resource, Selector};

/// Supported DNS record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Caa,
    Cname,
    Mx,
    Ns,
    Txt,
    Srv,
    Sshfp,
    Tlsa,
}

impl RecordType {
    /// All supported types, for validation messages
    pub const ALL: &'static [RecordType] = &[
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Caa,
        RecordType::Cname,
        RecordType::Mx,
        RecordType::Ns,
        RecordType::Txt,
        RecordType::Srv,
        RecordType::Sshfp,
        RecordType::Tlsa,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Caa => "CAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Txt => "TXT",
            RecordType::Srv => "SRV",
            RecordType::Sshfp => "SSHFP",
            RecordType::Tlsa => "TLSA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RecordType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::invalid_input(format!(
                    "unsupported record type {:?}, expected one of A, AAAA, CAA, CNAME, MX, NS, TXT, SRV, SSHFP, TLSA",
                    s
                ))
            })
    }
}

/// One DNS entry as held by the remote zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsEntry {
    /// Record name relative to the domain (e.g. "www", "@")
    pub name: String,
    /// Time-to-live in seconds
    pub expire: u32,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Record content (address, target hostname, text, ...)
    pub content: String,
}

/// Selects the entries of one name+type partition.
///
/// The remote identifies entries by name, expire and type; expire is
/// deliberately not part of the partition, so changing it rewrites the same
/// name+type slot instead of creating a parallel one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecordSelector {
    pub name: String,
    pub record_type: RecordType,
}

impl Selector<DnsEntry> for DnsRecordSelector {
    fn matches(&self, entry: &DnsEntry) -> bool {
        entry.name == self.name && entry.record_type == self.record_type
    }
}

/// Identifier of a DNS record set: `domain/type/name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordId {
    pub domain: String,
    pub record_type: RecordType,
    pub name: String,
}

impl RecordId {
    fn selector(&self) -> DnsRecordSelector {
        DnsRecordSelector {
            name: self.name.clone(),
            record_type: self.record_type,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.domain, self.record_type, self.name)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        let [domain, record_type, name] = parts.as_slice() else {
            return Err(Error::invalid_input(
                "Incorrect ID format, expected `domain/type/name`",
            ));
        };
        Ok(RecordId {
            domain: normalize_domain(domain),
            record_type: record_type.parse()?,
            name: name.to_string(),
        })
    }
}

/// Canonical domain form: lowercase, no trailing dot
pub fn normalize_domain(domain: &str) -> String {
    domain.trim_end_matches('.').to_lowercase()
}

fn default_expire() -> u32 {
    86400
}

/// Desired state of one record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecordSpec {
    /// Domain whose zone holds the entries
    pub domain: String,
    /// Record name within the zone
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Time-to-live in seconds
    #[serde(default = "default_expire")]
    pub expire: u32,
    /// Desired content values; the set of entries to exist remotely
    pub content: Vec<String>,
}

impl DnsRecordSpec {
    /// Identifier this spec maps to
    pub fn record_id(&self) -> RecordId {
        RecordId {
            domain: normalize_domain(&self.domain),
            record_type: self.record_type,
            name: self.name.clone(),
        }
    }
}

/// Observed state of one record set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecordState {
    pub expire: u32,
    pub content: Vec<String>,
}

/// DNS record set resource over a zone collection client
pub struct DnsRecordSet<C>
where
    C: CollectionClient<Entry = DnsEntry>,
{
    reconciler: Arc<Reconciler<C>>,
}

impl<C> DnsRecordSet<C>
where
    C: CollectionClient<Entry = DnsEntry>,
{
    pub fn new(reconciler: Arc<Reconciler<C>>) -> Self {
        Self { reconciler }
    }
}

/// Desired entries for the id's partition
fn desired_entries(id: &RecordId, desired: &DnsRecordSpec) -> Vec<DnsEntry> {
    desired
        .content
        .iter()
        .map(|content| DnsEntry {
            name: id.name.clone(),
            expire: desired.expire,
            record_type: id.record_type,
            content: content.clone(),
        })
        .collect()
}

#[async_trait]
impl<C> Resource for DnsRecordSet<C>
where
    C: CollectionClient<Entry = DnsEntry> + 'static,
{
    type Id = RecordId;
    type Desired = DnsRecordSpec;
    type State = DnsRecordState;

    async fn create(&self, desired: &Self::Desired) -> Result<Self::Id> {
        let id = desired.record_id();
        let existing = self.reconciler.read(&id.domain, &id.selector()).await?;
        if !existing.is_empty() {
            return Err(Error::already_exists(format!(
                "DNS entries for {} record named {} already exist",
                id.record_type, id.name
            )));
        }
        self.update(&id, desired).await?;
        Ok(id)
    }

    async fn read(&self, id: &Self::Id) -> Result<Option<Self::State>> {
        let entries = self.reconciler.read(&id.domain, &id.selector()).await?;
        debug!("read {}: {} matching entries", id, entries.len());
        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(DnsRecordState {
            expire: entries[0].expire,
            content: entries.into_iter().map(|e| e.content).collect(),
        }))
    }

    async fn update(&self, id: &Self::Id, desired: &Self::Desired) -> Result<()> {
        let entries = desired_entries(id, desired);
        self.reconciler
            .reconcile(&id.domain, &id.selector(), &entries)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &Self::Id) -> Result<()> {
        self.reconciler
            .reconcile(&id.domain, &id.selector(), &[])
            .await?;
        Ok(())
    }
}
