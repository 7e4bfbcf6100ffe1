// # Private Network Attachment Resource
//
// Manages the attachment of one VPS to one private network. The remote
// collection is the network's list of attached VPSes; this resource owns the
// single entry naming its VPS. A VPS that is busy with a running action
// rejects attach/detach calls, which the classifier treats as transient.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::executor::Reconciler;
use crate::traits::{CollectionClient, Resource, Selector};

/// One VPS attached to a private network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpsAttachment {
    /// Name of the attached VPS
    pub vps_name: String,
}

/// Selects the attachment entry of one VPS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSelector {
    pub vps_name: String,
}

impl Selector<VpsAttachment> for AttachmentSelector {
    fn matches(&self, entry: &VpsAttachment) -> bool {
        entry.vps_name == self.vps_name
    }
}

/// Identifier of an attachment: `network/vps`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentId {
    pub network_id: String,
    pub vps_name: String,
}

impl AttachmentId {
    fn selector(&self) -> AttachmentSelector {
        AttachmentSelector {
            vps_name: self.vps_name.clone(),
        }
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network_id, self.vps_name)
    }
}

impl FromStr for AttachmentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        let [network_id, vps_name] = parts.as_slice() else {
            return Err(Error::invalid_input(
                "Incorrect ID format, expected `network/vps`",
            ));
        };
        Ok(AttachmentId {
            network_id: network_id.to_string(),
            vps_name: vps_name.to_string(),
        })
    }
}

/// Desired attachment of one VPS to one private network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSpec {
    pub network_id: String,
    pub vps_name: String,
}

impl AttachmentSpec {
    pub fn attachment_id(&self) -> AttachmentId {
        AttachmentId {
            network_id: self.network_id.clone(),
            vps_name: self.vps_name.clone(),
        }
    }
}

/// Private network attachment resource
pub struct NetworkAttachment<C>
where
    C: CollectionClient<Entry = VpsAttachment>,
{
    reconciler: Arc<Reconciler<C>>,
}

impl<C> NetworkAttachment<C>
where
    C: CollectionClient<Entry = VpsAttachment>,
{
    pub fn new(reconciler: Arc<Reconciler<C>>) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl<C> Resource for NetworkAttachment<C>
where
    C: CollectionClient<Entry = VpsAttachment> + 'static,
{
    type Id = AttachmentId;
    type Desired = AttachmentSpec;
    type State = VpsAttachment;

    /// Attaching is idempotent: an already-attached VPS converges with zero
    /// writes
    async fn create(&self, desired: &Self::Desired) -> Result<Self::Id> {
        let id = desired.attachment_id();
        let entry = VpsAttachment {
            vps_name: id.vps_name.clone(),
        };
        self.reconciler
            .reconcile(&id.network_id, &id.selector(), std::slice::from_ref(&entry))
            .await?;
        Ok(id)
    }

    /// Absent when the network lists no matching VPS
    async fn read(&self, id: &Self::Id) -> Result<Option<Self::State>> {
        let entries = self.reconciler.read(&id.network_id, &id.selector()).await?;
        Ok(entries.into_iter().next())
    }

    /// Attachments have no mutable fields; convergence re-asserts presence
    async fn update(&self, id: &Self::Id, desired: &Self::Desired) -> Result<()> {
        let entry = VpsAttachment {
            vps_name: desired.vps_name.clone(),
        };
        self.reconciler
            .reconcile(&id.network_id, &id.selector(), std::slice::from_ref(&entry))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &Self::Id) -> Result<()> {
        self.reconciler
            .reconcile(&id.network_id, &id.selector(), &[])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_id_roundtrips() {
        let id: AttachmentId = "net-abc123/web-1".parse().unwrap();
        assert_eq!(id.network_id, "net-abc123");
        assert_eq!(id.vps_name, "web-1");
        assert_eq!(id.to_string(), "net-abc123/web-1");
    }

    #[test]
    fn malformed_attachment_id_is_invalid_input() {
        assert!(matches!(
            "just-a-network".parse::<AttachmentId>(),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            "a/b/c".parse::<AttachmentId>(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn selector_matches_own_vps_only() {
        let selector = AttachmentSelector {
            vps_name: "web-1".to_string(),
        };
        assert!(selector.matches(&VpsAttachment {
            vps_name: "web-1".to_string()
        }));
        assert!(!selector.matches(&VpsAttachment {
            vps_name: "web-2".to_string()
        }));
    }
}
