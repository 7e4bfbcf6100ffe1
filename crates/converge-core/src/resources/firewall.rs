// # VPS Firewall Ruleset Resource
//
// Manages the full inbound ruleset of one VPS. Unlike DNS record sets, the
// ruleset has no partition: the resource owns the whole collection, so the
// selector matches everything and deletion converges to an empty ruleset.
//
// A VPS with an action running rejects modifications; that rejection is a
// transient signature in the default classifier set.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::executor::Reconciler;
use crate::traits::{CollectionClient, MatchAll, Resource};

/// Network protocol a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    TcpUdp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::TcpUdp => "tcp_udp",
        };
        f.write_str(s)
    }
}

/// One inbound firewall rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    /// Description of the rule
    pub description: String,
    /// Protocol for this rule
    #[serde(default)]
    pub protocol: Protocol,
    /// Network port or port range (e.g. "22", "8000-8100")
    pub port: String,
    /// Whitelisted IP ranges allowed to connect; empty allows all
    #[serde(default)]
    pub whitelist: Vec<String>,
}

impl FirewallRule {
    /// Validate rule fields; whitelist entries must be CIDR ranges
    pub fn validate(&self) -> Result<()> {
        if self.port.is_empty() {
            return Err(Error::invalid_input(format!(
                "rule {:?} has an empty port",
                self.description
            )));
        }
        for range in &self.whitelist {
            validate_cidr(range)?;
        }
        Ok(())
    }
}

/// Check that `range` is a valid `address/prefix` CIDR network
fn validate_cidr(range: &str) -> Result<()> {
    let invalid = || Error::invalid_input(format!("{:?} is not a valid CIDR range", range));

    let (addr, prefix) = range.split_once('/').ok_or_else(invalid)?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;

    if Ipv4Addr::from_str(addr).is_ok() {
        if prefix > 32 {
            return Err(invalid());
        }
    } else if Ipv6Addr::from_str(addr).is_ok() {
        if prefix > 128 {
            return Err(invalid());
        }
    } else {
        return Err(invalid());
    }
    Ok(())
}

/// Desired ruleset of one VPS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallSpec {
    /// The name of the VPS
    pub vps_name: String,
    /// Desired inbound rules
    #[serde(default)]
    pub rules: Vec<FirewallRule>,
}

impl FirewallSpec {
    /// Validate every rule in the spec
    pub fn validate(&self) -> Result<()> {
        if self.vps_name.is_empty() {
            return Err(Error::invalid_input("VPS name cannot be empty"));
        }
        for rule in &self.rules {
            rule.validate()?;
        }
        Ok(())
    }
}

/// VPS firewall ruleset resource
pub struct VpsFirewall<C>
where
    C: CollectionClient<Entry = FirewallRule>,
{
    reconciler: Arc<Reconciler<C>>,
}

impl<C> VpsFirewall<C>
where
    C: CollectionClient<Entry = FirewallRule>,
{
    pub fn new(reconciler: Arc<Reconciler<C>>) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl<C> Resource for VpsFirewall<C>
where
    C: CollectionClient<Entry = FirewallRule> + 'static,
{
    type Id = String;
    type Desired = FirewallSpec;
    type State = Vec<FirewallRule>;

    /// A VPS always carries a ruleset remotely, so creation is convergence
    async fn create(&self, desired: &Self::Desired) -> Result<Self::Id> {
        desired.validate()?;
        self.reconciler
            .reconcile(&desired.vps_name, &MatchAll, &desired.rules)
            .await?;
        Ok(desired.vps_name.clone())
    }

    async fn read(&self, id: &Self::Id) -> Result<Option<Self::State>> {
        let rules = self.reconciler.read(id, &MatchAll).await?;
        if rules.is_empty() {
            return Ok(None);
        }
        Ok(Some(rules))
    }

    async fn update(&self, id: &Self::Id, desired: &Self::Desired) -> Result<()> {
        desired.validate()?;
        self.reconciler
            .reconcile(id, &MatchAll, &desired.rules)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &Self::Id) -> Result<()> {
        self.reconciler.reconcile(id, &MatchAll, &[]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ssh_rule() -> FirewallRule {
        FirewallRule {
            description: "ssh".to_string(),
            protocol: Protocol::Tcp,
            port: "22".to_string(),
            whitelist: vec!["10.0.0.0/8".to_string()],
        }
    }

    #[test]
    fn valid_rule_passes() {
        ssh_rule().validate().unwrap();
    }

    #[test]
    fn empty_port_is_rejected() {
        let mut rule = ssh_rule();
        rule.port = String::new();
        assert!(matches!(rule.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn cidr_validation() {
        validate_cidr("192.168.0.0/24").unwrap();
        validate_cidr("2001:db8::/32").unwrap();

        assert!(validate_cidr("192.168.0.0").is_err());
        assert!(validate_cidr("192.168.0.0/33").is_err());
        assert!(validate_cidr("2001:db8::/129").is_err());
        assert!(validate_cidr("not-an-address/8").is_err());
    }

    #[test]
    fn protocol_serializes_snake_case() {
        let json = serde_json::to_string(&Protocol::TcpUdp).unwrap();
        assert_eq!(json, r#""tcp_udp""#);
        assert_eq!(Protocol::TcpUdp.to_string(), "tcp_udp");
    }

    #[test]
    fn rule_defaults_apply_on_deserialize() {
        let rule: FirewallRule =
            serde_json::from_str(r#"{"description": "web", "port": "443"}"#).unwrap();
        assert_eq!(rule.protocol, Protocol::Tcp);
        assert!(rule.whitelist.is_empty());
    }
}
