// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::token::LogicalId;
use ipnet::Ipv4Net;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    Tcp(u16),
    TcpRange(u16, u16),
    AllTraffic,
}

impl Port {
    pub fn protocol(&self) -> &'static str {
        match self {
            Port::Tcp(_) | Port::TcpRange(_, _) => "tcp",
            Port::AllTraffic => "-1",
        }
    }

    /// `(FromPort, ToPort)`; all-traffic rules carry no range.
    pub fn range(&self) -> Option<(u16, u16)> {
        match self {
            Port::Tcp(p) => Some((*p, *p)),
            Port::TcpRange(from, to) => Some((*from, *to)),
            Port::AllTraffic => None,
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        match self.range() {
            Some((from, to)) => from <= port && port <= to,
            None => true,
        }
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Port::Tcp(p) => write!(f, "tcp/{}", p),
            Port::TcpRange(from, to) => write!(f, "tcp/{}-{}", from, to),
            Port::AllTraffic => write!(f, "all"),
        }
    }
}

/// Source of inbound traffic.
#[derive(Debug, Clone, PartialEq)]
pub enum Peer {
    Ipv4(Ipv4Net),
    SecurityGroup(LogicalId),
}

impl Peer {
    pub fn any_ipv4() -> Self {
        Peer::Ipv4(Ipv4Net::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngressRule {
    pub peer: Peer,
    pub port: Port,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecurityGroupProps {
    pub description: String,
    pub allow_all_outbound: bool,
    /// Address-range rules, emitted inline with the group.
    pub ingress: Vec<IngressRule>,
}

impl SecurityGroupProps {
    pub fn restricted(description: &str) -> Self {
        Self {
            description: description.to_string(),
            allow_all_outbound: false,
            ingress: Vec::new(),
        }
    }

    pub fn open_outbound(description: &str) -> Self {
        Self {
            description: description.to_string(),
            allow_all_outbound: true,
            ingress: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_contains() {
        assert!(Port::Tcp(5432).contains(5432));
        assert!(!Port::Tcp(5432).contains(5433));
        assert!(Port::TcpRange(1000, 2000).contains(1433));
        assert!(Port::AllTraffic.contains(1));
    }

    #[test]
    fn test_any_ipv4_peer() {
        assert_eq!(Peer::any_ipv4(), Peer::Ipv4("0.0.0.0/0".parse().unwrap()));
    }
}
