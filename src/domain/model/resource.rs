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

use super::token::{LogicalId, Props, Token, Value};
use serde::{Deserialize, Serialize};

/// What happens to a resource when its stack is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    #[default]
    Delete,
    Retain,
    Snapshot,
}

impl RemovalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalPolicy::Delete => "Delete",
            RemovalPolicy::Retain => "Retain",
            RemovalPolicy::Snapshot => "Snapshot",
        }
    }
}

impl std::str::FromStr for RemovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delete" | "destroy" => Ok(RemovalPolicy::Delete),
            "retain" => Ok(RemovalPolicy::Retain),
            "snapshot" => Ok(RemovalPolicy::Snapshot),
            other => Err(format!("Invalid removal policy: {}", other)),
        }
    }
}

/// A single low-level resource descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct CfnResource {
    pub logical_id: LogicalId,
    pub resource_type: String,
    pub properties: Props,
    pub depends_on: Vec<LogicalId>,
    pub removal_policy: Option<RemovalPolicy>,
}

impl CfnResource {
    pub fn new(logical_id: LogicalId, resource_type: &str, properties: Props) -> Self {
        Self {
            logical_id,
            resource_type: resource_type.to_string(),
            properties,
            depends_on: Vec::new(),
            removal_policy: None,
        }
    }

    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        if !self.depends_on.contains(id) {
            self.depends_on.push(id.clone());
        }
        self
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn is_type(&self, resource_type: &str) -> bool {
        self.resource_type == resource_type
    }

    pub fn reference(&self) -> Value {
        Token::reference(&self.logical_id).into()
    }

    pub fn attribute(&self, name: &str) -> Value {
        Token::get_att(&self.logical_id, name).into()
    }

    /// Resources this one refers to through tokens, in property order.
    pub fn referenced_ids(&self) -> Vec<&LogicalId> {
        let mut ids = Vec::new();
        for (_, value) in self.properties.iter() {
            value.visit_tokens(&mut |t| {
                if let Some(id) = t.target() {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            });
        }
        ids
    }
}

/// Input the operator supplies at deploy time, or the engine looks up.
#[derive(Debug, Clone, PartialEq)]
pub struct CfnParameter {
    pub name: String,
    pub parameter_type: String,
    pub default: Option<String>,
    pub description: Option<String>,
}

/// Named value surfaced after deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct CfnOutput {
    pub name: String,
    pub value: Value,
    pub description: Option<String>,
    pub export_name: Option<String>,
}

impl CfnOutput {
    pub fn new(name: &str, value: impl Into<Value>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            description: None,
            export_name: None,
        }
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    pub fn export(mut self, name: impl Into<String>) -> Self {
        self.export_name = Some(name.into());
        self
    }
}
