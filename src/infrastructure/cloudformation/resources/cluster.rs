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

use crate::domain::model::{CfnResource, ClusterProps, LogicalId, Props, Token, Value};
use crate::domain::stack::Stack;
use crate::infrastructure::constants::{CONTAINER_INSIGHTS_SETTING, TYPE_ECS_CLUSTER};
use crate::shared::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterHandle {
    pub cluster: LogicalId,
    pub cluster_name: Option<String>,
}

impl ClusterHandle {
    /// Resolves to the cluster name at deploy time.
    pub fn name_ref(&self) -> Value {
        Token::reference(&self.cluster).into()
    }
}

pub struct ClusterBuilder {
    id: String,
    props: ClusterProps,
}

impl ClusterBuilder {
    pub fn new(id: &str, props: ClusterProps) -> Self {
        Self {
            id: id.to_string(),
            props,
        }
    }

    pub fn build(&self, stack: &mut Stack) -> Result<ClusterHandle> {
        let insights = if self.props.container_insights {
            "enabled"
        } else {
            "disabled"
        };
        let settings = Props::new()
            .with("Name", CONTAINER_INSIGHTS_SETTING)
            .with("Value", insights);

        let props = Props::new()
            .with("ClusterSettings", vec![Value::from(settings)])
            .with_opt("ClusterName", self.props.cluster_name.clone());

        let cluster = stack.add_resource(CfnResource::new(
            LogicalId::new(&self.id),
            TYPE_ECS_CLUSTER,
            props,
        ))?;

        Ok(ClusterHandle {
            cluster,
            cluster_name: self.props.cluster_name.clone(),
        })
    }
}
